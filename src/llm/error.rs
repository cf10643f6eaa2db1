//! Typed errors for Radium transport and API calls
//!
//! `TransportError` covers failures below HTTP (nothing came back), while
//! `LlmError` adds the status-code failures of the OpenAI-compatible API.

use thiserror::Error;

/// Failure to complete an HTTP exchange
///
/// The instrumented transport hands these back to callers unchanged, so the
/// variant a caller sees is the one the underlying transport produced.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection could not be established (refused, DNS, TLS)
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The request or a body read timed out
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// The response body stream failed mid-read
    #[error("Body error: {0}")]
    Body(String),

    /// A fully read body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// The request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl TransportError {
    /// Convert a reqwest failure into a typed transport error
    ///
    /// The message carries the whole source chain; reqwest's own `Display`
    /// hides the OS-level cause ("Connection refused") behind its source.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        let message = error_chain(&e);
        if e.is_timeout() {
            TransportError::Timeout(message)
        } else if e.is_connect() {
            TransportError::Connect(message)
        } else if e.is_body() {
            TransportError::Body(message)
        } else if e.is_decode() {
            TransportError::Decode(message)
        } else if e.is_builder() {
            TransportError::InvalidRequest(message)
        } else {
            TransportError::Other(e.into())
        }
    }

    /// Connect and timeout failures mean the server was never reached
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, TransportError::Connect(_) | TransportError::Timeout(_))
    }
}

/// Errors from the OpenAI-compatible API
#[derive(Debug, Error)]
pub enum LlmError {
    /// Credential rejected (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Malformed request (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Server-side error (HTTP 5xx)
    #[error("Service error: {0}")]
    ServiceError(String),

    /// Any other non-success status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The server answered 2xx but the payload was not what the API promises
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl LlmError {
    /// Convert HTTP status code and error text into typed LlmError
    pub fn from_http_status(status: reqwest::StatusCode, error_text: String) -> Self {
        match status.as_u16() {
            401 => LlmError::Unauthorized(error_text),
            429 => LlmError::RateLimited(error_text),
            400 => LlmError::BadRequest(error_text),
            500..=599 => LlmError::ServiceError(error_text),
            other => LlmError::Http {
                status: other,
                body: error_text,
            },
        }
    }

    pub fn is_connection_failure(&self) -> bool {
        matches!(self, LlmError::Transport(t) if t.is_connection_failure())
    }
}

/// Render an error and all of its sources as `outer: inner: root`
pub(crate) fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
