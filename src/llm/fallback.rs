//! Error classification for Radium model calls
//!
//! Turns an arbitrary caught error into a coarse category, a display message
//! and a suggested fallback model. The suggestion is advisory: nothing here
//! retries or switches models, and the original error is always handed back.

use super::error::{LlmError, TransportError};
use super::log_sink::{default_sink, SharedSink};
use serde::Serialize;
use std::sync::Arc;

/// Model suggested when the caller does not name one
pub const DEFAULT_FALLBACK_MODEL: &str = "chat-model";

const CONNECTION_MARKERS: &[&str] = &["ECONNREFUSED", "ETIMEDOUT", "Failed to fetch"];
const AUTH_MARKER: &str = "authentication";

/// Coarse failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Connection,
    Authentication,
    Generic,
}

impl ErrorCategory {
    /// User-facing message for this category
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCategory::Connection => {
                "Unable to connect to the Radium LLM server. Falling back to default model."
            }
            ErrorCategory::Authentication => {
                "Authentication error with Radium LLM server. Falling back to default model."
            }
            ErrorCategory::Generic => "An error occurred with the Radium LLM model.",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Connection => "connection",
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Generic => "generic",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything that can be handed to the classifier.
///
/// `error_message` is `None` for values that are not errors at all; those
/// always land in [`ErrorCategory::Generic`]. `category_hint` lets typed
/// errors classify themselves without relying on message text.
pub trait Classifiable {
    fn error_message(&self) -> Option<String>;

    fn category_hint(&self) -> Option<ErrorCategory> {
        None
    }
}

impl Classifiable for TransportError {
    fn error_message(&self) -> Option<String> {
        Some(self.to_string())
    }

    fn category_hint(&self) -> Option<ErrorCategory> {
        self.is_connection_failure()
            .then_some(ErrorCategory::Connection)
    }
}

impl Classifiable for LlmError {
    fn error_message(&self) -> Option<String> {
        Some(self.to_string())
    }

    fn category_hint(&self) -> Option<ErrorCategory> {
        match self {
            LlmError::Transport(inner) => inner.category_hint(),
            LlmError::Unauthorized(_) => Some(ErrorCategory::Authentication),
            _ => None,
        }
    }
}

impl Classifiable for std::io::Error {
    fn error_message(&self) -> Option<String> {
        Some(self.to_string())
    }

    fn category_hint(&self) -> Option<ErrorCategory> {
        io_hint(self)
    }
}

impl Classifiable for anyhow::Error {
    fn error_message(&self) -> Option<String> {
        Some(format!("{:#}", self))
    }

    fn category_hint(&self) -> Option<ErrorCategory> {
        self.chain().find_map(cause_hint)
    }
}

impl Classifiable for Box<dyn std::error::Error + Send + Sync> {
    fn error_message(&self) -> Option<String> {
        Some(self.to_string())
    }

    fn category_hint(&self) -> Option<ErrorCategory> {
        let root: &(dyn std::error::Error + 'static) = &**self;
        std::iter::successors(Some(root), |e| e.source()).find_map(cause_hint)
    }
}

/// Arbitrary JSON payloads are opaque values, not errors
impl Classifiable for serde_json::Value {
    fn error_message(&self) -> Option<String> {
        None
    }
}

impl<T: Classifiable + ?Sized> Classifiable for &T {
    fn error_message(&self) -> Option<String> {
        (**self).error_message()
    }

    fn category_hint(&self) -> Option<ErrorCategory> {
        (**self).category_hint()
    }
}

impl<T: Classifiable + ?Sized> Classifiable for Arc<T> {
    fn error_message(&self) -> Option<String> {
        (**self).error_message()
    }

    fn category_hint(&self) -> Option<ErrorCategory> {
        (**self).category_hint()
    }
}

/// Structural hint for one link of an error chain
fn cause_hint(cause: &(dyn std::error::Error + 'static)) -> Option<ErrorCategory> {
    if let Some(io) = cause.downcast_ref::<std::io::Error>() {
        io_hint(io)
    } else if let Some(transport) = cause.downcast_ref::<TransportError>() {
        transport.category_hint()
    } else if let Some(llm) = cause.downcast_ref::<LlmError>() {
        llm.category_hint()
    } else {
        None
    }
}

fn io_hint(e: &std::io::Error) -> Option<ErrorCategory> {
    match e.kind() {
        std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::TimedOut => {
            Some(ErrorCategory::Connection)
        }
        _ => None,
    }
}

/// Classify without logging. First match wins: connection, then
/// authentication, then generic.
pub fn classify<E: Classifiable + ?Sized>(error: &E) -> ErrorCategory {
    let hint = error.category_hint();
    let message = error.error_message();
    let text = message.as_deref().unwrap_or("");

    if hint == Some(ErrorCategory::Connection)
        || CONNECTION_MARKERS.iter().any(|marker| text.contains(marker))
    {
        ErrorCategory::Connection
    } else if hint == Some(ErrorCategory::Authentication) || text.contains(AUTH_MARKER) {
        ErrorCategory::Authentication
    } else {
        ErrorCategory::Generic
    }
}

/// Result of classifying one error
#[derive(Debug)]
pub struct ClassifiedError<E> {
    pub message: String,
    pub category: ErrorCategory,
    pub fallback_to_model: String,
    pub original_error: E,
}

impl<E> ClassifiedError<E> {
    /// The serializable part of the result (everything except the error)
    pub fn summary(&self) -> ClassificationSummary<'_> {
        ClassificationSummary {
            category: self.category,
            message: &self.message,
            fallback_to_model: &self.fallback_to_model,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationSummary<'a> {
    pub category: ErrorCategory,
    pub message: &'a str,
    pub fallback_to_model: &'a str,
}

/// Classifier with an injected sink and default fallback model
#[derive(Clone)]
pub struct ErrorClassifier {
    sink: SharedSink,
    default_fallback: String,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(default_sink())
    }
}

impl ErrorClassifier {
    pub fn new(sink: SharedSink) -> Self {
        Self {
            sink,
            default_fallback: DEFAULT_FALLBACK_MODEL.to_string(),
        }
    }

    pub fn with_default_fallback(mut self, model: impl Into<String>) -> Self {
        self.default_fallback = model.into();
        self
    }

    pub fn default_fallback(&self) -> &str {
        &self.default_fallback
    }

    /// Log the raw error, classify it and attach the fallback suggestion.
    /// Never fails.
    pub fn handle<E>(&self, error: E, fallback_model_id: Option<&str>) -> ClassifiedError<E>
    where
        E: Classifiable + std::fmt::Debug,
    {
        self.sink
            .error(&format!("Error using Radium LLM model: {:?}", error));

        let category = classify(&error);
        ClassifiedError {
            message: category.message().to_string(),
            category,
            fallback_to_model: fallback_model_id
                .unwrap_or(&self.default_fallback)
                .to_string(),
            original_error: error,
        }
    }
}

/// Classify `error` with the default classifier, logging through `tracing`
pub fn handle_radium_model_error<E>(
    error: E,
    fallback_model_id: Option<&str>,
) -> ClassifiedError<E>
where
    E: Classifiable + std::fmt::Debug,
{
    ErrorClassifier::default().handle(error, fallback_model_id)
}
