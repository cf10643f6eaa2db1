//! HTTP transport seam for the OpenAI-compatible client
//!
//! The client builds [`HttpRequest`] values and hands them to an
//! [`HttpTransport`]. The real transport is [`ReqwestTransport`]; wrappers
//! such as the instrumented transport sit in between without changing the
//! request or response shapes.

use super::error::TransportError;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

/// Streaming response body. Consumable once.
pub type BodyStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// An outgoing request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// Add a header, rejecting names or values that are not valid HTTP
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, TransportError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidRequest(format!("header {}: {e}", name.as_str())))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn with_headers(mut self, headers: &HeaderMap) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `payload` as the JSON body
    pub fn with_json<T: Serialize + ?Sized>(self, payload: &T) -> Result<Self, TransportError> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| TransportError::InvalidRequest(format!("serializing body: {e}")))?;
        Ok(self.with_body(body))
    }
}

/// An incoming response with an unread body
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: BodyStream,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// A buffered copy of a response body
#[derive(Debug)]
pub struct BodyCopy {
    pub bytes: Bytes,
    /// Set when the body stream failed before it ended
    pub error: Option<String>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: BodyStream) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Response with an in-memory body
    pub fn from_bytes(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self::new(status, headers, stream::once(async move { Ok(body) }).boxed())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    pub fn into_body_stream(self) -> BodyStream {
        self.body
    }

    /// Read the whole body
    pub async fn bytes(self) -> Result<Bytes, TransportError> {
        let mut body = self.body;
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Read the whole body as UTF-8 text
    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| TransportError::Decode(e.to_string()))
    }

    /// Read the whole body as JSON
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, TransportError> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
    }

    /// Drain the body into a copy and return a response that replays it.
    ///
    /// The returned response yields the same chunks in the same order and,
    /// if the original stream failed, the same error at the same point.
    pub async fn tee(self) -> (HttpResponse, BodyCopy) {
        let HttpResponse {
            status,
            headers,
            mut body,
        } = self;

        let mut chunks = Vec::new();
        let mut copy = BytesMut::new();
        let mut failure = None;
        while let Some(next) = body.next().await {
            match next {
                Ok(chunk) => {
                    copy.extend_from_slice(&chunk);
                    chunks.push(Ok(chunk));
                }
                Err(e) => {
                    failure = Some(e.to_string());
                    chunks.push(Err(e));
                    break;
                }
            }
        }

        let replay = HttpResponse::new(status, headers, stream::iter(chunks).boxed());
        let copy = BodyCopy {
            bytes: copy.freeze(),
            error: failure,
        };
        (replay, copy)
    }
}

/// Sends one request and returns the response without reading its body
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Network transport backed by reqwest
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(TransportError::from_reqwest)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from_reqwest))
            .boxed();

        Ok(HttpResponse::new(status, headers, body))
    }
}
