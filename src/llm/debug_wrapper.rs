//! Debug wrapper for the Radium HTTP transport
//!
//! Intercepts every request sent to the inference server and logs the
//! request body, the response status and the response body, then hands the
//! response back exactly as the inner transport produced it.

use super::error::TransportError;
use super::log_sink::{default_sink, SharedSink};
use super::transport::{HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::Instrument;

const CHAT_COMPLETIONS_MARKER: &str = "/chat/completions";

/// How a response body is inspected for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    EventStream,
    Text,
}

impl BodyKind {
    fn of(content_type: Option<&str>) -> Self {
        match content_type {
            Some(ct) if ct.contains("application/json") => BodyKind::Json,
            Some(ct) if ct.contains("text/event-stream") => BodyKind::EventStream,
            _ => BodyKind::Text,
        }
    }
}

/// Transport wrapper that logs all traffic
///
/// Requests are forwarded untouched. JSON and text responses are read
/// through a buffered copy; event streams are never read.
pub struct InstrumentedTransport {
    inner: Arc<dyn HttpTransport>,
    sink: SharedSink,
}

impl InstrumentedTransport {
    pub fn new(inner: Arc<dyn HttpTransport>) -> Self {
        Self::with_sink(inner, default_sink())
    }

    pub fn with_sink(inner: Arc<dyn HttpTransport>, sink: SharedSink) -> Self {
        Self { inner, sink }
    }

    fn log_request_body(&self, url: &str, body: &Bytes) {
        self.sink
            .info(&format!("Request body: {}", String::from_utf8_lossy(body)));

        match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(json) => {
                let model = match json.get("model") {
                    Some(serde_json::Value::String(model)) => model.clone(),
                    Some(other) => other.to_string(),
                    None => "<none>".to_string(),
                };
                self.sink.info(&format!("Request model: {}", model));

                if url.contains(CHAT_COMPLETIONS_MARKER) {
                    let messages = json
                        .get("messages")
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "<none>".to_string());
                    self.sink.info(&format!("Chat messages: {}", messages));
                }
            }
            Err(e) => {
                self.sink
                    .error(&format!("Error parsing request body: {}", e));
            }
        }
    }

    async fn log_response(&self, response: HttpResponse) -> HttpResponse {
        match BodyKind::of(response.content_type()) {
            BodyKind::EventStream => {
                self.sink.info("Streaming response detected");
                response
            }
            BodyKind::Json => {
                let (response, copy) = response.tee().await;
                if let Some(e) = copy.error {
                    self.sink.error(&format!("Error reading response: {}", e));
                } else {
                    match serde_json::from_slice::<serde_json::Value>(&copy.bytes) {
                        Ok(json) => self.sink.info(&format!("JSON Response: {}", json)),
                        Err(e) => self.sink.error(&format!("Error reading response: {}", e)),
                    }
                }
                response
            }
            BodyKind::Text => {
                let (response, copy) = response.tee().await;
                match copy.error {
                    Some(e) => self.sink.error(&format!("Error reading response: {}", e)),
                    None => self.sink.info(&format!(
                        "Text Response: {}",
                        String::from_utf8_lossy(&copy.bytes)
                    )),
                }
                response
            }
        }
    }
}

#[async_trait]
impl HttpTransport for InstrumentedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::debug_span!(
            "radium_request",
            request_id = %request_id,
            method = %request.method,
        );

        async move {
            let url = request.url.to_string();
            self.sink.info(&format!("Request URL: {}", url));

            if let Some(body) = &request.body {
                self.log_request_body(&url, body);
            }

            self.sink.info(&format!("Sending request to: {}", url));
            let response = match self.inner.send(request).await {
                Ok(response) => response,
                Err(e) => {
                    self.sink.error(&format!("Network Error: {}", e));
                    return Err(e);
                }
            };

            self.sink
                .info(&format!("Response status: {}", response.status().as_u16()));
            Ok(self.log_response(response).await)
        }
        .instrument(span)
        .await
    }
}
