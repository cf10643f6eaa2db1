//! OpenAI-compatible provider for the Radium inference server
//!
//! Talks to any server implementing the chat completions API through an
//! injected [`HttpTransport`]. [`RadiumProvider::instrumented`] wires the
//! default setup: reqwest underneath, every exchange logged.
//!
//! SECURITY: Credentials are only sent to the configured endpoint.

use super::debug_wrapper::InstrumentedTransport;
use super::error::{LlmError, TransportError};
use super::log_sink::SharedSink;
use super::streaming::{SseDecoder, SseEvent};
use super::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use super::types::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ModelId,
    ModelList,
};
use crate::config::RadiumConfig;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::sync::Arc;
use url::Url;

pub const PROVIDER_NAME: &str = "radium-llm";
pub const DEFAULT_BASE_URL: &str = "http://llm-inference.radium.cloud:8001/v1";
/// The server accepts any bearer token; this is the value it documents
pub const PLACEHOLDER_API_KEY: &str = "empty";

/// Connection settings for an OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    pub headers: HeaderMap,
    pub default_model: ModelId,
    pub max_tokens: Option<u32>,
}

impl OpenAiCompatConfig {
    /// The fixed Radium endpoint
    pub fn radium() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            name: PROVIDER_NAME.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: PLACEHOLDER_API_KEY.to_string(),
            headers,
            default_model: ModelId::default(),
            max_tokens: None,
        }
    }

    /// Settings from the `[radium]` config section
    pub fn from_config(config: &RadiumConfig) -> Result<Self, TransportError> {
        Url::parse(&config.base_url).map_err(|e| {
            TransportError::InvalidRequest(format!("base_url {:?}: {}", config.base_url, e))
        })?;
        let mut compat = Self::radium().with_base_url(config.base_url.clone());
        compat.name = config.name.clone();
        compat.api_key = config.api_key.clone();
        compat.default_model = ModelId::new(config.model.clone());
        compat.max_tokens = config.max_tokens;
        Ok(compat)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<ModelId>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Resolve an API path such as `chat/completions` against the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| TransportError::InvalidRequest(format!("endpoint {joined:?}: {e}")))
    }
}

impl Default for OpenAiCompatConfig {
    fn default() -> Self {
        Self::radium()
    }
}

/// Client for the Radium chat completions API
#[derive(Clone)]
pub struct RadiumProvider {
    config: OpenAiCompatConfig,
    transport: Arc<dyn HttpTransport>,
    model: ModelId,
}

impl RadiumProvider {
    pub fn new(config: OpenAiCompatConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let model = config.default_model.clone();
        Self {
            config,
            transport,
            model,
        }
    }

    /// reqwest transport wrapped in an [`InstrumentedTransport`] logging to `sink`
    pub fn instrumented(config: OpenAiCompatConfig, sink: SharedSink) -> Self {
        let network: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new());
        let transport = InstrumentedTransport::with_sink(network, sink);
        Self::new(config, Arc::new(transport))
    }

    pub fn with_model(mut self, model: impl Into<ModelId>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &ModelId {
        &self.model
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &OpenAiCompatConfig {
        &self.config
    }

    fn authorize(&self, request: HttpRequest) -> Result<HttpRequest, TransportError> {
        request
            .with_headers(&self.config.headers)
            .with_header(
                AUTHORIZATION.as_str(),
                &format!("Bearer {}", self.config.api_key),
            )
    }

    fn chat_request(
        &self,
        messages: &[ChatMessage],
        stream: bool,
    ) -> Result<HttpRequest, TransportError> {
        let payload = ChatCompletionRequest {
            model: &self.model,
            messages,
            stream,
            max_tokens: self.config.max_tokens,
        };
        let url = self.config.endpoint("chat/completions")?;
        self.authorize(HttpRequest::post(url))?.with_json(&payload)
    }

    /// Send and turn non-success statuses into typed errors
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, LlmError> {
        let response = self.transport.send(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        tracing::debug!(
            target: "radium",
            provider = %self.config.name,
            status = status.as_u16(),
            "API request failed"
        );
        Err(LlmError::from_http_status(status, error_text))
    }

    /// Send a non-streaming chat completion and return the reply text
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        tracing::debug!(
            target: "radium",
            provider = %self.config.name,
            model = %self.model,
            messages = messages.len(),
            "Sending chat request"
        );

        let request = self.chat_request(messages, false)?;
        let response: ChatCompletionResponse = self.execute(request).await?.json().await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))
    }

    /// Send a streaming chat completion.
    ///
    /// `on_delta` sees each text fragment as it arrives; the full reply is
    /// returned once the stream ends or sends `[DONE]`.
    pub async fn chat_streaming<F>(
        &self,
        messages: &[ChatMessage],
        mut on_delta: F,
    ) -> Result<String, LlmError>
    where
        F: FnMut(&str) + Send,
    {
        tracing::debug!(
            target: "radium",
            provider = %self.config.name,
            model = %self.model,
            messages = messages.len(),
            "Sending streaming chat request"
        );

        let request = self.chat_request(messages, true)?;
        let mut stream = self.execute(request).await?.into_body_stream();
        let mut decoder = SseDecoder::new();
        let mut text = String::new();

        while let Some(chunk) = stream.next().await {
            for event in decoder.push(&chunk?) {
                if !apply_event(event, &mut text, &mut on_delta) {
                    // Anything buffered after [DONE] is not part of the reply
                    return Ok(text);
                }
            }
        }
        for event in decoder.finish() {
            if !apply_event(event, &mut text, &mut on_delta) {
                break;
            }
        }

        Ok(text)
    }

    /// List model ids served by the endpoint
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = self.config.endpoint("models")?;
        let request = self.authorize(HttpRequest::get(url))?;
        let models: ModelList = self.execute(request).await?.json().await?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }
}

/// Apply one SSE event; returns false once the stream is finished
fn apply_event<F: FnMut(&str)>(event: SseEvent, text: &mut String, on_delta: &mut F) -> bool {
    match event {
        SseEvent::Done => false,
        SseEvent::Data(payload) => {
            match serde_json::from_str::<ChatCompletionChunk>(&payload) {
                Ok(chunk) => {
                    let delta = chunk
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.delta.content)
                        .filter(|c| !c.is_empty());
                    if let Some(delta) = delta {
                        on_delta(&delta);
                        text.push_str(&delta);
                    }
                }
                Err(e) => {
                    tracing::debug!(target: "radium", "Skipping unparseable stream chunk: {}", e);
                }
            }
            true
        }
    }
}
