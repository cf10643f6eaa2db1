//! Wire types for the OpenAI-compatible chat API

use serde::{Deserialize, Serialize};

/// Identifier of a model served by the inference server.
///
/// Any string is accepted; [`ModelId::LLAMA_2_7B_CHAT`] is the one the
/// Radium server is known to host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub const LLAMA_2_7B_CHAT: &'static str = "/models/meta-llama/Llama-2-7b-chat-hf";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn llama_2_7b_chat() -> Self {
        Self::new(Self::LLAMA_2_7B_CHAT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_well_known(&self) -> bool {
        self.0 == Self::LLAMA_2_7B_CHAT
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::llama_2_7b_chat()
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ModelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a ModelId,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelList {
    #[serde(default)]
    pub data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelEntry {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_id_is_open_string() {
        let known = ModelId::default();
        assert!(known.is_well_known());
        assert_eq!(known.as_str(), "/models/meta-llama/Llama-2-7b-chat-hf");

        let custom = ModelId::from("mistral-7b-instruct");
        assert!(!custom.is_well_known());
        assert_eq!(serde_json::to_value(&custom).unwrap(), "mistral-7b-instruct");
    }

    #[test]
    fn test_request_serialization() {
        let model = ModelId::default();
        let messages = vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ];
        let request = ChatCompletionRequest {
            model: &model,
            messages: &messages,
            stream: false,
            max_tokens: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], ModelId::LLAMA_2_7B_CHAT);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["messages"][2]["role"], "assistant");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_chunk_without_content() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert!(chunk.choices[0].delta.content.is_none());
    }
}
