//! Types for the DeepSeek (OpenAI-compatible) chat completions API.
//!
//! [`ChatCompletionRequest`] is both the inbound shape of chat-format callers and the
//! outbound body sent to DeepSeek. Inbound fields are read leniently: a missing or
//! mistyped value takes its default, and messages are carried through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const DEFAULT_MODEL: &str = "deepseek-chat";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
}

impl ChatCompletionRequest {
    pub fn from_payload(payload: &Value) -> Self {
        let model = payload
            .get("model")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MODEL);

        let messages = payload
            .get("messages")
            .and_then(Value::as_array)
            .map(|list| list.iter().cloned().map(ChatMessage).collect())
            .unwrap_or_default();

        Self {
            model: model.to_string(),
            messages,
            stream: payload.get("stream") == Some(&Value::Bool(true)),
            temperature: payload.get("temperature").and_then(Value::as_f64),
            max_tokens: payload.get("max_tokens").and_then(Value::as_u64),
        }
    }
}

/// One message, kept as the caller sent it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChatMessage(Value);

impl ChatMessage {
    pub fn text(role: &str, content: impl Into<String>) -> Self {
        Self(json!({"role": role, "content": content.into()}))
    }

    pub fn role(&self) -> Option<&str> {
        self.0.get("role").and_then(Value::as_str)
    }

    pub fn content_text(&self) -> Option<&str> {
        self.0.get("content").and_then(Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// Streaming chunk (one `data:` record of the upstream event stream)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// Text increment carried by the first choice, if any.
    pub fn delta_text(&self) -> &str {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .unwrap_or("")
    }
}
