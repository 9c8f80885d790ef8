//! Types for the Coze chat API: the bot/user/additional_messages request shape and
//! the `conversation.message.*` event stream the relay emits to Coze-format callers.

use serde::Serialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Request fields
// ---------------------------------------------------------------------------

/// The parts of a Coze request the relay reads. Extraction never fails: a field that
/// is missing or of the wrong type takes its default. The raw body is what gets
/// forwarded to Coze, so identity fields are not copied here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CozeRequest {
    stream: bool,
    conversation_text: String,
    stage: String,
    context: String,
}

impl CozeRequest {
    pub fn from_payload(payload: &Value) -> Self {
        let string_at = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);
        let vars = payload.get("custom_variables");

        let conversation_text = payload
            .get("additional_messages")
            .and_then(Value::as_array)
            .and_then(|m| m.first())
            .and_then(|m| string_at(m.get("content")));

        let stage = string_at(vars.and_then(|v| v.get("stage"))).filter(|s| !s.is_empty());
        let context = string_at(vars.and_then(|v| v.get("context")));

        Self {
            stream: payload.get("stream") == Some(&Value::Bool(true)),
            conversation_text: conversation_text.unwrap_or_default(),
            stage: stage.unwrap_or_else(|| "Opening".to_string()),
            context: context.unwrap_or_default(),
        }
    }

    /// Only a literal `true` requests streaming.
    pub fn is_streaming(&self) -> bool {
        self.stream
    }

    /// Content of the first additional message, or empty.
    pub fn conversation_text(&self) -> &str {
        &self.conversation_text
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn context(&self) -> &str {
        &self.context
    }
}

// ---------------------------------------------------------------------------
// Stream events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CozeEventKind {
    Delta,
    Completed,
}

/// One event on a Coze-style stream. Delta events carry the increment; the
/// completion event carries the whole accumulated answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CozeEvent {
    pub kind: CozeEventKind,
    pub content: String,
}

#[derive(Serialize)]
struct EventData<'a> {
    #[serde(rename = "type")]
    data_type: &'static str,
    content: &'a str,
}

impl CozeEvent {
    pub fn delta(content: impl Into<String>) -> Self {
        Self {
            kind: CozeEventKind::Delta,
            content: content.into(),
        }
    }

    pub fn completed(content: impl Into<String>) -> Self {
        Self {
            kind: CozeEventKind::Completed,
            content: content.into(),
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self.kind {
            CozeEventKind::Delta => "conversation.message.delta",
            CozeEventKind::Completed => "conversation.message.completed",
        }
    }

    pub fn data_json(&self) -> String {
        let data = EventData {
            data_type: "answer",
            content: &self.content,
        };
        serde_json::to_string(&data).unwrap_or_default()
    }

    /// `event:` line, `data:` line, blank line.
    pub fn to_sse(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event_name(), self.data_json())
    }
}
