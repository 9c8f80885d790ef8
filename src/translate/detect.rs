//! Classify an inbound JSON body as Coze format, chat format, or neither, and parse it
//! into a tagged [`InboundPayload`] in the same step.

use serde_json::Value;

use super::chat_types::ChatCompletionRequest;
use super::coze_types::CozeRequest;
use crate::error::{RelayError, Result};

const COZE_FIELDS: [&str; 3] = ["bot_id", "user_id", "additional_messages"];

pub const UNKNOWN_FORMAT_DETAILS: &str = "Payload must be in Coze format (bot_id, user_id, additional_messages) or DeepSeek format (model, messages)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Coze,
    Chat,
    Unknown,
}

/// Coze fields win over chat fields when both are present.
pub fn detect_format(payload: &Value) -> PayloadFormat {
    let field = |name: &str| payload.get(name).filter(|v| truthy(v));

    if COZE_FIELDS.iter().any(|&name| field(name).is_some()) {
        return PayloadFormat::Coze;
    }

    if field("model").is_some() && payload.get("messages").is_some_and(Value::is_array) {
        return PayloadFormat::Chat;
    }

    PayloadFormat::Unknown
}

/// Null, `false`, `0` and `""` count as absent. Arrays and objects never do.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A classified inbound request.
#[derive(Debug, Clone)]
pub enum InboundPayload {
    /// The raw body is kept so it can be forwarded to Coze unmodified.
    Coze { request: CozeRequest, raw: Value },
    Chat(ChatCompletionRequest),
}

impl InboundPayload {
    pub fn parse(payload: Value) -> Result<Self> {
        match detect_format(&payload) {
            PayloadFormat::Coze => Ok(Self::Coze {
                request: CozeRequest::from_payload(&payload),
                raw: payload,
            }),
            PayloadFormat::Chat => {
                let request = ChatCompletionRequest::from_payload(&payload);
                if request.messages.is_empty() {
                    return Err(RelayError::validation("messages must not be empty"));
                }
                Ok(Self::Chat(request))
            }
            PayloadFormat::Unknown => Err(RelayError::validation(UNKNOWN_FORMAT_DETAILS)),
        }
    }

    pub fn format(&self) -> PayloadFormat {
        match self {
            Self::Coze { .. } => PayloadFormat::Coze,
            Self::Chat(_) => PayloadFormat::Chat,
        }
    }

    pub fn is_streaming(&self) -> bool {
        match self {
            Self::Coze { request, .. } => request.is_streaming(),
            Self::Chat(request) => request.stream,
        }
    }
}
