//! Translate a Coze-format request into a DeepSeek chat completions request.
//!
//! The Coze body carries a single pre-rendered transcript in its first additional
//! message plus `stage`/`context` custom variables. The DeepSeek request gets a
//! system prompt built from the stage, an optional context message, and the
//! transcript as the final user turn. There is no reverse translation.

use super::chat_types::{ChatCompletionRequest, ChatMessage, DEFAULT_MODEL};
use super::coze_types::CozeRequest;
use crate::config::PromptConfig;

pub const FALLBACK_TEMPERATURE: f64 = 0.7;
pub const FALLBACK_MAX_TOKENS: u64 = 500;

/// Pure function: same request and prompt always yield the same output.
pub fn coze_to_chat(req: &CozeRequest, prompt: &PromptConfig) -> ChatCompletionRequest {
    let mut messages = vec![ChatMessage::text("system", prompt.render(req.stage()))];

    let context = req.context();
    if !context.is_empty() {
        messages.push(ChatMessage::text("user", format!("[Context] {}", context)));
    }

    messages.push(ChatMessage::text("user", req.conversation_text()));

    ChatCompletionRequest {
        model: DEFAULT_MODEL.to_string(),
        messages,
        stream: req.is_streaming(),
        temperature: Some(FALLBACK_TEMPERATURE),
        max_tokens: Some(FALLBACK_MAX_TOKENS),
    }
}
