//! State machine for translating a DeepSeek delta stream into Coze stream events.
//!
//! [`CozeStreamTranslator`] is fed raw body chunks. It splits them into lines, keeps a
//! partial trailing line for the next chunk, and turns each `data:` record into at
//! most one [`CozeEvent`]. The running answer is kept so the completion event can
//! carry the full text.

use super::chat_types::ChatCompletionChunk;
use super::coze_types::CozeEvent;

const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Default)]
pub struct CozeStreamTranslator {
    full_content: String,
    pending: Vec<u8>,
    finished: bool,
    skipped: usize,
}

impl CozeStreamTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one upstream body chunk. Returns nothing once the stream has finished.
    pub fn process_chunk(&mut self, chunk: &[u8]) -> Vec<CozeEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }

        self.pending.extend_from_slice(chunk);

        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
            if self.finished {
                self.pending.clear();
                break;
            }
        }

        events
    }

    /// Call at end of body. Flushes an unterminated last line, then emits the
    /// completion event if `[DONE]` never arrived.
    pub fn finish(&mut self) -> Vec<CozeEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }

        let rest = std::mem::take(&mut self.pending);
        if let Some(event) = self.process_line(&rest) {
            events.push(event);
        }

        if !self.finished {
            events.push(self.complete());
        }

        events
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn full_content(&self) -> &str {
        &self.full_content
    }

    /// Number of `data:` records dropped because they were not valid JSON.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn process_line(&mut self, raw: &[u8]) -> Option<CozeEvent> {
        let line = String::from_utf8_lossy(raw);
        // Both `data: {..}` and `data:{..}` are valid field syntax.
        let data = line.trim().strip_prefix("data:")?.trim();

        if data == DONE_SENTINEL {
            return Some(self.complete());
        }

        let chunk: ChatCompletionChunk = match serde_json::from_str(data) {
            Ok(c) => c,
            Err(_) => {
                self.skipped += 1;
                return None;
            }
        };

        let text = chunk.delta_text();
        if text.is_empty() {
            return None;
        }

        self.full_content.push_str(text);
        Some(CozeEvent::delta(text))
    }

    fn complete(&mut self) -> CozeEvent {
        self.finished = true;
        CozeEvent::completed(std::mem::take(&mut self.full_content))
    }
}
