//! Payload classification and translation between the Coze and DeepSeek formats.
//!
//! Everything here is pure (no I/O): format detection, the Coze → DeepSeek request
//! transform, and the DeepSeek → Coze stream event state machine.

pub mod chat_types;
pub mod coze_types;
pub mod detect;
pub mod request;
pub mod streaming;
