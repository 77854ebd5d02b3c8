//! Reply selection: map an inbound event to the canned messages sent back.

use crate::channels::{InboundEvent, MessageContent};
use serde::Serialize;

/// Keyword that selects the greeting (matched case-insensitively, anywhere in the text).
pub const GREETING_KEYWORD: &str = "hello";
pub const GREETING_TEXT: &str = "Hello! How can I help you today?";
pub const FALLBACK_TEXT: &str = "I'm here to help you!";

/// One message object of a reply, serialized in the Messaging API shape (`{"type":"text","text":...}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Text { text: String },
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        OutboundMessage::Text { text: text.into() }
    }
}

/// Always returns at least one message. Non-text content gets the fallback.
pub fn select_reply(event: &InboundEvent) -> Vec<OutboundMessage> {
    let text = match &event.content {
        MessageContent::Text(t) if t.to_lowercase().contains(GREETING_KEYWORD) => GREETING_TEXT,
        _ => FALLBACK_TEXT,
    };
    vec![OutboundMessage::text(text)]
}
