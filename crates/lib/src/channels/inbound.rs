//! Inbound webhook payload: wire types and the validated event handed to the reply selector.

use serde::Deserialize;

/// Webhook POST body. Every field is optional on the wire; [`WebhookPayload::into_first_event`]
/// is the single place the shape is checked.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub events: Option<Vec<WebhookEvent>>,
}

/// One event as delivered by the platform.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub message: Option<WebhookMessage>,
}

/// Message object of an event (`type` is "text", "image", "sticker", ...).
#[derive(Debug, Deserialize)]
pub struct WebhookMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Opaque token authorizing exactly one reply to one inbound event. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyToken(String);

impl ReplyToken {
    /// Returns None for empty or whitespace-only input.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Content of the inbound message as far as reply selection cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    /// Non-text message, or an event without a message (follow, postback, ...).
    Unsupported,
}

/// Validated first event of a webhook payload.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub reply_token: ReplyToken,
    pub content: MessageContent,
}

/// Why a payload was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadRejection {
    MissingEvents,
    EmptyEvents,
    MissingReplyToken,
}

impl PayloadRejection {
    pub fn reason(self) -> &'static str {
        match self {
            PayloadRejection::MissingEvents => "missing events",
            PayloadRejection::EmptyEvents => "empty events",
            PayloadRejection::MissingReplyToken => "first event has no replyToken",
        }
    }
}

impl WebhookPayload {
    /// Validate the payload and take its first event. Remaining events are dropped;
    /// the second value is how many were dropped.
    pub fn into_first_event(self) -> Result<(InboundEvent, usize), PayloadRejection> {
        let events = self.events.ok_or(PayloadRejection::MissingEvents)?;
        let ignored = events.len().saturating_sub(1);
        let first = events
            .into_iter()
            .next()
            .ok_or(PayloadRejection::EmptyEvents)?;
        let reply_token = first
            .reply_token
            .and_then(ReplyToken::new)
            .ok_or(PayloadRejection::MissingReplyToken)?;
        let content = match first.message {
            Some(WebhookMessage {
                kind,
                text: Some(text),
            }) if kind == "text" => MessageContent::Text(text),
            _ => MessageContent::Unsupported,
        };
        Ok((
            InboundEvent {
                reply_token,
                content,
            },
            ignored,
        ))
    }
}
