//! Communication channels.
//!
//! Inbound webhook payload types, the outbound [`ReplyNotifier`] seam, and the
//! LINE Messaging API client that implements it.

mod inbound;
mod line;
mod notifier;

pub use inbound::{
    InboundEvent, MessageContent, PayloadRejection, ReplyToken, WebhookEvent, WebhookMessage,
    WebhookPayload,
};
pub use line::LineChannel;
pub use notifier::{DeliveryError, ReplyNotifier};
