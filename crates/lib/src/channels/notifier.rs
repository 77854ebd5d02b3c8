//! Outbound seam: the gateway sends replies through this trait so tests can swap the LINE client out.

use crate::channels::inbound::ReplyToken;
use crate::reply::OutboundMessage;
use async_trait::async_trait;

/// Why a reply could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Connection, TLS, timeout or body read failure; no usable response.
    #[error("transport error: {0}")]
    Transport(String),
    /// The API answered with a non-2xx status.
    #[error("api returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Sends one reply (an ordered list of messages) for one reply token.
#[async_trait]
pub trait ReplyNotifier: Send + Sync {
    /// Exactly one attempt. Ok only when the remote accepted the whole reply.
    async fn send_reply(
        &self,
        reply_token: &ReplyToken,
        messages: &[OutboundMessage],
    ) -> Result<(), DeliveryError>;
}
