//! Gateway: HTTP surface of the webhook receiver.
//!
//! `GET /` is a liveness probe. `POST /webhook` is rate limited per client, validated,
//! answered through the configured [`crate::channels::ReplyNotifier`], and mapped to one status.

mod error;
mod server;
mod throttle;

pub use error::{WebhookError, RATE_LIMIT_MESSAGE};
pub use server::{build_gateway_app, run_gateway, GatewayState};
pub use throttle::{RateLimit, RequestThrottle, ThrottleDecision};
