//! Shared helpers: serve the gateway router on a free loopback port.

use linehook::channels::ReplyNotifier;
use linehook::gateway::{self, GatewayState, RateLimit, RequestThrottle};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_LIMIT: RateLimit = RateLimit {
    max_requests: 10,
    window: Duration::from_secs(60),
};

/// Start the gateway with the given notifier and limit; the server task runs until the test ends.
pub async fn start_gateway(notifier: Arc<dyn ReplyNotifier>, limit: RateLimit) -> SocketAddr {
    let state = GatewayState::new(notifier, RequestThrottle::new(limit, false));
    let app = gateway::build_gateway_app(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind free port");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("serve gateway");
    });
    addr
}

pub fn text_event_body(reply_token: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "events": [{
            "type": "message",
            "replyToken": reply_token,
            "message": { "type": "text", "text": text }
        }]
    })
}
