//! Integration test: serve the gateway with a stub notifier and exercise every webhook outcome.

mod common;

use async_trait::async_trait;
use common::{start_gateway, text_event_body, DEFAULT_LIMIT};
use linehook::channels::{DeliveryError, ReplyNotifier, ReplyToken};
use linehook::gateway::{RateLimit, RATE_LIMIT_MESSAGE};
use linehook::reply::{OutboundMessage, FALLBACK_TEXT, GREETING_TEXT};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every reply; fails with a transport error when `fail` is set.
#[derive(Default)]
struct StubNotifier {
    fail: bool,
    calls: Mutex<Vec<(String, Vec<OutboundMessage>)>>,
}

impl StubNotifier {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(String, Vec<OutboundMessage>)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl ReplyNotifier for StubNotifier {
    async fn send_reply(
        &self,
        reply_token: &ReplyToken,
        messages: &[OutboundMessage],
    ) -> Result<(), DeliveryError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((reply_token.as_str().to_string(), messages.to_vec()));
        if self.fail {
            Err(DeliveryError::Transport("simulated connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

async fn post_webhook(addr: std::net::SocketAddr, body: String) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{}/webhook", addr))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .expect("POST /webhook")
}

#[tokio::test]
async fn health_probe_returns_ok_with_empty_body() {
    let addr = start_gateway(Arc::new(StubNotifier::default()), DEFAULT_LIMIT).await;
    let resp = reqwest::get(format!("http://{}/", addr)).await.expect("GET /");
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.expect("body").is_empty());
}

#[tokio::test]
async fn malformed_payloads_get_400_without_outbound_call() {
    let stub = Arc::new(StubNotifier::default());
    let addr = start_gateway(stub.clone(), DEFAULT_LIMIT).await;

    let bodies = [
        r#"{"events": []}"#,
        r#"{}"#,
        r#"{"events": [{"message": {"type": "text", "text": "hello"}}]}"#,
        r#"{"events": [{"replyToken": "", "message": {"type": "text", "text": "hello"}}]}"#,
        r#"not json"#,
        "events%5B0%5D%5BreplyToken%5D=tok1",
        "",
    ];
    for body in bodies {
        let resp = post_webhook(addr, body.to_string()).await;
        assert_eq!(resp.status(), 400, "body: {body:?}");
    }
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn hello_event_is_answered_with_greeting() {
    let stub = Arc::new(StubNotifier::default());
    let addr = start_gateway(stub.clone(), DEFAULT_LIMIT).await;

    let resp = post_webhook(addr, text_event_body("tok1", "hello!").to_string()).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        stub.calls(),
        vec![("tok1".to_string(), vec![OutboundMessage::text(GREETING_TEXT)])]
    );
}

#[tokio::test]
async fn only_first_event_of_a_batch_is_answered() {
    let stub = Arc::new(StubNotifier::default());
    let addr = start_gateway(stub.clone(), DEFAULT_LIMIT).await;

    let body = serde_json::json!({
        "events": [
            { "replyToken": "first", "message": { "type": "text", "text": "what?" } },
            { "replyToken": "second", "message": { "type": "text", "text": "hello" } }
        ]
    });
    let resp = post_webhook(addr, body.to_string()).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        stub.calls(),
        vec![("first".to_string(), vec![OutboundMessage::text(FALLBACK_TEXT)])]
    );
}

#[tokio::test]
async fn delivery_failure_maps_to_500_without_detail() {
    let stub = Arc::new(StubNotifier::failing());
    let addr = start_gateway(stub.clone(), DEFAULT_LIMIT).await;

    let resp = post_webhook(addr, text_event_body("tok1", "hello!").to_string()).await;
    assert_eq!(resp.status(), 500);
    let body = resp.text().await.expect("body");
    assert!(!body.contains("simulated"), "leaked detail: {body}");
    assert_eq!(stub.calls().len(), 1);
}

#[tokio::test]
async fn repeated_event_is_sent_twice() {
    let stub = Arc::new(StubNotifier::default());
    let addr = start_gateway(stub.clone(), DEFAULT_LIMIT).await;

    for _ in 0..2 {
        let resp = post_webhook(addr, text_event_body("tok1", "Hello there").to_string()).await;
        assert_eq!(resp.status(), 200);
    }
    let calls = stub.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], calls[1]);
}

#[tokio::test]
async fn eleventh_webhook_request_is_throttled_but_health_is_not() {
    let stub = Arc::new(StubNotifier::default());
    let addr = start_gateway(stub.clone(), DEFAULT_LIMIT).await;

    for i in 0..10 {
        let resp = post_webhook(addr, text_event_body("tok", "hi").to_string()).await;
        assert_eq!(resp.status(), 200, "request {}", i + 1);
    }
    let resp = post_webhook(addr, text_event_body("tok", "hi").to_string()).await;
    assert_eq!(resp.status(), 429);
    assert!(resp.headers().contains_key("retry-after"));
    assert_eq!(resp.text().await.expect("body"), RATE_LIMIT_MESSAGE);
    assert_eq!(stub.calls().len(), 10);

    for _ in 0..20 {
        let resp = reqwest::get(format!("http://{}/", addr)).await.expect("GET /");
        assert_eq!(resp.status(), 200);
    }
}

#[tokio::test]
async fn throttle_runs_before_validation() {
    let stub = Arc::new(StubNotifier::default());
    let limit = RateLimit {
        max_requests: 1,
        window: Duration::from_secs(60),
    };
    let addr = start_gateway(stub.clone(), limit).await;

    assert_eq!(post_webhook(addr, "{}".to_string()).await.status(), 400);
    assert_eq!(post_webhook(addr, "{}".to_string()).await.status(), 429);
    assert!(stub.calls().is_empty());
}
