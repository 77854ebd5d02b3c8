//! Gateway HTTP server: health probe and the LINE webhook.

use crate::channels::{LineChannel, PayloadRejection, ReplyNotifier, WebhookPayload};
use crate::config::{self, Config};
use crate::gateway::error::WebhookError;
use crate::gateway::throttle::{throttle_gate, RequestThrottle};
use crate::reply::select_reply;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared state for request handling. Built once at startup; nothing in here is read from the
/// process environment.
#[derive(Clone)]
pub struct GatewayState {
    /// Sends the reply for an accepted webhook event.
    pub notifier: Arc<dyn ReplyNotifier>,
    /// Webhook rate limit counters (shared across clones).
    pub throttle: RequestThrottle,
}

impl GatewayState {
    pub fn new(notifier: Arc<dyn ReplyNotifier>, throttle: RequestThrottle) -> Self {
        Self { notifier, throttle }
    }
}

/// Build the router: `GET /` (never throttled) and `POST /webhook` behind the throttle.
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn build_gateway_app(state: GatewayState) -> Router {
    let webhook = Router::new()
        .route("/webhook", post(line_webhook))
        .route_layer(middleware::from_fn_with_state(state.clone(), throttle_gate));
    Router::new()
        .route("/", get(health_http))
        .merge(webhook)
        .with_state(state)
}

/// Run the gateway server on config.gateway.bind:config.gateway.port.
/// Expects environment overrides to have been applied already (see [`config::apply_env_overrides`]).
/// Fails before binding when the LINE access token is missing or the config is invalid.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    config::validate(&config)?;
    let token = config::line_token(&config).context(
        "LINE access token not configured (set channels.line.accessToken or LINE_ACCESS_TOKEN)",
    )?;

    let line = LineChannel::new(token, &config.channels.line).context("building LINE client")?;
    let throttle = RequestThrottle::from_config(&config.rate_limit);
    log::info!(
        "webhook rate limit: {} request(s) per {}s per client",
        config.rate_limit.max_requests,
        config.rate_limit.window_secs
    );
    let app = build_gateway_app(GatewayState::new(Arc::new(line), throttle));

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on http://{}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Completes on SIGINT or SIGTERM. A signal that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

fn malformed(reason: &'static str) -> WebhookError {
    log::error!("invalid request data: {}", reason);
    WebhookError::MalformedRequest(reason)
}

/// POST /webhook: validate the payload, reply to the first event, map the outcome to a status.
async fn line_webhook(
    State(state): State<GatewayState>,
    body: Bytes,
) -> Result<StatusCode, WebhookError> {
    // JSON only; form-encoded bodies are rejected like any other unparsable body.
    let payload: WebhookPayload = serde_json::from_slice(&body).map_err(|e| {
        log::debug!("webhook body did not parse: {}", e);
        malformed("body is not a valid webhook payload")
    })?;
    let (event, ignored) = payload
        .into_first_event()
        .map_err(|r: PayloadRejection| malformed(r.reason()))?;
    if ignored > 0 {
        // Only the first event of a batch is answered.
        log::debug!("ignoring {} additional event(s) in webhook batch", ignored);
    }

    let messages = select_reply(&event);
    match state.notifier.send_reply(&event.reply_token, &messages).await {
        Ok(()) => Ok(StatusCode::OK),
        Err(e) => {
            log::error!("failed to send message: {}", e);
            Err(WebhookError::DeliveryFailed(e))
        }
    }
}

/// GET /: liveness probe, empty body.
async fn health_http() -> StatusCode {
    StatusCode::OK
}
