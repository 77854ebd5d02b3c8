//! Per-client sliding-window rate limit for the webhook route.

use crate::config::RateLimitConfig;
use crate::gateway::error::WebhookError;
use crate::gateway::server::GatewayState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::{mapref::entry::Entry, DashMap};
use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Idle clients are swept from the map once every this many webhook requests.
const CLEANUP_EVERY_REQUESTS: u64 = 512;

#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub max_requests: usize,
    pub window: Duration,
}

impl From<&RateLimitConfig> for RateLimit {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: config.window(),
        }
    }
}

/// Accepted-request timestamps per client IP. Cloning shares the counters.
#[derive(Clone)]
pub struct RequestThrottle {
    limit: RateLimit,
    trust_proxy: bool,
    hits: Arc<DashMap<IpAddr, VecDeque<Instant>>>,
    requests_seen: Arc<AtomicU64>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    Denied { retry_after: Duration },
}

impl RequestThrottle {
    pub fn new(limit: RateLimit, trust_proxy: bool) -> Self {
        Self {
            limit,
            trust_proxy,
            hits: Arc::new(DashMap::new()),
            requests_seen: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(RateLimit::from(config), config.trust_proxy)
    }

    pub fn check(&self, ip: IpAddr) -> ThrottleDecision {
        self.check_at(ip, Instant::now())
    }

    /// Count-and-decide runs under the entry lock for `ip`, so concurrent requests from one
    /// client cannot both take the last slot.
    pub fn check_at(&self, ip: IpAddr, now: Instant) -> ThrottleDecision {
        let RateLimit {
            max_requests,
            window,
        } = self.limit;
        if max_requests == 0 {
            return ThrottleDecision::Denied {
                retry_after: window.max(Duration::from_secs(1)),
            };
        }

        let decision = match self.hits.entry(ip) {
            Entry::Occupied(mut occupied) => {
                let hits = occupied.get_mut();
                while hits
                    .front()
                    .is_some_and(|t| now.saturating_duration_since(*t) >= window)
                {
                    hits.pop_front();
                }
                if hits.len() < max_requests {
                    hits.push_back(now);
                    ThrottleDecision::Allowed
                } else {
                    let oldest = hits.front().copied().unwrap_or(now);
                    ThrottleDecision::Denied {
                        retry_after: window.saturating_sub(now.saturating_duration_since(oldest)),
                    }
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(VecDeque::from([now]));
                ThrottleDecision::Allowed
            }
        };

        self.cleanup_if_needed(now);
        decision
    }

    fn cleanup_if_needed(&self, now: Instant) {
        let seen = self.requests_seen.fetch_add(1, Ordering::Relaxed) + 1;
        if seen % CLEANUP_EVERY_REQUESTS != 0 {
            return;
        }
        let window = self.limit.window;
        self.hits.retain(|_, hits| {
            hits.back()
                .is_some_and(|t| now.saturating_duration_since(*t) < window)
        });
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.hits.len()
    }
}

/// Middleware for POST /webhook. Requires the app to be served with `ConnectInfo<SocketAddr>`.
pub async fn throttle_gate(
    State(state): State<GatewayState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let throttle = &state.throttle;
    let client_ip = resolve_client_ip(request.headers(), addr, throttle.trust_proxy);
    match throttle.check(client_ip) {
        ThrottleDecision::Allowed => next.run(request).await,
        ThrottleDecision::Denied { retry_after } => {
            log::warn!("webhook rate limit exceeded for {}", client_ip);
            WebhookError::RateLimited { retry_after }.into_response()
        }
    }
}

fn resolve_client_ip(headers: &HeaderMap, addr: SocketAddr, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        if let Some(ip) = extract_forwarded_ip(headers) {
            return ip;
        }
    }
    addr.ip()
}

fn extract_forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    header("x-forwarded-for")
        .and_then(|xff| xff.split(',').find_map(|c| parse_ip(c.trim())))
        .or_else(|| header("x-real-ip").and_then(|v| parse_ip(v.trim())))
}

fn parse_ip(value: &str) -> Option<IpAddr> {
    if value.is_empty() {
        return None;
    }
    value
        .parse::<IpAddr>()
        .ok()
        .or_else(|| value.parse::<SocketAddr>().ok().map(|a| a.ip()))
}
