//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.linehook/config.json`) and environment.
//! Everything is resolved once at startup and handed to the gateway as plain values.

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default LINE Messaging API base URL.
pub const DEFAULT_LINE_API_BASE: &str = "https://api.line.me";

/// Top-level application config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server bind and port.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Channel settings (LINE access token, API base).
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Ingress rate limit for the webhook path.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Log sinks.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 3000). Overridden by PORT env.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0"; the platform must be able to reach the webhook).
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Per-channel config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub line: LineChannelConfig,
}

/// LINE channel config.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineChannelConfig {
    /// Channel access token from the LINE Developers console. Overridden by LINE_ACCESS_TOKEN env.
    #[serde(default)]
    pub access_token: Option<SecretString>,
    /// API base URL; only changed for tests or proxies.
    #[serde(default = "default_line_api_base")]
    pub api_base: String,
    /// Timeout for the outbound reply call, in seconds.
    #[serde(default = "default_line_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_line_api_base() -> String {
    DEFAULT_LINE_API_BASE.to_string()
}

fn default_line_timeout_secs() -> u64 {
    10
}

impl Default for LineChannelConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            api_base: default_line_api_base(),
            timeout_secs: default_line_timeout_secs(),
        }
    }
}

impl LineChannelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Sliding-window limit applied per client to POST /webhook.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    /// Window length in seconds (default 60).
    #[serde(default = "default_rate_limit_window_secs")]
    pub window_secs: u64,
    /// Requests accepted per client per window (default 10).
    #[serde(default = "default_rate_limit_max_requests")]
    pub max_requests: usize,
    /// Take the client address from X-Forwarded-For / X-Real-IP instead of the socket peer.
    #[serde(default)]
    pub trust_proxy: bool,
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_rate_limit_max_requests() -> usize {
    10
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_rate_limit_window_secs(),
            max_requests: default_rate_limit_max_requests(),
            trust_proxy: false,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Log sink settings. Console output is always on.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// File receiving error-level records only (default "error.log"). `null` disables it.
    #[serde(default = "default_error_log")]
    pub error_log: Option<PathBuf>,
}

fn default_error_log() -> Option<PathBuf> {
    Some(PathBuf::from("error.log"))
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            error_log: default_error_log(),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Apply LINE_ACCESS_TOKEN and PORT from the environment on top of file values.
/// An unparsable PORT is an error.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(token) = non_empty_env("LINE_ACCESS_TOKEN") {
        config.channels.line.access_token = Some(SecretString::new(token));
    }
    if let Some(p) = non_empty_env("PORT") {
        config.gateway.port = p
            .parse()
            .with_context(|| format!("parsing PORT env value {:?}", p))?;
    }
    Ok(())
}

/// Configured access token, trimmed. None when absent or blank.
pub fn line_token(config: &Config) -> Option<SecretString> {
    config
        .channels
        .line
        .access_token
        .as_ref()
        .map(|s| s.expose_secret().trim().to_string())
        .filter(|s| !s.is_empty())
        .map(SecretString::new)
}

/// Reject settings that would make the server unusable.
pub fn validate(config: &Config) -> Result<()> {
    if config.rate_limit.window_secs == 0 {
        anyhow::bail!("rateLimit.windowSecs must be greater than zero");
    }
    if config.rate_limit.max_requests == 0 {
        anyhow::bail!("rateLimit.maxRequests must be greater than zero");
    }
    if config.channels.line.timeout_secs == 0 {
        anyhow::bail!("channels.line.timeoutSecs must be greater than zero");
    }
    let base = config.channels.line.api_base.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        anyhow::bail!("channels.line.apiBase must be an http(s) URL, got {:?}", base);
    }
    Ok(())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("LINEHOOK_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".linehook").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, or the default path (or LINEHOOK_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
