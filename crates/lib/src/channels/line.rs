//! LINE channel: send replies via the Messaging API reply endpoint.

use crate::channels::inbound::ReplyToken;
use crate::channels::notifier::{DeliveryError, ReplyNotifier};
use crate::config::LineChannelConfig;
use crate::reply::OutboundMessage;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

const REPLY_PATH: &str = "/v2/bot/message/reply";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: &'a [OutboundMessage],
}

/// LINE Messaging API client holding the channel access token.
pub struct LineChannel {
    reply_url: String,
    token: SecretString,
    client: reqwest::Client,
}

impl LineChannel {
    /// Build the client with the configured API base and request timeout.
    pub fn new(token: SecretString, config: &LineChannelConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            reply_url: reply_url(&config.api_base),
            token,
            client,
        })
    }

    /// POST /v2/bot/message/reply. Returns the response body on success.
    pub async fn reply(
        &self,
        reply_token: &ReplyToken,
        messages: &[OutboundMessage],
    ) -> Result<String, DeliveryError> {
        let body = ReplyRequest {
            reply_token: reply_token.as_str(),
            messages,
        };
        let res = self
            .client
            .post(&self.reply_url)
            .bearer_auth(self.token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(error_chain(&e)))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| DeliveryError::Transport(error_chain(&e)))?;
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

fn reply_url(api_base: &str) -> String {
    format!("{}{}", api_base.trim().trim_end_matches('/'), REPLY_PATH)
}

/// `err` and all of its sources, joined with ": " (reqwest keeps the cause, e.g. connection refused, in `source()`).
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

/// Remote error body when there is one, otherwise the local description.
fn failure_detail(err: &DeliveryError) -> String {
    match err {
        DeliveryError::Rejected { body, .. } if !body.trim().is_empty() => body.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl ReplyNotifier for LineChannel {
    async fn send_reply(
        &self,
        reply_token: &ReplyToken,
        messages: &[OutboundMessage],
    ) -> Result<(), DeliveryError> {
        match self.reply(reply_token, messages).await {
            Ok(body) => {
                log::info!("response from LINE API: {}", body);
                Ok(())
            }
            Err(e) => {
                log::error!("error sending request to LINE API: {}", failure_detail(&e));
                Err(e)
            }
        }
    }
}
