//! Discord REST API client.
//!
//! Only message creation is needed: the pier receives everything else over
//! the Gateway.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use pierlink_types::error::PierError;
use pierlink_types::secret::SecretString;

use super::events::RateLimitInfo;

/// Attempts per message when Discord answers 429.
const MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Deserialize)]
struct CreatedMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TooManyRequests {
    /// Seconds to wait.
    retry_after: f64,
}

/// HTTP client for the Discord REST API with bot authorization.
pub struct DiscordApiClient {
    http: Client,
    token: SecretString,
    base_url: String,
}

impl DiscordApiClient {
    pub fn new(token: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            token,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Post `content` to a channel. Returns the new message id.
    ///
    /// Only user mentions are allowed to ping, so relayed `@everyone` or
    /// role mentions stay inert.
    pub async fn create_message(&self, channel_id: &str, content: &str) -> Result<String, PierError> {
        let url = format!("{}/channels/{channel_id}/messages", self.base_url);
        let body = serde_json::json!({
            "content": content,
            "allowed_mentions": { "parse": ["users"] },
        });

        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(channel_id = %channel_id, attempt, "creating message");

            let resp = self
                .http
                .post(&url)
                .header("Authorization", format!("Bot {}", self.token.expose()))
                .json(&body)
                .send()
                .await
                .map_err(|e| PierError::SendFailed(e.to_string()))?;

            let rate_limit = RateLimitInfo::from_headers(resp.headers());
            let status = resp.status();

            if status == StatusCode::TOO_MANY_REQUESTS && attempt < MAX_ATTEMPTS {
                let wait_ms = resp
                    .json::<TooManyRequests>()
                    .await
                    .map(|r| (r.retry_after * 1000.0) as u64)
                    .ok()
                    .or_else(|| rate_limit.retry_after_ms())
                    .unwrap_or(1000);
                warn!(wait_ms, bucket = ?rate_limit.bucket, "Discord rate limited, retrying");
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                continue;
            }

            if !status.is_success() {
                let err_body = resp.text().await.unwrap_or_else(|_| "unknown error".into());
                return match status {
                    StatusCode::UNAUTHORIZED => Err(PierError::AuthFailed(err_body)),
                    _ => Err(PierError::SendFailed(format!(
                        "Discord API returned {status}: {err_body}"
                    ))),
                };
            }

            if rate_limit.is_limited() {
                let wait_ms = rate_limit.retry_after_ms().unwrap_or(1000);
                debug!(wait_ms, "Discord bucket exhausted, pausing");
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            }

            let created: CreatedMessage = resp
                .json()
                .await
                .map_err(|e| PierError::SendFailed(e.to_string()))?;
            return Ok(created.id);
        }
    }
}
