//! Discord Gateway v10 payloads and opcodes, plus REST rate-limit headers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Gateway opcodes ─────────────────────────────────────────────────────

pub const OP_DISPATCH: u8 = 0;
pub const OP_HEARTBEAT: u8 = 1;
pub const OP_IDENTIFY: u8 = 2;
pub const OP_RESUME: u8 = 6;
/// Server is going away; reconnect and resume.
pub const OP_RECONNECT: u8 = 7;
/// `d` is `true` when the session may be resumed.
pub const OP_INVALID_SESSION: u8 = 9;
/// First frame after connect; carries the heartbeat interval.
pub const OP_HELLO: u8 = 10;
pub const OP_HEARTBEAT_ACK: u8 = 11;

/// Heartbeat interval used when Hello never arrives.
pub const FALLBACK_HEARTBEAT_MS: u64 = 41_250;

// ── Payload types ───────────────────────────────────────────────────────

/// Envelope of every Gateway frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayload {
    pub op: u8,
    pub d: Option<Value>,
    /// Sequence number (dispatch only).
    pub s: Option<u64>,
    /// Event name (dispatch only), e.g. `"MESSAGE_CREATE"`.
    pub t: Option<String>,
}

impl GatewayPayload {
    /// Outgoing frame with opcode and data.
    pub fn outgoing(op: u8, d: Option<Value>) -> Self {
        Self {
            op,
            d,
            s: None,
            t: None,
        }
    }

    /// Heartbeat carrying the last sequence number seen (or `null`).
    pub fn heartbeat(seq: u64) -> Self {
        Self::outgoing(
            OP_HEARTBEAT,
            if seq > 0 { Some(Value::from(seq)) } else { None },
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelloData {
    pub heartbeat_interval: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IdentifyPayload {
    pub token: String,
    pub intents: u32,
    pub properties: ConnectionProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumePayload {
    pub token: String,
    pub session_id: String,
    pub seq: u64,
}

/// `READY` dispatch data.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyEvent {
    pub v: u32,
    /// The bot's own user; its id is used to drop our own messages.
    pub user: User,
    pub session_id: String,
    pub resume_gateway_url: Option<String>,
}

/// `MESSAGE_CREATE` dispatch data.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageCreate {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub content: String,
    pub author: User,
    pub guild_id: Option<String>,
    /// Partial guild member of the author (guild messages only).
    pub member: Option<Member>,
    /// Set when the message was posted by a webhook.
    pub webhook_id: Option<String>,
    #[serde(default)]
    pub mentions: Vec<User>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl MessageCreate {
    /// Guild nick, then global display name, then username.
    pub fn author_display_name(&self) -> &str {
        self.member
            .as_ref()
            .and_then(|m| m.nick.as_deref())
            .or(self.author.global_name.as_deref())
            .unwrap_or(&self.author.username)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    /// Display name chosen by the user, if any.
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    pub nick: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    pub url: String,
}

/// Rate limit information parsed from Discord REST response headers.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    pub remaining: Option<u32>,
    /// Seconds until the bucket resets.
    pub reset_after: Option<f64>,
    pub bucket: Option<String>,
}

impl RateLimitInfo {
    pub fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        let get = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        Self {
            remaining: get("x-ratelimit-remaining").and_then(|v| v.parse().ok()),
            reset_after: get("x-ratelimit-reset-after").and_then(|v| v.parse().ok()),
            bucket: get("x-ratelimit-bucket").map(String::from),
        }
    }

    /// `true` when the bucket is exhausted.
    pub fn is_limited(&self) -> bool {
        self.remaining == Some(0)
    }

    pub fn retry_after_ms(&self) -> Option<u64> {
        self.reset_after.map(|s| (s * 1000.0) as u64)
    }
}
