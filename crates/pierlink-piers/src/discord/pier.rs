//! [`DiscordPier`] -- `Pier` implementation for Discord.
//!
//! The connection task runs the Gateway loop (Hello, Identify or Resume,
//! heartbeats, dispatch) and reconnects after drops. Outbound messages go
//! straight to the REST API from the caller's task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use pierlink_types::config::DiscordConfig;
use pierlink_types::error::PierError;
use pierlink_types::message::{Message, PlatformType, Sender, Source};
use pierlink_types::secret::SecretString;

use crate::irc::proto::floor_char_boundary;
use crate::lifecycle::PierLifecycle;
use crate::traits::{BridgeHost, Pier, PierStatus};

use super::api::DiscordApiClient;
use super::events::{
    ConnectionProperties, FALLBACK_HEARTBEAT_MS, GatewayPayload, HelloData, IdentifyPayload,
    MessageCreate, OP_DISPATCH, OP_HEARTBEAT, OP_HEARTBEAT_ACK, OP_HELLO, OP_IDENTIFY,
    OP_INVALID_SESSION, OP_RECONNECT, OP_RESUME, ReadyEvent, ResumePayload, User,
};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Discord's per-message character limit.
pub const DISCORD_MAX_MESSAGE_LEN: usize = 2000;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

/// What the gateway loop should do after handling a frame.
enum Flow {
    Continue,
    Reconnect,
}

/// Split a message into chunks of at most `max_len` bytes, preferring line
/// then word boundaries.
pub fn chunk_message(content: &str, max_len: usize) -> Vec<&str> {
    if content.len() <= max_len {
        return vec![content];
    }

    let mut chunks = Vec::new();
    let mut remaining = content;
    while remaining.len() > max_len {
        let hard = floor_char_boundary(remaining, max_len).max(1);
        let window = &remaining[..hard];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .map(|pos| pos + 1)
            .unwrap_or(hard);

        let (chunk, rest) = remaining.split_at(split_at);
        let chunk = chunk.trim_end();
        if !chunk.is_empty() {
            chunks.push(chunk);
        }
        remaining = rest.trim_start_matches('\n');
    }
    if !remaining.is_empty() {
        chunks.push(remaining);
    }
    chunks
}

/// Backslash-escape Discord markdown in a relayed nick.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '*' | '_' | '~' | '`' | '|' | '\\' | '>') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Render a relayed message as Discord text.
pub fn render_for_discord(message: &Message) -> String {
    match &message.sender {
        Sender::Bot => message.content.clone(),
        Sender::User { display_name, .. } => {
            format!("**<{}>** {}", escape_markdown(display_name), message.content)
        }
    }
}

/// Replace `<@id>` / `<@!id>` user mentions with `@name`.
pub fn resolve_mentions(content: &str, mentions: &[User]) -> String {
    let mut out = content.to_string();
    for user in mentions {
        let name = format!("@{}", user.display_name());
        out = out
            .replace(&format!("<@{}>", user.id), &name)
            .replace(&format!("<@!{}>", user.id), &name);
    }
    out
}

/// Message text as relayed: resolved mentions followed by attachment URLs.
pub fn relay_content(msg: &MessageCreate) -> String {
    let mut parts = Vec::with_capacity(1 + msg.attachments.len());
    let text = resolve_mentions(&msg.content, &msg.mentions);
    if !text.trim().is_empty() {
        parts.push(text);
    }
    parts.extend(msg.attachments.iter().map(|a| a.url.clone()));
    parts.join(" ")
}

struct DiscordShared {
    config: DiscordConfig,
    token: SecretString,
    sequence: AtomicU64,
    session_id: RwLock<Option<String>>,
    resume_url: RwLock<Option<String>>,
    /// Our own user id, learned from READY.
    bot_user_id: RwLock<Option<String>>,
}

impl DiscordShared {
    async fn run(self: Arc<Self>, host: Arc<dyn BridgeHost>, cancel: CancellationToken) {
        info!("Discord pier starting");
        loop {
            match self.connect_and_run(&host, &cancel).await {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => error!(error = %e, "Discord Gateway connection failed"),
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(RECONNECT_DELAY) => info!("reconnecting Discord Gateway..."),
            }
        }
        info!("Discord pier stopped");
    }

    /// One Gateway session. `Ok(true)` means cancelled, `Ok(false)` means
    /// reconnect.
    async fn connect_and_run(
        &self,
        host: &Arc<dyn BridgeHost>,
        cancel: &CancellationToken,
    ) -> Result<bool, PierError> {
        let gateway_url = self
            .resume_url
            .read()
            .clone()
            .unwrap_or_else(|| self.config.gateway_url.clone());

        let ws_stream = tokio::select! {
            _ = cancel.cancelled() => return Ok(true),
            res = tokio_tungstenite::connect_async(&gateway_url) => {
                res.map_err(|e| PierError::ConnectionFailed(e.to_string()))?.0
            }
        };
        info!("Discord Gateway connected");
        let (mut ws_write, mut ws_read) = ws_stream.split();

        let heartbeat_interval = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = ws_write.close().await;
                    return Ok(true);
                }
                frame = ws_read.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        if let Ok(payload) = serde_json::from_str::<GatewayPayload>(&text)
                            && payload.op == OP_HELLO
                            && let Some(d) = payload.d
                            && let Ok(hello) = serde_json::from_value::<HelloData>(d)
                        {
                            break hello.heartbeat_interval;
                        }
                    }
                    Some(Err(e)) => return Err(PierError::ReceiveFailed(e.to_string())),
                    None => break FALLBACK_HEARTBEAT_MS,
                    _ => {}
                }
            }
        };
        debug!(interval_ms = heartbeat_interval, "received Hello");

        let auth = self.auth_payload()?;
        send_payload(&mut ws_write, &auth).await?;

        let mut heartbeat = tokio::time::interval(Duration::from_millis(heartbeat_interval));
        heartbeat.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Discord pier received cancellation");
                    let _ = ws_write.close().await;
                    return Ok(true);
                }
                _ = heartbeat.tick() => {
                    let hb = GatewayPayload::heartbeat(self.sequence.load(Ordering::SeqCst));
                    if let Err(e) = send_payload(&mut ws_write, &hb).await {
                        warn!(error = %e, "failed to send heartbeat");
                        return Ok(false);
                    }
                }
                frame = ws_read.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        let received_at = Instant::now();
                        match serde_json::from_str::<GatewayPayload>(&text) {
                            Ok(payload) => {
                                if let Flow::Reconnect =
                                    self.handle_payload(payload, host, &mut ws_write, received_at).await
                                {
                                    return Ok(false);
                                }
                            }
                            Err(e) => warn!(error = %e, "failed to parse gateway payload"),
                        }
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        info!(frame = ?frame, "Discord Gateway closed by server");
                        return Ok(false);
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        let _ = ws_write.send(WsMessage::Pong(data)).await;
                    }
                    Some(Err(e)) => return Err(PierError::ReceiveFailed(e.to_string())),
                    None => {
                        info!("Discord Gateway stream ended");
                        return Ok(false);
                    }
                    _ => {}
                }
            }
        }
    }

    /// Resume when a previous session exists, otherwise Identify.
    fn auth_payload(&self) -> Result<GatewayPayload, PierError> {
        let to_value =
            |v: serde_json::Result<serde_json::Value>| v.map_err(|e| PierError::Other(e.to_string()));

        if let Some(session_id) = self.session_id.read().clone() {
            let seq = self.sequence.load(Ordering::SeqCst);
            info!(session_id = %session_id, seq, "resuming Discord session");
            let d = to_value(serde_json::to_value(ResumePayload {
                token: self.token.expose().to_owned(),
                session_id,
                seq,
            }))?;
            return Ok(GatewayPayload::outgoing(OP_RESUME, Some(d)));
        }

        debug!("identifying with Discord Gateway");
        let d = to_value(serde_json::to_value(IdentifyPayload {
            token: self.token.expose().to_owned(),
            intents: self.config.intents,
            properties: ConnectionProperties {
                os: std::env::consts::OS.to_owned(),
                browser: "pierlink".into(),
                device: "pierlink".into(),
            },
        }))?;
        Ok(GatewayPayload::outgoing(OP_IDENTIFY, Some(d)))
    }

    async fn handle_payload(
        &self,
        payload: GatewayPayload,
        host: &Arc<dyn BridgeHost>,
        ws_write: &mut WsSink,
        received_at: Instant,
    ) -> Flow {
        if let Some(s) = payload.s {
            self.sequence.store(s, Ordering::SeqCst);
        }

        match payload.op {
            OP_DISPATCH => {
                let (Some(event), Some(d)) = (payload.t.as_deref(), payload.d) else {
                    return Flow::Continue;
                };
                match event {
                    "READY" => match serde_json::from_value::<ReadyEvent>(d) {
                        Ok(ready) => {
                            info!(
                                bot_id = %ready.user.id,
                                bot_name = %ready.user.username,
                                "Discord bot authenticated"
                            );
                            *self.bot_user_id.write() = Some(ready.user.id);
                            *self.session_id.write() = Some(ready.session_id);
                            *self.resume_url.write() = ready.resume_gateway_url;
                        }
                        Err(e) => warn!(error = %e, "failed to parse READY"),
                    },
                    "RESUMED" => info!("Discord session resumed"),
                    "MESSAGE_CREATE" => match serde_json::from_value::<MessageCreate>(d) {
                        Ok(msg) => {
                            if let Some(message) = self.to_bridge_message(&msg, received_at) {
                                host.submit_message(message).await;
                            }
                        }
                        Err(e) => warn!(error = %e, "failed to parse MESSAGE_CREATE"),
                    },
                    other => debug!(event = %other, "unhandled dispatch event"),
                }
                Flow::Continue
            }
            OP_HEARTBEAT => {
                let hb = GatewayPayload::heartbeat(self.sequence.load(Ordering::SeqCst));
                if let Err(e) = send_payload(ws_write, &hb).await {
                    warn!(error = %e, "failed to answer heartbeat request");
                }
                Flow::Continue
            }
            OP_HEARTBEAT_ACK => {
                debug!("heartbeat acknowledged");
                Flow::Continue
            }
            OP_RECONNECT => {
                info!("Discord requested reconnect");
                Flow::Reconnect
            }
            OP_INVALID_SESSION => {
                let resumable = payload.d.as_ref().and_then(|v| v.as_bool()).unwrap_or(false);
                if resumable {
                    warn!("invalid session (resumable), reconnecting");
                } else {
                    warn!("invalid session, clearing state for a fresh Identify");
                    *self.session_id.write() = None;
                    *self.resume_url.write() = None;
                    self.sequence.store(0, Ordering::SeqCst);
                }
                Flow::Reconnect
            }
            op => {
                debug!(op, "unhandled opcode");
                Flow::Continue
            }
        }
    }

    /// Normalize a `MESSAGE_CREATE`. Our own messages and empty messages
    /// yield `None`.
    fn to_bridge_message(&self, msg: &MessageCreate, received_at: Instant) -> Option<Message> {
        if self
            .bot_user_id
            .read()
            .as_deref()
            .is_some_and(|id| id == msg.author.id)
        {
            debug!(message_id = %msg.id, "skipping own message");
            return None;
        }

        let content = relay_content(msg);
        if content.is_empty() {
            debug!(message_id = %msg.id, "skipping empty message");
            return None;
        }

        Some(Message::received(
            content,
            Sender::User {
                display_name: msg.author_display_name().to_string(),
                id: Some(msg.author.id.clone()),
            },
            Source::discord(msg.channel_id.clone()),
            received_at,
        ))
    }
}

async fn send_payload(ws_write: &mut WsSink, payload: &GatewayPayload) -> Result<(), PierError> {
    let json = serde_json::to_string(payload).map_err(|e| PierError::Other(e.to_string()))?;
    ws_write
        .send(WsMessage::Text(json))
        .await
        .map_err(|e| PierError::SendFailed(e.to_string()))
}

/// Discord pier.
pub struct DiscordPier {
    shared: Arc<DiscordShared>,
    api: DiscordApiClient,
    lifecycle: PierLifecycle,
}

impl DiscordPier {
    /// Create a Discord pier. Fails when no bot token is configured.
    pub fn new(config: DiscordConfig) -> Result<Self, PierError> {
        let token = config.resolved_token();
        if token.is_empty() {
            return Err(PierError::AuthFailed(format!(
                "no Discord bot token (set discord.token or ${})",
                config.token_env
            )));
        }
        Ok(Self {
            api: DiscordApiClient::new(token.clone(), config.api_base_url.clone()),
            shared: Arc::new(DiscordShared {
                config,
                token,
                sequence: AtomicU64::new(0),
                session_id: RwLock::new(None),
                resume_url: RwLock::new(None),
                bot_user_id: RwLock::new(None),
            }),
            lifecycle: PierLifecycle::new("discord"),
        })
    }
}

#[async_trait]
impl Pier for DiscordPier {
    fn platform(&self) -> PlatformType {
        PlatformType::Discord
    }

    fn status(&self) -> PierStatus {
        self.lifecycle.status()
    }

    async fn start(&self, host: Arc<dyn BridgeHost>) -> Result<(), PierError> {
        let cancel = self.lifecycle.begin()?;
        let shared = self.shared.clone();
        self.lifecycle
            .attach(tokio::spawn(shared.run(host, cancel)));
        Ok(())
    }

    async fn shutdown(&self) {
        self.lifecycle.shutdown().await;
    }

    async fn send_message(&self, target_channel: &str, message: &Message) {
        if !self.lifecycle.is_running() {
            debug!(channel_id = %target_channel, "Discord pier not running, dropping message");
            return;
        }
        let cancel = self.lifecycle.cancellation();
        let text = render_for_discord(message);

        for chunk in chunk_message(&text, DISCORD_MAX_MESSAGE_LEN) {
            tokio::select! {
                _ = cancel.cancelled() => return,
                res = self.api.create_message(target_channel, chunk) => {
                    if let Err(e) = res {
                        warn!(channel_id = %target_channel, error = %e, "failed to relay message to Discord");
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use super::super::events::Attachment;

    fn shared() -> DiscordShared {
        DiscordShared {
            config: DiscordConfig::default(),
            token: SecretString::new("t"),
            sequence: AtomicU64::new(0),
            session_id: RwLock::new(None),
            resume_url: RwLock::new(None),
            bot_user_id: RwLock::new(Some("99".into())),
        }
    }

    fn create(author_id: &str, content: &str) -> MessageCreate {
        serde_json::from_value(serde_json::json!({
            "id": "1",
            "channel_id": "712345678901234567",
            "content": content,
            "author": {"id": author_id, "username": "alice"},
        }))
        .unwrap()
    }

    #[test]
    fn chunk_short_message() {
        assert_eq!(chunk_message("Hello", 2000), vec!["Hello"]);
    }

    #[test]
    fn chunk_at_newline_boundary() {
        let line = "x".repeat(900);
        let msg = format!("{line}\n{line}\n{line}");
        let chunks = chunk_message(&msg, 2000);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() <= 2000));
    }

    #[test]
    fn chunk_hard_split_multibyte() {
        let msg = "ü".repeat(1500);
        let chunks = chunk_message(&msg, 2000);
        assert!(chunks.iter().all(|c| c.len() <= 2000));
        assert_eq!(chunks.concat(), msg);
    }

    #[test]
    fn escape_nick_markdown() {
        assert_eq!(escape_markdown("cool_guy*"), "cool\\_guy\\*");
    }

    #[test]
    fn render_user_and_bot() {
        let user = Message::new("hi", Sender::user("bob_"), Source::irc("#rust"));
        assert_eq!(render_for_discord(&user), "**<bob\\_>** hi");
        let bot = Message::from_bot("Topic: x", Source::irc("#rust"));
        assert_eq!(render_for_discord(&bot), "Topic: x");
    }

    #[test]
    fn mentions_resolved() {
        let users: Vec<User> = serde_json::from_value(serde_json::json!([
            {"id": "42", "username": "bob", "global_name": "Bobby"}
        ]))
        .unwrap();
        assert_eq!(
            resolve_mentions("hi <@42> and <@!42>", &users),
            "hi @Bobby and @Bobby"
        );
    }

    #[test]
    fn attachments_appended() {
        let mut msg = create("7", "look");
        msg.attachments.push(Attachment {
            id: "3".into(),
            filename: "cat.png".into(),
            url: "https://cdn.example/cat.png".into(),
        });
        assert_eq!(relay_content(&msg), "look https://cdn.example/cat.png");
        msg.content.clear();
        assert_eq!(relay_content(&msg), "https://cdn.example/cat.png");
    }

    #[test]
    fn own_messages_suppressed() {
        let shared = shared();
        assert!(shared.to_bridge_message(&create("99", "echo"), Instant::now()).is_none());

        let msg = shared
            .to_bridge_message(&create("7", "hello"), Instant::now())
            .unwrap();
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.source, Source::discord("712345678901234567"));
        assert_eq!(
            msg.sender,
            Sender::User {
                display_name: "alice".into(),
                id: Some("7".into())
            }
        );
    }

    #[test]
    fn empty_messages_skipped() {
        assert!(shared().to_bridge_message(&create("7", "  "), Instant::now()).is_none());
    }

    #[test]
    fn identify_then_resume() {
        let shared = shared();
        assert_eq!(shared.auth_payload().unwrap().op, OP_IDENTIFY);
        *shared.session_id.write() = Some("abc".into());
        shared.sequence.store(5, Ordering::SeqCst);
        let resume = shared.auth_payload().unwrap();
        assert_eq!(resume.op, OP_RESUME);
        assert_eq!(resume.d.unwrap()["seq"], 5);
    }

    #[test]
    fn new_requires_token() {
        let cfg = DiscordConfig {
            token_env: String::new(),
            ..Default::default()
        };
        assert!(matches!(DiscordPier::new(cfg), Err(PierError::AuthFailed(_))));
    }
}
