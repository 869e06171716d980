//! [`IrcPier`] -- `Pier` implementation for IRC.
//!
//! One connection task per pier: connect (plain TCP or TLS), register,
//! join the mapped channels, then read lines until the connection drops or
//! the pier is cancelled. Outbound lines go through an mpsc queue drained
//! by a writer task, so relaying never waits on the reader.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use rustls::pki_types::CertificateDer;
use tokio_rustls::TlsConnector;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use pierlink_types::config::{IrcAuthMethod, IrcConfig};
use pierlink_types::error::PierError;
use pierlink_types::message::{Message, PlatformType, Sender};

use crate::lifecycle::PierLifecycle;
use crate::traits::{BridgeHost, Pier, PierStatus};

use super::events::{IrcEvent, normalize_event};
use super::proto::{IrcLine, privmsg_lines};
use super::types::validate_config;

/// Capacity of the outbound line queue.
const OUTBOUND_QUEUE: usize = 256;

/// Zero-width space inserted into relayed nicks when anti-ping is on.
const ANTI_PING: char = '\u{200B}';

/// Render a relayed message as IRC text lines (one per content line).
pub fn render_lines(message: &Message, anti_ping: bool) -> Vec<String> {
    match &message.sender {
        Sender::Bot => message.content.lines().map(str::to_string).collect(),
        Sender::User { display_name, .. } => {
            let nick = if anti_ping {
                break_ping(display_name)
            } else {
                display_name.clone()
            };
            message
                .content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| format!("<{nick}> {line}"))
                .collect()
        }
    }
}

fn break_ping(nick: &str) -> String {
    let mut chars = nick.chars();
    match chars.next() {
        Some(first) => format!("{first}{ANTI_PING}{}", chars.as_str()),
        None => String::new(),
    }
}

/// Build a root store from the platform certificates, logging anything
/// that could not be loaded or parsed.
fn root_store<E: std::fmt::Display>(
    certs: Vec<CertificateDer<'static>>,
    errors: &[E],
) -> rustls::RootCertStore {
    for e in errors {
        warn!(error = %e, "failed to load native certificates");
    }
    let mut roots = rustls::RootCertStore::empty();
    for cert in certs {
        if let Err(e) = roots.add(cert) {
            warn!(error = %e, "skipping unparsable root certificate");
        }
    }
    if roots.is_empty() {
        warn!("no usable root certificates, TLS connections will fail");
    }
    roots
}

fn tls_connector() -> Result<TlsConnector, PierError> {
    let native = rustls_native_certs::load_native_certs();
    let roots = root_store(native.certs, &native.errors);
    let config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| PierError::ConnectionFailed(format!("tls setup: {e}")))?
    .with_root_certificates(roots)
    .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

/// State shared between the pier handle and its connection task.
struct IrcShared {
    config: IrcConfig,
    channels: Vec<String>,
    /// Nick confirmed by the server (may differ from the configured one).
    current_nick: RwLock<String>,
    /// Present while registered on the server.
    outbound: Mutex<Option<mpsc::Sender<String>>>,
}

impl IrcShared {
    async fn run(self: Arc<Self>, host: Arc<dyn BridgeHost>, cancel: CancellationToken) {
        info!(
            server = %self.config.server,
            port = self.config.port,
            tls = self.config.use_tls,
            "IRC pier starting"
        );
        let delay = Duration::from_secs(self.config.reconnect_delay_secs);

        loop {
            match self.connect_and_run(&host, &cancel).await {
                Ok(()) => break,
                Err(e) => error!(error = %e, "IRC connection failed"),
            }
            *self.outbound.lock() = None;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => info!("reconnecting to IRC..."),
            }
        }

        *self.outbound.lock() = None;
        info!("IRC pier stopped");
    }

    /// Returns `Ok(())` only when cancelled.
    async fn connect_and_run(
        &self,
        host: &Arc<dyn BridgeHost>,
        cancel: &CancellationToken,
    ) -> Result<(), PierError> {
        let addr = (self.config.server.as_str(), self.config.port);
        let tcp = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            res = TcpStream::connect(addr) => {
                res.map_err(|e| PierError::ConnectionFailed(e.to_string()))?
            }
        };

        if self.config.use_tls {
            let server_name = rustls::pki_types::ServerName::try_from(self.config.server.clone())
                .map_err(|e| PierError::ConnectionFailed(format!("invalid server name: {e}")))?;
            let tls = tls_connector()?
                .connect(server_name, tcp)
                .await
                .map_err(|e| PierError::ConnectionFailed(format!("tls handshake: {e}")))?;
            self.run_session(tls, host, cancel).await
        } else {
            self.run_session(tcp, host, cancel).await
        }
    }

    async fn run_session<S>(
        &self,
        stream: S,
        host: &Arc<dyn BridgeHost>,
        cancel: &CancellationToken,
    ) -> Result<(), PierError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let mut lines = BufReader::new(reader).lines();
        let (tx, rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);
        let session = cancel.child_token();
        let writer_task = tokio::spawn(write_lines(writer, rx, session.clone(), cancel.clone()));

        *self.current_nick.write() = self.config.nickname.clone();
        for line in self.registration_lines() {
            self.queue(&tx, line).await;
        }
        info!(nick = %self.config.nickname, "IRC connected, registering");

        let result = loop {
            tokio::select! {
                _ = session.cancelled() => {
                    break if cancel.is_cancelled() {
                        Ok(())
                    } else {
                        Err(PierError::SendFailed("IRC writer stopped".into()))
                    };
                }
                line = lines.next_line() => match line {
                    Ok(Some(raw)) => self.handle_line(&raw, &tx, host).await,
                    Ok(None) => break Err(PierError::ConnectionFailed("connection closed by server".into())),
                    Err(e) => break Err(PierError::ReceiveFailed(e.to_string())),
                }
            }
        };

        *self.outbound.lock() = None;
        drop(tx);
        session.cancel();
        let _ = writer_task.await;
        result
    }

    fn registration_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(env) = &self.config.server_password_env
            && let Ok(pass) = std::env::var(env)
        {
            out.push(format!("PASS {pass}"));
        }
        out.push(format!("NICK {}", self.config.nickname));
        out.push(format!(
            "USER {} 0 * :{}",
            self.config.username(),
            self.config.realname
        ));
        out
    }

    async fn queue(&self, tx: &mpsc::Sender<String>, line: String) {
        if tx.send(line).await.is_err() {
            debug!("IRC writer gone, dropping line");
        }
    }

    async fn handle_line(&self, raw: &str, tx: &mpsc::Sender<String>, host: &Arc<dyn BridgeHost>) {
        let received_at = Instant::now();
        let Some(line) = IrcLine::parse(raw) else {
            return;
        };

        match line.command.as_str() {
            "PING" => {
                let token = line.param(0).unwrap_or_default();
                self.queue(tx, format!("PONG :{token}")).await;
            }
            "001" => {
                if let Some(nick) = line.param(0) {
                    *self.current_nick.write() = nick.to_string();
                }
                *self.outbound.lock() = Some(tx.clone());
                info!(nick = %self.current_nick.read(), "IRC registered");

                if self.config.auth_method == IrcAuthMethod::Nickserv
                    && let Some(env) = &self.config.password_env
                {
                    match std::env::var(env) {
                        Ok(password) => {
                            self.queue(tx, format!("PRIVMSG NickServ :IDENTIFY {password}"))
                                .await;
                        }
                        Err(_) => warn!(env = %env, "NickServ password env var not set"),
                    }
                }
                for channel in &self.channels {
                    self.queue(tx, format!("JOIN {channel}")).await;
                }
            }
            "433" => {
                let nick = format!("{}_", self.current_nick.read());
                warn!(nick = %nick, "nickname in use, retrying");
                *self.current_nick.write() = nick.clone();
                self.queue(tx, format!("NICK {nick}")).await;
            }
            "NICK" => {
                let own = self.current_nick.read().clone();
                if line.nick().is_some_and(|n| n.eq_ignore_ascii_case(&own))
                    && let Some(new_nick) = line.param(0)
                {
                    *self.current_nick.write() = new_nick.to_string();
                }
            }
            "ERROR" => {
                warn!(reason = line.param(0).unwrap_or_default(), "IRC server error");
            }
            _ => {
                let Some(event) = IrcEvent::from_line(&line) else {
                    return;
                };
                let own = self.current_nick.read().clone();
                if let Some(message) = normalize_event(event, &own, received_at) {
                    host.submit_message(message).await;
                }
            }
        }
    }
}

async fn write_lines<W>(
    mut writer: W,
    mut rx: mpsc::Receiver<String>,
    session: CancellationToken,
    cancel: CancellationToken,
) where
    W: AsyncWrite + Unpin + Send,
{
    loop {
        let line = tokio::select! {
            _ = session.cancelled() => break,
            line = rx.recv() => match line {
                Some(line) => line,
                None => break,
            },
        };
        let framed = format!("{line}\r\n");
        if let Err(e) = writer.write_all(framed.as_bytes()).await {
            warn!(error = %e, "IRC write failed");
            session.cancel();
            return;
        }
        if let Err(e) = writer.flush().await {
            warn!(error = %e, "IRC flush failed");
            session.cancel();
            return;
        }
    }

    if cancel.is_cancelled() {
        let _ = writer.write_all(b"QUIT :Bridge shutting down\r\n").await;
        let _ = writer.flush().await;
    }
    let _ = writer.shutdown().await;
}

/// IRC pier.
pub struct IrcPier {
    shared: Arc<IrcShared>,
    lifecycle: PierLifecycle,
}

impl IrcPier {
    /// Create an IRC pier that joins `channels` once registered.
    pub fn new(config: IrcConfig, channels: Vec<String>) -> Result<Self, PierError> {
        validate_config(&config, &channels).map_err(PierError::Other)?;
        Ok(Self {
            shared: Arc::new(IrcShared {
                current_nick: RwLock::new(config.nickname.clone()),
                config,
                channels,
                outbound: Mutex::new(None),
            }),
            lifecycle: PierLifecycle::new("irc"),
        })
    }

    /// Nick currently used on the server.
    pub fn current_nick(&self) -> String {
        self.shared.current_nick.read().clone()
    }
}

#[async_trait]
impl Pier for IrcPier {
    fn platform(&self) -> PlatformType {
        PlatformType::Irc
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
            debug!(channel = %target_channel, "IRC pier not running, dropping message");
            return;
        }
        let outbound = self.shared.outbound.lock().clone();
        let Some(tx) = outbound else {
            warn!(channel = %target_channel, "IRC not connected, dropping message");
            return;
        };

        let rendered = render_lines(message, self.shared.config.anti_ping);
        let cancel = self.lifecycle.cancellation();
        for line in privmsg_lines(target_channel, rendered.iter().map(String::as_str)) {
            tokio::select! {
                _ = cancel.cancelled() => return,
                res = tx.send(line) => {
                    if res.is_err() {
                        warn!(channel = %target_channel, "IRC connection dropped mid-send");
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

    use pierlink_types::message::Source;

    #[test]
    fn render_user_message_with_anti_ping() {
        let msg = Message::new("hello\nworld", Sender::user("bob"), Source::discord("1"));
        assert_eq!(
            render_lines(&msg, true),
            vec!["<b\u{200B}ob> hello", "<b\u{200B}ob> world"]
        );
        assert_eq!(render_lines(&msg, false), vec!["<bob> hello", "<bob> world"]);
    }

    #[test]
    fn render_bot_message_plain() {
        let msg = Message::from_bot("Uptime: 1\nMessages: 2", Source::irc("#rust"));
        assert_eq!(render_lines(&msg, true), vec!["Uptime: 1", "Messages: 2"]);
    }

    #[test]
    fn break_ping_multibyte() {
        assert_eq!(break_ping("élan"), "é\u{200B}lan");
        assert_eq!(break_ping(""), "");
    }

    #[test]
    fn root_store_skips_bad_certificates() {
        let roots = root_store(
            vec![CertificateDer::from(vec![0x30, 0x03, 0x01, 0x01, 0xff])],
            &["permission denied: /etc/ssl/certs"],
        );
        assert!(roots.is_empty());

        let none: [&str; 0] = [];
        assert!(root_store(Vec::new(), &none).is_empty());
    }

    #[test]
    fn new_validates_config() {
        let cfg = IrcConfig {
            server: "irc.libera.chat".into(),
            nickname: String::new(),
            ..Default::default()
        };
        assert!(IrcPier::new(cfg, vec![]).is_err());
    }

    #[tokio::test]
    async fn send_before_start_is_dropped() {
        let cfg = IrcConfig {
            server: "irc.libera.chat".into(),
            nickname: "pierlink".into(),
            ..Default::default()
        };
        let pier = IrcPier::new(cfg, vec!["#rust".into()]).unwrap();
        let msg = Message::new("hi", Sender::user("bob"), Source::discord("1"));
        pier.send_message("#rust", &msg).await;
        assert_eq!(pier.status(), PierStatus::NotStarted);
        pier.shutdown().await;
        assert_eq!(pier.status(), PierStatus::ShutDown);
    }
}
