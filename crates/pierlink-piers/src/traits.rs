//! Pier trait definitions.
//!
//! - [`Pier`] -- implemented by each backend transport (IRC, Discord)
//! - [`BridgeHost`] -- implemented by the bridge, consumed by piers to
//!   hand inbound messages to the pipeline

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use pierlink_types::error::PierError;
use pierlink_types::message::{Message, PlatformType};

/// Lifecycle state of a pier. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PierStatus {
    NotStarted,
    Running,
    ShutDown,
}

impl PierStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::Running => "running",
            Self::ShutDown => "shut down",
        }
    }
}

impl fmt::Display for PierStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The trait every transport implements.
///
/// The bridge drives the lifecycle:
///
/// 1. [`start`](Pier::start) spawns the pier's connection task and returns.
///    Connection failures after that point are logged and retried by the
///    pier; they never reach the pipeline.
/// 2. Inbound events become [`Message`]s and are passed to
///    [`BridgeHost::submit_message`], awaited in receive order.
/// 3. [`send_message`](Pier::send_message) relays a message from the other
///    side. It never re-enters the pipeline and drops the message (with a
///    log line) when the backend is unavailable.
/// 4. [`shutdown`](Pier::shutdown) is terminal and idempotent.
#[async_trait]
pub trait Pier: Send + Sync {
    /// The backend this pier connects to.
    fn platform(&self) -> PlatformType;

    fn status(&self) -> PierStatus;

    /// Start the pier. Fails with [`PierError::InvalidState`] if the pier
    /// was already started or has been shut down.
    async fn start(&self, host: Arc<dyn BridgeHost>) -> Result<(), PierError>;

    /// Stop the pier and release its connection. Safe to call more than
    /// once and before [`start`](Pier::start).
    async fn shutdown(&self);

    /// Relay `message` into `target_channel` on this pier's backend.
    async fn send_message(&self, target_channel: &str, message: &Message);
}

/// Services the bridge exposes to piers.
#[async_trait]
pub trait BridgeHost: Send + Sync {
    /// Hand a normalized inbound message to the pipeline.
    async fn submit_message(&self, message: Message);
}

#[cfg(test)]
mod tests {
    use super::*;

    use pierlink_types::message::{Sender, Source};
    use tokio::sync::Mutex;

    struct RecordingHost {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BridgeHost for RecordingHost {
        async fn submit_message(&self, message: Message) {
            self.seen.lock().await.push(message.content);
        }
    }

    #[test]
    fn status_display() {
        assert_eq!(PierStatus::NotStarted.to_string(), "not started");
        assert_eq!(PierStatus::Running.to_string(), "running");
        assert_eq!(PierStatus::ShutDown.to_string(), "shut down");
    }

    #[tokio::test]
    async fn host_is_object_safe() {
        let host = Arc::new(RecordingHost {
            seen: Mutex::new(Vec::new()),
        });
        let dyn_host: Arc<dyn BridgeHost> = host.clone();
        dyn_host
            .submit_message(Message::new("a", Sender::user("x"), Source::irc("#c")))
            .await;
        dyn_host
            .submit_message(Message::new("b", Sender::user("x"), Source::irc("#c")))
            .await;
        assert_eq!(*host.seen.lock().await, vec!["a", "b"]);
    }
}
