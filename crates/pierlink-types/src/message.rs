//! The normalized message relayed between piers.
//!
//! Every inbound event, whichever backend it came from, is turned into a
//! [`Message`] before it enters the mutator pipeline. The message carries
//! its own applied-set so a mutator never runs twice on the same message,
//! even when the message re-enters the pipeline.

use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// The two chat backends pierlink bridges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformType {
    Irc,
    Discord,
}

impl PlatformType {
    /// The platform a message from `self` is relayed to.
    pub fn opposite(self) -> Self {
        match self {
            Self::Irc => Self::Discord,
            Self::Discord => Self::Irc,
        }
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Irc => write!(f, "IRC"),
            Self::Discord => write!(f, "Discord"),
        }
    }
}

/// Author of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sender {
    /// A human user on one of the backends.
    User {
        display_name: String,
        /// Backend user id (Discord snowflake); `None` on IRC.
        id: Option<String>,
    },
    /// The bridge itself: synthetic events and command output.
    Bot,
}

/// Reserved sender for events the bridge produces on its own.
pub const BOT_SENDER: Sender = Sender::Bot;

impl Sender {
    pub fn user(display_name: impl Into<String>) -> Self {
        Self::User {
            display_name: display_name.into(),
            id: None,
        }
    }

    /// Name used when rendering the message on the other side.
    pub fn display_name(&self) -> &str {
        match self {
            Self::User { display_name, .. } => display_name,
            Self::Bot => "Bridge",
        }
    }
}

/// Where a message was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub platform: PlatformType,
    /// Discord channel id, or IRC channel name including the `#`.
    pub channel: String,
}

impl Source {
    pub fn irc(channel: impl Into<String>) -> Self {
        Self {
            platform: PlatformType::Irc,
            channel: channel.into(),
        }
    }

    pub fn discord(channel_id: impl Into<String>) -> Self {
        Self {
            platform: PlatformType::Discord,
            channel: channel_id.into(),
        }
    }
}

/// Stable key identifying a mutator in a message's applied-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutatorId(pub &'static str);

impl MutatorId {
    pub fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for MutatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A chat message in bridge-neutral form.
#[derive(Debug, Clone)]
pub struct Message {
    pub content: String,
    pub sender: Sender,
    pub source: Source,
    /// Monotonic instant the pier observed the event. Only used for
    /// latency measurement.
    pub received_at: Instant,
    applied: HashSet<MutatorId>,
}

impl Message {
    /// Build a message stamped with the current instant.
    pub fn new(content: impl Into<String>, sender: Sender, source: Source) -> Self {
        Self::received(content, sender, source, Instant::now())
    }

    /// Build a message with an explicit receive instant.
    pub fn received(
        content: impl Into<String>,
        sender: Sender,
        source: Source,
        received_at: Instant,
    ) -> Self {
        Self {
            content: content.into(),
            sender,
            source,
            received_at,
            applied: HashSet::new(),
        }
    }

    /// A message authored by the bridge itself.
    pub fn from_bot(content: impl Into<String>, source: Source) -> Self {
        Self::new(content, BOT_SENDER, source)
    }

    pub fn is_from_bot(&self) -> bool {
        matches!(self.sender, Sender::Bot)
    }

    pub fn has_applied(&self, id: MutatorId) -> bool {
        self.applied.contains(&id)
    }

    /// Record `id` in the applied-set. Returns `false` if it was already there.
    pub fn mark_applied(&mut self, id: MutatorId) -> bool {
        self.applied.insert(id)
    }

    pub fn applied_mutators(&self) -> impl Iterator<Item = MutatorId> + '_ {
        self.applied.iter().copied()
    }

    /// If the content starts with `prefix`, the lower-cased command name
    /// that follows it.
    pub fn command_name(&self, prefix: &str) -> Option<String> {
        if prefix.is_empty() {
            return None;
        }
        let rest = self.content.trim_start().strip_prefix(prefix)?;
        let name = rest.split_whitespace().next()?;
        Some(name.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: MutatorId = MutatorId("a");
    const B: MutatorId = MutatorId("b");

    #[test]
    fn opposite_platform() {
        assert_eq!(PlatformType::Irc.opposite(), PlatformType::Discord);
        assert_eq!(PlatformType::Discord.opposite(), PlatformType::Irc);
        assert_eq!(PlatformType::Irc.to_string(), "IRC");
        assert_eq!(PlatformType::Discord.to_string(), "Discord");
    }

    #[test]
    fn mark_applied_is_idempotent() {
        let mut msg = Message::new("hi", Sender::user("alice"), Source::irc("#rust"));
        assert!(!msg.has_applied(A));
        assert!(msg.mark_applied(A));
        assert!(!msg.mark_applied(A));
        msg.mark_applied(B);

        let mut ids: Vec<_> = msg.applied_mutators().collect();
        ids.sort();
        assert_eq!(ids, vec![A, B]);
    }

    #[test]
    fn clone_carries_applied_set() {
        let mut msg = Message::new("hi", Sender::user("alice"), Source::irc("#rust"));
        msg.mark_applied(A);
        assert!(msg.clone().has_applied(A));
    }

    #[test]
    fn command_name_parsing() {
        let msg = Message::new("!Stats now", Sender::user("bob"), Source::discord("1"));
        assert_eq!(msg.command_name("!").as_deref(), Some("stats"));
        assert_eq!(msg.command_name("?"), None);
        assert_eq!(msg.command_name(""), None);

        let bare = Message::new("!", Sender::user("bob"), Source::discord("1"));
        assert_eq!(bare.command_name("!"), None);
    }

    #[test]
    fn bot_sender() {
        let msg = Message::from_bot("Topic: x", Source::irc("#rust"));
        assert!(msg.is_from_bot());
        assert_eq!(msg.sender, BOT_SENDER);
        assert_eq!(msg.sender.display_name(), "Bridge");
    }
}
