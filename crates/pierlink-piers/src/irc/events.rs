//! IRC events the bridge relays, and their normalization into [`Message`]s.
//!
//! Channel messages and `/me` actions carry the IRC user as sender. Mode
//! and topic changes are reported by the bridge itself ([`BOT_SENDER`]).
//! Anything caused by the pier's own nick is dropped here so the bridge
//! never relays its own output back.

use std::time::Instant;

use pierlink_types::message::{BOT_SENDER, Message, Sender, Source};

use super::proto::IrcLine;

/// IRC italics toggle.
const ITALIC: char = '\x1D';

const CTCP_DELIM: char = '\x01';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcEvent {
    ChannelMessage {
        nick: String,
        channel: String,
        text: String,
    },
    /// CTCP `ACTION` (`/me`).
    Action {
        nick: String,
        channel: String,
        text: String,
    },
    ModeChange {
        actor: String,
        channel: String,
        modes: String,
    },
    TopicChange {
        setter: Option<String>,
        channel: String,
        topic: Option<String>,
    },
}

fn is_channel(target: &str) -> bool {
    target.starts_with('#') || target.starts_with('&')
}

impl IrcEvent {
    /// Extract a relayable event from a parsed line. Private messages,
    /// non-ACTION CTCP and unrelated commands yield `None`.
    pub fn from_line(line: &IrcLine) -> Option<Self> {
        match line.command.as_str() {
            "PRIVMSG" => {
                let nick = line.nick()?.to_string();
                let channel = line.param(0).filter(|t| is_channel(t))?.to_string();
                let text = line.param(1)?;

                if let Some(ctcp) = text.strip_prefix(CTCP_DELIM) {
                    let ctcp = ctcp.strip_suffix(CTCP_DELIM).unwrap_or(ctcp);
                    let action = ctcp.strip_prefix("ACTION ")?;
                    return Some(Self::Action {
                        nick,
                        channel,
                        text: action.to_string(),
                    });
                }

                Some(Self::ChannelMessage {
                    nick,
                    channel,
                    text: text.to_string(),
                })
            }
            "MODE" => {
                let channel = line.param(0).filter(|t| is_channel(t))?.to_string();
                let modes = line.params[1..].join(" ");
                if modes.is_empty() {
                    return None;
                }
                Some(Self::ModeChange {
                    actor: line.nick()?.to_string(),
                    channel,
                    modes,
                })
            }
            "TOPIC" => {
                let channel = line.param(0).filter(|t| is_channel(t))?.to_string();
                Some(Self::TopicChange {
                    setter: line.nick().map(str::to_string),
                    channel,
                    topic: line.param(1).filter(|t| !t.is_empty()).map(str::to_string),
                })
            }
            _ => None,
        }
    }

    fn actor(&self) -> Option<&str> {
        match self {
            Self::ChannelMessage { nick, .. } | Self::Action { nick, .. } => Some(nick),
            Self::ModeChange { actor, .. } => Some(actor),
            Self::TopicChange { setter, .. } => setter.as_deref(),
        }
    }
}

/// Turn an event into a bridge message. Returns `None` for events caused
/// by `own_nick`.
pub fn normalize_event(event: IrcEvent, own_nick: &str, received_at: Instant) -> Option<Message> {
    if event
        .actor()
        .is_some_and(|actor| actor.eq_ignore_ascii_case(own_nick))
    {
        return None;
    }

    let message = match event {
        IrcEvent::ChannelMessage {
            nick,
            channel,
            text,
        } => Message::received(text, Sender::user(nick), Source::irc(channel), received_at),
        IrcEvent::Action {
            nick,
            channel,
            text,
        } => Message::received(
            format!("{ITALIC}{text}{ITALIC}"),
            Sender::user(nick),
            Source::irc(channel),
            received_at,
        ),
        IrcEvent::ModeChange {
            actor,
            channel,
            modes,
        } => Message::received(
            format!("{actor} changed channel modes: {modes}"),
            BOT_SENDER,
            Source::irc(channel),
            received_at,
        ),
        IrcEvent::TopicChange {
            setter,
            channel,
            topic,
        } => {
            let topic = topic.unwrap_or_else(|| "Unknown topic".into());
            let content = match setter {
                Some(setter) => format!("Topic set by {setter}: {topic}"),
                None => format!("Topic: {topic}"),
            };
            Message::received(content, BOT_SENDER, Source::irc(channel), received_at)
        }
    };
    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pierlink_types::message::PlatformType;

    fn event(raw: &str) -> Option<IrcEvent> {
        IrcEvent::from_line(&IrcLine::parse(raw).unwrap())
    }

    fn normalize(raw: &str) -> Option<Message> {
        normalize_event(event(raw)?, "pierlink", Instant::now())
    }

    #[test]
    fn channel_message() {
        let msg = normalize(":alice!a@h PRIVMSG #rust :hello").unwrap();
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.sender, Sender::user("alice"));
        assert_eq!(msg.source.platform, PlatformType::Irc);
        assert_eq!(msg.source.channel, "#rust");
    }

    #[test]
    fn private_message_ignored() {
        assert!(event(":alice!a@h PRIVMSG pierlink :psst").is_none());
    }

    #[test]
    fn own_messages_suppressed() {
        assert!(normalize(":pierlink!p@h PRIVMSG #rust :<bob> relayed").is_none());
        assert!(normalize(":PierLink!p@h PRIVMSG #rust :case").is_none());
        assert!(normalize(":pierlink!p@h MODE #rust +o alice").is_none());
    }

    #[test]
    fn action_wrapped_in_italics() {
        let msg = normalize(":alice!a@h PRIVMSG #rust :\x01ACTION waves\x01").unwrap();
        assert_eq!(msg.content, "\x1Dwaves\x1D");
        assert!(!msg.is_from_bot());
    }

    #[test]
    fn other_ctcp_ignored() {
        assert!(event(":alice!a@h PRIVMSG #rust :\x01VERSION\x01").is_none());
    }

    #[test]
    fn mode_change_uses_bot_sender() {
        let msg = normalize(":op!o@h MODE #rust +o alice").unwrap();
        assert_eq!(msg.content, "op changed channel modes: +o alice");
        assert!(msg.is_from_bot());
    }

    #[test]
    fn user_mode_ignored() {
        assert!(event(":pierlink MODE pierlink :+i").is_none());
    }

    #[test]
    fn topic_change() {
        let msg = normalize(":alice!a@h TOPIC #rust :Release day").unwrap();
        assert_eq!(msg.content, "Topic set by alice: Release day");
        assert!(msg.is_from_bot());

        let cleared = normalize(":alice!a@h TOPIC #rust :").unwrap();
        assert_eq!(cleared.content, "Topic set by alice: Unknown topic");
    }

    #[test]
    fn topic_without_setter() {
        let msg = normalize_event(
            IrcEvent::TopicChange {
                setter: None,
                channel: "#rust".into(),
                topic: Some("hi".into()),
            },
            "pierlink",
            Instant::now(),
        )
        .unwrap();
        assert_eq!(msg.content, "Topic: hi");
    }
}
