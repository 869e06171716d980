//! Discord channel id <-> IRC channel name routing table.

use std::collections::HashMap;

use pierlink_types::config::Config;
use pierlink_types::message::{PlatformType, Source};

#[derive(Debug, Clone, Default)]
pub struct ChannelMappings {
    discord_to_irc: HashMap<String, String>,
    /// Keyed by lower-cased IRC channel name.
    irc_to_discord: HashMap<String, String>,
}

impl ChannelMappings {
    pub fn from_config(config: &Config) -> Self {
        Self::from_pairs(
            config
                .channel_mappings
                .iter()
                .map(|(d, i)| (d.as_str(), i.as_str())),
        )
    }

    /// Build from `(discord_id, irc_channel)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut mappings = Self::default();
        for (discord, irc) in pairs {
            mappings
                .discord_to_irc
                .insert(discord.to_owned(), irc.to_owned());
            mappings
                .irc_to_discord
                .insert(irc.to_lowercase(), discord.to_owned());
        }
        mappings
    }

    /// Channel on the opposite platform that `source` relays into.
    pub fn target_for(&self, source: &Source) -> Option<&str> {
        match source.platform {
            PlatformType::Irc => self
                .irc_to_discord
                .get(&source.channel.to_lowercase())
                .map(String::as_str),
            PlatformType::Discord => self.discord_to_irc.get(&source.channel).map(String::as_str),
        }
    }

    /// IRC channels the IRC pier should join, sorted.
    pub fn irc_channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.discord_to_irc.values().cloned().collect();
        channels.sort();
        channels
    }

    pub fn len(&self) -> usize {
        self.discord_to_irc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.discord_to_irc.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mappings() -> ChannelMappings {
        ChannelMappings::from_pairs([("111", "#Rust"), ("222", "#pierlink")])
    }

    #[test]
    fn routes_both_ways() {
        let m = mappings();
        assert_eq!(m.target_for(&Source::discord("111")), Some("#Rust"));
        assert_eq!(m.target_for(&Source::irc("#rust")), Some("111"));
        assert_eq!(m.target_for(&Source::irc("#RUST")), Some("111"));
        assert_eq!(m.target_for(&Source::irc("#pierlink")), Some("222"));
    }

    #[test]
    fn unmapped_is_none() {
        let m = mappings();
        assert!(m.target_for(&Source::discord("333")).is_none());
        assert!(m.target_for(&Source::irc("#other")).is_none());
    }

    #[test]
    fn channels_to_join() {
        let m = mappings();
        assert_eq!(m.irc_channels(), vec!["#Rust", "#pierlink"]);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn from_config_map() {
        let mut cfg = Config::default();
        cfg.channel_mappings.insert("42".into(), "#x".into());
        let m = ChannelMappings::from_config(&cfg);
        assert_eq!(m.target_for(&Source::irc("#X")), Some("42"));
        assert!(!m.is_empty());
    }
}
