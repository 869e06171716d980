//! Configuration schema types.
//!
//! All structs accept both `snake_case` and `camelCase` field names (the
//! loader normalizes keys, and `#[serde(alias)]` covers direct parsing).
//! Unknown fields are ignored.
//!
//! - [`piers`] -- IRC and Discord connection settings
//! - [`loader`] -- config file discovery and parsing

pub mod loader;
pub mod piers;

pub use loader::{camel_to_snake, discover_config_path, load_config, normalize_keys};
pub use piers::{DiscordConfig, IrcAuthMethod, IrcConfig};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PierlinkError;

pub(crate) fn default_true() -> bool {
    true
}

/// Root configuration for one bridge.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Bridge name, used in log fields.
    #[serde(default = "default_bridge_name")]
    pub name: String,

    #[serde(default)]
    pub irc: IrcConfig,

    #[serde(default)]
    pub discord: DiscordConfig,

    /// Discord channel id -> IRC channel name (`"#channel"`).
    #[serde(default, alias = "channelMappings")]
    pub channel_mappings: HashMap<String, String>,

    #[serde(default, alias = "pasteService")]
    pub paste_service: PasteServiceConfig,

    #[serde(default)]
    pub commands: CommandsConfig,
}

fn default_bridge_name() -> String {
    "pierlink".into()
}

impl Config {
    /// Structural checks that do not depend on a particular pier.
    ///
    /// Pier-specific validation (IRC argument sanitizing and the like) is
    /// done by the piers when they are constructed.
    pub fn validate(&self) -> Result<(), PierlinkError> {
        let invalid = |reason: String| PierlinkError::ConfigInvalid { reason };

        if self.channel_mappings.is_empty() {
            return Err(invalid("channel_mappings is empty; nothing to bridge".into()));
        }
        let mut seen_irc = std::collections::HashSet::new();
        for (discord_id, irc_channel) in &self.channel_mappings {
            if discord_id.is_empty() || !discord_id.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid(format!(
                    "channel_mappings: discord channel id must be numeric, got {discord_id:?}"
                )));
            }
            if !irc_channel.starts_with('#') && !irc_channel.starts_with('&') {
                return Err(invalid(format!(
                    "channel_mappings: irc channel must start with '#' or '&', got {irc_channel:?}"
                )));
            }
            if !seen_irc.insert(irc_channel.to_lowercase()) {
                return Err(invalid(format!(
                    "channel_mappings: irc channel {irc_channel:?} is mapped more than once"
                )));
            }
        }

        if self.commands.enabled && self.commands.prefix.trim().is_empty() {
            return Err(invalid("commands.prefix must not be empty".into()));
        }

        let paste = &self.paste_service;
        if paste.enabled {
            if paste.max_message_length == 0 {
                return Err(invalid("paste_service.max_message_length must be > 0".into()));
            }
            if paste.api_url.is_empty() {
                return Err(invalid("paste_service.api_url is required when enabled".into()));
            }
        }

        Ok(())
    }
}

/// Long-message paste service settings (Discord -> IRC).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasteServiceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Messages longer than this many characters are pasted.
    #[serde(default = "default_max_message_length", alias = "maxMessageLength")]
    pub max_message_length: usize,

    /// Messages with more than this many lines are pasted.
    #[serde(default = "default_max_new_lines", alias = "maxNewLines")]
    pub max_new_lines: usize,

    /// Characters of the first line kept as a preview on IRC.
    #[serde(default = "default_preview_length", alias = "previewLength")]
    pub preview_length: usize,

    #[serde(default = "default_paste_expiration_days", alias = "pasteExpirationDays")]
    pub paste_expiration_days: u32,

    /// Base URL of the paste API.
    #[serde(default = "default_paste_api_url", alias = "apiUrl")]
    pub api_url: String,

    /// Base URL of the public paste links.
    #[serde(default = "default_paste_link_base", alias = "linkBase")]
    pub link_base: String,
}

fn default_max_message_length() -> usize {
    450
}

fn default_max_new_lines() -> usize {
    4
}

fn default_preview_length() -> usize {
    100
}

fn default_paste_expiration_days() -> u32 {
    7
}

fn default_paste_api_url() -> String {
    "https://api.paste.gg/v1".into()
}

fn default_paste_link_base() -> String {
    "https://paste.gg/p/anonymous".into()
}

impl Default for PasteServiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_message_length: default_max_message_length(),
            max_new_lines: default_max_new_lines(),
            preview_length: default_preview_length(),
            paste_expiration_days: default_paste_expiration_days(),
            api_url: default_paste_api_url(),
            link_base: default_paste_link_base(),
        }
    }
}

/// Chat command settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_command_prefix")]
    pub prefix: String,
}

fn default_command_prefix() -> String {
    "!".into()
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: default_command_prefix(),
        }
    }
}
