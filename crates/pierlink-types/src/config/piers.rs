//! Connection settings for the IRC and Discord piers.

use serde::{Deserialize, Serialize};

use super::default_true;
use crate::secret::SecretString;

/// How the IRC pier identifies itself after registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IrcAuthMethod {
    #[default]
    None,
    /// `PRIVMSG NickServ :IDENTIFY <password>` after the welcome numeric.
    Nickserv,
}

/// IRC pier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrcConfig {
    /// IRC server hostname (e.g. `"irc.libera.chat"`).
    #[serde(default)]
    pub server: String,

    /// Server port (6697 for TLS, 6667 for plaintext).
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true", alias = "useTls")]
    pub use_tls: bool,

    #[serde(default)]
    pub nickname: String,

    /// Username sent with `USER`; falls back to the nickname.
    #[serde(default)]
    pub username: Option<String>,

    /// Real name sent with `USER`.
    #[serde(default = "default_realname")]
    pub realname: String,

    #[serde(default, alias = "authMethod")]
    pub auth_method: IrcAuthMethod,

    /// Environment variable holding the NickServ password.
    #[serde(default, alias = "passwordEnv")]
    pub password_env: Option<String>,

    /// Environment variable holding the server password (`PASS`).
    #[serde(default, alias = "serverPasswordEnv")]
    pub server_password_env: Option<String>,

    #[serde(default = "default_reconnect_delay_secs", alias = "reconnectDelaySecs")]
    pub reconnect_delay_secs: u64,

    /// Break relayed nicks with a zero-width space so IRC clients do not
    /// highlight the Discord user's namesake.
    #[serde(default = "default_true", alias = "antiPing")]
    pub anti_ping: bool,
}

fn default_port() -> u16 {
    6697
}

fn default_realname() -> String {
    "pierlink IRC/Discord bridge".into()
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

impl IrcConfig {
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.nickname)
    }
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: default_port(),
            use_tls: true,
            nickname: String::new(),
            username: None,
            realname: default_realname(),
            auth_method: IrcAuthMethod::None,
            password_env: None,
            server_password_env: None,
            reconnect_delay_secs: default_reconnect_delay_secs(),
            anti_ping: true,
        }
    }
}

/// Discord pier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token. Prefer `token_env` over storing the token in the file.
    #[serde(default)]
    pub token: SecretString,

    /// Environment variable consulted when `token` is empty.
    #[serde(default = "default_token_env", alias = "tokenEnv")]
    pub token_env: String,

    #[serde(default = "default_gateway_url", alias = "gatewayUrl")]
    pub gateway_url: String,

    #[serde(default = "default_api_base_url", alias = "apiBaseUrl")]
    pub api_base_url: String,

    /// Gateway intents bitmask (GUILDS | GUILD_MESSAGES | MESSAGE_CONTENT | GUILD_MEMBERS).
    #[serde(default = "default_intents")]
    pub intents: u32,
}

fn default_token_env() -> String {
    "PIERLINK_DISCORD_TOKEN".into()
}

fn default_gateway_url() -> String {
    "wss://gateway.discord.gg/?v=10&encoding=json".into()
}

fn default_api_base_url() -> String {
    "https://discord.com/api/v10".into()
}

fn default_intents() -> u32 {
    1 | (1 << 1) | (1 << 9) | (1 << 15)
}

impl DiscordConfig {
    /// The bot token, falling back to `token_env`.
    pub fn resolved_token(&self) -> SecretString {
        self.token.or_env(&self.token_env)
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: SecretString::default(),
            token_env: default_token_env(),
            gateway_url: default_gateway_url(),
            api_base_url: default_api_base_url(),
            intents: default_intents(),
        }
    }
}
