//! IRC configuration validation.

use pierlink_types::config::{IrcAuthMethod, IrcConfig};

/// Validate the IRC pier configuration and the channels it will join.
///
/// Checks:
/// - `server` and `nickname` are non-empty and safe to put on the wire
/// - `password_env` is set when NickServ authentication is requested
/// - channel names start with `#` or `&` and carry no forbidden characters
pub fn validate_config(config: &IrcConfig, channels: &[String]) -> Result<(), String> {
    if config.server.is_empty() {
        return Err("irc: server is required".into());
    }
    sanitize_irc_argument(&config.server).map_err(|e| format!("irc: invalid server: {e}"))?;

    if config.nickname.is_empty() {
        return Err("irc: nickname is required".into());
    }
    sanitize_irc_argument(&config.nickname)
        .map_err(|e| format!("irc: invalid nickname: {e}"))?;
    if config.nickname.contains(' ') {
        return Err("irc: nickname must not contain spaces".into());
    }
    sanitize_irc_argument(config.username())
        .map_err(|e| format!("irc: invalid username: {e}"))?;

    if config.auth_method == IrcAuthMethod::Nickserv && config.password_env.is_none() {
        return Err("irc: password_env is required when auth_method is \"nickserv\"".into());
    }

    for ch in channels {
        if !ch.starts_with('#') && !ch.starts_with('&') {
            return Err(format!(
                "irc: channel name must start with '#' or '&', got {ch:?}"
            ));
        }
        sanitize_channel_name(ch).map_err(|e| format!("irc: invalid channel name: {e}"))?;
    }

    Ok(())
}

/// Sanitize an IRC channel name.
///
/// The leading `#`/`&` prefix is allowed; the body must not contain
/// protocol injection characters, spaces, commas or shell metacharacters.
pub fn sanitize_channel_name(name: &str) -> Result<&str, String> {
    let mut chars = name.chars();
    let Some(prefix) = chars.next() else {
        return Err("empty channel name".into());
    };

    const BANNED_CHARS: &[char] = &[
        ';', '|', '&', '$', '`', '(', ')', '{', '}', '<', '>', '!', '\n', '\r', '\0', ' ', ',',
        '\x07',
    ];

    let body = &name[prefix.len_utf8()..];
    if let Some(ch) = body.chars().find(|c| BANNED_CHARS.contains(c)) {
        return Err(format!("channel name contains forbidden character: {ch:?}"));
    }

    Ok(name)
}

/// Reject arguments that would allow protocol injection (line breaks, NUL)
/// or that contain shell metacharacters.
pub fn sanitize_irc_argument(arg: &str) -> Result<&str, String> {
    if arg.is_empty() {
        return Err("empty argument".into());
    }

    const BANNED_CHARS: &[char] = &[
        ';', '|', '&', '$', '`', '(', ')', '{', '}', '<', '>', '!', '\n', '\r', '\0',
    ];

    if let Some(ch) = arg.chars().find(|c| BANNED_CHARS.contains(c)) {
        return Err(format!("argument contains forbidden character: {ch:?}"));
    }

    Ok(arg)
}
