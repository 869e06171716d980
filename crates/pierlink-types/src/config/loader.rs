//! Configuration file discovery and loading.
//!
//! The discovery order is:
//! 1. An explicit path (`--config`).
//! 2. `PIERLINK_CONFIG` environment variable.
//! 3. `./pierlink.json`
//! 4. `~/.pierlink/config.json`
//!
//! JSON keys are normalized from camelCase to snake_case before the typed
//! [`Config`] is deserialized. Values (channel names, ids) are untouched.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use super::Config;
use crate::error::PierlinkError;

/// Environment variable that points at the config file.
pub const CONFIG_ENV_VAR: &str = "PIERLINK_CONFIG";

/// Discover the config file path using the fallback chain.
///
/// An explicit path or the env var path is returned as-is (the caller
/// reports a missing file); the default locations are only returned when
/// they exist.
pub fn discover_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    discover_from(
        explicit,
        std::env::var(CONFIG_ENV_VAR).ok(),
        std::env::current_dir().ok(),
        dirs::home_dir(),
    )
}

fn discover_from(
    explicit: Option<&Path>,
    env_path: Option<String>,
    cwd: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(env_path) = env_path.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(env_path));
    }
    let candidates = cwd
        .map(|dir| dir.join("pierlink.json"))
        .into_iter()
        .chain(home.map(|h| h.join(".pierlink").join("config.json")));
    for candidate in candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

/// Read, normalize and deserialize the config file at `path`.
pub fn load_config(path: &Path) -> Result<Config, PierlinkError> {
    debug!(path = %path.display(), "loading config file");
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse config JSON text after key normalization.
pub fn parse_config(contents: &str) -> Result<Config, PierlinkError> {
    let raw: Value = serde_json::from_str(contents)?;
    let config = serde_json::from_value(normalize_keys(raw))?;
    Ok(config)
}

/// Convert camelCase JSON keys to snake_case recursively.
///
/// Keys of `channel_mappings` are Discord ids and are left alone.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut new_map = serde_json::Map::new();
            for (key, val) in map {
                let snake_key = camel_to_snake(&key);
                let val = if snake_key == "channel_mappings" {
                    val
                } else {
                    normalize_keys(val)
                };
                new_map.insert(snake_key, val);
            }
            Value::Object(new_map)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

/// Convert a single camelCase string to snake_case.
///
/// Acronym runs stay together: `"HTMLParser"` becomes `"html_parser"`.
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut result = String::with_capacity(name.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            if prev.is_lowercase()
                || (prev.is_uppercase() && next.is_some_and(|c| c.is_lowercase()))
            {
                result.push('_');
            }
        }
        result.push(ch.to_ascii_lowercase());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn camel_to_snake_cases() {
        assert_eq!(camel_to_snake("channelMappings"), "channel_mappings");
        assert_eq!(camel_to_snake("useTls"), "use_tls");
        assert_eq!(camel_to_snake("already_snake"), "already_snake");
        assert_eq!(camel_to_snake("apiURL"), "api_url");
        assert_eq!(camel_to_snake("HTMLParser"), "html_parser");
    }

    #[test]
    fn normalize_nested_but_not_mappings() {
        let raw = json!({
            "pasteService": {"maxNewLines": 3},
            "channelMappings": {"123": "#MixedCase"}
        });
        let out = normalize_keys(raw);
        assert_eq!(out["paste_service"]["max_new_lines"], 3);
        assert_eq!(out["channel_mappings"]["123"], "#MixedCase");
    }

    #[test]
    fn explicit_path_wins() {
        let found = discover_from(
            Some(Path::new("/tmp/explicit.json")),
            Some("/tmp/env.json".into()),
            None,
            None,
        );
        assert_eq!(found, Some(PathBuf::from("/tmp/explicit.json")));
    }

    #[test]
    fn env_path_before_defaults() {
        let found = discover_from(None, Some("/tmp/env.json".into()), None, None);
        assert_eq!(found, Some(PathBuf::from("/tmp/env.json")));
    }

    #[test]
    fn cwd_then_home() {
        let cwd = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let home_cfg = home.path().join(".pierlink").join("config.json");
        std::fs::create_dir_all(home_cfg.parent().unwrap()).unwrap();
        std::fs::write(&home_cfg, "{}").unwrap();

        let found = discover_from(
            None,
            None,
            Some(cwd.path().to_path_buf()),
            Some(home.path().to_path_buf()),
        );
        assert_eq!(found, Some(home_cfg));

        let cwd_cfg = cwd.path().join("pierlink.json");
        std::fs::write(&cwd_cfg, "{}").unwrap();
        let found = discover_from(
            None,
            None,
            Some(cwd.path().to_path_buf()),
            Some(home.path().to_path_buf()),
        );
        assert_eq!(found, Some(cwd_cfg));
    }

    #[test]
    fn nothing_found() {
        let empty = tempfile::tempdir().unwrap();
        assert_eq!(
            discover_from(None, None, Some(empty.path().to_path_buf()), None),
            None
        );
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pierlink.json");
        std::fs::write(
            &path,
            r##"{"name": "libera", "channelMappings": {"42": "#pierlink"}, "irc": {"antiPing": false}}"##,
        )
        .unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.name, "libera");
        assert_eq!(cfg.channel_mappings["42"], "#pierlink");
        assert!(!cfg.irc.anti_ping);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/pierlink.json")).unwrap_err();
        assert!(matches!(err, PierlinkError::Io(_)));
    }

    #[test]
    fn parse_bad_json() {
        assert!(matches!(parse_config("{oops"), Err(PierlinkError::Json(_))));
    }
}
