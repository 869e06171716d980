//! Subcommand implementations and shared helpers.

pub mod check_config;
pub mod run;

use std::path::Path;

use anyhow::Context;
use tracing::info;

use pierlink_types::config::{Config, discover_config_path, load_config};

/// Locate, load and validate the configuration.
///
/// `config_override` wins over `PIERLINK_CONFIG` and the default locations.
pub fn resolve_config(config_override: Option<&str>) -> anyhow::Result<Config> {
    let path = discover_config_path(config_override.map(Path::new)).ok_or_else(|| {
        anyhow::anyhow!(
            "no config file found (use --config, PIERLINK_CONFIG, ./pierlink.json or ~/.pierlink/config.json)"
        )
    })?;
    if !path.exists() {
        anyhow::bail!("config file not found: {}", path.display());
    }
    info!(path = %path.display(), "using config file");

    let config = load_config(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("pierlink_cli_{}_{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_override_is_an_error() {
        let err = resolve_config(Some("/nonexistent/pierlink.json")).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let path = temp_file("empty.json", "{}");
        let result = resolve_config(path.to_str());
        let _ = std::fs::remove_file(&path);
        assert!(result.is_err());
    }

    #[test]
    fn valid_config_loads() {
        let path = temp_file(
            "valid.json",
            r##"{
                "irc": { "server": "irc.libera.chat", "nickname": "pierlink" },
                "channelMappings": { "712345678901234567": "#pierlink" }
            }"##,
        );
        let result = resolve_config(path.to_str());
        let _ = std::fs::remove_file(&path);
        let config = result.unwrap();
        assert_eq!(config.irc.server, "irc.libera.chat");
        assert_eq!(config.channel_mappings.len(), 1);
    }
}
