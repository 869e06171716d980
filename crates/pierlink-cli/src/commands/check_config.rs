//! `pierlink check-config` -- validate and print the resolved configuration.

use clap::Args;

use pierlink_core::ChannelMappings;
use pierlink_piers::irc::validate_config;

use super::resolve_config;

#[derive(Args)]
pub struct CheckConfigArgs {
    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<String>,
}

pub fn run(args: CheckConfigArgs) -> anyhow::Result<()> {
    let config = resolve_config(args.config.as_deref())?;
    let mappings = ChannelMappings::from_config(&config);
    validate_config(&config.irc, &mappings.irc_channels())
        .map_err(|reason| anyhow::anyhow!("invalid IRC config: {reason}"))?;

    if config.discord.resolved_token().is_empty() {
        eprintln!(
            "warning: no Discord token set (config or ${})",
            config.discord.token_env
        );
    }

    // Secrets serialize redacted.
    println!("{}", serde_json::to_string_pretty(&config)?);
    println!("config OK: {} channel mapping(s)", mappings.len());
    Ok(())
}
