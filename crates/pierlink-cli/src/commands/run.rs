//! `pierlink run` -- start both piers and relay until Ctrl+C.
//!
//! ```text
//! 1. Load and validate config
//! 2. Build the IRC and Discord piers
//! 3. Build the mutator pipeline, stats recorder and command hook
//! 4. Start the bridge
//! 5. Wait for Ctrl+C, then shut both piers down
//! ```

use std::sync::Arc;

use clap::Args;
use tracing::info;

use pierlink_core::mutator::PasteGgClient;
use pierlink_core::{Bridge, ChannelMappings, CommandManager, MutatorManager, StatsManager};
use pierlink_piers::Pier;
use pierlink_piers::discord::DiscordPier;
use pierlink_piers::irc::IrcPier;

use super::resolve_config;

#[derive(Args)]
pub struct RunArgs {
    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<String>,
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = resolve_config(args.config.as_deref())?;
    let mappings = ChannelMappings::from_config(&config);

    let irc: Arc<dyn Pier> = Arc::new(IrcPier::new(config.irc.clone(), mappings.irc_channels())?);
    let discord: Arc<dyn Pier> = Arc::new(DiscordPier::new(config.discord.clone())?);

    let paste = Arc::new(PasteGgClient::new(&config.paste_service));
    let mutators = MutatorManager::with_defaults(&config, paste);
    let stats = Arc::new(StatsManager::new());
    let commands = CommandManager::with_defaults(&config.commands, stats.clone());

    let bridge = Arc::new(Bridge::new(
        &config, irc, discord, mutators, stats, commands,
    ));
    bridge.start().await;
    info!(bridge = %bridge.name(), "bridge running -- press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    info!("received shutdown signal");

    bridge.shutdown().await;
    info!("bridge stopped");
    Ok(())
}
