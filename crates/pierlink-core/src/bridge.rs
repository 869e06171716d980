//! The bridge: routes messages between the IRC and Discord piers.
//!
//! Each pier hands inbound messages to [`Bridge::submit_message`] from its
//! own task. The bridge resolves the relay target, runs the mutator
//! pipeline, forwards the result to the opposite pier and records its
//! latency. Chat commands are answered on both sides.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, error, info};

use pierlink_piers::{BridgeHost, Pier};
use pierlink_types::config::Config;
use pierlink_types::message::{Message, PlatformType, Source};

use crate::channel_mappings::ChannelMappings;
use crate::commands::CommandManager;
use crate::mutator::MutatorManager;
use crate::stats::StatsManager;

pub struct Bridge {
    name: String,
    mappings: ChannelMappings,
    irc: Arc<dyn Pier>,
    discord: Arc<dyn Pier>,
    mutators: MutatorManager,
    stats: Arc<StatsManager>,
    commands: CommandManager,
}

impl Bridge {
    pub fn new(
        config: &Config,
        irc: Arc<dyn Pier>,
        discord: Arc<dyn Pier>,
        mutators: MutatorManager,
        stats: Arc<StatsManager>,
        commands: CommandManager,
    ) -> Self {
        Self {
            name: config.name.clone(),
            mappings: ChannelMappings::from_config(config),
            irc,
            discord,
            mutators,
            stats,
            commands,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn pier(&self, platform: PlatformType) -> &Arc<dyn Pier> {
        match platform {
            PlatformType::Irc => &self.irc,
            PlatformType::Discord => &self.discord,
        }
    }

    /// Start both piers. A pier that fails to start is logged and left
    /// stopped; the other one keeps running.
    pub async fn start(self: &Arc<Self>) {
        info!(bridge = %self.name, mappings = self.mappings.len(), "starting bridge");
        let host: Arc<dyn BridgeHost> = self.clone();
        for pier in [&self.irc, &self.discord] {
            if let Err(e) = pier.start(host.clone()).await {
                error!(
                    bridge = %self.name,
                    pier = %pier.platform(),
                    error = %e,
                    "pier failed to start"
                );
            }
        }
    }

    /// Shut down both piers.
    pub async fn shutdown(&self) {
        info!(bridge = %self.name, "shutting down bridge");
        tokio::join!(self.irc.shutdown(), self.discord.shutdown());
    }

    async fn answer_command(&self, command: &Message, target: &str) {
        let Some(answer) = self.commands.process(command) else {
            return;
        };
        let origin = command.source.platform;
        let reply = Message::from_bot(answer, command.source.clone());

        self.pier(origin)
            .send_message(&command.source.channel, &reply)
            .await;
        self.pier(origin.opposite()).send_message(target, &reply).await;
    }
}

#[async_trait]
impl BridgeHost for Bridge {
    async fn submit_message(&self, message: Message) {
        let origin = message.source.platform;
        let Some(target) = self.mappings.target_for(&message.source) else {
            debug!(
                bridge = %self.name,
                origin = %origin,
                channel = %message.source.channel,
                "no mapping for channel, dropping message"
            );
            return;
        };

        let command = self.commands.is_command(&message).then(|| message.clone());

        match self.mutators.apply(message).await {
            Some(relayed) if relayed.content.trim().is_empty() => {
                debug!(
                    bridge = %self.name,
                    origin = %origin,
                    "message empty after mutators, dropping"
                );
            }
            Some(relayed) => {
                self.pier(origin.opposite())
                    .send_message(target, &relayed)
                    .await;
                self.stats.record_message(&relayed, Instant::now());
            }
            None => {}
        }

        if let Some(command) = command {
            self.answer_command(&command, target).await;
        }
    }
}
