//! Chat command hook.
//!
//! Messages starting with the configured prefix (default `!`) are looked up
//! in the [`CommandManager`]; a matching [`Executor`] may answer with text
//! that the bridge posts back to both sides.

pub mod stats;

pub use stats::StatsCommand;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use pierlink_types::config::CommandsConfig;
use pierlink_types::message::Message;

use crate::stats::StatsManager;

/// Handles one chat command.
pub trait Executor: Send + Sync {
    /// Answer `command`, or `None` to stay silent.
    fn on_command(&self, command: &Message) -> Option<String>;
}

pub struct CommandManager {
    enabled: bool,
    prefix: String,
    executors: HashMap<String, Arc<dyn Executor>>,
}

impl CommandManager {
    pub fn new(config: &CommandsConfig) -> Self {
        Self {
            enabled: config.enabled,
            prefix: config.prefix.clone(),
            executors: HashMap::new(),
        }
    }

    /// Manager with the built-in `stats` command.
    pub fn with_defaults(config: &CommandsConfig, stats: Arc<StatsManager>) -> Self {
        Self::new(config).register("stats", Arc::new(StatsCommand::new(stats)))
    }

    /// Register `executor` under `name` (matched case-insensitively).
    pub fn register(mut self, name: &str, executor: Arc<dyn Executor>) -> Self {
        self.executors.insert(name.to_lowercase(), executor);
        self
    }

    pub fn is_command(&self, message: &Message) -> bool {
        self.enabled && message.command_name(&self.prefix).is_some()
    }

    /// Run the executor for `message`, if it is a known command.
    pub fn process(&self, message: &Message) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let name = message.command_name(&self.prefix)?;
        let executor = self.executors.get(&name)?;
        debug!(command = %name, origin = %message.source.platform, "executing command");
        executor.on_command(message)
    }
}
