//! # pierlink-core
//!
//! Message pipeline and routing for the pierlink bridge.
//!
//! Contains the mutator pipeline, the stats recorder and `!stats` reporter,
//! the chat command hook, channel mappings, and the [`Bridge`] that ties
//! two piers together.

pub mod bridge;
pub mod channel_mappings;
pub mod commands;
pub mod mutator;
pub mod stats;

pub use bridge::Bridge;
pub use channel_mappings::ChannelMappings;
pub use commands::{CommandManager, Executor};
pub use mutator::{LifeCycle, Mutator, MutatorManager};
pub use stats::StatsManager;
