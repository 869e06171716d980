//! IRC pier.
//!
//! - [`types`] -- config validation and argument sanitizing
//! - [`proto`] -- line parsing and outbound formatting
//! - [`events`] -- IRC events and their normalization into messages
//! - [`pier`] -- [`IrcPier`], the connection task and outbound queue

pub mod events;
pub mod pier;
pub mod proto;
pub mod types;

pub use pier::IrcPier;
pub use types::{sanitize_channel_name, sanitize_irc_argument, validate_config};
