//! Discord pier.
//!
//! Receives events over the Gateway WebSocket and sends messages through
//! the REST API.

pub mod api;
pub mod events;
pub mod pier;

pub use api::DiscordApiClient;
pub use pier::DiscordPier;
