//! Pier (transport) layer for pierlink.
//!
//! A pier is the boundary component that talks to one chat backend. Each
//! pier normalizes backend events into [`Message`](pierlink_types::Message)s,
//! hands them to the bridge through [`BridgeHost::submit_message`], and
//! relays messages coming from the other side with [`Pier::send_message`].
//!
//! - [`traits`] -- [`Pier`], [`BridgeHost`], [`PierStatus`]
//! - [`lifecycle`] -- [`PierLifecycle`], the shared start/shutdown state machine
//! - [`irc`] -- [`IrcPier`](irc::IrcPier)
//! - [`discord`] -- [`DiscordPier`](discord::DiscordPier)

pub mod discord;
pub mod irc;
pub mod lifecycle;
pub mod traits;

pub use lifecycle::{PierLifecycle, SHUTDOWN_GRACE};
pub use traits::{BridgeHost, Pier, PierStatus};
