//! # pierlink-types
//!
//! Core type definitions for the pierlink IRC/Discord bridge.
//!
//! Every other pierlink crate depends on this one. It contains:
//!
//! - **[`error`]** -- [`PierlinkError`], [`PierError`] and [`MutatorError`]
//! - **[`message`]** -- the normalized [`Message`] relayed between piers
//! - **[`config`]** -- configuration schema and file discovery
//! - **[`secret`]** -- [`SecretString`] for tokens and passwords

pub mod config;
pub mod error;
pub mod message;
pub mod secret;

pub use error::{MutatorError, PierError, PierlinkError, Result};
pub use message::{BOT_SENDER, Message, MutatorId, PlatformType, Sender, Source};
pub use secret::SecretString;
