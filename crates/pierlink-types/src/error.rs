//! Error types for pierlink.
//!
//! [`PierlinkError`] is the top-level error, [`PierError`] covers transport
//! failures and [`MutatorError`] covers failures inside a pipeline stage.
//! All are non-exhaustive.

use thiserror::Error;

/// Top-level error type for pierlink.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PierlinkError {
    /// Configuration is malformed or semantically invalid.
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// No configuration file could be located.
    #[error("no config file found (set PIERLINK_CONFIG or pass --config)")]
    ConfigNotFound,

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A pier-layer error bubbled up.
    #[error("pier error: {0}")]
    Pier(#[from] PierError),
}

/// Transport (pier) error type.
///
/// Backend failures after a pier has started are logged by the pier itself
/// and never reach the pipeline; this type is returned from lifecycle calls
/// and used internally by the connection loops.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PierError {
    /// Failed to establish a connection to the backend.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication / authorization was rejected.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Sending a message failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receiving a message failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// A lifecycle call was made in the wrong state (e.g. double start).
    #[error("invalid pier state: expected {expected}, was {actual}")]
    InvalidState {
        /// State the call requires.
        expected: &'static str,
        /// State the pier was actually in.
        actual: &'static str,
    },

    /// Catch-all for errors that do not fit other variants.
    #[error("{0}")]
    Other(String),
}

/// Failure raised by a mutator while transforming a message.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MutatorError {
    /// An external upload (paste service) failed.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// Catch-all for errors that do not fit other variants.
    #[error("{0}")]
    Other(String),
}

/// A convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, PierlinkError>;
