use thiserror::Error;

/// Errors raised by the channel pool and the sweep driver.
///
/// Rejecting an arrival is never an error; it is the counted outcome of a
/// full pool.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A construction parameter is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A completion thread found its channel already free on release.
    #[error("Channel {channel} released while already free")]
    ChannelAlreadyFree {
        /// Index of the offending channel.
        channel: usize,
    },

    /// `accepted + rejected != total` after the lock was released.
    #[error("Counter mismatch: {accepted} accepted + {rejected} rejected != {total} total")]
    CounterMismatch {
        /// Arrivals offered.
        total: u64,
        /// Arrivals accepted.
        accepted: u64,
        /// Arrivals rejected.
        rejected: u64,
    },

    /// Writing the results table failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
