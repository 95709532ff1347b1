//! Error types for the update coordinator.

/// Top-level error type for update checks, downloads and the host gateway.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// Check, download or install failed against the release source.
    #[error("transport error: {0}")]
    Transport(String),

    /// Operation requested while the state machine cannot honor it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Operation name not recognized at the gateway boundary.
    #[error("invalid channel: {0}")]
    InvalidChannel(String),

    /// `open-release` requested with no pending version.
    #[error("no pending version")]
    NoPendingVersion,

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, UpdateError>;
