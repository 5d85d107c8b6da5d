//! Error types for judge-bridge.

use thiserror::Error;

/// Main error type for all bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol error (malformed frame, bad compression, oversize length, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The peer closed the connection before sending any data.
    #[error("Protocol error: peer sent no data")]
    NoData,

    /// The peer closed the connection in the middle of a frame.
    #[error("Protocol error: truncated frame, expected {expected} bytes, received {received}")]
    Truncated { expected: usize, received: usize },

    /// No handler is registered for the packet name.
    #[error("Unknown packet: {0}")]
    UnknownPacket(String),

    /// A socket-level deadline elapsed.
    #[error("Timed out")]
    Timeout,

    /// Failure reported by the submission store.
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl BridgeError {
    /// Whether this error belongs to the frame-level protocol taxonomy.
    ///
    /// Protocol errors are fatal to the current connection only.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            BridgeError::Protocol(_) | BridgeError::NoData | BridgeError::Truncated { .. }
        )
    }
}

impl From<tokio::time::error::Elapsed> for BridgeError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        BridgeError::Timeout
    }
}

/// Result type alias using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;
