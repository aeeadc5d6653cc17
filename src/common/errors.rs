//! Error types for the engine

use thiserror::Error;

/// Result type alias using our EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for engine construction and orchestration
///
/// The tick path itself never returns errors; everything here is raised
/// while building analyzers or moving events between tasks.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Grid parameters that cannot produce a usable price ladder
    #[error("Invalid grid parameters: {0}")]
    InvalidGrid(String),

    /// Symbol has no partition mapping
    #[error("Unknown partition for symbol: {0}")]
    UnknownPartition(String),

    /// Market type does not support the requested trading mode
    #[error("Unsupported market: {0}")]
    UnsupportedMarket(String),

    /// An analyzer with the same id is already registered
    #[error("Duplicate analyzer id: {0}")]
    DuplicateAnalyzer(String),

    /// Analyzer lookup failed
    #[error("Analyzer not found: {0}")]
    AnalyzerNotFound(String),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// I/O errors while reading feeds or replay files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send errors
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Channel receive errors
    #[error("Channel receive error: {0}")]
    ChannelReceive(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::Configuration(err.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for EngineError {
    fn from(err: tokio::sync::mpsc::error::SendError<T>) -> Self {
        EngineError::ChannelSend(err.to_string())
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for EngineError {
    fn from(err: tokio::sync::oneshot::error::RecvError) -> Self {
        EngineError::ChannelReceive(err.to_string())
    }
}
