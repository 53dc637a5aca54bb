//! Error types for the legend sync engine.

use thiserror::Error;

/// Errors that can occur in legend operations.
#[derive(Error, Debug)]
pub enum LegendError {
    #[error("Invalid event: {0}")]
    Validation(String),

    #[error("Event '{0}' belongs to another user")]
    PermissionDenied(String),

    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("No events to copy on {0}")]
    NothingToCopy(String),

    #[error("{0} requires a connection")]
    RequiresConnection(String),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Local cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for legend operations.
pub type LegendResult<T> = Result<T, LegendError>;
