//! Error types for TARS

use thiserror::Error;

/// Result type alias for TARS operations
pub type Result<T> = std::result::Result<T, TarsError>;

/// Main error type for shared TARS utilities
#[derive(Error, Debug)]
pub enum TarsError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid daily sequence number: {0:?}")]
    InvalidDailySequence(String),
}
