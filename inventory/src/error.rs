//! Error types for the inventory

use thiserror::Error;

/// Inventory error type
#[derive(Error, Debug)]
pub enum InventoryError {
    /// A configuration with the same (url, description) already exists.
    /// Carries the existing row id so callers can reuse it.
    #[error("benchmark with provided URL and description already exists (id {id})")]
    Conflict {
        /// Id of the already-stored configuration
        id: i64,
    },

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value failed to decode (duration text, timestamp, header or
    /// parameter row)
    #[error("stored value could not be decoded: {0}")]
    Decode(String),
}

impl InventoryError {
    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        InventoryError::Decode(msg.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, InventoryError>;
