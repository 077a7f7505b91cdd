//! Error types for katyusha-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (malformed header, missing stop condition, ...)
    #[error("configuration error: {0}")]
    Config(String),

    /// TLS material error (unreadable CA, malformed PEM, bad key pair)
    #[error("TLS material error: {0}")]
    Tls(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a TLS material error
    pub fn tls(msg: impl Into<String>) -> Self {
        Error::Tls(msg.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
