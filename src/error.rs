// Nyseal — Top-level error types
//
// Aggregates the subsystem errors into a single enum for the application
// boundary.

use thiserror::Error;

/// Top-level error type for all Nyseal operations.
#[derive(Debug, Error)]
pub enum NysealError {
    #[error("Key error: {0}")]
    Key(#[from] crate::enclave::KeyArtifactError),

    #[error("Payload error: {0}")]
    Payload(#[from] crate::codec::PayloadFormatError),

    #[error("Seal error: {0}")]
    Seal(#[from] crate::codec::SealError),

    #[error("{0}")]
    Bootstrap(#[from] crate::bootstrap::BootstrapError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] crate::bootstrap::ManifestError),

    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, NysealError>;
