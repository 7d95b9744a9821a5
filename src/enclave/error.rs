// Nyseal — Enclave error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyArtifactError {
    #[error("Key artifact not found at {0}")]
    NotFound(PathBuf),

    #[error("Failed to access key artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Key artifact is not wrapped in the expected delimiter")]
    Unwrapped,

    #[error("Key artifact contains invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Key artifact decodes to an empty secret")]
    Empty,

    #[error("Key artifact already exists at {0} (use --force to overwrite)")]
    AlreadyExists(PathBuf),
}
