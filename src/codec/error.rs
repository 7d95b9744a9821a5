// Nyseal — Codec error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecryptionError {
    #[error("Authentication failed: tag does not match (wrong key or tampered artifact)")]
    Authentication,

    #[error("Invalid PKCS7 padding")]
    Padding,

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Decrypted payload is not valid UTF-8")]
    NotUtf8,
}

#[derive(Debug, Error)]
pub enum PayloadFormatError {
    #[error("Artifact is not a valid payload record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Field '{field}' is not valid base64: {source}")]
    Base64 {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },
}

#[derive(Debug, Error)]
pub enum SealError {
    #[error("Cipher error: {0}")]
    Cipher(String),
}
