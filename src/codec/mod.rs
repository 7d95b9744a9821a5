// Nyseal — Codec Module
//
// Authenticated decryption of sealed module artifacts: PBKDF2-HMAC-SHA256 key
// derivation per artifact salt, AES-256-GCM with a detached tag, then PKCS7
// unpadding. No plaintext leaves the codec unless the tag verifies.

mod cipher;
mod error;
mod payload;

pub use cipher::{DecryptedSource, PayloadCodec, KDF_ITERATIONS};
pub use error::{DecryptionError, PayloadFormatError, SealError};
pub use payload::EncryptedPayload;
