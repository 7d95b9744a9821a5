// Nyseal — Enclave Module
//
// Provisions the master secret from the protected key artifact. The secret
// lives in zeroizing storage and is overwritten when its owner drops it,
// including on error paths.

mod error;
mod provider;

pub use error::KeyArtifactError;
pub use provider::{
    write_key_artifact, KeyFileProvisioner, KeyProvisioner, MasterSecret, DEFAULT_DELIMITER,
    DEFAULT_KEY_PATH,
};
