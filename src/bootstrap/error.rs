// Nyseal — Bootstrap error types

use std::path::PathBuf;

use thiserror::Error;

use crate::activation::ActivationError;
use crate::codec::{DecryptionError, PayloadFormatError};
use crate::enclave::KeyArtifactError;

/// A single failed load-and-activate attempt. Always retryable by default.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed artifact: {0}")]
    Format(#[from] PayloadFormatError),

    #[error("Decryption failed: {0}")]
    Decrypt(#[from] DecryptionError),

    #[error("Activation failed: {0}")]
    Activate(#[from] ActivationError),
}

impl LoadError {
    /// True when the artifact itself is tampered or keyed wrongly, so no
    /// further attempt can succeed.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            LoadError::Decrypt(DecryptionError::Authentication | DecryptionError::Padding)
        )
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Key provisioning failed: {0}")]
    Provisioning(#[from] KeyArtifactError),

    #[error("Could not load module '{module}' after {attempts} attempts: {last}")]
    Exhausted {
        module: String,
        attempts: u32,
        #[source]
        last: LoadError,
    },

    #[error("Module '{module}' failed its integrity check: {source}")]
    Integrity {
        module: String,
        #[source]
        source: LoadError,
    },
}

impl BootstrapError {
    /// Name of the module that aborted the sequence, if any.
    pub fn module(&self) -> Option<&str> {
        match self {
            BootstrapError::Provisioning(_) => None,
            BootstrapError::Exhausted { module, .. } | BootstrapError::Integrity { module, .. } => {
                Some(module)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Cannot read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Module '{0}' is listed more than once")]
    DuplicateModule(String),

    #[error("Module '{0}' requests no exports")]
    EmptyExports(String),

    #[error("Module '{module}' imports from '{dependency}', which is not in the manifest")]
    UnknownDependency { module: String, dependency: String },

    #[error("Module '{module}' imports from '{dependency}', which is ordered after it")]
    ImportOrder { module: String, dependency: String },

    #[error("Module '{module}' imports '{symbol}' from '{dependency}', which does not export it")]
    UnexportedSymbol {
        module: String,
        dependency: String,
        symbol: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_classification() {
        assert!(LoadError::Decrypt(DecryptionError::Authentication).is_integrity_failure());
        assert!(LoadError::Decrypt(DecryptionError::Padding).is_integrity_failure());
        assert!(!LoadError::Decrypt(DecryptionError::NotUtf8).is_integrity_failure());
        let io = LoadError::Io {
            path: PathBuf::from("encrypted/a_v1.nyrethenc"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(!io.is_integrity_failure());
    }

    #[test]
    fn test_exhausted_names_module() {
        let err = BootstrapError::Exhausted {
            module: "symbolic_network".into(),
            attempts: 5,
            last: LoadError::Decrypt(DecryptionError::Authentication),
        };
        assert_eq!(err.module(), Some("symbolic_network"));
        assert!(err.to_string().contains("symbolic_network"));
        assert!(err.to_string().contains("5 attempts"));
    }
}
