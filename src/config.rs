// Nyseal — Configuration
//
// BootstrapConfig is read from an optional JSON file; every field has a
// default. The resource root is chosen as: explicit override (CLI `--root`),
// then $NYSEAL_RESOURCE_ROOT, then the file's `resource_root`, then the
// working directory. Relative paths resolve against that root.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::bootstrap::{FsArtifactSource, Manifest, ManifestError, RetryPolicy, DEFAULT_EXTENSION};
use crate::codec::{PayloadCodec, KDF_ITERATIONS};
use crate::enclave::{KeyFileProvisioner, DEFAULT_DELIMITER, DEFAULT_KEY_PATH};

pub const RESOURCE_ROOT_ENV: &str = "NYSEAL_RESOURCE_ROOT";
pub const DEFAULT_ENCRYPTED_DIR: &str = "encrypted";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootstrapConfig {
    pub resource_root: Option<PathBuf>,
    pub key_path: PathBuf,
    pub key_delimiter: char,
    pub encrypted_dir: PathBuf,
    pub extension: String,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub fail_fast_on_integrity: bool,
    pub kdf_iterations: u32,
    pub manifest: Option<PathBuf>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            resource_root: None,
            key_path: PathBuf::from(DEFAULT_KEY_PATH),
            key_delimiter: DEFAULT_DELIMITER,
            encrypted_dir: PathBuf::from(DEFAULT_ENCRYPTED_DIR),
            extension: DEFAULT_EXTENSION.to_string(),
            max_attempts: 5,
            retry_delay_ms: 500,
            fail_fast_on_integrity: false,
            kdf_iterations: KDF_ITERATIONS,
            manifest: None,
        }
    }
}

impl BootstrapConfig {
    /// Loads `path` if given (defaults otherwise) and settles the resource
    /// root, `root_override` taking precedence over the environment.
    pub fn load(path: Option<&Path>, root_override: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let root = resolve_root(
            root_override,
            std::env::var_os(RESOURCE_ROOT_ENV),
            config.resource_root.as_deref(),
        )?;
        config.resource_root = Some(root);
        config.validate()?;
        tracing::debug!(root = %config.root().display(), "Configuration loaded");
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".into()));
        }
        if self.kdf_iterations == 0 {
            return Err(ConfigError::Invalid("kdf_iterations must be at least 1".into()));
        }
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::Invalid("extension must not be empty".into()));
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        self.resource_root.as_deref().unwrap_or_else(|| Path::new("."))
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root().join(path)
        }
    }

    pub fn key_file(&self) -> PathBuf {
        self.resolve(&self.key_path)
    }

    pub fn encrypted_root(&self) -> PathBuf {
        self.resolve(&self.encrypted_dir)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.retry_delay_ms))
            .fail_fast_on_integrity(self.fail_fast_on_integrity)
    }

    pub fn codec(&self) -> PayloadCodec {
        PayloadCodec::with_iterations(self.kdf_iterations)
    }

    pub fn provisioner(&self) -> KeyFileProvisioner {
        KeyFileProvisioner::new(self.key_file()).with_delimiter(self.key_delimiter)
    }

    pub fn artifact_source(&self) -> FsArtifactSource {
        FsArtifactSource::new(self.encrypted_root()).with_extension(&self.extension)
    }

    /// The configured manifest file, or the built-in module list.
    pub fn manifest(&self) -> Result<Manifest, ManifestError> {
        match &self.manifest {
            Some(path) => Manifest::load(&self.resolve(path)),
            None => Ok(Manifest::nyreth()),
        }
    }
}

fn resolve_root(
    root_override: Option<&Path>,
    env_root: Option<OsString>,
    configured: Option<&Path>,
) -> Result<PathBuf, ConfigError> {
    if let Some(root) = root_override {
        return Ok(root.to_path_buf());
    }
    if let Some(root) = env_root.filter(|r| !r.is_empty()) {
        return Ok(PathBuf::from(root));
    }
    if let Some(root) = configured {
        return Ok(root.to_path_buf());
    }
    std::env::current_dir().map_err(|source| ConfigError::Io {
        path: PathBuf::from("."),
        source,
    })
}
