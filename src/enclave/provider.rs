// Nyseal — Key Provisioner
//
// Reads the master secret from the local key artifact. The artifact holds
// `<delimiter><base64(secret)><delimiter>`, written by `nyseal keygen` or by
// an older Windows tool that encoded the delimiter as a single cp1252 byte.
//
// The secret is never logged and never Debug-displayed. It is stored in a
// `Zeroizing` buffer so the backing memory is overwritten when dropped.

use std::fmt;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use zeroize::Zeroizing;

use super::KeyArtifactError;

// ─── Constants ───────────────────────────────────────────────────────────────

/// Key artifact location, relative to the resource root.
pub const DEFAULT_KEY_PATH: &str = "models/.cache/.sig..x";

/// Delimiter wrapped around the base64 body of the key artifact.
pub const DEFAULT_DELIMITER: char = '§';

/// Length of a freshly generated master secret (256-bit entropy).
const MASTER_SECRET_LEN: usize = 32;

// ─── Master Secret ───────────────────────────────────────────────────────────

/// Raw master secret bytes. Overwritten in memory on drop.
pub struct MasterSecret(Zeroizing<Vec<u8>>);

impl MasterSecret {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Generate a new random master secret from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let mut secret = Zeroizing::new(vec![0u8; MASTER_SECRET_LEN]);
        rand::rng().fill_bytes(&mut secret);
        Self(secret)
    }

    /// Borrow the raw bytes. Callers must not copy them into long-lived storage.
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterSecret([REDACTED])")
    }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Source of the master secret. Provisioning failures are always fatal.
pub trait KeyProvisioner {
    fn obtain(&self) -> Result<MasterSecret, KeyArtifactError>;
}

// ─── File Implementation ─────────────────────────────────────────────────────

pub struct KeyFileProvisioner {
    path: PathBuf,
    delimiter: char,
}

impl KeyFileProvisioner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: DEFAULT_DELIMITER,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyProvisioner for KeyFileProvisioner {
    fn obtain(&self) -> Result<MasterSecret, KeyArtifactError> {
        let raw = match std::fs::read(&self.path) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KeyArtifactError::NotFound(self.path.clone()));
            }
            Err(source) => {
                return Err(KeyArtifactError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let body = unwrap_artifact(&raw, self.delimiter)?;
        let secret = BASE64.decode(body)?;
        if secret.is_empty() {
            return Err(KeyArtifactError::Empty);
        }

        tracing::debug!(path = %self.path.display(), "Master secret provisioned");
        Ok(MasterSecret::from_bytes(secret))
    }
}

/// Write a wrapped key artifact for `secret`. Parent directories are created.
pub fn write_key_artifact(
    path: &Path,
    secret: &MasterSecret,
    delimiter: char,
    force: bool,
) -> Result<(), KeyArtifactError> {
    let io_err = |source| KeyArtifactError::Io {
        path: path.to_path_buf(),
        source,
    };

    if path.exists() && !force {
        return Err(KeyArtifactError::AlreadyExists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let wrapped = Zeroizing::new(format!(
        "{delimiter}{}{delimiter}",
        BASE64.encode(secret.expose())
    ));
    std::fs::write(path, wrapped.as_bytes()).map_err(io_err)?;

    // Owner-only, same as any other credential file
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms).map_err(io_err)?;
    }

    tracing::info!(path = %path.display(), "Key artifact written");
    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Strip the delimiter wrapper. The delimiter may appear in its UTF-8 form or,
/// for characters in the Latin-1 range, as a single byte.
fn unwrap_artifact(raw: &[u8], delimiter: char) -> Result<&[u8], KeyArtifactError> {
    let trimmed = raw.trim_ascii();

    let mut buf = [0u8; 4];
    let wide = delimiter.encode_utf8(&mut buf).as_bytes();
    let narrow = u8::try_from(u32::from(delimiter))
        .ok()
        .filter(|b| *b >= 0x80)
        .map(|b| [b]);

    let mut forms: Vec<&[u8]> = vec![wide];
    if let Some(ref byte) = narrow {
        forms.push(byte);
    }

    forms
        .into_iter()
        .find_map(|form| strip_wrapper(trimmed, form))
        .map(|inner| inner.trim_ascii())
        .ok_or(KeyArtifactError::Unwrapped)
}

fn strip_wrapper<'a>(raw: &'a [u8], delimiter: &[u8]) -> Option<&'a [u8]> {
    let mut inner = raw.strip_prefix(delimiter)?.strip_suffix(delimiter)?;
    while let Some(rest) = inner.strip_prefix(delimiter) {
        inner = rest;
    }
    while let Some(rest) = inner.strip_suffix(delimiter) {
        inner = rest;
    }
    Some(inner)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
