// Nyseal — Artifact sources
//
// Where encrypted module artifacts come from. The filesystem source follows
// the `<root>/<name>_v1.<ext>` naming convention.

use std::path::{Path, PathBuf};

use crate::codec::EncryptedPayload;

use super::LoadError;

pub const DEFAULT_EXTENSION: &str = "nyrethenc";

pub trait ArtifactSource {
    /// Reads and parses the artifact for `module`. Called once per attempt.
    fn read(&self, module: &str) -> Result<EncryptedPayload, LoadError>;
}

#[derive(Debug, Clone)]
pub struct FsArtifactSource {
    root: PathBuf,
    extension: String,
}

impl FsArtifactSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, module: &str) -> PathBuf {
        artifact_path(&self.root, module, &self.extension)
    }
}

/// `<dir>/<module>_v1.<extension>`
pub fn artifact_path(dir: &Path, module: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}_v1.{}", module, extension))
}

impl ArtifactSource for FsArtifactSource {
    fn read(&self, module: &str) -> Result<EncryptedPayload, LoadError> {
        let path = self.path_for(module);
        tracing::debug!(module, path = %path.display(), "Reading artifact");
        let text = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(EncryptedPayload::from_json(&text)?)
    }
}

// ─── Mock ────────────────────────────────────────────────────────────────────
