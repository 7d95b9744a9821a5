// Nyseal — Bootstrap
//
// Turns encrypted module artifacts into a wired, read-only aggregate.

mod error;
mod manifest;
mod registry;
mod retry;
mod sequencer;
mod source;

pub use error::{BootstrapError, LoadError, ManifestError};
pub use manifest::Manifest;
pub use registry::{FrozenRegistry, ModuleRegistry};
pub use retry::{ModuleState, RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
pub use sequencer::BootstrapSequencer;
pub use source::{artifact_path, ArtifactSource, FsArtifactSource, DEFAULT_EXTENSION};

#[cfg(test)]
pub use source::mock;
