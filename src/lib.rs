// Nyseal — Library root
//
// Secure module bootstrap: key provisioning, authenticated payload
// decryption, module activation, and the ordered sequencer that wires the
// modules into a Bridge.

pub mod activation;
pub mod bootstrap;
pub mod bridge;
pub mod cli;
pub mod codec;
pub mod config;
pub mod enclave;
pub mod error;
pub mod glyph;

pub use bootstrap::{BootstrapSequencer, Manifest};
pub use bridge::Bridge;
pub use config::BootstrapConfig;
pub use error::{NysealError, Result};

/// Validates the configured manifest and runs a full bootstrap from disk.
/// Blocks until every module is active or one of them fails for good.
pub fn run_bootstrap(config: &BootstrapConfig) -> Result<Bridge> {
    let manifest = config.manifest()?;
    manifest.validate()?;

    tracing::info!(
        root = %config.root().display(),
        modules = manifest.modules.len(),
        "Starting bootstrap"
    );

    let provisioner = config.provisioner();
    let bridge = BootstrapSequencer::new(&provisioner, config.artifact_source())?
        .with_codec(config.codec())
        .with_retry(config.retry_policy())
        .run(&manifest)?;
    Ok(bridge)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::activation::ModuleSpec;
    use crate::bootstrap::{BootstrapError, ManifestError};
    use crate::codec::PayloadCodec;
    use crate::enclave::{write_key_artifact, KeyArtifactError, MasterSecret, DEFAULT_DELIMITER};

    fn config(root: &Path) -> BootstrapConfig {
        BootstrapConfig {
            resource_root: Some(root.to_path_buf()),
            retry_delay_ms: 0,
            kdf_iterations: 1,
            manifest: Some(PathBuf::from("manifest.json")),
            ..BootstrapConfig::default()
        }
    }

    fn write_manifest(config: &BootstrapConfig, modules: Vec<ModuleSpec>) {
        let text = Manifest::new(modules).to_json().unwrap();
        std::fs::write(config.root().join("manifest.json"), text).unwrap();
    }

    fn write_module(config: &BootstrapConfig, secret: &MasterSecret, name: &str, source: &str) {
        let payload = PayloadCodec::with_iterations(config.kdf_iterations)
            .seal(source.as_bytes(), secret)
            .unwrap();
        let path = config.artifact_source().path_for(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, payload.to_json().unwrap()).unwrap();
    }

    fn spec_b() -> ModuleSpec {
        ModuleSpec::interpreted("b", &["Trace"])
    }

    fn spec_c() -> ModuleSpec {
        ModuleSpec::interpreted("c", &["Net"]).import("b", "Trace")
    }

    /// Key artifact plus sealed `b` and `c` modules under `root`.
    fn provision(root: &Path) -> BootstrapConfig {
        let config = config(root);
        let secret = MasterSecret::generate();
        write_key_artifact(&config.key_file(), &secret, DEFAULT_DELIMITER, false).unwrap();
        write_module(&config, &secret, "b", "type Trace(glyphs, weight)");
        write_module(&config, &secret, "c", "type Net(links) extends Trace");
        config
    }

    #[test]
    fn test_bootstrap_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = provision(dir.path());
        write_manifest(&config, vec![spec_b(), spec_c()]);

        let bridge = run_bootstrap(&config).unwrap();
        assert_eq!(bridge.modules(), vec!["b", "c"]);
        let net = bridge.get("c", "Net").unwrap();
        assert_eq!(net.as_type().unwrap().fields, vec!["glyphs", "weight", "links"]);
    }

    #[test]
    fn test_misordered_manifest_is_rejected_before_loading() {
        let dir = tempfile::tempdir().unwrap();
        let config = provision(dir.path());
        write_manifest(&config, vec![spec_c(), spec_b()]);

        let err = run_bootstrap(&config).unwrap_err();
        assert!(matches!(
            err,
            NysealError::Manifest(ManifestError::ImportOrder { ref module, ref dependency })
                if module == "c" && dependency == "b"
        ));
    }

    #[test]
    fn test_missing_key_artifact_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        write_manifest(&config, vec![spec_b()]);

        let err = run_bootstrap(&config).unwrap_err();
        assert!(matches!(
            err,
            NysealError::Bootstrap(BootstrapError::Provisioning(KeyArtifactError::NotFound(_)))
        ));
    }
}
