// Nyseal — CLI Command Handlers
//
// Each function handles one CLI subcommand. Commands that need the wired
// modules run the blocking bootstrap on tokio's blocking pool first.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use zeroize::Zeroizing;

use crate::activation::ModuleKind;
use crate::bootstrap::artifact_path;
use crate::bridge::{Bridge, TraceWatcher};
use crate::config::BootstrapConfig;
use crate::enclave::{write_key_artifact, KeyProvisioner, MasterSecret};
use crate::error::NysealError;

use super::{Cli, Commands};

/// Execute the parsed CLI command.
pub async fn execute(cli: Cli) -> Result<(), NysealError> {
    let config = BootstrapConfig::load(cli.config.as_deref(), cli.root.as_deref())?;

    match cli.command {
        Commands::Keygen { out, force } => cmd_keygen(&config, out, force),
        Commands::Seal {
            name,
            input,
            out_dir,
        } => cmd_seal(&config, &name, input, out_dir),
        Commands::Check => cmd_check(&config),
        Commands::Bootstrap => cmd_bootstrap(config).await,
        Commands::Get { module, symbol } => cmd_get(config, &module, &symbol).await,
        Commands::Query { text } => cmd_query(config, &text).await,
        Commands::Watch { dir, interval_ms } => cmd_watch(config, dir, interval_ms).await,
    }
}

/// Run the bootstrap without blocking the async runtime.
async fn boot(config: BootstrapConfig) -> Result<Bridge, NysealError> {
    tokio::task::spawn_blocking(move || crate::run_bootstrap(&config))
        .await
        .map_err(|e| NysealError::Other(format!("Bootstrap task failed: {}", e)))?
}

// ─── Key & Artifacts ─────────────────────────────────────────────────────────

fn cmd_keygen(config: &BootstrapConfig, out: Option<PathBuf>, force: bool) -> Result<(), NysealError> {
    let path = out.map(|p| config.resolve(&p)).unwrap_or_else(|| config.key_file());
    let secret = MasterSecret::generate();
    write_key_artifact(&path, &secret, config.key_delimiter, force)?;
    println!("✓ Key artifact written to {}", path.display());
    Ok(())
}

fn cmd_seal(
    config: &BootstrapConfig,
    name: &str,
    input: PathBuf,
    out_dir: Option<PathBuf>,
) -> Result<(), NysealError> {
    let secret = config.provisioner().obtain()?;
    let plaintext = Zeroizing::new(std::fs::read(&input)?);
    let payload = config.codec().seal(&plaintext, &secret)?;

    let dir = out_dir
        .map(|d| config.resolve(&d))
        .unwrap_or_else(|| config.encrypted_root());
    std::fs::create_dir_all(&dir)?;
    let path = artifact_path(&dir, name, config.extension.trim_start_matches('.'));
    std::fs::write(&path, payload.to_json()?)?;

    tracing::info!(module = name, fingerprint = %payload.fingerprint(), "Module sealed");
    println!("✓ Sealed {} → {}", name, path.display());
    Ok(())
}

// ─── Check ───────────────────────────────────────────────────────────────────

fn cmd_check(config: &BootstrapConfig) -> Result<(), NysealError> {
    let manifest = config.manifest()?;
    let source = config.artifact_source();
    let key_file = config.key_file();

    println!("Resource root: {}", config.root().display());
    println!(
        "Key artifact:  {} {}",
        key_file.display(),
        if key_file.exists() { "✓" } else { "✗ missing" }
    );
    println!("{:-<80}", "");
    println!("{:<28} {:<12} {:<8} EXPORTS", "MODULE", "KIND", "FILE");
    println!("{:-<80}", "");

    let mut missing = 0;
    for module in &manifest.modules {
        let kind = match module.kind {
            ModuleKind::Interpreted => "interpreted",
            ModuleKind::DataOnly => "data",
        };
        let present = source.path_for(&module.name).exists();
        if !present {
            missing += 1;
        }
        println!(
            "{:<28} {:<12} {:<8} {}",
            module.name,
            kind,
            if present { "✓" } else { "✗" },
            module.exports.join(", ")
        );
    }
    println!("{:-<80}", "");

    let problems = manifest.problems();
    for problem in &problems {
        println!("✗ {}", problem);
    }

    if !problems.is_empty() {
        return Err(NysealError::Other(format!(
            "Manifest has {} problem(s)",
            problems.len()
        )));
    }
    if missing > 0 {
        println!("Manifest is valid; {} artifact(s) missing", missing);
    } else {
        println!("✓ Manifest is valid ({} modules)", manifest.modules.len());
    }
    Ok(())
}

// ─── Bootstrap & Lookup ──────────────────────────────────────────────────────

async fn cmd_bootstrap(config: BootstrapConfig) -> Result<(), NysealError> {
    let bridge = boot(config).await?;

    println!("{:<28} EXPORTS", "MODULE");
    println!("{:-<80}", "");
    for module in bridge.modules() {
        let exports = bridge
            .exports(module)
            .map(|e| e.keys().cloned().collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        println!("{:<28} {}", module, exports);
    }
    println!("{:-<80}", "");
    println!(
        "✓ {} modules active, {} glyphs loaded",
        bridge.modules().len(),
        bridge.glyph_library().len()
    );
    Ok(())
}

async fn cmd_get(config: BootstrapConfig, module: &str, symbol: &str) -> Result<(), NysealError> {
    let bridge = boot(config).await?;
    match bridge.get(module, symbol) {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(value.as_ref())?);
            Ok(())
        }
        None => Err(NysealError::Other(format!(
            "Symbol '{}' not found in module '{}'",
            symbol, module
        ))),
    }
}

async fn cmd_query(config: BootstrapConfig, text: &str) -> Result<(), NysealError> {
    let bridge = boot(config).await?;
    let outcome = bridge.process_query(text);
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

// ─── Watch ───────────────────────────────────────────────────────────────────

async fn cmd_watch(config: BootstrapConfig, dir: PathBuf, interval_ms: u64) -> Result<(), NysealError> {
    let dir = config.resolve(&dir);
    let bridge = Arc::new(boot(config).await?);

    println!("Watching {} (Ctrl-C to stop)", dir.display());
    TraceWatcher::new(dir, bridge)
        .with_interval(Duration::from_millis(interval_ms.max(1)))
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Cannot listen for Ctrl-C: {}", e);
            }
        })
        .await?;
    Ok(())
}
