// Nyseal — Application Entry Point
//
// Parses CLI arguments, initializes structured logging, and dispatches to
// the command handler. Secret material never reaches a log line at any level.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nyseal::cli::{execute, Cli};

#[tokio::main]
async fn main() {
    // RUST_LOG=nyseal=debug for per-attempt detail.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nyseal=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = execute(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
