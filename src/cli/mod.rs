// Nyseal — CLI Module
//
// Command-line interface using clap derive macros.
// Subcommands: keygen, seal, check, bootstrap, get, query, watch.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::execute;

/// Nyseal — secure bootstrap for encrypted Nyreth modules.
#[derive(Parser, Debug)]
#[command(name = "nyseal")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Resource root (overrides $NYSEAL_RESOURCE_ROOT).
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a new master secret and write the key artifact.
    Keygen {
        /// Where to write the artifact (defaults to the configured key path).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Overwrite an existing artifact.
        #[arg(long, default_value = "false")]
        force: bool,
    },

    /// Encrypt a plaintext module into `<name>_v1.<ext>`.
    Seal {
        /// Module name.
        #[arg(long)]
        name: String,

        /// Plaintext source file.
        #[arg(long)]
        input: PathBuf,

        /// Output directory (defaults to the configured encrypted directory).
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Validate the manifest and report missing artifacts.
    Check,

    /// Run the full bootstrap and list active modules.
    Bootstrap,

    /// Bootstrap, then print one exported symbol as JSON.
    Get {
        /// Module name.
        module: String,

        /// Exported symbol name.
        symbol: String,
    },

    /// Bootstrap, then route a free-text query.
    Query {
        /// The query text.
        text: String,
    },

    /// Bootstrap, then watch a directory for trace files until interrupted.
    Watch {
        /// Trace directory, relative to the resource root.
        #[arg(long, default_value = "traces")]
        dir: PathBuf,

        /// Poll interval in milliseconds.
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["nyseal", "get", "symbolic_memory", "SymbolicMemory", "--root", "/opt/n"])
            .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/opt/n")));
        match cli.command {
            Commands::Get { module, symbol } => {
                assert_eq!(module, "symbolic_memory");
                assert_eq!(symbol, "SymbolicMemory");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_watch_defaults() {
        let cli = Cli::try_parse_from(["nyseal", "watch"]).unwrap();
        match cli.command {
            Commands::Watch { dir, interval_ms } => {
                assert_eq!(dir, PathBuf::from("traces"));
                assert_eq!(interval_ms, 1000);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_seal_requires_name_and_input() {
        assert!(Cli::try_parse_from(["nyseal", "seal", "--name", "x"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
