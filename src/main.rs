//! Binary entry point for shopwatch.
//!
//! This binary provides the CLI interface for the shop record extractor.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr/print_stdout in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow unnecessary_wraps for consistent command function signatures
#![allow(clippy::unnecessary_wraps)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use shopwatch::config::ShopwatchConfig;
use shopwatch::observability::{self, InitOptions};

use commands::{cmd_extract, cmd_watch};

/// Shopwatch - incremental extractor for captured shop listings.
#[derive(Parser)]
#[command(name = "shopwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "SHOPWATCH_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run a one-shot extraction over a capture file.
    Extract {
        /// Capture file to extract from.
        input: PathBuf,

        /// Output CSV path.
        output: PathBuf,

        /// Preserve existing output rows and add only new records.
        #[arg(long)]
        append: bool,
    },

    /// Watch a capture file and extract on every change.
    Watch {
        /// Capture file to watch.
        input: PathBuf,

        /// Output CSV path (always appended to).
        output: PathBuf,

        /// Persist the scan cursor here so a restarted watcher resumes.
        #[arg(long)]
        state_file: Option<PathBuf>,

        /// Debounce window in milliseconds.
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init(InitOptions {
        verbose: cli.verbose,
    }) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Extract {
            input,
            output,
            append,
        } => cmd_extract(&input, &output, append),

        Commands::Watch {
            input,
            output,
            state_file,
            debounce_ms,
        } => cmd_watch(&config, &input, &output, state_file, debounce_ms).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration from an explicit path or the default locations.
fn load_config(path: Option<&str>) -> shopwatch::Result<ShopwatchConfig> {
    path.map_or_else(
        || Ok(ShopwatchConfig::load_default()),
        |p| ShopwatchConfig::load_from_file(std::path::Path::new(p)),
    )
}
