//! Binary entry point for storeport.
//!
//! This binary provides the CLI interface for importing, previewing, and
//! exporting catalog data against a SQLite database.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use commands::{cmd_export, cmd_import, cmd_preview};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use storeport::EngineConfig;
use storeport::EntityType;
use storeport::observability::{self, LoggingConfig};

/// Storeport - bulk catalog import/export for multi-tenant storefronts.
#[derive(Parser)]
#[command(name = "storeport")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "STOREPORT_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Path to the SQLite catalog database.
    #[arg(long, global = true, env = "STOREPORT_DB", default_value = "storeport.db")]
    db: PathBuf,

    /// Store identifier all rows are scoped to.
    #[arg(short, long, global = true, env = "STOREPORT_STORE", default_value = "")]
    store: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Import rows from a file.
    Import {
        /// Input file (.csv or .json).
        file: PathBuf,

        /// Entity type: products or customers.
        #[arg(short, long)]
        entity: EntityType,

        /// Input format: csv or json (default: from file extension).
        #[arg(short, long)]
        format: Option<String>,

        /// Write a Row/Field/Error report here when rows fail.
        #[arg(long)]
        errors_out: Option<PathBuf>,
    },

    /// Validate a file without writing anything.
    Preview {
        /// Input file (.csv or .json).
        file: PathBuf,

        /// Entity type: products or customers.
        #[arg(short, long)]
        entity: EntityType,

        /// Input format: csv or json (default: from file extension).
        #[arg(short, long)]
        format: Option<String>,

        /// Print the full preview as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Export rows for a store.
    Export {
        /// Entity type: products, customers, or orders.
        #[arg(short, long)]
        entity: EntityType,

        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: csv or json.
        #[arg(short, long)]
        format: Option<String>,

        /// Earliest creation date (orders only).
        #[arg(long)]
        from: Option<String>,

        /// Latest creation date (orders only).
        #[arg(long)]
        to: Option<String>,
    },
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = observability::init(LoggingConfig::from_env(cli.verbose)) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(cli: Cli, config: EngineConfig) -> storeport::Result<()> {
    match cli.command {
        Commands::Import {
            file,
            entity,
            format,
            errors_out,
        } => cmd_import(config, &cli.db, &cli.store, entity, file, format, errors_out).await,

        Commands::Preview {
            file,
            entity,
            format,
            json,
        } => cmd_preview(config, &cli.db, &cli.store, entity, file, format, json).await,

        Commands::Export {
            entity,
            output,
            format,
            from,
            to,
        } => cmd_export(&cli.db, &cli.store, entity, output, format, from, to),
    }
}

/// Loads configuration, then applies environment overrides.
fn load_config(path: Option<&Path>) -> storeport::Result<EngineConfig> {
    let config = match path {
        Some(config_path) => EngineConfig::load_from_file(config_path)?,
        None => EngineConfig::load_default(),
    };
    Ok(config.with_env_overrides())
}
