//! Vitalsync CLI
//!
//! Command-line tools for driving and inspecting the sync engine.
//!
//! # Commands
//!
//! - `sync` - Run one incremental sync against a remote endpoint
//! - `refresh` - Reset the watermark and resync as a compensable workflow
//! - `status` - Show watermark, totals, and recent history
//! - `reset` - Clear the watermark and metadata

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Vitalsync command-line tools.
#[derive(Parser)]
#[command(name = "vitalsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the local state file (watermark and metadata)
    #[arg(global = true, long, default_value = "vitalsync-state.json")]
    state: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one incremental sync against a remote endpoint
    Sync {
        /// Base URL of the records API
        #[arg(short, long)]
        server: String,

        /// Entity types to fetch, comma-separated (default: all)
        #[arg(short, long)]
        types: Option<String>,

        /// Page size for the paginated fetch
        #[arg(short, long, default_value = "100")]
        batch_size: u32,

        /// File synced records are stored in
        #[arg(short, long, default_value = "vitalsync-records.json")]
        output: PathBuf,
    },

    /// Reset the watermark and resync, with rollback on failure
    Refresh {
        /// Base URL of the records API
        #[arg(short, long)]
        server: String,

        /// Page size for the paginated fetch
        #[arg(short, long, default_value = "100")]
        batch_size: u32,

        /// File synced records are stored in
        #[arg(short, long, default_value = "vitalsync-records.json")]
        output: PathBuf,
    },

    /// Show watermark, totals, and recent history
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Clear the watermark and metadata
    Reset,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Sync {
            server,
            types,
            batch_size,
            output,
        } => {
            commands::sync::run(&cli.state, &server, types.as_deref(), batch_size, &output).await?;
        }
        Commands::Refresh {
            server,
            batch_size,
            output,
        } => {
            commands::refresh::run(&cli.state, &server, batch_size, &output).await?;
        }
        Commands::Status { format } => {
            commands::status::run(&cli.state, &format)?;
        }
        Commands::Reset => {
            commands::reset::run(&cli.state)?;
        }
    }

    Ok(())
}
