//! castellan CLI - directory authentication diagnostics
//!
//! Checks directory connectivity the same way the authentication engine
//! does: resolve the bind identity, bind, search for the user's entry,
//! and list the remote groups that would be reconciled.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod check;
mod config;
mod error;

/// castellan - directory authentication diagnostics
#[derive(Parser)]
#[command(name = "castellan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the castellan configuration file
    #[arg(short, long, global = true, default_value = "castellan.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check directory connectivity, bind, and search
    Check(check::CheckArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check(args) => check::run(&cli.config, args).await,
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
