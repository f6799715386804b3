//! SPSPack CLI - Command-line interface
//!
//! This binary provides a command-line interface to the spspack library.

mod commands;
mod error;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::explore::ExploreArgs;
use commands::fetch::FetchArgs;
use commands::pack::PackArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "spspack", version, about = "Build SPS packages from XML documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a package from local files listed in a JSON manifest
    Pack(PackArgs),
    /// Build a package by downloading a remote XML and its assets
    Fetch(FetchArgs),
    /// List the document bundles found in a folder or zip
    Explore(ExploreArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let result: Result<(), CliError> = match cli.command {
        Command::Pack(args) => commands::pack::run(args),
        Command::Fetch(args) => commands::fetch::run(args).await,
        Command::Explore(args) => commands::explore::run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_code_for(&e)
        }
    }
}

/// Usage and configuration mistakes exit 1; pipeline failures exit 2.
fn exit_code_for(error: &CliError) -> ExitCode {
    match error {
        CliError::Manifest(_) | CliError::Explore(_) => ExitCode::from(1),
        CliError::Pack(_) | CliError::Fetch(_) => ExitCode::from(2),
    }
}
