//! CLI error type.

use std::fmt;

/// Errors surfaced to the terminal user.
#[derive(Debug)]
pub enum CliError {
    /// Reading or validating the manifest failed.
    Manifest(String),
    /// Local package assembly failed.
    Pack(String),
    /// Remote package assembly failed.
    Fetch(String),
    /// Source exploration failed.
    Explore(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Manifest(msg) => write!(f, "manifest error: {}", msg),
            CliError::Pack(msg) => write!(f, "pack failed: {}", msg),
            CliError::Fetch(msg) => write!(f, "fetch failed: {}", msg),
            CliError::Explore(msg) => write!(f, "explore failed: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}
