//! Build a package from local files.

use std::path::{Path, PathBuf};

use spspack::package::{PackageAssembler, RawManifest};

use crate::error::CliError;

/// Arguments for the `pack` command.
#[derive(Debug, clap::Args)]
pub struct PackArgs {
    /// Path to a JSON manifest with "xml", "assets" and "renditions" keys
    pub manifest: PathBuf,

    /// Directory the archive is written into
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

/// Run the `pack` command.
pub fn run(args: PackArgs) -> Result<(), CliError> {
    let json = std::fs::read_to_string(&args.manifest).map_err(|e| {
        CliError::Manifest(format!("cannot read {}: {}", args.manifest.display(), e))
    })?;
    let request = RawManifest::from_json(&json)
        .and_then(|m| m.validate())
        .map_err(|e| CliError::Manifest(e.to_string()))?;

    let assembler = PackageAssembler::new();
    let archive = assembler
        .assemble_from_paths(&request, output_dir(&args.output)?)
        .map_err(|e| CliError::Pack(e.to_string()))?;

    println!("Wrote {}", archive.display());
    Ok(())
}

fn output_dir(path: &Path) -> Result<&Path, CliError> {
    if path.is_dir() {
        Ok(path)
    } else {
        Err(CliError::Pack(format!(
            "output directory does not exist: {}",
            path.display()
        )))
    }
}
