//! List the document bundles found in a source folder or zip.

use std::path::PathBuf;

use spspack::discovery::explore;

use crate::error::CliError;

/// Arguments for the `explore` command.
#[derive(Debug, clap::Args)]
pub struct ExploreArgs {
    /// Folder or zip file holding XML documents and companion files
    pub source: PathBuf,
}

/// Run the `explore` command.
pub fn run(args: ExploreArgs) -> Result<(), CliError> {
    let bundles = explore(&args.source).map_err(|e| CliError::Explore(e.to_string()))?;

    if bundles.is_empty() {
        println!("No XML documents found in {}", args.source.display());
        return Ok(());
    }

    for (key, bundle) in &bundles {
        println!("{}", key);
        println!("  xml: {}", bundle.xml);
        for asset in &bundle.assets {
            println!("  asset: {}", asset);
        }
        for (lang, rendition) in &bundle.renditions {
            println!("  rendition [{}]: {}", lang, rendition);
        }
    }
    Ok(())
}
