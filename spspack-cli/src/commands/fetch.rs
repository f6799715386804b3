//! Build a package from a remote document.

use std::path::PathBuf;

use spspack::package::{PackageAssembler, RemoteRendition};

use crate::error::CliError;

/// Arguments for the `fetch` command.
#[derive(Debug, clap::Args)]
pub struct FetchArgs {
    /// Absolute http(s) URI of the XML document
    pub xml_uri: String,

    /// Rendition as URI=NAME, repeatable (NAME carries the language suffix)
    #[arg(short, long = "rendition", value_name = "URI=NAME")]
    pub renditions: Vec<String>,

    /// Directory the archive is written into
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

/// Run the `fetch` command.
pub async fn run(args: FetchArgs) -> Result<(), CliError> {
    let renditions = parse_renditions(&args.renditions)?;
    if !args.output.is_dir() {
        return Err(CliError::Fetch(format!(
            "output directory does not exist: {}",
            args.output.display()
        )));
    }

    let assembler = PackageAssembler::new();
    let archive = assembler
        .assemble_from_uri(&args.xml_uri, &renditions, &args.output)
        .await
        .map_err(|e| CliError::Fetch(e.to_string()))?;

    println!("Wrote {}", archive.display());
    Ok(())
}

fn parse_renditions(raw: &[String]) -> Result<Vec<RemoteRendition>, CliError> {
    raw.iter()
        .map(|pair| {
            let (uri, name) = pair.split_once('=').ok_or_else(|| {
                CliError::Fetch(format!("rendition must be URI=NAME, got \"{}\"", pair))
            })?;
            Ok(RemoteRendition {
                uri: uri.to_string(),
                name: name.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_renditions_splits_on_first_equals() {
        let parsed =
            parse_renditions(&["https://x/doc.pdf=doc-en.pdf".to_string()]).unwrap();
        assert_eq!(parsed[0].uri, "https://x/doc.pdf");
        assert_eq!(parsed[0].name, "doc-en.pdf");
    }

    #[test]
    fn test_parse_renditions_rejects_bare_uri() {
        assert!(parse_renditions(&["https://x/doc.pdf".to_string()]).is_err());
    }
}
