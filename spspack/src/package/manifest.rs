//! Input manifests for package assembly.
//!
//! The paths form arrives as JSON with three required keys; missing keys
//! and missing files are distinct error conditions, surfaced before any
//! other work happens.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::error::{PackageError, PackageResult};

/// Raw, unvalidated paths-form manifest as supplied by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct RawManifest {
    pub xml: Option<PathBuf>,
    pub assets: Option<Vec<PathBuf>>,
    pub renditions: Option<Vec<PathBuf>>,
}

impl RawManifest {
    /// Parse a JSON manifest document.
    pub fn from_json(json: &str) -> PackageResult<Self> {
        serde_json::from_str(json).map_err(|e| PackageError::Manifest(e.to_string()))
    }

    /// Validate into a typed request: all keys present, all paths readable.
    pub fn validate(self) -> PackageResult<PackageRequest> {
        let xml = self.xml.ok_or(PackageError::MissingKey("xml"))?;
        let assets = self.assets.ok_or(PackageError::MissingKey("assets"))?;
        let renditions = self.renditions.ok_or(PackageError::MissingKey("renditions"))?;

        check_readable(&xml)?;
        for path in assets.iter().chain(renditions.iter()) {
            check_readable(path)?;
        }

        Ok(PackageRequest {
            xml,
            assets,
            renditions,
        })
    }
}

/// A validated paths-form request.
#[derive(Debug, Clone)]
pub struct PackageRequest {
    pub xml: PathBuf,
    pub assets: Vec<PathBuf>,
    pub renditions: Vec<PathBuf>,
}

/// One remote rendition of the URI-form request.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRendition {
    /// Absolute http(s) URI of the rendition.
    pub uri: String,
    /// Filename the rendition is known by (carries the language suffix).
    pub name: String,
}

fn check_readable(path: &Path) -> PackageResult<()> {
    let metadata = std::fs::metadata(path).map_err(|e| PackageError::File {
        path: path.to_path_buf(),
        source: e,
    })?;
    if !metadata.is_file() {
        return Err(PackageError::File {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_distinct_from_missing_file() {
        let manifest = RawManifest::from_json(r#"{"xml": "/nonexistent/doc.xml"}"#).unwrap();
        assert!(matches!(
            manifest.validate(),
            Err(PackageError::MissingKey("assets"))
        ));

        let dir = tempfile::tempdir().unwrap();
        let xml = dir.path().join("doc.xml");
        std::fs::write(&xml, "<article/>").unwrap();
        let manifest = RawManifest {
            xml: Some(xml),
            assets: Some(vec![dir.path().join("missing.jpg")]),
            renditions: Some(vec![]),
        };
        assert!(matches!(manifest.validate(), Err(PackageError::File { .. })));
    }

    #[test]
    fn test_valid_manifest_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["doc.xml", "a.jpg", "doc.pdf"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        let json = format!(
            r#"{{"xml": "{0}/doc.xml", "assets": ["{0}/a.jpg"], "renditions": ["{0}/doc.pdf"]}}"#,
            dir.path().display()
        );
        let request = RawManifest::from_json(&json).unwrap().validate().unwrap();
        assert_eq!(request.assets.len(), 1);
        assert_eq!(request.renditions.len(), 1);
    }

    #[test]
    fn test_malformed_json_is_a_manifest_error() {
        assert!(matches!(
            RawManifest::from_json("{not json"),
            Err(PackageError::Manifest(_))
        ));
    }
}
