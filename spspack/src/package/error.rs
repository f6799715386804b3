//! Error types for package assembly.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::download::DownloadError;
use crate::identity::IdentityError;
use crate::xml::XmlError;

/// Result type for package operations.
pub type PackageResult<T> = Result<T, PackageError>;

/// Errors that can occur while assembling an SPS package.
#[derive(Debug)]
pub enum PackageError {
    /// A required manifest key is absent. Distinct from a missing file.
    MissingKey(&'static str),

    /// The manifest is present but not usable.
    Manifest(String),

    /// A referenced local file cannot be read.
    File { path: PathBuf, source: io::Error },

    /// An absolute http(s) URI was required and not supplied.
    InvalidUri(String),

    /// A remote resource could not be fetched.
    Fetch(DownloadError),

    /// The fetched or read document carries no content.
    EmptyContent(String),

    /// The document is not well-formed XML.
    MalformedXml { origin: String, source: XmlError },

    /// The document parses but its identity cannot be resolved.
    Identity(IdentityError),

    /// A required asset referenced by the XML is not among the
    /// supplied or fetched files.
    MissingAsset(String),

    /// Writing the output archive failed.
    Archive {
        path: PathBuf,
        source: zip::result::ZipError,
    },
}

impl fmt::Display for PackageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageError::MissingKey(key) => {
                write!(f, "manifest is missing required key \"{}\"", key)
            }
            PackageError::Manifest(msg) => {
                write!(f, "invalid manifest: {}", msg)
            }
            PackageError::File { path, source } => {
                write!(f, "file error for {}: {}", path.display(), source)
            }
            PackageError::InvalidUri(uri) => {
                if uri.is_empty() {
                    write!(f, "an absolute http(s) URI is required, got an empty string")
                } else {
                    write!(f, "an absolute http(s) URI is required, got \"{}\"", uri)
                }
            }
            PackageError::Fetch(e) => {
                write!(f, "fetch failed: {}", e)
            }
            PackageError::EmptyContent(origin) => {
                write!(f, "document at {} carries no content", origin)
            }
            PackageError::MalformedXml { origin, source } => {
                write!(f, "document at {} is not valid XML: {}", origin, source)
            }
            PackageError::Identity(e) => {
                write!(f, "cannot resolve document identity: {}", e)
            }
            PackageError::MissingAsset(name) => {
                write!(f, "required asset is not available: {}", name)
            }
            PackageError::Archive { path, source } => {
                write!(f, "failed to write archive {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for PackageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PackageError::File { source, .. } => Some(source),
            PackageError::Fetch(e) => Some(e),
            PackageError::MalformedXml { source, .. } => Some(source),
            PackageError::Identity(e) => Some(e),
            PackageError::Archive { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<IdentityError> for PackageError {
    fn from(e: IdentityError) -> Self {
        PackageError::Identity(e)
    }
}

impl From<DownloadError> for PackageError {
    fn from(e: DownloadError) -> Self {
        PackageError::Fetch(e)
    }
}
