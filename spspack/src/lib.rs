//! SPSPack - SciELO Publishing Schema package assembly
//!
//! This library builds SPS packages: flat zip archives holding one XML
//! document, its digital assets under canonical names, and its PDF
//! renditions. Documents can come from local files or be fetched from
//! remote URIs with a bounded concurrent downloader.

pub mod discovery;
pub mod download;
pub mod identity;
pub mod inventory;
pub mod issue;
pub mod package;
pub mod xml;

pub use discovery::{explore, DocumentBundle, ExploreError};
pub use download::{DownloadError, DownloadItem, DownloadOutcome, Downloader, Fetcher};
pub use identity::{DocumentIdentity, IdentityError, SetOutcome};
pub use inventory::{Asset, AssetInventory, AssetType};
pub use issue::{parse_issue, IssueDescriptor};
pub use package::{PackageAssembler, PackageError, PackageRequest, RawManifest, RemoteRendition};
pub use xml::{XmlError, XmlTree};
