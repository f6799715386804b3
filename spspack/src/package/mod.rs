//! SPS package assembly.
//!
//! This module turns one XML document plus its companion files into a
//! single flat zip archive named after the document's bibliographic
//! identity.
//!
//! # Overview
//!
//! The assembly workflow:
//! 1. Validate the request (manifest keys, file paths or URIs)
//! 2. Parse the XML and resolve the document identity
//! 3. Compute canonical names for every referenced asset
//! 4. Materialize the files (read local paths or download remote URIs)
//! 5. Pre-flight the asset set and write the archive
//!
//! # Example
//!
//! ```ignore
//! use spspack::package::{PackageAssembler, RawManifest};
//!
//! let request = RawManifest::from_json(&manifest_json)?.validate()?;
//! let assembler = PackageAssembler::new();
//! let archive = assembler.assemble_from_paths(&request, "/tmp/out".as_ref())?;
//! println!("wrote {}", archive.display());
//! ```

mod archive;
mod assembler;
mod error;
mod manifest;

pub use archive::{write_archive, ArchiveEntry, EntrySource};
pub use assembler::PackageAssembler;
pub use error::{PackageError, PackageResult};
pub use manifest::{PackageRequest, RawManifest, RemoteRendition};
