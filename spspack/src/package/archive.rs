//! Output archive writing.
//!
//! The final package is a flat zip: every entry sits at the archive root
//! under its canonical name. Entries come either from disk or from bytes
//! already in memory (the rewritten XML).

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::error::{PackageError, PackageResult};

/// One entry of the output archive.
#[derive(Debug)]
pub struct ArchiveEntry {
    /// Entry name inside the archive (no directories).
    pub name: String,
    /// Where the entry's bytes come from.
    pub source: EntrySource,
}

/// Source of an archive entry's bytes.
#[derive(Debug)]
pub enum EntrySource {
    /// Copy from a file on disk.
    File(PathBuf),
    /// Write bytes already in memory.
    Bytes(Vec<u8>),
}

impl ArchiveEntry {
    pub fn from_file(name: &str, path: &Path) -> Self {
        ArchiveEntry {
            name: name.to_string(),
            source: EntrySource::File(path.to_path_buf()),
        }
    }

    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Self {
        ArchiveEntry {
            name: name.to_string(),
            source: EntrySource::Bytes(bytes),
        }
    }
}

/// Write all entries into a zip archive at `path`.
pub fn write_archive(path: &Path, entries: &[ArchiveEntry]) -> PackageResult<()> {
    let file = File::create(path).map_err(|e| PackageError::File {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    for entry in entries {
        writer
            .start_file(entry.name.as_str(), options)
            .map_err(|e| PackageError::Archive {
                path: path.to_path_buf(),
                source: e,
            })?;
        match &entry.source {
            EntrySource::File(source_path) => {
                let mut source = File::open(source_path).map_err(|e| PackageError::File {
                    path: source_path.clone(),
                    source: e,
                })?;
                io::copy(&mut source, &mut writer).map_err(|e| PackageError::File {
                    path: source_path.clone(),
                    source: e,
                })?;
            }
            EntrySource::Bytes(bytes) => {
                io::Write::write_all(&mut writer, bytes).map_err(|e| PackageError::File {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            }
        }
    }

    writer.finish().map_err(|e| PackageError::Archive {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!(archive = %path.display(), entries = entries.len(), "wrote package archive");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_write_archive_flat_namelist() {
        let dir = tempfile::tempdir().unwrap();
        let asset = dir.path().join("a.jpg");
        std::fs::write(&asset, b"jpegbytes").unwrap();

        let out = dir.path().join("pkg.zip");
        write_archive(
            &out,
            &[
                ArchiveEntry::from_bytes("pkg.xml", b"<article/>".to_vec()),
                ArchiveEntry::from_file("pkg-g1.jpg", &asset),
            ],
        )
        .unwrap();

        let archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let names: BTreeSet<String> = archive.file_names().map(String::from).collect();
        let expected: BTreeSet<String> =
            ["pkg.xml", "pkg-g1.jpg"].iter().map(|s| s.to_string()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_missing_source_file_is_a_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("pkg.zip");
        let result = write_archive(
            &out,
            &[ArchiveEntry::from_file(
                "gone.jpg",
                &dir.path().join("gone.jpg"),
            )],
        );
        assert!(matches!(result, Err(PackageError::File { .. })));
    }
}
