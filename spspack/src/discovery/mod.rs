//! Discovery and grouping of loose package files.
//!
//! Given a folder or an existing zip archive, finds every XML document and
//! partitions the remaining files into per-document asset and rendition
//! sets using filename-prefix heuristics. Each file is attributed to at
//! most one document.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;
use zip::ZipArchive;

/// Result type for discovery operations.
pub type ExploreResult<T> = Result<T, ExploreError>;

/// Errors raised while exploring a source.
#[derive(Debug)]
pub enum ExploreError {
    /// The source is neither a readable folder nor a valid zip archive.
    UnsupportedSource(PathBuf),

    /// Failed to list the source.
    ReadFailed { path: PathBuf, source: io::Error },
}

impl fmt::Display for ExploreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExploreError::UnsupportedSource(path) => {
                write!(
                    f,
                    "source is neither a folder nor a zip archive: {}",
                    path.display()
                )
            }
            ExploreError::ReadFailed { path, source } => {
                write!(f, "failed to read source {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ExploreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExploreError::ReadFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// The files belonging to one document inside a source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentBundle {
    /// Name of the XML file inside the source.
    pub xml: String,
    /// Asset file names, in source order.
    pub assets: Vec<String>,
    /// Rendition file names keyed by language, `"original"` for the
    /// unlabelled default. At most one entry per key.
    pub renditions: BTreeMap<String, String>,
}

/// `-xx` language suffix on a rendition filename.
fn language_suffix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^-([A-Za-z]{2})$").unwrap())
}

/// Explore a folder or zip archive and group its files per document.
///
/// The returned map is keyed by each XML file's basename without
/// extension. Grouping is a partition: a file matched to one document is
/// never attributed to another.
pub fn explore(source: &Path) -> ExploreResult<BTreeMap<String, DocumentBundle>> {
    let names = list_source(source)?;
    Ok(group_names(names))
}

fn list_source(source: &Path) -> ExploreResult<Vec<String>> {
    if source.is_dir() {
        let entries = std::fs::read_dir(source).map_err(|e| ExploreError::ReadFailed {
            path: source.to_path_buf(),
            source: e,
        })?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ExploreError::ReadFailed {
                path: source.to_path_buf(),
                source: e,
            })?;
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        return Ok(names);
    }

    if source.is_file() {
        let file = File::open(source).map_err(|e| ExploreError::ReadFailed {
            path: source.to_path_buf(),
            source: e,
        })?;
        if let Ok(archive) = ZipArchive::new(file) {
            let mut names: Vec<String> = archive
                .file_names()
                .filter(|n| !n.ends_with('/'))
                .map(String::from)
                .collect();
            names.sort();
            return Ok(names);
        }
    }

    Err(ExploreError::UnsupportedSource(source.to_path_buf()))
}

fn group_names(names: Vec<String>) -> BTreeMap<String, DocumentBundle> {
    let xml_names: Vec<String> = names
        .iter()
        .filter(|n| has_extension(n, "xml"))
        .cloned()
        .collect();
    // XML files are never assets or renditions of another document.
    let mut working: Vec<String> = names
        .into_iter()
        .filter(|n| !has_extension(n, "xml"))
        .collect();

    let mut groups = BTreeMap::new();
    for xml in xml_names {
        let key = stem_of(&xml);
        let mut bundle = DocumentBundle {
            xml: xml.clone(),
            ..DocumentBundle::default()
        };

        let mut remaining = Vec::with_capacity(working.len());
        for name in working {
            let basename = basename_of(&name);
            let matched = basename.starts_with(&format!("{}-", key))
                || basename.starts_with(&format!("{}.", key));
            if !matched {
                remaining.push(name);
                continue;
            }
            classify_match(&key, basename, &name, &mut bundle);
        }
        working = remaining;

        debug!(
            document = %key,
            assets = bundle.assets.len(),
            renditions = bundle.renditions.len(),
            "grouped document files"
        );
        groups.insert(key, bundle);
    }
    groups
}

fn classify_match(key: &str, basename: &str, name: &str, bundle: &mut DocumentBundle) {
    if has_extension(basename, "pdf") {
        let suffix = &basename[key.len()..basename.len() - ".pdf".len()];
        if suffix.is_empty() {
            bundle
                .renditions
                .entry("original".to_string())
                .or_insert_with(|| name.to_string());
            return;
        }
        if let Some(caps) = language_suffix_pattern().captures(suffix) {
            bundle
                .renditions
                .entry(caps[1].to_lowercase())
                .or_insert_with(|| name.to_string());
            return;
        }
    }
    bundle.assets.push(name.to_string());
}

fn has_extension(name: &str, ext: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

fn basename_of(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn stem_of(name: &str) -> String {
    let base = basename_of(name);
    match base.rfind('.') {
        Some(dot) => base[..dot].to_string(),
        None => base.to_string(),
    }
}
