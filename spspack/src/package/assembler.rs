//! Package assembly orchestration.
//!
//! Linear stages: validate inputs, resolve identity, compute canonical
//! names, materialize files, write the archive. Stages 1-3 fail fast
//! before any I/O side effect; per-item download failures are isolated in
//! the downloader and only become fatal here, at the asset pre-flight
//! check, so a partial archive is never left on disk.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use reqwest::Url;
use tracing::{debug, info};

use crate::download::{DownloadItem, Downloader};
use crate::identity::DocumentIdentity;
use crate::inventory::AssetInventory;
use crate::xml::XmlTree;

use super::archive::{write_archive, ArchiveEntry};
use super::error::{PackageError, PackageResult};
use super::manifest::{PackageRequest, RemoteRendition};

/// Assembles one SPS package per invocation.
///
/// Stateless across invocations; the only held resource is the downloader
/// and its shared HTTP client.
pub struct PackageAssembler {
    downloader: Downloader,
}

impl PackageAssembler {
    pub fn new() -> Self {
        PackageAssembler {
            downloader: Downloader::new(),
        }
    }

    /// Replace the downloader (injected transport, custom concurrency).
    pub fn with_downloader(downloader: Downloader) -> Self {
        PackageAssembler { downloader }
    }

    /// Assemble from local files. Returns the path of the written archive.
    pub fn assemble_from_paths(
        &self,
        request: &PackageRequest,
        output_dir: &Path,
    ) -> PackageResult<PathBuf> {
        // Stage 1: every referenced path must be readable.
        for path in std::iter::once(&request.xml)
            .chain(request.assets.iter())
            .chain(request.renditions.iter())
        {
            if !path.is_file() {
                return Err(PackageError::File {
                    path: path.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "no such file",
                    ),
                });
            }
        }

        // Stage 2: resolve identity.
        let origin = request.xml.display().to_string();
        let bytes = std::fs::read(&request.xml).map_err(|e| PackageError::File {
            path: request.xml.clone(),
            source: e,
        })?;
        let (mut tree, identity, package_name) = resolve_identity(&bytes, &origin)?;

        // Stage 3: canonical names for every supplied file.
        let mut inventory = AssetInventory::build(&tree, identity.scielo_pid_v3());
        let canonical_by_href = group_canonical_names(&inventory, &package_name);

        let mut entries: Vec<ArchiveEntry> = Vec::new();
        for path in &request.assets {
            let basename = file_name_of(path);
            match canonical_by_href.get(&basename) {
                Some(canonical_names) => {
                    for name in canonical_names {
                        entries.push(ArchiveEntry::from_file(name, path));
                    }
                }
                None => {
                    // Supplied but unreferenced; packaged under its own name.
                    debug!(file = %basename, "asset not referenced by the XML");
                    entries.push(ArchiveEntry::from_file(&basename, path));
                }
            }
        }
        for (language, path) in keyed_renditions(&request.renditions)? {
            let name = rendition_canonical_name(&package_name, &language, path);
            entries.push(ArchiveEntry::from_file(&name, path));
        }

        // The packaged XML carries canonical hrefs.
        inventory.remote_to_local(&mut tree, &package_name);
        entries.push(ArchiveEntry::from_bytes(
            &format!("{}.xml", package_name),
            tree.to_xml().into_bytes(),
        ));

        // Stage 5: pre-flight, then write.
        preflight(&inventory, &package_name, &entries)?;
        let archive_path = output_dir.join(format!("{}.zip", package_name));
        write_archive(&archive_path, &entries)?;
        info!(package = %package_name, "assembled package from local files");
        Ok(archive_path)
    }

    /// Assemble from a remote XML; assets are discovered from the document
    /// itself, renditions are supplied as `(uri, name)` pairs.
    pub async fn assemble_from_uri(
        &self,
        xml_uri: &str,
        renditions: &[RemoteRendition],
        output_dir: &Path,
    ) -> PackageResult<PathBuf> {
        // Stage 1: URIs must be absolute http(s).
        let base = parse_http_uri(xml_uri)?;
        for rendition in renditions {
            parse_http_uri(&rendition.uri)?;
        }

        // Stage 2: fetch and resolve identity.
        let bytes = self.downloader.fetch_bytes(xml_uri).await?;
        let (mut tree, identity, package_name) = resolve_identity(&bytes, xml_uri)?;

        // Stage 3: discover assets from the document.
        let mut inventory = AssetInventory::build(&tree, identity.scielo_pid_v3());
        let mut items: Vec<DownloadItem> = Vec::new();
        let mut required: HashSet<String> = HashSet::new();
        // Each distinct href is downloaded once, under the first canonical
        // name referencing it; every further canonical name for the same
        // href becomes an alias entry written from the same staged file.
        let mut queued_as: HashMap<String, String> = HashMap::new();
        let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
        for (href, canonical) in inventory.canonical_names(&package_name) {
            required.insert(canonical.clone());
            match queued_as.get(&href) {
                Some(first) => {
                    aliases.entry(first.clone()).or_default().push(canonical);
                }
                None => {
                    let uri = resolve_asset_uri(&base, &href)?;
                    queued_as.insert(href, canonical.clone());
                    items.push(DownloadItem {
                        uri,
                        filename: canonical,
                    });
                }
            }
        }
        for rendition in renditions {
            let language = rendition_language(&stem_of(&rendition.name));
            let name = match language {
                Some(lang) => format!("{}-{}.pdf", package_name, lang),
                None => format!("{}.pdf", package_name),
            };
            items.push(DownloadItem {
                uri: rendition.uri.clone(),
                filename: name,
            });
        }
        inventory.remote_to_local(&mut tree, &package_name);

        // Stage 4: materialize into a staging folder exclusive to this run.
        let staging = tempfile::tempdir().map_err(|e| PackageError::File {
            path: PathBuf::from("<staging>"),
            source: e,
        })?;
        let outcomes = self.downloader.fetch_all(&items, staging.path()).await;

        let mut entries: Vec<ArchiveEntry> = vec![ArchiveEntry::from_bytes(
            &format!("{}.xml", package_name),
            tree.to_xml().into_bytes(),
        )];
        for outcome in outcomes {
            match outcome.result {
                Ok(path) => {
                    for alias in aliases.get(&outcome.filename).into_iter().flatten() {
                        entries.push(ArchiveEntry::from_file(alias, &path));
                    }
                    entries.push(ArchiveEntry::from_file(&outcome.filename, &path));
                }
                Err(e) => {
                    if required.contains(&outcome.filename) {
                        return Err(PackageError::MissingAsset(outcome.filename));
                    }
                    // A rendition the caller explicitly asked for.
                    return Err(PackageError::Fetch(e));
                }
            }
        }

        // Stage 5: pre-flight, then write.
        preflight(&inventory, &package_name, &entries)?;
        let archive_path = output_dir.join(format!("{}.zip", package_name));
        write_archive(&archive_path, &entries)?;
        info!(package = %package_name, uri = xml_uri, "assembled package from remote document");
        Ok(archive_path)
    }
}

impl Default for PackageAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse bytes into tree + identity + package name, classifying failures
/// by cause.
fn resolve_identity(
    bytes: &[u8],
    origin: &str,
) -> PackageResult<(XmlTree, DocumentIdentity, String)> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(PackageError::EmptyContent(origin.to_string()));
    }
    let tree = XmlTree::parse(bytes).map_err(|e| PackageError::MalformedXml {
        origin: origin.to_string(),
        source: e,
    })?;
    let identity = DocumentIdentity::from_tree(&tree)?;
    let package_name = identity.package_name()?;
    Ok((tree, identity, package_name))
}

/// Canonical names grouped by the href's final path segment, so a pathed
/// locator still matches the supplied local file of the same basename. A
/// document referencing one file twice yields one group with two
/// canonical names.
fn group_canonical_names(
    inventory: &AssetInventory,
    package_name: &str,
) -> HashMap<String, Vec<String>> {
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
    for (href, canonical) in inventory.canonical_names(package_name) {
        let key = href.rsplit('/').next().unwrap_or(&href).to_string();
        grouped.entry(key).or_default().push(canonical);
    }
    grouped
}

/// Every asset referenced by the XML must be among the entries about to be
/// written; otherwise abort before any bytes hit the disk.
fn preflight(
    inventory: &AssetInventory,
    package_name: &str,
    entries: &[ArchiveEntry],
) -> PackageResult<()> {
    let available: HashSet<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    for (_, canonical) in inventory.canonical_names(package_name) {
        if !available.contains(canonical.as_str()) {
            return Err(PackageError::MissingAsset(canonical));
        }
    }
    Ok(())
}

/// Key local rendition files by language; at most one file per key.
fn keyed_renditions(paths: &[PathBuf]) -> PackageResult<BTreeMap<String, &PathBuf>> {
    let mut keyed = BTreeMap::new();
    for path in paths {
        let stem = stem_of(&file_name_of(path));
        let key = rendition_language(&stem).unwrap_or_else(|| "original".to_string());
        if keyed.insert(key.clone(), path).is_some() {
            return Err(PackageError::Manifest(format!(
                "two renditions for language key \"{}\"",
                key
            )));
        }
    }
    Ok(keyed)
}

fn rendition_canonical_name(package_name: &str, language: &str, path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    if language == "original" {
        format!("{}{}", package_name, extension)
    } else {
        format!("{}-{}{}", package_name, language, extension)
    }
}

/// A trailing `-xx` (two letters) on a file stem marks a translation.
fn rendition_language(stem: &str) -> Option<String> {
    let (_, suffix) = stem.rsplit_once('-')?;
    if suffix.len() == 2 && suffix.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(suffix.to_lowercase())
    } else {
        None
    }
}

fn parse_http_uri(uri: &str) -> PackageResult<Url> {
    if uri.trim().is_empty() {
        return Err(PackageError::InvalidUri(uri.to_string()));
    }
    let parsed = Url::parse(uri).map_err(|_| PackageError::InvalidUri(uri.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(PackageError::InvalidUri(uri.to_string())),
    }
}

/// Remote hrefs are used as-is; bare filenames resolve against the
/// document's own URI.
fn resolve_asset_uri(base: &Url, href: &str) -> PackageResult<String> {
    if href.contains("://") {
        return Ok(href.to_string());
    }
    base.join(href)
        .map(|u| u.to_string())
        .map_err(|_| PackageError::InvalidUri(href.to_string()))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn stem_of(name: &str) -> String {
    match name.rfind('.') {
        Some(dot) => name[..dot].to_string(),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendition_language_suffix() {
        assert_eq!(rendition_language("doc-en"), Some("en".to_string()));
        assert_eq!(rendition_language("doc-PT"), Some("pt".to_string()));
        assert_eq!(rendition_language("doc"), None);
        assert_eq!(rendition_language("doc-fig1"), None);
    }

    #[test]
    fn test_parse_http_uri_rejects_empty_and_schemeless() {
        assert!(matches!(
            parse_http_uri(""),
            Err(PackageError::InvalidUri(_))
        ));
        assert!(matches!(
            parse_http_uri("example.org/doc.xml"),
            Err(PackageError::InvalidUri(_))
        ));
        assert!(matches!(
            parse_http_uri("ftp://example.org/doc.xml"),
            Err(PackageError::InvalidUri(_))
        ));
        assert!(parse_http_uri("https://example.org/doc.xml").is_ok());
    }

    #[test]
    fn test_resolve_asset_uri_joins_bare_names() {
        let base = Url::parse("https://example.org/docs/doc.xml").unwrap();
        assert_eq!(
            resolve_asset_uri(&base, "a.jpg").unwrap(),
            "https://example.org/docs/a.jpg"
        );
        assert_eq!(
            resolve_asset_uri(&base, "https://cdn/x/a.jpg").unwrap(),
            "https://cdn/x/a.jpg"
        );
    }

    #[test]
    fn test_keyed_renditions_rejects_duplicates() {
        let paths = vec![PathBuf::from("/r/doc.pdf"), PathBuf::from("/r/other.pdf")];
        assert!(matches!(
            keyed_renditions(&paths),
            Err(PackageError::Manifest(_))
        ));

        let paths = vec![PathBuf::from("/r/doc.pdf"), PathBuf::from("/r/doc-en.pdf")];
        let keyed = keyed_renditions(&paths).unwrap();
        assert_eq!(keyed.len(), 2);
        assert!(keyed.contains_key("original") && keyed.contains_key("en"));
    }
}
