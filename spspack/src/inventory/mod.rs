//! Asset inventory: enumeration, classification and canonical naming of
//! every binary resource referenced from inside the article XML.
//!
//! The inventory is enumerated fresh for every document; nothing is cached
//! across builds. Rewrites (`remote_to_local`, `local_to_remote`) mutate
//! the live tree in place; callers needing the original form clone the
//! tree first.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::xml::{NodeId, XmlTree};

/// Classification of an asset by its nearest enclosing element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetType {
    /// Figures and any unrecognized graphic (type code `g`).
    Figure,
    /// Inline graphics and formulas (type code `i`).
    Inline,
    /// Display formula images (type code `e`).
    Equation,
    /// Supplementary material (type code `s`).
    Supplementary,
}

impl AssetType {
    /// Single-letter code used in canonical filenames.
    pub fn code(self) -> char {
        match self {
            AssetType::Figure => 'g',
            AssetType::Inline => 'i',
            AssetType::Equation => 'e',
            AssetType::Supplementary => 's',
        }
    }
}

/// One href-bearing node of the document.
#[derive(Debug, Clone)]
pub struct Asset {
    /// The node owning the href attribute.
    pub node: NodeId,
    /// `id` of the nearest scoping ancestor, if any.
    pub scope_id: Option<String>,
    /// Zero-based position inside the scope, or the document-global
    /// 1-based index for unscoped assets.
    pub index: u32,
    /// The node's `content-type` attribute, when present.
    pub content_type: Option<String>,
    /// Asset classification.
    pub asset_type: AssetType,
    /// Current locator value.
    pub href: String,
}

/// Every asset of one document, in document order.
#[derive(Debug, Clone)]
pub struct AssetInventory {
    assets: Vec<Asset>,
}

impl AssetInventory {
    /// Enumerate and classify the assets of a document.
    ///
    /// A candidate href is accepted only if it is a bare local filename
    /// (no path separator) or its path contains a segment equal to the
    /// document's own v3 PID; locators that belong to another package are
    /// excluded so shared storage buckets cannot leak foreign assets in.
    pub fn build(tree: &XmlTree, v3_pid: Option<&str>) -> Self {
        let mut candidates: Vec<NodeId> = Vec::new();
        let mut hrefs: HashMap<NodeId, String> = HashMap::new();
        for id in tree.element_descendants(tree.root()) {
            if let Some(href) = tree.attr(id, "href") {
                if accept_href(href, v3_pid) {
                    candidates.push(id);
                    hrefs.insert(id, href.to_string());
                }
            }
        }
        let candidate_set: HashSet<NodeId> = candidates.iter().copied().collect();

        let mut assets: Vec<Asset> = Vec::new();
        let mut claimed: HashSet<NodeId> = HashSet::new();

        // Scoped pass: elements carrying an id claim their href-bearing
        // descendants in document order. Translation sub-documents do not
        // scope; their roots carry ids but belong to the whole document.
        for scope in tree.element_descendants(tree.root()) {
            if tree.local_name(scope) == Some("sub-article") {
                continue;
            }
            let Some(scope_id) = tree.attr(scope, "id") else {
                continue;
            };
            let mut index = 0u32;
            for node in tree.element_descendants(scope) {
                if !candidate_set.contains(&node) || claimed.contains(&node) {
                    continue;
                }
                claimed.insert(node);
                assets.push(Asset {
                    node,
                    scope_id: Some(scope_id.to_string()),
                    index,
                    content_type: tree.attr(node, "content-type").map(String::from),
                    asset_type: classify(tree, node),
                    href: hrefs[&node].clone(),
                });
                index += 1;
            }
        }

        // Unscoped pass: a single running counter across the document.
        let mut global = 0u32;
        for node in candidates {
            if claimed.contains(&node) {
                continue;
            }
            global += 1;
            assets.push(Asset {
                node,
                scope_id: None,
                index: global,
                content_type: tree.attr(node, "content-type").map(String::from),
                asset_type: classify(tree, node),
                href: hrefs[&node].clone(),
            });
        }

        AssetInventory { assets }
    }

    /// The enumerated assets.
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Canonical filename for one asset:
    /// `{base}-{type_code}{content_type-or-disambiguator}{extension}`.
    ///
    /// Names are unique across the inventory. Preferred names can collide
    /// when one scope id is a prefix of another (`f1` holding two assets
    /// and `f11` holding one both prefer `f11`); the later asset in
    /// document order then carries an ordinal suffix before the extension.
    pub fn canonical_name(&self, base: &str, asset: &Asset) -> String {
        let position = self
            .assets
            .iter()
            .position(|a| a.node == asset.node)
            .unwrap_or(0);
        self.resolved_names(base).swap_remove(position)
    }

    /// Pairs of `(current_href, canonical_name)` for every asset.
    pub fn canonical_names(&self, base: &str) -> Vec<(String, String)> {
        self.assets
            .iter()
            .zip(self.resolved_names(base))
            .map(|(a, name)| (a.href.clone(), name))
            .collect()
    }

    /// Preferred name stem and extension for one asset, before
    /// uniqueness resolution.
    fn name_parts(&self, base: &str, asset: &Asset) -> (String, String) {
        let disambiguator = match (&asset.content_type, &asset.scope_id) {
            (Some(content_type), _) => content_type.clone(),
            (None, Some(scope_id)) => {
                let siblings = self
                    .assets
                    .iter()
                    .filter(|a| a.scope_id.as_deref() == Some(scope_id))
                    .count();
                if siblings > 1 && asset.index > 0 {
                    format!("{}{}", scope_id, asset.index)
                } else {
                    scope_id.clone()
                }
            }
            (None, None) => asset.index.to_string(),
        };
        let stem = format!("{}-{}{}", base, asset.asset_type.code(), disambiguator);
        (stem, extension_of(&asset.href))
    }

    /// One name per asset, in document order, pairwise distinct.
    fn resolved_names(&self, base: &str) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut names = Vec::with_capacity(self.assets.len());
        for asset in &self.assets {
            let (stem, extension) = self.name_parts(base, asset);
            let mut name = format!("{}{}", stem, extension);
            let mut ordinal = 1u32;
            while !seen.insert(name.clone()) {
                name = format!("{}-{}{}", stem, ordinal, extension);
                ordinal += 1;
            }
            names.push(name);
        }
        names
    }

    /// Rewrite every asset href to its canonical local filename.
    /// Mutates the tree in place.
    pub fn remote_to_local(&mut self, tree: &mut XmlTree, base: &str) {
        let names = self.resolved_names(base);
        for (asset, name) in self.assets.iter_mut().zip(names) {
            tree.set_attr(asset.node, "href", &name);
            asset.href = name;
        }
    }

    /// Rewrite scheme-less hrefs to their mapped remote URIs; hrefs that
    /// already carry a scheme are left untouched.
    pub fn local_to_remote(&mut self, tree: &mut XmlTree, uris: &HashMap<String, String>) {
        for asset in &mut self.assets {
            if asset.href.contains("://") {
                continue;
            }
            if let Some(uri) = uris.get(&asset.href) {
                tree.set_attr(asset.node, "href", uri);
                asset.href = uri.clone();
            }
        }
    }
}

/// Accept bare filenames, and pathed locators only when a path segment
/// equals the document's own v3 PID.
fn accept_href(href: &str, v3_pid: Option<&str>) -> bool {
    if !href.contains('/') {
        return true;
    }
    match v3_pid {
        Some(pid) if !pid.is_empty() => href.split('/').any(|segment| segment == pid),
        _ => false,
    }
}

/// Classify by nearest enclosing element name, the node itself first.
fn classify(tree: &XmlTree, node: NodeId) -> AssetType {
    let mut chain = vec![node];
    chain.extend(tree.ancestors(node));
    for id in chain {
        let Some(name) = tree.local_name(id) else {
            continue;
        };
        if name.contains("disp-formula") {
            return AssetType::Equation;
        }
        // Checked before "inline" so inline-supplementary-material is
        // classified as supplementary.
        if name.contains("supplementary") {
            return AssetType::Supplementary;
        }
        if name.contains("inline") {
            return AssetType::Inline;
        }
    }
    AssetType::Figure
}

/// File extension of a locator, dot included; empty when absent.
fn extension_of(href: &str) -> String {
    Path::new(href)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> XmlTree {
        let xml = format!(
            r#"<article xmlns:xlink="http://www.w3.org/1999/xlink"><front><article-meta/></front><body>{}</body></article>"#,
            body
        );
        XmlTree::parse(xml.as_bytes()).unwrap()
    }

    #[test]
    fn test_scoping_excludes_foreign_package_hrefs() {
        let tree = doc(
            r#"<p><graphic xlink:href="a.jpg"/></p>
               <p><graphic xlink:href="/PIDV3/b.jpg"/></p>
               <p><graphic xlink:href="http://x/OTHER/c.jpg"/></p>"#,
        );
        let inventory = AssetInventory::build(&tree, Some("PIDV3"));
        let hrefs: Vec<&str> = inventory.assets().iter().map(|a| a.href.as_str()).collect();
        assert_eq!(hrefs, vec!["a.jpg", "/PIDV3/b.jpg"]);
    }

    #[test]
    fn test_without_v3_only_bare_filenames_are_accepted() {
        let tree = doc(r#"<p><graphic xlink:href="a.jpg"/><graphic xlink:href="/x/b.jpg"/></p>"#);
        let inventory = AssetInventory::build(&tree, None);
        assert_eq!(inventory.len(), 1);
    }

    #[test]
    fn test_unscoped_assets_use_global_one_based_index() {
        let tree = doc(r#"<p><graphic xlink:href="a.jpg"/></p><p><graphic xlink:href="b.jpg"/></p>"#);
        let inventory = AssetInventory::build(&tree, None);
        let names: Vec<String> = inventory
            .assets()
            .iter()
            .map(|a| inventory.canonical_name("X", a))
            .collect();
        assert_eq!(names, vec!["X-g1.jpg", "X-g2.jpg"]);
    }

    #[test]
    fn test_scoped_assets_use_scope_id() {
        let tree = doc(r#"<fig id="f01"><graphic xlink:href="a.jpg"/></fig>"#);
        let inventory = AssetInventory::build(&tree, None);
        let asset = &inventory.assets()[0];
        assert_eq!(asset.scope_id.as_deref(), Some("f01"));
        assert_eq!(asset.index, 0);
        assert_eq!(inventory.canonical_name("X", asset), "X-gf01.jpg");
    }

    #[test]
    fn test_multiple_assets_in_one_scope_disambiguate() {
        let tree = doc(
            r#"<fig id="f01"><graphic xlink:href="a.jpg"/><graphic xlink:href="b.jpg"/></fig>"#,
        );
        let inventory = AssetInventory::build(&tree, None);
        let names: Vec<String> = inventory
            .assets()
            .iter()
            .map(|a| inventory.canonical_name("X", a))
            .collect();
        assert_eq!(names, vec!["X-gf01.jpg", "X-gf011.jpg"]);
    }

    #[test]
    fn test_prefix_related_scope_ids_get_distinct_names() {
        // Scope "f1" with two assets prefers "f1"/"f11"; scope "f11"
        // prefers "f11" as well and must be pushed off the collision.
        let tree = doc(
            r#"<fig id="f1"><graphic xlink:href="a.jpg"/><graphic xlink:href="b.jpg"/></fig>
               <fig id="f11"><graphic xlink:href="c.jpg"/></fig>"#,
        );
        let inventory = AssetInventory::build(&tree, None);
        let names: Vec<String> = inventory
            .assets()
            .iter()
            .map(|a| inventory.canonical_name("X", a))
            .collect();
        assert_eq!(names, vec!["X-gf1.jpg", "X-gf11.jpg", "X-gf11-1.jpg"]);
        let unique: HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), names.len(), "canonical names must be distinct");
    }

    #[test]
    fn test_content_type_attribute_wins_over_disambiguator() {
        let tree = doc(
            r#"<fig id="f01"><graphic xlink:href="a.jpg"/><graphic content-type="thumb" xlink:href="a-thumb.jpg"/></fig>"#,
        );
        let inventory = AssetInventory::build(&tree, None);
        let names: Vec<String> = inventory
            .assets()
            .iter()
            .map(|a| inventory.canonical_name("X", a))
            .collect();
        assert_eq!(names, vec!["X-gf01.jpg", "X-gthumb.jpg"]);
    }

    #[test]
    fn test_type_classification_by_enclosing_element() {
        let tree = doc(
            r#"<disp-formula id="e01"><graphic xlink:href="eq.tif"/></disp-formula>
               <p><inline-graphic xlink:href="in.gif"/></p>
               <supplementary-material id="s01"><media xlink:href="data.zip"/></supplementary-material>
               <fig id="f01"><graphic xlink:href="fig.jpg"/></fig>"#,
        );
        let inventory = AssetInventory::build(&tree, None);
        let types: HashMap<&str, char> = inventory
            .assets()
            .iter()
            .map(|a| (a.href.as_str(), a.asset_type.code()))
            .collect();
        assert_eq!(types["eq.tif"], 'e');
        assert_eq!(types["in.gif"], 'i');
        assert_eq!(types["data.zip"], 's');
        assert_eq!(types["fig.jpg"], 'g');
    }

    #[test]
    fn test_inline_supplementary_is_supplementary() {
        let tree = doc(r#"<p><inline-supplementary-material xlink:href="x.pdf"/></p>"#);
        let inventory = AssetInventory::build(&tree, None);
        assert_eq!(inventory.assets()[0].asset_type, AssetType::Supplementary);
    }

    #[test]
    fn test_sub_article_root_does_not_scope() {
        let xml = r#"<article xmlns:xlink="http://www.w3.org/1999/xlink"><front><article-meta/></front><body/><sub-article id="tr01" article-type="translation"><body><p><graphic xlink:href="t.jpg"/></p></body></sub-article></article>"#;
        let tree = XmlTree::parse(xml.as_bytes()).unwrap();
        let inventory = AssetInventory::build(&tree, None);
        assert_eq!(inventory.assets()[0].scope_id, None);
    }

    #[test]
    fn test_remote_to_local_rewrites_tree_with_unique_names() {
        let mut tree = doc(
            r#"<fig id="f01"><graphic xlink:href="http://minio/PIDV3/a.jpg"/></fig>
               <p><graphic xlink:href="b.png"/></p>"#,
        );
        let mut inventory = AssetInventory::build(&tree, Some("PIDV3"));
        inventory.remote_to_local(&mut tree, "X");

        let rescanned = AssetInventory::build(&tree, Some("PIDV3"));
        let names: HashSet<String> =
            rescanned.assets().iter().map(|a| a.href.clone()).collect();
        assert_eq!(names.len(), rescanned.len());
        for name in &names {
            assert!(name.starts_with("X-"), "not canonical: {}", name);
        }
        assert!(tree.to_xml().contains(r#"xlink:href="X-gf01.jpg""#));
    }

    #[test]
    fn test_local_to_remote_skips_hrefs_with_scheme() {
        let mut tree = doc(
            r#"<p><graphic xlink:href="a.jpg"/><graphic xlink:href="https://cdn/x/kept.jpg"/></p>"#,
        );
        let mut inventory = AssetInventory::build(&tree, Some("x"));
        let mut uris = HashMap::new();
        uris.insert("a.jpg".to_string(), "https://cdn/PIDV3/a.jpg".to_string());
        uris.insert(
            "https://cdn/x/kept.jpg".to_string(),
            "https://elsewhere/nope.jpg".to_string(),
        );
        inventory.local_to_remote(&mut tree, &uris);
        let xml = tree.to_xml();
        assert!(xml.contains("https://cdn/PIDV3/a.jpg"));
        assert!(xml.contains("https://cdn/x/kept.jpg"));
        assert!(!xml.contains("elsewhere"));
    }
}
