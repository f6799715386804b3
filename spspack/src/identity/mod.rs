//! Document identity: canonical identifiers and the derived package name.
//!
//! A `DocumentIdentity` is read once from the article's `front` matter.
//! Setters mutate the underlying tree in place so the packaged XML carries
//! the identifiers it was named from; insertion position is fixed (before
//! the first existing `article-id`, else first in `article-meta`) so
//! repeated runs produce byte-stable output.

mod error;

pub use error::{IdentityError, IdentityResult};

use crate::issue::{parse_issue, IssueDescriptor};
use crate::xml::{NodeId, XmlTree};

/// Outcome of a setter on a write-once identifier.
///
/// `Unchanged` is an explicit no-op, not an error: callers must not assume
/// the new value took effect and should re-read the accessor to confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The value was written.
    Written,
    /// A value was already present; nothing was changed.
    Unchanged,
}

/// Canonical identifiers of one article document.
#[derive(Debug, Clone)]
pub struct DocumentIdentity {
    article_meta: NodeId,
    scielo_pid_v1: Option<String>,
    scielo_pid_v2: Option<String>,
    scielo_pid_v3: Option<String>,
    aop_pid: Option<String>,
    doi: Option<String>,
    order_source: Option<String>,
    issn: Option<String>,
    acronym: Option<String>,
    volume: Option<String>,
    issue: IssueDescriptor,
    elocation_id: Option<String>,
    fpage: Option<String>,
    fpage_seq: Option<String>,
    lpage: Option<String>,
}

impl DocumentIdentity {
    /// Read the identity from a parsed article tree.
    ///
    /// Fails with [`IdentityError::NoArticleMeta`] when the document carries
    /// no `front/article-meta`, which also covers non-article roots.
    pub fn from_tree(tree: &XmlTree) -> IdentityResult<Self> {
        let front = tree
            .children(tree.root())
            .iter()
            .copied()
            .find(|&id| tree.local_name(id) == Some("front"))
            .ok_or(IdentityError::NoArticleMeta)?;
        let article_meta = tree
            .find(front, "article-meta")
            .ok_or(IdentityError::NoArticleMeta)?;

        let mut identity = DocumentIdentity {
            article_meta,
            scielo_pid_v1: None,
            scielo_pid_v2: None,
            scielo_pid_v3: None,
            aop_pid: None,
            doi: None,
            order_source: None,
            issn: None,
            acronym: None,
            volume: None,
            issue: IssueDescriptor::default(),
            elocation_id: None,
            fpage: None,
            fpage_seq: None,
            lpage: None,
        };

        for id in tree.find_all(article_meta, "article-id") {
            let value = tree.text_of(id);
            if value.is_empty() {
                continue;
            }
            match (tree.attr(id, "pub-id-type"), tree.attr(id, "specific-use")) {
                (Some("doi"), _) => identity.doi = Some(value),
                (Some("other"), _) => identity.order_source = Some(value),
                (_, Some("scielo-v1")) => identity.scielo_pid_v1 = Some(value),
                (_, Some("scielo-v2")) => identity.scielo_pid_v2 = Some(value),
                (_, Some("scielo-v3")) => identity.scielo_pid_v3 = Some(value),
                (_, Some("previous-pid")) => identity.aop_pid = Some(value),
                _ => {}
            }
        }

        if let Some(meta) = tree.find(front, "journal-meta") {
            identity.issn = pick_issn(tree, meta);
            identity.acronym = tree
                .find_all(meta, "journal-id")
                .into_iter()
                .find(|&id| tree.attr(id, "journal-id-type") == Some("publisher-id"))
                .map(|id| tree.text_of(id))
                .filter(|v| !v.is_empty());
        }

        identity.volume = child_text(tree, article_meta, "volume");
        if let Some(raw) = child_text(tree, article_meta, "issue") {
            identity.issue = parse_issue(&raw);
        }
        identity.elocation_id = child_text(tree, article_meta, "elocation-id");
        if let Some(fpage) = tree.find(article_meta, "fpage") {
            identity.fpage = Some(tree.text_of(fpage)).filter(|v| !v.is_empty());
            identity.fpage_seq = tree.attr(fpage, "seq").map(String::from);
        }
        identity.lpage = child_text(tree, article_meta, "lpage");

        Ok(identity)
    }

    pub fn scielo_pid_v1(&self) -> Option<&str> {
        self.scielo_pid_v1.as_deref()
    }

    pub fn scielo_pid_v2(&self) -> Option<&str> {
        self.scielo_pid_v2.as_deref()
    }

    pub fn scielo_pid_v3(&self) -> Option<&str> {
        self.scielo_pid_v3.as_deref()
    }

    pub fn aop_pid(&self) -> Option<&str> {
        self.aop_pid.as_deref()
    }

    pub fn doi(&self) -> Option<&str> {
        self.doi.as_deref()
    }

    pub fn issn(&self) -> Option<&str> {
        self.issn.as_deref()
    }

    pub fn acronym(&self) -> Option<&str> {
        self.acronym.as_deref()
    }

    pub fn volume(&self) -> Option<&str> {
        self.volume.as_deref()
    }

    pub fn issue(&self) -> &IssueDescriptor {
        &self.issue
    }

    pub fn elocation_id(&self) -> Option<&str> {
        self.elocation_id.as_deref()
    }

    pub fn fpage(&self) -> Option<&str> {
        self.fpage.as_deref()
    }

    pub fn lpage(&self) -> Option<&str> {
        self.lpage.as_deref()
    }

    /// Publication order inside the issue.
    ///
    /// Read from the "other"-typed publisher identifier, else derived from
    /// the last five characters of the v2 PID. Both absent, or a value that
    /// is not a number in `0..=99999`, is a hard failure: package naming
    /// cannot proceed without it or an equivalent last-item source.
    pub fn order(&self) -> IdentityResult<u32> {
        let raw = match (&self.order_source, &self.scielo_pid_v2) {
            (Some(other), _) => other.clone(),
            (None, Some(v2)) => {
                let chars: Vec<char> = v2.chars().collect();
                let tail = chars.len().saturating_sub(5);
                chars[tail..].iter().collect()
            }
            (None, None) => {
                return Err(IdentityError::InvalidOrder(
                    "no order source: neither an \"other\" publisher id nor a v2 PID".into(),
                ))
            }
        };
        raw.parse::<u32>()
            .ok()
            .filter(|n| *n <= 99_999)
            .ok_or(IdentityError::InvalidOrder(raw))
    }

    /// Set the v1 PID, creating the `article-id` node when absent.
    pub fn set_scielo_pid_v1(&mut self, tree: &mut XmlTree, value: &str) {
        self.write_article_id(tree, value, &V1_ATTRS);
        self.scielo_pid_v1 = Some(value.to_string());
    }

    /// Set the v2 PID. Write-once: when a value is already present this is
    /// an explicit no-op and the stored value is kept.
    pub fn set_scielo_pid_v2(&mut self, tree: &mut XmlTree, value: &str) -> SetOutcome {
        if self.scielo_pid_v2.is_some() {
            return SetOutcome::Unchanged;
        }
        self.write_article_id(tree, value, &V2_ATTRS);
        self.scielo_pid_v2 = Some(value.to_string());
        SetOutcome::Written
    }

    /// Set the v3 PID, creating the `article-id` node when absent.
    pub fn set_scielo_pid_v3(&mut self, tree: &mut XmlTree, value: &str) {
        self.write_article_id(tree, value, &V3_ATTRS);
        self.scielo_pid_v3 = Some(value.to_string());
    }

    /// Set the ahead-of-print PID, creating the node when absent.
    pub fn set_aop_pid(&mut self, tree: &mut XmlTree, value: &str) {
        self.write_article_id(tree, value, &AOP_ATTRS);
        self.aop_pid = Some(value.to_string());
    }

    /// Set the DOI, creating the node when absent.
    pub fn set_doi(&mut self, tree: &mut XmlTree, value: &str) {
        self.write_article_id(tree, value, &DOI_ATTRS);
        self.doi = Some(value.to_string());
    }

    /// The derived, never stored, canonical package name.
    ///
    /// Hyphen-joined `(issn, acronym, volume, number, supplement-as-"sNN",
    /// last-item)`; present segments zero-padded to width 2 except the last
    /// item (width 5); absent segments omitted. Last item priority:
    /// `fpage(+seq) > elocation_id > order > doi-suffix`.
    pub fn package_name(&self) -> IdentityResult<String> {
        let mut segments: Vec<String> = Vec::new();
        if let Some(issn) = &self.issn {
            segments.push(issn.clone());
        }
        if let Some(acronym) = &self.acronym {
            segments.push(acronym.clone());
        }
        if let Some(volume) = &self.volume {
            segments.push(zfill(volume, 2));
        }
        if let Some(number) = &self.issue.number {
            segments.push(zfill(number, 2));
        }
        if let Some(supplement) = &self.issue.supplement {
            segments.push(format!("s{}", zfill(supplement, 2)));
        }
        segments.push(self.last_item()?);
        Ok(segments.join("-"))
    }

    fn last_item(&self) -> IdentityResult<String> {
        if let Some(fpage) = &self.fpage {
            let seq = self.fpage_seq.as_deref().unwrap_or("");
            return Ok(format!("{}{}", zfill(fpage, 5), seq));
        }
        if let Some(elocation) = &self.elocation_id {
            return Ok(zfill(elocation, 5));
        }
        match self.order() {
            Ok(order) => Ok(format!("{:05}", order)),
            Err(order_err) => match &self.doi {
                Some(doi) => {
                    let suffix = doi.rsplit('/').next().unwrap_or(doi);
                    Ok(zfill(&suffix.to_lowercase(), 5))
                }
                None => Err(order_err),
            },
        }
    }

    fn write_article_id(&self, tree: &mut XmlTree, value: &str, attrs: &[(&str, &str)]) {
        let existing = tree.find_all(self.article_meta, "article-id").into_iter().find(|&id| {
            attrs
                .iter()
                .all(|(k, v)| tree.attr(id, k) == Some(*v))
        });
        match existing {
            Some(id) => tree.set_text(id, value),
            None => {
                let node = tree.new_element("article-id", attrs);
                tree.set_text(node, value);
                let position = tree
                    .find_all(self.article_meta, "article-id")
                    .into_iter()
                    .filter(|&id| tree.parent(id) == Some(self.article_meta))
                    .find_map(|id| tree.child_position(self.article_meta, id))
                    .unwrap_or(0);
                tree.insert_child(self.article_meta, position, node);
            }
        }
    }
}

const V1_ATTRS: [(&str, &str); 2] = [("pub-id-type", "publisher-id"), ("specific-use", "scielo-v1")];
const V2_ATTRS: [(&str, &str); 2] = [("pub-id-type", "publisher-id"), ("specific-use", "scielo-v2")];
const V3_ATTRS: [(&str, &str); 2] = [("pub-id-type", "publisher-id"), ("specific-use", "scielo-v3")];
const AOP_ATTRS: [(&str, &str); 2] = [("pub-id-type", "publisher-id"), ("specific-use", "previous-pid")];
const DOI_ATTRS: [(&str, &str); 1] = [("pub-id-type", "doi")];

/// Prefer the electronic ISSN, then print, then whatever is first.
fn pick_issn(tree: &XmlTree, journal_meta: NodeId) -> Option<String> {
    let issns = tree.find_all(journal_meta, "issn");
    for wanted in ["epub", "ppub"] {
        if let Some(id) = issns
            .iter()
            .copied()
            .find(|&id| tree.attr(id, "pub-type") == Some(wanted))
        {
            let value = tree.text_of(id);
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    issns
        .first()
        .map(|&id| tree.text_of(id))
        .filter(|v| !v.is_empty())
}

fn child_text(tree: &XmlTree, from: NodeId, local: &str) -> Option<String> {
    tree.find(from, local)
        .map(|id| tree.text_of(id))
        .filter(|v| !v.is_empty())
}

/// Left-pad with zeros to `width`; longer values pass through unchanged.
fn zfill(value: &str, width: usize) -> String {
    if value.len() >= width {
        value.to_string()
    } else {
        format!("{}{}", "0".repeat(width - value.len()), value)
    }
}
