//! Owned, mutable XML tree.
//!
//! The identity and inventory stages both read and rewrite the same article
//! document, so the tree is modeled as an explicitly owned single-writer
//! structure: parsed once with `quick-xml`, mutated in place through `&mut`
//! methods, and serialized back deterministically. Consumers that need to
//! compare before/after states clone the tree first (`XmlTree: Clone`).
//!
//! The prolog (XML declaration, DOCTYPE, leading comments and processing
//! instructions) round-trips verbatim so repeated runs over the same input
//! produce byte-stable output.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Result type for XML tree operations.
pub type XmlResult<T> = Result<T, XmlError>;

/// Errors raised while parsing a document into a tree.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The input is not well-formed XML.
    #[error("malformed XML: {0}")]
    Parse(#[from] quick_xml::Error),

    /// An element carries a malformed attribute.
    #[error("malformed XML attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    /// The input contains no root element.
    #[error("document has no root element")]
    NoRootElement,
}

/// Index of a node inside an [`XmlTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A single node of the tree.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Element with qualified tag name and attributes in document order.
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    /// Character data, unescaped.
    Text(String),
    /// CDATA section, verbatim.
    CData(String),
    /// Comment, verbatim (without the `<!--` / `-->` delimiters).
    Comment(String),
    /// Processing instruction, verbatim (without `<?` / `?>`).
    Pi(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// An owned XML document: prolog plus a tree of nodes rooted at the
/// document element.
#[derive(Debug, Clone)]
pub struct XmlTree {
    nodes: Vec<Node>,
    prolog: Vec<String>,
    root: NodeId,
}

impl XmlTree {
    /// Parse a document from raw bytes.
    pub fn parse(bytes: &[u8]) -> XmlResult<Self> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();

        let mut nodes: Vec<Node> = Vec::new();
        let mut prolog: Vec<String> = Vec::new();
        // Stack of open elements; empty until the root element starts.
        let mut stack: Vec<NodeId> = Vec::new();
        let mut root: Option<NodeId> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Decl(e) => {
                    prolog.push(format!("<?{}?>", String::from_utf8_lossy(&e)));
                }
                Event::DocType(e) => {
                    prolog.push(format!("<!DOCTYPE {}>", String::from_utf8_lossy(&e)));
                }
                Event::Start(e) => {
                    let id = push_element(&mut nodes, &mut stack, &e)?;
                    if root.is_none() {
                        root = Some(id);
                    }
                    stack.push(id);
                }
                Event::Empty(e) => {
                    let id = push_element(&mut nodes, &mut stack, &e)?;
                    if root.is_none() {
                        root = Some(id);
                    }
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Text(e) => {
                    let text = e.unescape()?.into_owned();
                    push_child(&mut nodes, &stack, NodeKind::Text(text));
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    push_child(&mut nodes, &stack, NodeKind::CData(text));
                }
                Event::Comment(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    if stack.is_empty() {
                        prolog.push(format!("<!--{}-->", text));
                    } else {
                        push_child(&mut nodes, &stack, NodeKind::Comment(text));
                    }
                }
                Event::PI(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    if stack.is_empty() {
                        prolog.push(format!("<?{}?>", text));
                    } else {
                        push_child(&mut nodes, &stack, NodeKind::Pi(text));
                    }
                }
                Event::Eof => break,
            }
            buf.clear();
        }

        let root = root.ok_or(XmlError::NoRootElement)?;
        Ok(XmlTree {
            nodes,
            prolog,
            root,
        })
    }

    /// The document element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Qualified tag name of an element node, `None` for non-elements.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    /// Local part of an element's tag name (after any namespace prefix).
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.name(id)
            .map(|n| n.rsplit(':').next().unwrap_or(n))
    }

    /// Attribute value by qualified name; falls back to matching the local
    /// part so `attr(id, "href")` finds `xlink:href`.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        let NodeKind::Element { attrs, .. } = &self.nodes[id.0].kind else {
            return None;
        };
        attrs
            .iter()
            .find(|(k, _)| k == name)
            .or_else(|| {
                attrs
                    .iter()
                    .find(|(k, _)| k.rsplit(':').next() == Some(name))
            })
            .map(|(_, v)| v.as_str())
    }

    /// Set (or add) an attribute on an element node. The qualified name is
    /// matched the same way as [`attr`](Self::attr).
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let NodeKind::Element { attrs, .. } = &mut self.nodes[id.0].kind else {
            return;
        };
        let found = attrs
            .iter_mut()
            .find(|(k, _)| k.as_str() == name || k.rsplit(':').next() == Some(name));
        match found {
            Some((_, v)) => *v = value.to_string(),
            None => attrs.push((name.to_string(), value.to_string())),
        }
    }

    /// Children of a node, in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Parent of a node; `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Walk from a node to the root, yielding each ancestor.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    /// All element descendants of a node, depth-first in document order.
    pub fn element_descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements(id, &mut out);
        out
    }

    fn collect_elements(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.nodes[id.0].children {
            if matches!(self.nodes[child.0].kind, NodeKind::Element { .. }) {
                out.push(child);
            }
            self.collect_elements(child, out);
        }
    }

    /// First element descendant with the given local tag name.
    pub fn find(&self, from: NodeId, local: &str) -> Option<NodeId> {
        self.element_descendants(from)
            .into_iter()
            .find(|&id| self.local_name(id) == Some(local))
    }

    /// Every element descendant with the given local tag name.
    pub fn find_all(&self, from: NodeId, local: &str) -> Vec<NodeId> {
        self.element_descendants(from)
            .into_iter()
            .filter(|&id| self.local_name(id) == Some(local))
            .collect()
    }

    /// Concatenated, trimmed text content of a node's subtree.
    pub fn text_of(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out.trim().to_string()
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for &child in &self.nodes[id.0].children {
            match &self.nodes[child.0].kind {
                NodeKind::Text(t) | NodeKind::CData(t) => out.push_str(t),
                NodeKind::Element { .. } => self.collect_text(child, out),
                _ => {}
            }
        }
    }

    /// Create a detached element node.
    pub fn new_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Element {
                name: name.to_string(),
                attrs: attrs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
        });
        id
    }

    /// Replace a node's children with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        let text_id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(id),
            children: Vec::new(),
            kind: NodeKind::Text(text.to_string()),
        });
        self.nodes[id.0].children = vec![text_id];
    }

    /// Insert a detached node into a parent's child list at `index`
    /// (clamped to the list length).
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let index = index.min(self.nodes[parent.0].children.len());
        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Position of a child inside its parent's child list.
    pub fn child_position(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.nodes[parent.0].children.iter().position(|&c| c == child)
    }

    /// Serialize the document, prolog first, back to a string.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        for item in &self.prolog {
            out.push_str(item);
            out.push('\n');
        }
        self.write_node(self.root, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Element { name, attrs } => {
                out.push('<');
                out.push_str(name);
                for (k, v) in attrs {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    out.push_str(&escape(v.as_str()));
                    out.push('"');
                }
                let children = &self.nodes[id.0].children;
                if children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    for &child in children {
                        self.write_node(child, out);
                    }
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
            NodeKind::Text(t) => out.push_str(&escape(t.as_str())),
            NodeKind::CData(t) => {
                out.push_str("<![CDATA[");
                out.push_str(t);
                out.push_str("]]>");
            }
            NodeKind::Comment(t) => {
                out.push_str("<!--");
                out.push_str(t);
                out.push_str("-->");
            }
            NodeKind::Pi(t) => {
                out.push_str("<?");
                out.push_str(t);
                out.push_str("?>");
            }
        }
    }
}

fn push_element(
    nodes: &mut Vec<Node>,
    stack: &[NodeId],
    start: &quick_xml::events::BytesStart<'_>,
) -> XmlResult<NodeId> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    let id = NodeId(nodes.len());
    let parent = stack.last().copied();
    nodes.push(Node {
        parent,
        children: Vec::new(),
        kind: NodeKind::Element { name, attrs },
    });
    if let Some(p) = parent {
        nodes[p.0].children.push(id);
    }
    Ok(id)
}

fn push_child(nodes: &mut Vec<Node>, stack: &[NodeId], kind: NodeKind) {
    let Some(&parent) = stack.last() else {
        // Whitespace or stray text outside the root element is dropped.
        return;
    };
    let id = NodeId(nodes.len());
    nodes.push(Node {
        parent: Some(parent),
        children: Vec::new(),
        kind,
    });
    nodes[parent.0].children.push(id);
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<article xmlns:xlink="http://www.w3.org/1999/xlink"><front><article-meta><volume>39</volume></article-meta></front><body><fig id="f01"><graphic xlink:href="a.jpg"/></fig></body></article>"#;

    #[test]
    fn test_parse_and_query() {
        let tree = XmlTree::parse(DOC.as_bytes()).unwrap();
        assert_eq!(tree.local_name(tree.root()), Some("article"));
        let volume = tree.find(tree.root(), "volume").unwrap();
        assert_eq!(tree.text_of(volume), "39");
    }

    #[test]
    fn test_attr_matches_local_name() {
        let tree = XmlTree::parse(DOC.as_bytes()).unwrap();
        let graphic = tree.find(tree.root(), "graphic").unwrap();
        assert_eq!(tree.attr(graphic, "xlink:href"), Some("a.jpg"));
        assert_eq!(tree.attr(graphic, "href"), Some("a.jpg"));
    }

    #[test]
    fn test_set_attr_rewrites_in_place() {
        let mut tree = XmlTree::parse(DOC.as_bytes()).unwrap();
        let graphic = tree.find(tree.root(), "graphic").unwrap();
        tree.set_attr(graphic, "href", "renamed.jpg");
        assert_eq!(tree.attr(graphic, "href"), Some("renamed.jpg"));
        assert!(tree.to_xml().contains(r#"xlink:href="renamed.jpg""#));
    }

    #[test]
    fn test_serialization_is_stable() {
        let tree = XmlTree::parse(DOC.as_bytes()).unwrap();
        let first = tree.to_xml();
        let second = XmlTree::parse(first.as_bytes()).unwrap().to_xml();
        assert_eq!(first, second);
    }

    #[test]
    fn test_prolog_round_trips() {
        let tree = XmlTree::parse(DOC.as_bytes()).unwrap();
        assert!(tree
            .to_xml()
            .starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
    }

    #[test]
    fn test_insert_child_at_position() {
        let mut tree = XmlTree::parse(DOC.as_bytes()).unwrap();
        let meta = tree.find(tree.root(), "article-meta").unwrap();
        let id = tree.new_element("article-id", &[("pub-id-type", "doi")]);
        tree.set_text(id, "10.1590/abc");
        tree.insert_child(meta, 0, id);
        let xml = tree.to_xml();
        assert!(xml.contains(r#"<article-id pub-id-type="doi">10.1590/abc</article-id><volume>"#));
    }

    #[test]
    fn test_malformed_input_is_an_error() {
        assert!(XmlTree::parse(b"<article><unclosed></article>").is_err());
    }

    #[test]
    fn test_empty_input_has_no_root() {
        assert!(matches!(
            XmlTree::parse(b"   "),
            Err(XmlError::NoRootElement)
        ));
    }

    #[test]
    fn test_ancestors_walk() {
        let tree = XmlTree::parse(DOC.as_bytes()).unwrap();
        let graphic = tree.find(tree.root(), "graphic").unwrap();
        let names: Vec<_> = tree
            .ancestors(graphic)
            .into_iter()
            .filter_map(|id| tree.local_name(id))
            .collect();
        assert_eq!(names, vec!["fig", "body", "article"]);
    }

    #[test]
    fn test_escaped_text_round_trip() {
        let doc = "<a>1 &lt; 2 &amp; 3</a>";
        let tree = XmlTree::parse(doc.as_bytes()).unwrap();
        assert_eq!(tree.text_of(tree.root()), "1 < 2 & 3");
        assert_eq!(tree.to_xml(), doc);
    }
}
