//! Arena storage for the layout tree.
//!
//! Nodes live in a single `Vec` owned by [`LayoutDocument`] and are addressed
//! by [`NodeId`] indices. Removed nodes are tombstoned rather than compacted,
//! so ids handed out earlier never alias a different node.

use indexmap::IndexMap;

use crate::error::{LayoutError, Result};

/// Handle of a node in a [`LayoutDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Element types of the layout tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Document,
    Metadata,
    Creator,
    Created,
    LastChange,
    Process,
    Page,
    TextRegion,
    TextLine,
    Word,
    Glyph,
    Coords,
    Baseline,
    TextEquiv,
    Unicode,
}

impl ElementKind {
    const ALL: [ElementKind; 15] = [
        ElementKind::Document,
        ElementKind::Metadata,
        ElementKind::Creator,
        ElementKind::Created,
        ElementKind::LastChange,
        ElementKind::Process,
        ElementKind::Page,
        ElementKind::TextRegion,
        ElementKind::TextLine,
        ElementKind::Word,
        ElementKind::Glyph,
        ElementKind::Coords,
        ElementKind::Baseline,
        ElementKind::TextEquiv,
        ElementKind::Unicode,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Document => "Document",
            ElementKind::Metadata => "Metadata",
            ElementKind::Creator => "Creator",
            ElementKind::Created => "Created",
            ElementKind::LastChange => "LastChange",
            ElementKind::Process => "Process",
            ElementKind::Page => "Page",
            ElementKind::TextRegion => "TextRegion",
            ElementKind::TextLine => "TextLine",
            ElementKind::Word => "Word",
            ElementKind::Glyph => "Glyph",
            ElementKind::Coords => "Coords",
            ElementKind::Baseline => "Baseline",
            ElementKind::TextEquiv => "TextEquiv",
            ElementKind::Unicode => "Unicode",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Kinds that carry text content and may own Coords.
    pub fn is_text_element(self) -> bool {
        matches!(
            self,
            ElementKind::TextRegion | ElementKind::TextLine | ElementKind::Word | ElementKind::Glyph
        )
    }
}

/// Where [`LayoutDocument::create_node`] places the new node relative to
/// its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMode {
    /// Last child of the target.
    #[default]
    Child,
    /// Right after the target, under the same parent.
    NextSibling,
    /// Right before the target, under the same parent.
    PrevSibling,
}

#[derive(Debug, Clone)]
struct Node {
    kind: ElementKind,
    attrs: IndexMap<String, String>,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    alive: bool,
}

impl Node {
    fn new(kind: ElementKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            attrs: IndexMap::new(),
            text: None,
            parent,
            children: Vec::new(),
            alive: true,
        }
    }
}

/// In-memory page layout document.
///
/// The root is a `Document` element holding a `Metadata` element and the
/// pages. Geometry is stored as `points` attribute strings on `Coords` and
/// `Baseline` children of the text elements.
#[derive(Debug, Clone)]
pub struct LayoutDocument {
    nodes: Vec<Node>,
    root: NodeId,
}

impl LayoutDocument {
    /// Creates an empty document with a `Metadata` element naming `creator`.
    pub fn new(creator: &str) -> Self {
        let mut doc = Self {
            nodes: vec![Node::new(ElementKind::Document, None)],
            root: NodeId(0),
        };
        let stamp = super::process::timestamp();
        let metadata = doc.push_child(doc.root, ElementKind::Metadata);
        let c = doc.push_child(metadata, ElementKind::Creator);
        doc.nodes[c.0].text = Some(creator.to_string());
        let c = doc.push_child(metadata, ElementKind::Created);
        doc.nodes[c.0].text = Some(stamp.clone());
        let c = doc.push_child(metadata, ElementKind::LastChange);
        doc.nodes[c.0].text = Some(stamp);
        doc
    }

    fn push_child(&mut self, parent: NodeId, kind: ElementKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `Metadata` element, if it was not removed.
    pub fn metadata(&self) -> Option<NodeId> {
        self.children(self.root)
            .iter()
            .copied()
            .find(|&c| self.kind(c) == ElementKind::Metadata)
    }

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.nodes.get(node.0).is_some_and(|n| n.alive)
    }

    pub(crate) fn check_alive(&self, node: NodeId) -> Result<()> {
        if self.is_alive(node) {
            Ok(())
        } else {
            Err(LayoutError::validation(format!(
                "node {} does not exist",
                node.0
            )))
        }
    }

    pub fn kind(&self, node: NodeId) -> ElementKind {
        self.nodes[node.0].kind
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// Children of `node` of the given kind.
    pub fn children_of_kind(&self, node: NodeId, kind: ElementKind) -> Vec<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|&c| self.kind(c) == kind)
            .collect()
    }

    /// Ancestor-or-self of `node` with the given kind.
    pub fn closest(&self, kind: ElementKind, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.kind(n) == kind {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }

    /// Descendants of `node` in document order, excluding `node`.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node.0].attrs.get(name).map(String::as_str)
    }

    pub fn attrs(&self, node: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.nodes[node.0]
            .attrs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The `id` attribute of a node.
    pub fn id(&self, node: NodeId) -> Option<&str> {
        self.attr(node, "id")
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.check_alive(node)?;
        if name == "id" {
            if let Some(other) = self.find_by_id(value) {
                if other != node {
                    return Err(LayoutError::validation(format!(
                        "id already exists: {value}"
                    )));
                }
            }
        }
        self.nodes[node.0]
            .attrs
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> Option<String> {
        if !self.is_alive(node) {
            return None;
        }
        self.nodes[node.0].attrs.shift_remove(name)
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.nodes[node.0].text.as_deref()
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<()> {
        self.check_alive(node)?;
        self.nodes[node.0].text = Some(text.to_string());
        Ok(())
    }

    /// Finds the live node with the given `id` attribute.
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&n| self.id(n) == Some(id))
    }

    /// Creates a new element placed relative to `target`.
    ///
    /// When `id` is given it must not already be used in the document.
    pub fn create_node(
        &mut self,
        kind: ElementKind,
        id: Option<&str>,
        target: NodeId,
        mode: InsertMode,
    ) -> Result<NodeId> {
        self.check_alive(target)?;
        if let Some(id) = id {
            if self.find_by_id(id).is_some() {
                return Err(LayoutError::validation(format!("id already exists: {id}")));
            }
        }

        let (parent, position) = match mode {
            InsertMode::Child => (target, self.children(target).len()),
            InsertMode::NextSibling | InsertMode::PrevSibling => {
                let parent = self.parent(target).ok_or_else(|| {
                    LayoutError::validation("cannot add a sibling to the document root")
                })?;
                let pos = self
                    .children(parent)
                    .iter()
                    .position(|&c| c == target)
                    .ok_or_else(|| LayoutError::validation("target is detached from its parent"))?;
                let pos = if mode == InsertMode::NextSibling {
                    pos + 1
                } else {
                    pos
                };
                (parent, pos)
            }
        };

        let node = NodeId(self.nodes.len());
        let mut data = Node::new(kind, Some(parent));
        if let Some(id) = id {
            data.attrs.insert("id".to_string(), id.to_string());
        }
        self.nodes.push(data);
        self.nodes[parent.0].children.insert(position, node);
        Ok(node)
    }

    /// Removes a node and its subtree.
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        self.check_alive(node)?;
        let parent = self
            .parent(node)
            .ok_or_else(|| LayoutError::validation("cannot remove the document root"))?;
        self.nodes[parent.0].children.retain(|&c| c != node);
        for n in std::iter::once(node).chain(self.descendants(node)) {
            self.nodes[n.0].alive = false;
        }
        self.nodes[node.0].parent = None;
        Ok(())
    }

    /// Removes several nodes, returning how many were removed. Nodes already
    /// gone (e.g. inside an earlier removed subtree) are skipped.
    pub fn remove_nodes(&mut self, nodes: &[NodeId]) -> Result<usize> {
        let mut removed = 0;
        for &n in nodes {
            if self.is_alive(n) {
                self.remove_node(n)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Rearranges some children of `parent` into the given order. The listed
    /// nodes take over the positions they occupied before; other children
    /// stay where they are.
    pub fn reorder_children(&mut self, parent: NodeId, order: &[NodeId]) -> Result<()> {
        self.check_alive(parent)?;
        let children = &self.nodes[parent.0].children;
        let slots: Vec<usize> = children
            .iter()
            .enumerate()
            .filter(|(_, c)| order.contains(*c))
            .map(|(i, _)| i)
            .collect();
        if slots.len() != order.len() {
            return Err(LayoutError::validation(
                "reorder_children: nodes must be distinct children of the parent",
            ));
        }
        let children = &mut self.nodes[parent.0].children;
        for (&slot, &node) in slots.iter().zip(order) {
            children[slot] = node;
        }
        Ok(())
    }

    /// Copies the subtree of `node` from `source` into this document.
    ///
    /// Fails without modifying the document when any id of the copied
    /// subtree is already present.
    pub fn import_subtree(
        &mut self,
        source: &LayoutDocument,
        node: NodeId,
        target: NodeId,
        mode: InsertMode,
    ) -> Result<NodeId> {
        source.check_alive(node)?;
        for n in std::iter::once(node).chain(source.descendants(node)) {
            if let Some(id) = source.id(n) {
                if self.find_by_id(id).is_some() {
                    return Err(LayoutError::validation(format!("id already exists: {id}")));
                }
            }
        }

        let copied = self.create_node(source.kind(node), None, target, mode)?;
        self.nodes[copied.0].attrs = source.nodes[node.0].attrs.clone();
        self.nodes[copied.0].text = source.nodes[node.0].text.clone();

        let mut stack: Vec<(NodeId, NodeId)> = vec![(node, copied)];
        while let Some((src, dst)) = stack.pop() {
            for &child in source.children(src) {
                let new = self.push_child(dst, source.kind(child));
                self.nodes[new.0].attrs = source.nodes[child.0].attrs.clone();
                self.nodes[new.0].text = source.nodes[child.0].text.clone();
                stack.push((child, new));
            }
        }
        Ok(copied)
    }

    /// Number of nodes matched by a selector path.
    pub fn count(&self, path: &str, base: Option<NodeId>) -> Result<usize> {
        Ok(self.select(path, base)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_insertion_order() {
        let mut doc = LayoutDocument::new("test");
        let root = doc.root();
        let a = doc
            .create_node(ElementKind::Page, Some("a"), root, InsertMode::Child)
            .unwrap();
        let c = doc
            .create_node(ElementKind::Page, Some("c"), a, InsertMode::NextSibling)
            .unwrap();
        let b = doc
            .create_node(ElementKind::Page, Some("b"), c, InsertMode::PrevSibling)
            .unwrap();
        let pages = doc.children_of_kind(root, ElementKind::Page);
        assert_eq!(pages, vec![a, b, c]);
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut doc = LayoutDocument::new("test");
        let root = doc.root();
        doc.create_node(ElementKind::Page, Some("p"), root, InsertMode::Child)
            .unwrap();
        assert!(doc
            .create_node(ElementKind::Page, Some("p"), root, InsertMode::Child)
            .is_err());
    }

    #[test]
    fn removed_subtree_is_dead() {
        let mut doc = LayoutDocument::new("test");
        let root = doc.root();
        let page = doc
            .create_node(ElementKind::Page, None, root, InsertMode::Child)
            .unwrap();
        let region = doc
            .create_node(ElementKind::TextRegion, Some("r1"), page, InsertMode::Child)
            .unwrap();
        doc.remove_node(page).unwrap();
        assert!(!doc.is_alive(region));
        assert!(doc.find_by_id("r1").is_none());
        assert!(doc.remove_node(root).is_err());
    }
}
