//! Arena-backed document tree.
//!
//! The tree is the engine's stand-in for a browser DOM: ordered element
//! and text nodes under a single root. Nodes are never freed; removing a
//! node detaches it, so a [`NodeId`] handed out once stays valid for the
//! tree's lifetime even if it is no longer reachable from the root.

mod position;

pub use position::{Affinity, Position};

/// Index of a node in the tree arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Ordered, rooted tree of element and text nodes.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl DocumentTree {
    /// Create a tree holding a single, empty root element.
    pub fn new(root_tag: &str) -> Self {
        let root = NodeData {
            kind: NodeKind::Element {
                tag: root_tag.to_string(),
                attributes: Vec::new(),
            },
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena, including detached ones.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Text(_))
    }

    /// Tag name of an element node.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Character data of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Position of a node among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Length of the node's text content in characters.
    pub fn text_len(&self, id: NodeId) -> usize {
        match self.kind(id) {
            NodeKind::Text(text) => text.chars().count(),
            NodeKind::Element { .. } => self
                .children(id)
                .iter()
                .map(|&child| self.text_len(child))
                .sum(),
            NodeKind::Comment(_) => 0,
        }
    }

    /// Concatenated text of the node and all its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut content = String::new();
        for node in self.text_nodes(id) {
            if let Some(text) = self.text(node) {
                content.push_str(text);
            }
        }
        content
    }

    /// Whether `node` is `ancestor` or lies below it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// All nodes below `id` in document (pre-)order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Text nodes at or below `id` in document order.
    pub fn text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        if self.is_text(id) {
            return vec![id];
        }
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.is_text(n))
            .collect()
    }

    // ============ Mutation ============

    fn push_node(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent,
            children: Vec::new(),
        });
        id
    }

    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: Vec<(String, String)>,
    ) -> NodeId {
        debug_assert!(self.tag(parent).is_some(), "only elements have children");
        let kind = NodeKind::Element {
            tag: tag.to_string(),
            attributes,
        };
        let id = self.push_node(kind, Some(parent));
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        debug_assert!(self.tag(parent).is_some(), "only elements have children");
        let id = self.push_node(NodeKind::Text(text.to_string()), Some(parent));
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn append_comment(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.push_node(NodeKind::Comment(text.to_string()), Some(parent));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Split a text node at character offset `at`.
    ///
    /// The original node keeps `[0, at)`; the returned node holds the rest and
    /// is inserted as the next sibling. Returns `None` (and changes nothing)
    /// when `at` is not strictly inside the node or the node is detached.
    pub fn split_text(&mut self, id: NodeId, at: usize) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        let NodeKind::Text(text) = self.kind(id) else {
            return None;
        };
        let len = text.chars().count();
        if at == 0 || at >= len {
            return None;
        }

        let byte_at = text
            .char_indices()
            .nth(at)
            .map_or(text.len(), |(byte, _)| byte);
        let tail = text[byte_at..].to_string();
        if let NodeKind::Text(text) = &mut self.nodes[id.0].kind {
            text.truncate(byte_at);
        }

        let new_node = self.push_node(NodeKind::Text(tail), Some(parent));
        self.nodes[parent.0].children.insert(index + 1, new_node);
        Some(new_node)
    }

    /// Move `parent`'s children in `range` under a new element that takes
    /// their place.
    pub fn wrap_children(
        &mut self,
        parent: NodeId,
        range: std::ops::Range<usize>,
        tag: &str,
        attributes: Vec<(String, String)>,
    ) -> NodeId {
        let kind = NodeKind::Element {
            tag: tag.to_string(),
            attributes,
        };
        let wrapper = self.push_node(kind, Some(parent));
        let moved: Vec<NodeId> = self.nodes[parent.0]
            .children
            .splice(range.clone(), [wrapper])
            .collect();
        for &child in &moved {
            self.nodes[child.0].parent = Some(wrapper);
        }
        self.nodes[wrapper.0].children = moved;
        wrapper
    }

    /// Replace an element by its children. Returns the former parent.
    pub fn unwrap(&mut self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for &child in &children {
            self.nodes[child.0].parent = Some(parent);
        }
        let _removed: Vec<NodeId> = self.nodes[parent.0]
            .children
            .splice(index..=index, children)
            .collect();
        self.nodes[id.0].parent = None;
        Some(parent)
    }

    /// Merge adjacent text children of `id` and drop empty ones.
    pub fn normalize(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());

        for child in children {
            let NodeKind::Text(text) = &self.nodes[child.0].kind else {
                kept.push(child);
                continue;
            };
            if text.is_empty() {
                self.nodes[child.0].parent = None;
                continue;
            }
            match kept.last() {
                Some(&previous) if self.is_text(previous) => {
                    let text = text.clone();
                    if let NodeKind::Text(previous_text) = &mut self.nodes[previous.0].kind {
                        previous_text.push_str(&text);
                    }
                    self.nodes[child.0].parent = None;
                }
                _ => kept.push(child),
            }
        }

        self.nodes[id.0].children = kept;
    }
}
