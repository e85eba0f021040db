//! # Address Codec
//!
//! Converts a node (or a [`Position`] in it) into a structure-relative
//! [`Address`] and back. An address records, for every level between a
//! root and the target, the 1-based index of the target among its
//! same-typed siblings: the n-th `<p>`, the n-th text node. That makes it
//! independent of node identities, so it can be persisted and resolved
//! against a freshly parsed copy of the same document.
//!
//! Two serializations exist and a deployment picks one ([`AddressKind`]):
//!
//! | kind  | example              | root  |
//! |-------|----------------------|-------|
//! | Path  | `p:2/#text:1`        | `""`  |
//! | Query | `/p[2]/text()[1]`    | `.`   |
//!
//! Addresses are only stable while the structure is. Highlight wrappers
//! shift sibling indices, so callers revert them before encoding or
//! decoding (see [`crate::render::Renderer::revert`]).
//!
//! Decoding never errors on a missing node: `None` is the expected outcome
//! once a document has drifted away from the one an address was made for.

mod path;
mod query;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::tree::{DocumentTree, NodeId, NodeKind, Position};

pub use path::PathAddress;
pub use query::{QueryAddress, QueryStep};

/// Which serialization a deployment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressKind {
    #[default]
    Path,
    Query,
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressKind::Path => write!(f, "path"),
            AddressKind::Query => write!(f, "query"),
        }
    }
}

impl FromStr for AddressKind {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "path" => Ok(AddressKind::Path),
            "query" | "xpath" => Ok(AddressKind::Query),
            _ => Err(AddressParseError::UnknownKind(s.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("Malformed address step '{step}' in '{address}'")]
    MalformedStep { address: String, step: String },
    #[error("Address indices start at 1: '{address}'")]
    ZeroIndex { address: String },
    #[error("Query address must start with '/' or './': '{0}'")]
    NotRooted(String),
    #[error("Unknown address kind: {0}")]
    UnknownKind(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressingError {
    #[error("Node {node:?} is not contained in root {root:?}")]
    NotUnderRoot { node: NodeId, root: NodeId },
    #[error("Offset {offset} is beyond the {len} characters of node {node:?}")]
    OffsetOutOfBounds {
        node: NodeId,
        offset: usize,
        len: usize,
    },
    #[error("Document has no text at offset {0}")]
    NoTextAt(usize),
    #[error("Node {0:?} cannot be addressed")]
    Unaddressable(NodeId),
}

/// One level of an address as computed from the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// n-th element child with this tag (1-based)
    Element { tag: String, index: usize },
    /// n-th text child (1-based)
    Text { index: usize },
}

/// A structure-relative node address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Path(PathAddress),
    Query(QueryAddress),
}

impl Address {
    pub fn kind(&self) -> AddressKind {
        match self {
            Address::Path(_) => AddressKind::Path,
            Address::Query(_) => AddressKind::Query,
        }
    }

    /// Parse the serialized form of an address of the given kind.
    pub fn parse(kind: AddressKind, s: &str) -> Result<Self, AddressParseError> {
        match kind {
            AddressKind::Path => s.parse().map(Address::Path),
            AddressKind::Query => s.parse().map(Address::Query),
        }
    }

    fn from_steps(kind: AddressKind, steps: Vec<Step>) -> Self {
        match kind {
            AddressKind::Path => Address::Path(PathAddress::new(steps)),
            AddressKind::Query => Address::Query(QueryAddress::from_steps(steps)),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Path(path) => path.fmt(f),
            Address::Query(query) => query.fmt(f),
        }
    }
}

/// A persisted position: an address plus a character offset in that node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    pub address: Address,
    pub offset: usize,
}

impl Boundary {
    pub fn new(address: Address, offset: usize) -> Self {
        Self { address, offset }
    }
}

/// Encode the address of `node` relative to `root`.
pub fn encode(
    tree: &DocumentTree,
    node: NodeId,
    root: NodeId,
    kind: AddressKind,
) -> Result<Address, AddressingError> {
    if !tree.contains(root, node) {
        return Err(AddressingError::NotUnderRoot { node, root });
    }

    let mut steps = Vec::new();
    let mut current = node;
    while current != root {
        let parent = tree
            .parent(current)
            .ok_or(AddressingError::NotUnderRoot { node, root })?;
        let step = step_for(tree, parent, current).ok_or(AddressingError::Unaddressable(node))?;
        steps.push(step);
        current = parent;
    }
    steps.reverse();

    Ok(Address::from_steps(kind, steps))
}

/// Encode a position as an address plus offset.
pub fn encode_position(
    tree: &DocumentTree,
    position: Position,
    root: NodeId,
    kind: AddressKind,
) -> Result<Boundary, AddressingError> {
    let len = tree.text_len(position.node);
    if position.offset > len {
        return Err(AddressingError::OffsetOutOfBounds {
            node: position.node,
            offset: position.offset,
            len,
        });
    }
    let address = encode(tree, position.node, root, kind)?;
    Ok(Boundary::new(address, position.offset))
}

/// Resolve an address against `root`. `None` is a decode miss.
pub fn decode(tree: &DocumentTree, address: &Address, root: NodeId) -> Option<NodeId> {
    match address {
        Address::Path(path) => path.resolve(tree, root),
        Address::Query(query) => query.resolve(tree, root),
    }
}

/// Resolve a boundary to a position, checking the offset still fits.
pub fn decode_boundary(tree: &DocumentTree, boundary: &Boundary, root: NodeId) -> Option<Position> {
    let node = decode(tree, &boundary.address, root)?;
    let position = Position::new(node, boundary.offset);
    (boundary.offset <= tree.text_len(node)).then_some(position)
}

fn step_for(tree: &DocumentTree, parent: NodeId, node: NodeId) -> Option<Step> {
    let siblings = tree.children(parent);
    let preceding = siblings.iter().take_while(|&&sibling| sibling != node);

    match tree.kind(node) {
        NodeKind::Element { tag, .. } => Some(Step::Element {
            tag: tag.clone(),
            index: 1 + preceding
                .filter(|&&sibling| tree.tag(sibling).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
                .count(),
        }),
        NodeKind::Text(_) => Some(Step::Text {
            index: 1 + preceding.filter(|&&sibling| tree.is_text(sibling)).count(),
        }),
        NodeKind::Comment(_) => None,
    }
}

/// n-th (1-based) child of `parent` accepted by `matches`.
pub(crate) fn nth_child(
    tree: &DocumentTree,
    parent: NodeId,
    index: usize,
    matches: impl Fn(NodeId) -> bool,
) -> Option<NodeId> {
    tree.children(parent)
        .iter()
        .copied()
        .filter(|&child| matches(child))
        .nth(index.checked_sub(1)?)
}
