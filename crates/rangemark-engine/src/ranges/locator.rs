use super::Span;
use crate::addressing::{self, AddressKind, AddressingError, Boundary};
use crate::tree::{Affinity, DocumentTree, NodeId};

/// Translates between persisted boundaries and global offsets.
pub trait Locator {
    /// Global offset of a boundary, `None` on a decode miss.
    fn offset_of(&self, boundary: &Boundary) -> Option<usize>;

    /// Boundary for a global offset.
    fn boundary_at(&self, offset: usize, affinity: Affinity) -> Result<Boundary, AddressingError>;

    /// Document text covered by a span.
    fn text_in(&self, span: Span) -> String;
}

/// [`Locator`] over a structurally original (reverted) document tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeLocator<'a> {
    tree: &'a DocumentTree,
    root: NodeId,
    kind: AddressKind,
}

impl<'a> TreeLocator<'a> {
    pub fn new(tree: &'a DocumentTree, root: NodeId, kind: AddressKind) -> Self {
        Self { tree, root, kind }
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }
}

impl Locator for TreeLocator<'_> {
    fn offset_of(&self, boundary: &Boundary) -> Option<usize> {
        let position = addressing::decode_boundary(self.tree, boundary, self.root)?;
        self.tree.global_offset(self.root, position)
    }

    fn boundary_at(&self, offset: usize, affinity: Affinity) -> Result<Boundary, AddressingError> {
        let position = self
            .tree
            .position_at(self.root, offset, affinity)
            .ok_or(AddressingError::NoTextAt(offset))?;
        addressing::encode_position(self.tree, position, self.root, self.kind)
    }

    fn text_in(&self, span: Span) -> String {
        self.tree.text_between(self.root, span.start, span.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_html;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(AddressKind::Path, 4, Affinity::Forward, "p:1/b:1/#text:1", 0)]
    #[case(AddressKind::Path, 4, Affinity::Backward, "p:1/#text:1", 4)]
    #[case(AddressKind::Query, 8, Affinity::Backward, "/p[1]/text()[2]", 1)]
    fn test_boundary_at(
        #[case] kind: AddressKind,
        #[case] offset: usize,
        #[case] affinity: Affinity,
        #[case] address: &str,
        #[case] local: usize,
    ) {
        let tree = parse_html("<p>one <b>two</b> three</p>");
        let locator = TreeLocator::new(&tree, tree.root(), kind);

        let boundary = locator.boundary_at(offset, affinity).unwrap();

        assert_eq!(boundary.address.to_string(), address);
        assert_eq!(boundary.offset, local);
        assert_eq!(locator.offset_of(&boundary), Some(offset));
    }

    #[test]
    fn test_boundary_past_end_fails() {
        let tree = parse_html("<p>abc</p>");
        let locator = TreeLocator::new(&tree, tree.root(), AddressKind::Path);
        assert_eq!(
            locator.boundary_at(4, Affinity::Forward),
            Err(AddressingError::NoTextAt(4))
        );
    }

    #[test]
    fn test_text_in_crosses_elements() {
        let tree = parse_html("<p>one <b>two</b> three</p>");
        let locator = TreeLocator::new(&tree, tree.root(), AddressKind::Path);
        assert_eq!(locator.text_in(Span::new(2, 9)), "e two t");
    }
}
