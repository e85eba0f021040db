use super::{DocumentTree, NodeId};

/// A point in the text content of a node.
///
/// For text nodes `offset` counts characters of the node's data; for
/// elements it counts characters of the element's text content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Which text node wins when a global offset sits on a node boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    /// Start of the following text node (range starts)
    Forward,
    /// End of the preceding text node (range ends)
    Backward,
}

impl DocumentTree {
    /// Whether `position` names a valid point of its node.
    pub fn is_valid_position(&self, position: Position) -> bool {
        position.node.index() < self.node_count()
            && position.offset <= self.text_len(position.node)
    }

    /// Global offset of a position: characters of `root`'s text content
    /// before it.
    ///
    /// `None` when the node is not under `root` or the offset is out of range.
    pub fn global_offset(&self, root: NodeId, position: Position) -> Option<usize> {
        if !self.is_valid_position(position) || !self.contains(root, position.node) {
            return None;
        }

        let mut offset = position.offset;
        let mut current = position.node;
        while current != root {
            let parent = self.parent(current)?;
            offset += self
                .children(parent)
                .iter()
                .take_while(|&&sibling| sibling != current)
                .map(|&sibling| self.text_len(sibling))
                .sum::<usize>();
            current = parent;
        }
        Some(offset)
    }

    /// Text-node position for a global offset under `root`.
    ///
    /// Empty text nodes are never chosen. `None` when the offset lies past
    /// the end of the text or there is no text at all.
    pub fn position_at(&self, root: NodeId, offset: usize, affinity: Affinity) -> Option<Position> {
        let mut consumed = 0;
        let mut last_text = None;

        for node in self.text_nodes(root) {
            let len = self.text_len(node);
            if len == 0 {
                continue;
            }
            let end = consumed + len;
            let inside = match affinity {
                Affinity::Forward => offset < end,
                Affinity::Backward => offset <= end,
            };
            if inside && offset >= consumed {
                return Some(Position::new(node, offset - consumed));
            }
            consumed = end;
            last_text = Some((node, len));
        }

        // Forward affinity at the very end of the document
        match last_text {
            Some((node, len)) if offset == consumed => Some(Position::new(node, len)),
            _ => None,
        }
    }

    /// Characters of `root`'s text content in `[start, end)`.
    pub fn text_between(&self, root: NodeId, start: usize, end: usize) -> String {
        if start >= end {
            return String::new();
        }
        self.text_content(root)
            .chars()
            .skip(start)
            .take(end - start)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// `<p>ab<i>cd</i>ef</p>`
    fn sample() -> (DocumentTree, Vec<NodeId>) {
        let mut tree = DocumentTree::new("#document");
        let p = tree.append_element(tree.root(), "p", Vec::new());
        let ab = tree.append_text(p, "ab");
        let i = tree.append_element(p, "i", Vec::new());
        let cd = tree.append_text(i, "cd");
        let ef = tree.append_text(p, "ef");
        (tree, vec![p, ab, i, cd, ef])
    }

    #[test]
    fn test_global_offset_of_nested_text() {
        let (tree, nodes) = sample();
        let root = tree.root();
        assert_eq!(tree.global_offset(root, Position::new(nodes[3], 1)), Some(3));
        assert_eq!(tree.global_offset(root, Position::new(nodes[4], 2)), Some(6));
        assert_eq!(tree.global_offset(root, Position::new(nodes[2], 0)), Some(2));
    }

    #[test]
    fn test_global_offset_relative_to_inner_root() {
        let (tree, nodes) = sample();
        assert_eq!(tree.global_offset(nodes[2], Position::new(nodes[3], 2)), Some(2));
        assert_eq!(tree.global_offset(nodes[2], Position::new(nodes[4], 0)), None);
    }

    #[test]
    fn test_global_offset_rejects_out_of_range() {
        let (tree, nodes) = sample();
        assert_eq!(tree.global_offset(tree.root(), Position::new(nodes[1], 3)), None);
    }

    #[rstest]
    #[case(0, Affinity::Forward, 1, 0)]
    #[case(2, Affinity::Forward, 3, 0)]
    #[case(2, Affinity::Backward, 1, 2)]
    #[case(0, Affinity::Backward, 1, 0)]
    #[case(5, Affinity::Forward, 4, 1)]
    #[case(6, Affinity::Forward, 4, 2)]
    #[case(6, Affinity::Backward, 4, 2)]
    fn test_position_at(
        #[case] offset: usize,
        #[case] affinity: Affinity,
        #[case] node_index: usize,
        #[case] local: usize,
    ) {
        let (tree, nodes) = sample();
        let position = tree.position_at(tree.root(), offset, affinity).unwrap();
        assert_eq!(position, Position::new(nodes[node_index], local));
    }

    #[test]
    fn test_position_past_end_is_none() {
        let (tree, _) = sample();
        assert_eq!(tree.position_at(tree.root(), 7, Affinity::Forward), None);
    }

    #[test]
    fn test_text_between() {
        let (tree, _) = sample();
        assert_eq!(tree.text_between(tree.root(), 1, 5), "bcde");
        assert_eq!(tree.text_between(tree.root(), 4, 4), "");
    }
}
