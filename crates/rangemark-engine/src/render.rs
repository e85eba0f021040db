//! # Highlight Renderer
//!
//! Draws the ranges of a [`RangeStore`] into a [`DocumentTree`] by wrapping
//! the covered text in marker elements.
//!
//! Stored boundaries address the tree as it was before any marker existed,
//! so every render starts by reverting the previous one. Each range is
//! then resolved to a span of global offsets, and the spans are wrapped
//! back to front (furthest start first). Wrapping splits text nodes and
//! adds elements but never changes global offsets, so a span resolved up
//! front stays correct no matter how many markers went in before it.

use log::{debug, warn};

use crate::addressing;
use crate::ranges::{HighlightRange, RangeId, RangeStore, Span};
use crate::tree::{DocumentTree, NodeId};

pub const DEFAULT_MARKER_TAG: &str = "mark";
pub const DEFAULT_MARKER_CLASS: &str = "highlight";
pub const DEFAULT_ID_ATTRIBUTE: &str = "data-highlight-id";

/// How marker elements look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerStyle {
    pub tag: String,
    pub class: String,
    /// Attribute carrying the range id
    pub id_attribute: String,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            tag: DEFAULT_MARKER_TAG.to_string(),
            class: DEFAULT_MARKER_CLASS.to_string(),
            id_attribute: DEFAULT_ID_ATTRIBUTE.to_string(),
        }
    }
}

/// Outcome of a render pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Ranges drawn, in the order they were applied
    pub applied: Vec<RangeId>,
    /// Ranges whose boundaries no longer resolve
    pub skipped: Vec<RangeId>,
}

/// Part of a text node covered by a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextHighlight {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
    pub range: RangeId,
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    style: MarkerStyle,
}

impl Renderer {
    pub fn new(style: MarkerStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &MarkerStyle {
        &self.style
    }

    /// Whether `node` is a marker element this renderer inserted.
    pub fn is_marker(&self, tree: &DocumentTree, node: NodeId) -> bool {
        tree.tag(node)
            .is_some_and(|tag| tag.eq_ignore_ascii_case(&self.style.tag))
            && tree.attribute(node, &self.style.id_attribute).is_some()
    }

    /// Remove every marker under `root`, restoring the original structure.
    ///
    /// Returns the number of markers removed.
    pub fn revert(&self, tree: &mut DocumentTree, root: NodeId) -> usize {
        let markers: Vec<NodeId> = tree
            .descendants(root)
            .into_iter()
            .filter(|&node| self.is_marker(tree, node))
            .collect();

        // Outer markers come first, so no parent recorded here is a marker
        let mut parents: Vec<NodeId> = Vec::new();
        for &marker in &markers {
            match tree.unwrap(marker) {
                Some(parent) if !parents.contains(&parent) => parents.push(parent),
                _ => {}
            }
        }
        for parent in parents {
            tree.normalize(parent);
        }

        if !markers.is_empty() {
            debug!("Reverted {} highlight marker(s)", markers.len());
        }
        markers.len()
    }

    /// Revert, then wrap the text of every resolvable range in markers.
    pub fn render(&self, tree: &mut DocumentTree, root: NodeId, store: &RangeStore) -> RenderReport {
        self.revert(tree, root);

        let (mut resolved, skipped) = resolve_all(tree, root, store);
        resolved.sort_by(|(a_span, a_order, _), (b_span, b_order, _)| {
            b_span.start.cmp(&a_span.start).then(b_order.cmp(a_order))
        });

        let mut report = RenderReport {
            applied: Vec::with_capacity(resolved.len()),
            skipped,
        };
        for (span, _, id) in resolved {
            self.wrap_span(tree, root, span, id);
            report.applied.push(id);
        }

        debug!(
            "Rendered {} highlight(s), skipped {}",
            report.applied.len(),
            report.skipped.len()
        );
        report
    }

    /// Text segments each range covers, without touching the tree.
    ///
    /// `tree` must be free of markers. Segments are listed in document
    /// order, ranges with a smaller order first on equal segments.
    pub fn highlight_spans(
        &self,
        tree: &DocumentTree,
        root: NodeId,
        store: &RangeStore,
    ) -> (Vec<TextHighlight>, RenderReport) {
        let (resolved, skipped) = resolve_all(tree, root, store);

        let mut highlights: Vec<(u64, TextHighlight)> = Vec::new();
        let mut applied = Vec::with_capacity(resolved.len());
        for (span, order, id) in resolved {
            highlights.extend(
                text_segments(tree, root, span)
                    .into_iter()
                    .map(|(node, start, end)| {
                        (
                            order,
                            TextHighlight {
                                node,
                                start,
                                end,
                                range: id,
                            },
                        )
                    }),
            );
            applied.push(id);
        }

        let order_in_document: Vec<NodeId> = tree.text_nodes(root);
        highlights.sort_by_key(|(order, h)| {
            let position = order_in_document.iter().position(|&n| n == h.node);
            (position, h.start, *order)
        });

        (
            highlights.into_iter().map(|(_, h)| h).collect(),
            RenderReport { applied, skipped },
        )
    }

    /// Range id of the innermost marker enclosing `node`.
    pub fn marker_id_at(&self, tree: &DocumentTree, node: NodeId) -> Option<RangeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.is_marker(tree, id) {
                return tree
                    .attribute(id, &self.style.id_attribute)
                    .and_then(|value| value.parse().ok());
            }
            current = tree.parent(id);
        }
        None
    }

    fn marker_attributes(&self, id: RangeId) -> Vec<(String, String)> {
        vec![
            ("class".to_string(), self.style.class.clone()),
            (self.style.id_attribute.clone(), id.to_string()),
        ]
    }

    /// Wrap each text segment of `span` in its own marker, last segment first.
    fn wrap_span(&self, tree: &mut DocumentTree, root: NodeId, span: Span, id: RangeId) {
        for (node, start, end) in text_segments(tree, root, span).into_iter().rev() {
            if end < tree.text_len(node) {
                tree.split_text(node, end);
            }
            let target = if start > 0 {
                match tree.split_text(node, start) {
                    Some(tail) => tail,
                    None => continue,
                }
            } else {
                node
            };

            let (Some(parent), Some(index)) = (tree.parent(target), tree.index_in_parent(target))
            else {
                continue;
            };
            tree.wrap_children(
                parent,
                index..index + 1,
                &self.style.tag,
                self.marker_attributes(id),
            );
        }
    }
}

/// Spans of every resolvable range as `(span, order, id)`, plus the ids of
/// ranges that did not resolve.
fn resolve_all(
    tree: &DocumentTree,
    root: NodeId,
    store: &RangeStore,
) -> (Vec<(Span, u64, RangeId)>, Vec<RangeId>) {
    let mut resolved = Vec::with_capacity(store.len());
    let mut skipped = Vec::new();

    for range in store.iter() {
        match resolve_span(tree, root, range) {
            Some(span) if !span.is_empty() => resolved.push((span, range.order, range.id)),
            _ => {
                warn!(
                    "Skipping highlight {}: '{}'..'{}' no longer resolves",
                    range.id, range.start.address, range.end.address
                );
                skipped.push(range.id);
            }
        }
    }
    (resolved, skipped)
}

fn resolve_span(tree: &DocumentTree, root: NodeId, range: &HighlightRange) -> Option<Span> {
    let start = addressing::decode_boundary(tree, &range.start, root)?;
    let end = addressing::decode_boundary(tree, &range.end, root)?;
    Some(Span::new(
        tree.global_offset(root, start)?,
        tree.global_offset(root, end)?,
    ))
}

/// `(text node, local start, local end)` for every non-empty part of a
/// text node inside `span`, in document order.
fn text_segments(tree: &DocumentTree, root: NodeId, span: Span) -> Vec<(NodeId, usize, usize)> {
    let mut segments = Vec::new();
    let mut consumed = 0;

    for node in tree.text_nodes(root) {
        let len = tree.text_len(node);
        let node_span = Span {
            start: consumed,
            end: consumed + len,
        };
        consumed += len;

        if let Some(covered) = node_span.intersection(span) {
            segments.push((
                node,
                covered.start - node_span.start,
                covered.end - node_span.start,
            ));
        }
        if consumed >= span.end {
            break;
        }
    }
    segments
}
