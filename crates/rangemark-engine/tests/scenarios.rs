use pretty_assertions::assert_eq;
use rangemark_engine::addressing::{decode_boundary, encode_position};
use rangemark_engine::{
    AddressKind, HighlightSession, OverlapPolicy, PersistedRange, RangeError, RangeId, RangeStore,
    RecordedEvents, SessionError, Span, TreeLocator, parse_html,
};
use rangemark_engine::{DocumentTree, Position};
use rstest::rstest;

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!(
        "{}/tests/fixtures/{name}.html",
        env!("CARGO_MANIFEST_DIR")
    ))
    .unwrap()
}

/// Global offset of the first occurrence of `needle`.
fn offset_of(tree: &DocumentTree, needle: &str) -> usize {
    let content = tree.text_content(tree.root());
    let byte = content.find(needle).unwrap();
    content[..byte].chars().count()
}

fn session(kind: AddressKind, policy: OverlapPolicy) -> HighlightSession<RecordedEvents> {
    HighlightSession::from_html(&fixture("article"), kind, RecordedEvents::default())
        .with_store(RangeStore::new(policy))
}

fn spans(session: &HighlightSession<RecordedEvents>) -> Vec<Span> {
    let mut tree = session.tree().clone();
    let renderer = rangemark_engine::Renderer::default();
    let root = tree.root();
    renderer.revert(&mut tree, root);
    let locator = TreeLocator::new(&tree, tree.root(), session.kind());
    let mut spans: Vec<Span> = session
        .store()
        .iter()
        .filter_map(|range| range.span(&locator))
        .collect();
    spans.sort();
    spans
}

#[rstest]
fn positions_roundtrip_through_addresses(
    #[values(AddressKind::Path, AddressKind::Query)] kind: AddressKind,
) {
    let tree = parse_html(&fixture("article"));
    let root = tree.root();

    for node in tree.text_nodes(root) {
        for offset in 0..=tree.text_len(node) {
            let position = Position::new(node, offset);
            let boundary = encode_position(&tree, position, root, kind).unwrap();
            assert_eq!(decode_boundary(&tree, &boundary, root), Some(position));
        }
    }
}

#[rstest]
fn adding_a_selection_caches_its_text(
    #[values(AddressKind::Path, AddressKind::Query)] kind: AddressKind,
) {
    let mut session = session(kind, OverlapPolicy::Reject);
    let start = offset_of(session.tree(), "React");

    let outcome = session.select_offsets(start, start + 5).unwrap();

    assert_eq!(outcome.range.text, "React");
    assert_eq!(session.store().len(), 1);
    assert!(session.html().contains(r#"<p><mark class="highlight" data-highlight-id="1">React</mark> is great</p>"#));
}

#[test]
fn overlapping_selections_merge_under_merge_policy() {
    let mut session = session(AddressKind::Path, OverlapPolicy::Merge);
    let start = offset_of(session.tree(), "React");

    session.select_offsets(start, start + 5).unwrap();
    session.select_offsets(start + 3, start + 8).unwrap();

    assert_eq!(spans(&session), vec![Span::new(start, start + 8)]);
    assert_eq!(session.events().deleted, vec![RangeId(1)]);
}

#[test]
fn overlapping_selection_is_refused_under_reject_policy() {
    let mut session = session(AddressKind::Query, OverlapPolicy::Reject);
    let start = offset_of(session.tree(), "React");
    session.select_offsets(start, start + 5).unwrap();

    let result = session.select_offsets(start + 3, start + 8);

    assert!(matches!(
        result,
        Err(SessionError::Range(RangeError::Overlap {
            existing: RangeId(1)
        }))
    ));
    assert_eq!(spans(&session), vec![Span::new(start, start + 5)]);
}

#[test]
fn erasing_inside_a_range_splits_it() {
    let mut session = session(AddressKind::Path, OverlapPolicy::Reject);
    let start = offset_of(session.tree(), "React");
    session.select_offsets(start, start + 10).unwrap();

    let outcome = session.erase_offsets(start + 3, start + 6).unwrap();

    assert_eq!(outcome.removed.len(), 1);
    assert_eq!(
        spans(&session),
        vec![
            Span::new(start, start + 3),
            Span::new(start + 6, start + 10)
        ]
    );
    // The residuals plus the erased part rebuild the original span
    let mut pieces = spans(&session);
    pieces.push(Span::new(start + 3, start + 6));
    assert_eq!(
        rangemark_engine::ranges::merge_spans(pieces),
        vec![Span::new(start, start + 10)]
    );
}

#[test]
fn deleting_twice_is_a_noop() {
    let mut session = session(AddressKind::Path, OverlapPolicy::Reject);
    let start = offset_of(session.tree(), "React");
    let id = session.select_offsets(start, start + 5).unwrap().range.id;

    assert!(session.delete(id).is_some());
    assert!(session.delete(id).is_none());
    assert!(session.store().is_empty());
    assert_eq!(session.events().deleted, vec![id]);
}

#[test]
fn restore_drops_stale_records_and_keeps_the_rest() {
    let mut original = session(AddressKind::Query, OverlapPolicy::Reject);
    let react = offset_of(original.tree(), "React");
    let wonderful = offset_of(original.tree(), "wonderful");
    original.select_offsets(react, react + 5).unwrap();
    original.select_offsets(wonderful, wonderful + 9).unwrap();

    let mut records: Vec<PersistedRange> = original.records();
    records[0].start_address = "/html[1]/body[1]/p[9]/text()[1]".to_string();

    let mut restored = session(AddressKind::Query, OverlapPolicy::Reject);
    let report = restored.restore(records);

    assert_eq!(report.restored, vec![RangeId(2)]);
    assert_eq!(report.dropped, 1);
    assert_eq!(restored.events().errors.len(), 1);
    assert!(restored.html().contains(r#"<em><mark class="highlight" data-highlight-id="2">wonderful</mark></em>"#));
}

#[test]
fn restored_ids_are_not_reused() {
    let mut original = session(AddressKind::Path, OverlapPolicy::Reject);
    let react = offset_of(original.tree(), "React");
    original.select_offsets(react, react + 5).unwrap();
    original.select_offsets(react + 6, react + 8).unwrap();
    let json = original.records_json().unwrap();

    let mut restored = session(AddressKind::Path, OverlapPolicy::Reject);
    restored.restore_json(&json).unwrap();
    let next = restored.select_offsets(react + 9, react + 14).unwrap();

    assert_eq!(next.range.id, RangeId(3));
    assert_eq!(next.range.order, 3);
}

#[test]
fn highlights_across_list_items_and_comments() {
    let mut session = session(AddressKind::Path, OverlapPolicy::Reject);
    let start = offset_of(session.tree(), "world");
    let end = offset_of(session.tree(), "second") + 3;

    let outcome = session.select_offsets(start, end).unwrap();

    assert!(outcome.range.text.starts_with("world"));
    assert!(outcome.range.text.ends_with("sec"));
    assert_eq!(session.last_render().applied, vec![outcome.range.id]);
    assert!(session.html().contains("<!-- editor note -->"));
}

#[test]
fn clear_twice_leaves_the_same_empty_state() {
    let mut session = session(AddressKind::Path, OverlapPolicy::Reject);
    let start = offset_of(session.tree(), "Hello");
    session.select_offsets(start, start + 5).unwrap();
    let plain = HighlightSession::from_html(&fixture("article"), AddressKind::Path, ()).html();

    assert_eq!(session.clear(), vec![RangeId(1)]);
    assert_eq!(session.clear(), Vec::<RangeId>::new());
    assert_eq!(session.html(), plain);
}
