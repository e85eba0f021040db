use std::collections::BTreeMap;

use chrono::Utc;
use log::debug;

use super::{
    AddOutcome, HighlightRange, Locator, OverlapPolicy, RangeError, RangeId, ReconcileOutcome,
    Span,
};
use crate::addressing::Boundary;
use crate::tree::Affinity;

const INITIAL_ORDER: u64 = 1;
const INITIAL_ID: u64 = 1;
pub const DEFAULT_MERGE_SEPARATOR: &str = " ";

/// The authoritative set of saved highlight ranges.
///
/// `order_counter` always exceeds every stored `order`; `next_id` is never
/// reset, so an id is never handed out twice.
#[derive(Debug, Clone)]
pub struct RangeStore {
    ranges: BTreeMap<RangeId, HighlightRange>,
    order_counter: u64,
    next_id: u64,
    policy: OverlapPolicy,
    separator: String,
}

/// A range taking part in a merge, with its resolved span.
struct Member {
    span: Span,
    order: u64,
    start: Boundary,
    end: Boundary,
    text: String,
}

impl Member {
    fn of(range: HighlightRange, span: Span) -> Self {
        Self {
            span,
            order: range.order,
            start: range.start,
            end: range.end,
            text: range.text,
        }
    }
}

/// A residual planned by an erase before the store is touched.
struct Residual {
    start: Boundary,
    end: Boundary,
    text: String,
}

impl Default for RangeStore {
    fn default() -> Self {
        Self::new(OverlapPolicy::default())
    }
}

impl RangeStore {
    pub fn new(policy: OverlapPolicy) -> Self {
        Self {
            ranges: BTreeMap::new(),
            order_counter: INITIAL_ORDER,
            next_id: INITIAL_ID,
            policy,
            separator: DEFAULT_MERGE_SEPARATOR.to_string(),
        }
    }

    /// Text placed between cached texts when ranges merge.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: OverlapPolicy) {
        self.policy = policy;
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// The order the next created range will get.
    pub fn order_counter(&self) -> u64 {
        self.order_counter
    }

    pub fn get(&self, id: RangeId) -> Option<&HighlightRange> {
        self.ranges.get(&id)
    }

    /// Stored ranges by ascending order value.
    pub fn iter(&self) -> impl Iterator<Item = &HighlightRange> {
        let mut ranges: Vec<&HighlightRange> = self.ranges.values().collect();
        ranges.sort_by_key(|range| range.order);
        ranges.into_iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Ranges covering the character at `offset`.
    pub fn ranges_at(&self, locator: &impl Locator, offset: usize) -> Vec<&HighlightRange> {
        self.iter()
            .filter(|range| range.span(locator).is_some_and(|span| span.contains(offset)))
            .collect()
    }

    /// Save a new selection, reconciling it under the store's policy.
    ///
    /// Backwards selections are accepted and stored start-first.
    pub fn add(
        &mut self,
        locator: &impl Locator,
        start: Boundary,
        end: Boundary,
        text: impl Into<String>,
    ) -> Result<AddOutcome, RangeError> {
        let start_offset = locator.offset_of(&start).ok_or(RangeError::Unresolved)?;
        let end_offset = locator.offset_of(&end).ok_or(RangeError::Unresolved)?;
        if start_offset == end_offset {
            return Err(RangeError::EmptySelection);
        }

        let (start, end) = if start_offset > end_offset {
            (end, start)
        } else {
            (start, end)
        };
        let span = Span::new(start_offset, end_offset);
        let text = text.into();

        match self.policy {
            OverlapPolicy::Reject => {
                if let Some((existing, _)) = self
                    .resolved(locator)
                    .into_iter()
                    .find(|(_, stored)| stored.overlaps(span))
                {
                    debug!("Rejected selection {span:?}: overlaps range {existing}");
                    return Err(RangeError::Overlap { existing });
                }
                let range = self.create(start, end, text);
                Ok(AddOutcome {
                    range,
                    removed: Vec::new(),
                })
            }
            OverlapPolicy::Merge => Ok(self.add_merged(locator, span, start, end, text)),
        }
    }

    fn add_merged(
        &mut self,
        locator: &impl Locator,
        span: Span,
        start: Boundary,
        end: Boundary,
        text: String,
    ) -> AddOutcome {
        let resolved = self.resolved(locator);
        let mut union = span;
        let mut absorbed: Vec<(RangeId, Span)> = Vec::new();

        // Grow the union until no stored range touches it
        loop {
            let before = absorbed.len();
            for &(id, stored) in &resolved {
                if stored.touches(union) && !absorbed.iter().any(|(a, _)| *a == id) {
                    union = union.union(stored);
                    absorbed.push((id, stored));
                }
            }
            if absorbed.len() == before {
                break;
            }
        }

        if absorbed.is_empty() {
            let range = self.create(start, end, text);
            return AddOutcome {
                range,
                removed: Vec::new(),
            };
        }

        let removed: Vec<HighlightRange> = absorbed
            .iter()
            .filter_map(|(id, _)| self.ranges.remove(id))
            .collect();
        let members: Vec<Member> = removed
            .iter()
            .cloned()
            .zip(absorbed.iter().map(|(_, stored)| *stored))
            .map(|(range, stored)| Member::of(range, stored))
            .collect();
        let selection = Member {
            span,
            order: self.order_counter,
            start,
            end,
            text,
        };

        let range = self.create_merged(selection, members);
        debug!(
            "Merged selection {span:?} with {} range(s) into {}",
            removed.len(),
            range.id
        );
        AddOutcome { range, removed }
    }

    /// Coalesce every group of touching stored ranges into one range.
    ///
    /// Ranges that do not resolve are left alone. A second call right after
    /// the first finds nothing to do.
    pub fn merge_all(&mut self, locator: &impl Locator) -> ReconcileOutcome {
        let mut resolved = self.resolved(locator);
        resolved.sort_by_key(|&(id, span)| (span, self.ranges.get(&id).map(|r| r.order)));

        let mut groups: Vec<(Span, Vec<(RangeId, Span)>)> = Vec::new();
        for (id, span) in resolved {
            match groups.last_mut() {
                Some((union, members)) if union.touches(span) => {
                    *union = union.union(span);
                    members.push((id, span));
                }
                _ => groups.push((span, vec![(id, span)])),
            }
        }

        let mut outcome = ReconcileOutcome::default();
        for (_, group) in groups.into_iter().filter(|(_, members)| members.len() > 1) {
            let mut members: Vec<Member> = group
                .into_iter()
                .filter_map(|(id, span)| {
                    let range = self.ranges.remove(&id)?;
                    outcome.removed.push(range.clone());
                    Some(Member::of(range, span))
                })
                .collect();
            if members.is_empty() {
                continue;
            }
            let seed = members.remove(0);
            outcome.created.push(self.create_merged(seed, members));
        }

        if !outcome.is_empty() {
            debug!(
                "Merged {} range(s) into {}",
                outcome.removed.len(),
                outcome.created.len()
            );
        }
        outcome
    }

    /// Cut the span `[erase.start, erase.end)` out of every stored range.
    ///
    /// Each overlapped range is replaced by its residuals before and after
    /// the erased span, each with a fresh id and order. Residuals whose text
    /// is blank are dropped. On error the store is unchanged.
    pub fn split_on_erase(
        &mut self,
        locator: &impl Locator,
        erase: Span,
    ) -> Result<ReconcileOutcome, RangeError> {
        if erase.is_empty() {
            return Err(RangeError::EmptySelection);
        }

        let mut affected: Vec<(RangeId, Span)> = self
            .resolved(locator)
            .into_iter()
            .filter(|(_, span)| span.overlaps(erase))
            .collect();
        affected.sort_by_key(|(id, _)| self.ranges.get(id).map(|r| r.order));

        let mut plans: Vec<(RangeId, Vec<Residual>)> = Vec::with_capacity(affected.len());
        for &(id, span) in &affected {
            let Some(range) = self.ranges.get(&id) else {
                continue;
            };
            let mut residuals = Vec::new();
            for piece in span.difference(erase) {
                let text = locator.text_in(piece);
                if text.trim().is_empty() {
                    continue;
                }
                let start = if piece.start == span.start {
                    range.start.clone()
                } else {
                    locator.boundary_at(piece.start, Affinity::Forward)?
                };
                let end = if piece.end == span.end {
                    range.end.clone()
                } else {
                    locator.boundary_at(piece.end, Affinity::Backward)?
                };
                residuals.push(Residual { start, end, text });
            }
            plans.push((id, residuals));
        }

        let mut outcome = ReconcileOutcome::default();
        for (id, residuals) in plans {
            if let Some(range) = self.ranges.remove(&id) {
                outcome.removed.push(range);
            }
            for residual in residuals {
                let created = self.create(residual.start, residual.end, residual.text);
                outcome.created.push(created);
            }
        }

        debug!(
            "Erase {erase:?} split {} range(s) into {} residual(s)",
            outcome.removed.len(),
            outcome.created.len()
        );
        Ok(outcome)
    }

    /// Remove a range. Unknown ids are ignored.
    pub fn delete(&mut self, id: RangeId) -> Option<HighlightRange> {
        let removed = self.ranges.remove(&id);
        if removed.is_some() {
            debug!("Deleted range {id}");
        }
        removed
    }

    /// Remove every range and restart the order sequence.
    pub fn clear(&mut self) -> Vec<RangeId> {
        let ids: Vec<RangeId> = self.ranges.keys().copied().collect();
        self.ranges.clear();
        self.order_counter = INITIAL_ORDER;
        ids
    }

    /// Store a range restored from a record, keeping its id and order.
    ///
    /// Returns the range previously stored under the same id, if any.
    pub fn insert_restored(&mut self, range: HighlightRange) -> Option<HighlightRange> {
        self.order_counter = self.order_counter.max(range.order.saturating_add(1));
        self.next_id = self.next_id.max(range.id.0.saturating_add(1));
        self.ranges.insert(range.id, range)
    }

    /// Spans of every stored range that still resolves, by id.
    fn resolved(&self, locator: &impl Locator) -> Vec<(RangeId, Span)> {
        self.ranges
            .values()
            .filter_map(|range| range.span(locator).map(|span| (range.id, span)))
            .collect()
    }

    fn create(&mut self, start: Boundary, end: Boundary, text: String) -> HighlightRange {
        let id = RangeId(self.next_id);
        self.next_id += 1;
        let order = self.order_counter;
        self.order_counter += 1;

        let range = HighlightRange {
            id,
            order,
            start,
            end,
            text,
            created_at: Utc::now(),
        };
        self.ranges.insert(id, range.clone());
        range
    }

    /// Create one range covering `seed` and `others`, texts joined in document order.
    fn create_merged(&mut self, seed: Member, others: Vec<Member>) -> HighlightRange {
        let mut start = (seed.span.start, seed.start);
        let mut end = (seed.span.end, seed.end);
        let mut texts = vec![(seed.span.start, seed.order, seed.text)];

        for member in others {
            if member.span.start < start.0 {
                start = (member.span.start, member.start);
            }
            if member.span.end > end.0 {
                end = (member.span.end, member.end);
            }
            texts.push((member.span.start, member.order, member.text));
        }

        texts.sort_by_key(|(at, order, _)| (*at, *order));
        let text = texts
            .into_iter()
            .map(|(_, _, text)| text)
            .collect::<Vec<_>>()
            .join(&self.separator);

        self.create(start.1, end.1, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::AddressKind;
    use crate::html::parse_html;
    use crate::ranges::TreeLocator;
    use crate::tree::DocumentTree;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn select(
        store: &mut RangeStore,
        locator: &TreeLocator<'_>,
        start: usize,
        end: usize,
    ) -> Result<AddOutcome, RangeError> {
        let from = locator.boundary_at(start, Affinity::Forward).unwrap();
        let to = locator.boundary_at(end, Affinity::Backward).unwrap();
        store.add(locator, from, to, locator.text_in(Span::new(start, end)))
    }

    fn spans(store: &RangeStore, locator: &TreeLocator<'_>) -> Vec<Span> {
        let mut spans: Vec<Span> = store.iter().filter_map(|r| r.span(locator)).collect();
        spans.sort();
        spans
    }

    fn doc() -> DocumentTree {
        parse_html("<p>React is great</p>")
    }

    #[rstest]
    fn test_add_caches_selected_text(
        #[values(AddressKind::Path, AddressKind::Query)] kind: AddressKind,
    ) {
        let tree = doc();
        let locator = TreeLocator::new(&tree, tree.root(), kind);
        let mut store = RangeStore::default();

        let outcome = select(&mut store, &locator, 0, 5).unwrap();

        assert_eq!(outcome.range.text, "React");
        assert_eq!(outcome.range.id, RangeId(1));
        assert_eq!(outcome.range.order, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.order_counter(), 2);
    }

    #[test]
    fn test_empty_selection_rejected() {
        let tree = doc();
        let locator = TreeLocator::new(&tree, tree.root(), AddressKind::Path);
        let mut store = RangeStore::default();

        assert_eq!(
            select(&mut store, &locator, 4, 4),
            Err(RangeError::EmptySelection)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_backwards_selection_is_normalized() {
        let tree = doc();
        let locator = TreeLocator::new(&tree, tree.root(), AddressKind::Path);
        let mut store = RangeStore::default();
        let from = locator.boundary_at(8, Affinity::Backward).unwrap();
        let to = locator.boundary_at(6, Affinity::Forward).unwrap();

        let range = store.add(&locator, from, to, "is").unwrap().range;

        assert_eq!(locator.offset_of(&range.start), Some(6));
        assert_eq!(locator.offset_of(&range.end), Some(8));
    }

    #[test]
    fn test_reject_policy_refuses_overlap_without_consuming_ids() {
        let tree = doc();
        let locator = TreeLocator::new(&tree, tree.root(), AddressKind::Path);
        let mut store = RangeStore::new(OverlapPolicy::Reject);
        select(&mut store, &locator, 0, 5).unwrap();

        assert_eq!(
            select(&mut store, &locator, 3, 8),
            Err(RangeError::Overlap {
                existing: RangeId(1)
            })
        );
        assert_eq!(store.len(), 1);

        // Adjacent is not overlapping
        let next = select(&mut store, &locator, 5, 8).unwrap().range;
        assert_eq!((next.id, next.order), (RangeId(2), 2));
    }

    #[test]
    fn test_merge_policy_coalesces_overlap() {
        let tree = doc();
        let locator = TreeLocator::new(&tree, tree.root(), AddressKind::Path);
        let mut store = RangeStore::new(OverlapPolicy::Merge);
        select(&mut store, &locator, 0, 5).unwrap();

        let outcome = select(&mut store, &locator, 3, 8).unwrap();

        assert_eq!(spans(&store, &locator), vec![Span::new(0, 8)]);
        assert_eq!(outcome.range.text, "React act i");
        assert_eq!(outcome.range.id, RangeId(2));
        assert_eq!(outcome.removed.len(), 1);
        assert_eq!(outcome.removed[0].id, RangeId(1));
    }

    #[test]
    fn test_merge_is_transitive_and_keeps_distant_ranges() {
        let tree = doc();
        let locator = TreeLocator::new(&tree, tree.root(), AddressKind::Path);
        let mut store = RangeStore::new(OverlapPolicy::Merge).with_separator(" | ");
        select(&mut store, &locator, 0, 3).unwrap();
        select(&mut store, &locator, 5, 8).unwrap();
        select(&mut store, &locator, 11, 14).unwrap();

        let outcome = select(&mut store, &locator, 2, 6).unwrap();

        assert_eq!(
            spans(&store, &locator),
            vec![Span::new(0, 8), Span::new(11, 14)]
        );
        assert_eq!(outcome.removed.len(), 2);
        assert_eq!(outcome.range.text, "Rea | act  |  is");
    }

    #[test]
    fn test_merge_all_is_idempotent() {
        let tree = doc();
        let locator = TreeLocator::new(&tree, tree.root(), AddressKind::Path);
        let mut store = RangeStore::new(OverlapPolicy::Reject);
        select(&mut store, &locator, 0, 3).unwrap();
        select(&mut store, &locator, 3, 6).unwrap();
        select(&mut store, &locator, 9, 14).unwrap();

        let first = store.merge_all(&locator);
        let after_first = spans(&store, &locator);
        let second = store.merge_all(&locator);

        assert_eq!(first.removed.len(), 2);
        assert_eq!(first.created.len(), 1);
        assert_eq!(first.created[0].text, "Rea ct ");
        assert!(second.is_empty());
        assert_eq!(spans(&store, &locator), after_first);
        assert_eq!(after_first, vec![Span::new(0, 6), Span::new(9, 14)]);
    }

    #[test]
    fn test_split_on_erase_leaves_two_residuals() {
        let tree = doc();
        let locator = TreeLocator::new(&tree, tree.root(), AddressKind::Path);
        let mut store = RangeStore::default();
        select(&mut store, &locator, 0, 10).unwrap();

        let outcome = store.split_on_erase(&locator, Span::new(3, 6)).unwrap();

        assert_eq!(outcome.removed.len(), 1);
        let texts: Vec<&str> = outcome.created.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["Rea", "is g"]);
        assert_eq!(
            spans(&store, &locator),
            vec![Span::new(0, 3), Span::new(6, 10)]
        );
        for offset in 3..6 {
            assert!(store.ranges_at(&locator, offset).is_empty());
        }
        let orders: Vec<u64> = outcome.created.iter().map(|r| r.order).collect();
        assert_eq!(orders, vec![2, 3]);
    }

    #[test]
    fn test_split_drops_blank_residuals() {
        let tree = doc();
        let locator = TreeLocator::new(&tree, tree.root(), AddressKind::Path);
        let mut store = RangeStore::default();
        select(&mut store, &locator, 5, 9).unwrap();

        let outcome = store.split_on_erase(&locator, Span::new(6, 8)).unwrap();

        assert_eq!(outcome.removed.len(), 1);
        assert!(outcome.created.is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_split_ignores_untouched_ranges() {
        let tree = doc();
        let locator = TreeLocator::new(&tree, tree.root(), AddressKind::Path);
        let mut store = RangeStore::default();
        select(&mut store, &locator, 0, 5).unwrap();

        let outcome = store.split_on_erase(&locator, Span::new(5, 8)).unwrap();

        assert!(outcome.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_twice_is_noop() {
        let tree = doc();
        let locator = TreeLocator::new(&tree, tree.root(), AddressKind::Path);
        let mut store = RangeStore::default();
        let id = select(&mut store, &locator, 0, 5).unwrap().range.id;

        assert!(store.delete(id).is_some());
        assert_eq!(store.delete(id), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear_is_idempotent_and_resets_order() {
        let tree = doc();
        let locator = TreeLocator::new(&tree, tree.root(), AddressKind::Path);
        let mut store = RangeStore::default();
        select(&mut store, &locator, 0, 5).unwrap();
        select(&mut store, &locator, 6, 8).unwrap();

        assert_eq!(store.clear(), vec![RangeId(1), RangeId(2)]);
        assert_eq!(store.clear(), Vec::<RangeId>::new());
        assert_eq!(store.order_counter(), 1);

        let next = select(&mut store, &locator, 0, 5).unwrap().range;
        assert_eq!(next.order, 1);
        assert_eq!(next.id, RangeId(3));
    }

    #[test]
    fn test_order_invariant_after_mixed_operations() {
        let tree = doc();
        let locator = TreeLocator::new(&tree, tree.root(), AddressKind::Path);
        let mut store = RangeStore::new(OverlapPolicy::Merge);
        select(&mut store, &locator, 0, 4).unwrap();
        select(&mut store, &locator, 9, 14).unwrap();
        select(&mut store, &locator, 3, 7).unwrap();
        store.split_on_erase(&locator, Span::new(10, 12)).unwrap();
        let first = store.iter().next().map(|r| r.id).unwrap();
        store.delete(first);
        select(&mut store, &locator, 0, 2).unwrap();

        let orders: Vec<u64> = store.iter().map(|r| r.order).collect();
        assert!(orders.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(orders.iter().all(|&order| order < store.order_counter()));
        for range in store.iter() {
            let start = locator.offset_of(&range.start).unwrap();
            let end = locator.offset_of(&range.end).unwrap();
            assert!(start <= end);
        }
    }

    #[test]
    fn test_insert_restored_advances_counters() {
        let tree = doc();
        let locator = TreeLocator::new(&tree, tree.root(), AddressKind::Path);
        let mut store = RangeStore::default();
        let mut range = select(&mut store, &locator, 0, 5).unwrap().range;
        store.clear();
        range.id = RangeId(40);
        range.order = 7;

        assert_eq!(store.insert_restored(range), None);

        let next = select(&mut store, &locator, 6, 8).unwrap().range;
        assert_eq!((next.id, next.order), (RangeId(41), 8));
    }

    #[test]
    fn test_unresolved_boundary() {
        let tree = doc();
        let other = parse_html("<div><p>x</p><p>React is great</p></div>");
        let locator = TreeLocator::new(&tree, tree.root(), AddressKind::Path);
        let foreign = TreeLocator::new(&other, other.root(), AddressKind::Path);
        let mut store = RangeStore::default();
        let start = foreign.boundary_at(1, Affinity::Forward).unwrap();
        let end = foreign.boundary_at(6, Affinity::Backward).unwrap();

        assert_eq!(
            store.add(&locator, start, end, "React"),
            Err(RangeError::Unresolved)
        );
    }
}
