/// A character range `[start, end)` in global offsets.
///
/// Global offsets count characters of the root's text content, so a span
/// means the same text before and after highlight markers are inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

impl Span {
    /// Build a span, swapping the ends of a backwards pair.
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// Returns the length in characters. Uses saturating subtraction for safety.
    #[must_use]
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains(self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Whether the spans share at least one character.
    #[must_use]
    pub fn overlaps(self, other: Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether the spans overlap or are directly adjacent.
    #[must_use]
    pub fn touches(self, other: Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    #[must_use]
    pub fn intersection(self, other: Span) -> Option<Span> {
        let span = Span {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        };
        (!span.is_empty()).then_some(span)
    }

    /// Smallest span covering both.
    #[must_use]
    pub fn union(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// The parts of `self` outside `other`: zero, one or two spans in
    /// document order, none of them empty.
    #[must_use]
    pub fn difference(self, other: Span) -> Vec<Span> {
        if !self.overlaps(other) {
            return if self.is_empty() { Vec::new() } else { vec![self] };
        }

        let before = Span {
            start: self.start,
            end: other.start,
        };
        let after = Span {
            start: other.end,
            end: self.end,
        };
        [before, after]
            .into_iter()
            .filter(|span| span.start >= self.start && span.end <= self.end && !span.is_empty())
            .collect()
    }
}

/// Sort spans and coalesce every run of touching ones.
///
/// The result is sorted, contains no empty spans and no two of its spans
/// touch, so feeding it back in returns it unchanged.
pub fn merge_spans(spans: impl IntoIterator<Item = Span>) -> Vec<Span> {
    let mut sorted: Vec<Span> = spans.into_iter().filter(|s| !s.is_empty()).collect();
    sorted.sort();

    let mut merged: Vec<Span> = Vec::with_capacity(sorted.len());
    for span in sorted {
        match merged.last_mut() {
            Some(last) if last.touches(span) => *last = last.union(span),
            _ => merged.push(span),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn span(start: usize, end: usize) -> Span {
        Span { start, end }
    }

    #[test]
    fn test_new_normalizes_backwards_pair() {
        assert_eq!(Span::new(8, 3), span(3, 8));
    }

    #[rstest]
    #[case(span(0, 5), span(3, 8), true, true)]
    #[case(span(0, 5), span(5, 8), false, true)]
    #[case(span(0, 5), span(6, 8), false, false)]
    #[case(span(2, 4), span(0, 10), true, true)]
    fn test_overlaps_and_touches(
        #[case] a: Span,
        #[case] b: Span,
        #[case] overlaps: bool,
        #[case] touches: bool,
    ) {
        assert_eq!(a.overlaps(b), overlaps);
        assert_eq!(b.overlaps(a), overlaps);
        assert_eq!(a.touches(b), touches);
        assert_eq!(b.touches(a), touches);
    }

    #[rstest]
    #[case(span(0, 10), span(3, 6), vec![span(0, 3), span(6, 10)])]
    #[case(span(0, 10), span(0, 4), vec![span(4, 10)])]
    #[case(span(0, 10), span(7, 12), vec![span(0, 7)])]
    #[case(span(3, 6), span(0, 10), vec![])]
    #[case(span(0, 3), span(5, 8), vec![span(0, 3)])]
    fn test_difference(#[case] a: Span, #[case] erase: Span, #[case] expected: Vec<Span>) {
        assert_eq!(a.difference(erase), expected);
    }

    #[rstest]
    #[case(span(0, 10), span(3, 6))]
    #[case(span(0, 10), span(8, 15))]
    #[case(span(4, 9), span(0, 6))]
    fn test_difference_plus_intersection_rebuilds_span(#[case] a: Span, #[case] erase: Span) {
        let mut pieces = a.difference(erase);
        pieces.extend(a.intersection(erase));
        pieces.sort();

        assert_eq!(pieces.iter().map(|s| s.len()).sum::<usize>(), a.len());
        assert_eq!(merge_spans(pieces.clone()), vec![a]);
        for pair in pieces.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_merge_spans_coalesces_touching_runs() {
        let merged = merge_spans([span(6, 9), span(0, 5), span(3, 6), span(12, 14), span(2, 2)]);
        assert_eq!(merged, vec![span(0, 9), span(12, 14)]);
    }

    #[test]
    fn test_merge_spans_is_idempotent() {
        let once = merge_spans([span(10, 20), span(0, 4), span(4, 7), span(15, 30)]);
        let twice = merge_spans(once.clone());
        assert_eq!(once, twice);
    }
}
