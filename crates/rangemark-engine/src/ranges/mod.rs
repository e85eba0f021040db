//! # Range Store
//!
//! Saved highlight ranges and the reconciliation rules between them.
//!
//! Ranges are persisted as pairs of [`Boundary`] values, but all the
//! overlap arithmetic happens on [`Span`]s of global character offsets. A
//! [`Locator`] translates between the two against the current document, so
//! the store itself never touches a tree.
//!
//! A new selection that overlaps saved ranges is handled by the store's
//! [`OverlapPolicy`]: refused, or coalesced with everything it touches.
//! Erasing cuts stored ranges down to the parts outside the erased span.

mod locator;
mod span;
mod store;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::addressing::{AddressingError, Boundary};

pub use locator::{Locator, TreeLocator};
pub use span::{Span, merge_spans};
pub use store::{DEFAULT_MERGE_SEPARATOR, RangeStore};

/// Stable identity of a highlight range. Never reused within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RangeId(pub u64);

impl fmt::Display for RangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RangeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(RangeId)
    }
}

/// One saved highlight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRange {
    pub id: RangeId,
    /// Insertion sequence number
    pub order: u64,
    pub start: Boundary,
    pub end: Boundary,
    /// Literal text cached when the range was created
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl HighlightRange {
    /// Current span of the range, `None` when either boundary no longer resolves.
    pub fn span(&self, locator: &impl Locator) -> Option<Span> {
        let start = locator.offset_of(&self.start)?;
        let end = locator.offset_of(&self.end)?;
        Some(Span::new(start, end))
    }
}

/// What happens when a new selection overlaps saved ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Refuse the new range
    #[default]
    Reject,
    /// Coalesce it with every range it touches
    Merge,
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlapPolicy::Reject => write!(f, "reject"),
            OverlapPolicy::Merge => write!(f, "merge"),
        }
    }
}

impl FromStr for OverlapPolicy {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(OverlapPolicy::Reject),
            "merge" => Ok(OverlapPolicy::Merge),
            _ => Err(RangeError::UnknownPolicy(s.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Selection is empty")]
    EmptySelection,
    #[error("Selection overlaps highlight {existing}")]
    Overlap { existing: RangeId },
    #[error("Selection boundary does not resolve against the document")]
    Unresolved,
    #[error("Unknown overlap policy: {0}")]
    UnknownPolicy(String),
    #[error(transparent)]
    Addressing(#[from] AddressingError),
}

/// Result of a successful [`RangeStore::add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    pub range: HighlightRange,
    /// Ranges absorbed by a merge
    pub removed: Vec<HighlightRange>,
}

/// Ranges removed and created by a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcileOutcome {
    pub removed: Vec<HighlightRange>,
    pub created: Vec<HighlightRange>,
}

impl ReconcileOutcome {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.created.is_empty()
    }
}
