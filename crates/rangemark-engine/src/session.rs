//! A highlighting session: one document, its ranges and the event sink
//! that persists them.
//!
//! The session keeps the document rendered at all times. Every operation
//! reverts the markers, works against the original structure, and renders
//! again before returning, whether it succeeded or not.

use log::{debug, warn};
use thiserror::Error;

use crate::addressing::{AddressKind, AddressingError};
use crate::html::{parse_html, to_html};
use crate::persist::{PersistedRange, RecordError, records_from_json_lenient, records_to_json};
use crate::ranges::{
    AddOutcome, HighlightRange, Locator, RangeError, RangeId, RangeStore, ReconcileOutcome, Span,
    TreeLocator,
};
use crate::render::{RenderReport, Renderer};
use crate::tree::{Affinity, DocumentTree, NodeId, Position};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error(transparent)]
    Addressing(#[from] AddressingError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("Position {0:?} is not in the document")]
    InvalidPosition(Position),
    #[error("Record {0} no longer matches the document")]
    UnresolvedRecord(RangeId),
    #[error("Record {0} duplicates an already restored id")]
    DuplicateRecord(RangeId),
}

/// Notifications for whoever persists the ranges.
pub trait RangeEvents {
    /// A range was created, by a selection, a merge or an erase split.
    fn range_created(&mut self, _range: &HighlightRange) {}

    /// A range was removed, directly or by being merged or split.
    fn range_deleted(&mut self, _id: RangeId) {}

    /// Something went wrong that did not stop the operation.
    fn error(&mut self, _error: &SessionError) {}
}

impl RangeEvents for () {}

/// Event sink that keeps everything it is told.
#[derive(Debug, Default, Clone)]
pub struct RecordedEvents {
    pub created: Vec<HighlightRange>,
    pub deleted: Vec<RangeId>,
    pub errors: Vec<String>,
}

impl RangeEvents for RecordedEvents {
    fn range_created(&mut self, range: &HighlightRange) {
        self.created.push(range.clone());
    }

    fn range_deleted(&mut self, id: RangeId) {
        self.deleted.push(id);
    }

    fn error(&mut self, error: &SessionError) {
        self.errors.push(error.to_string());
    }
}

/// Outcome of restoring persisted records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: Vec<RangeId>,
    /// Records dropped, each reported through [`RangeEvents::error`]
    pub dropped: usize,
}

pub struct HighlightSession<E: RangeEvents = ()> {
    tree: DocumentTree,
    root: NodeId,
    store: RangeStore,
    renderer: Renderer,
    kind: AddressKind,
    events: E,
    last_render: RenderReport,
}

impl<E: RangeEvents> HighlightSession<E> {
    pub fn new(tree: DocumentTree, kind: AddressKind, events: E) -> Self {
        let root = tree.root();
        Self {
            tree,
            root,
            store: RangeStore::default(),
            renderer: Renderer::default(),
            kind,
            events,
            last_render: RenderReport::default(),
        }
    }

    pub fn from_html(html: &str, kind: AddressKind, events: E) -> Self {
        Self::new(parse_html(html), kind, events)
    }

    /// Use a configured store. Ranges already in it are rendered.
    pub fn with_store(mut self, store: RangeStore) -> Self {
        self.store = store;
        self.render();
        self
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer.revert(&mut self.tree, self.root);
        self.renderer = renderer;
        self.render();
        self
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn store(&self) -> &RangeStore {
        &self.store
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn into_events(self) -> E {
        self.events
    }

    pub fn last_render(&self) -> &RenderReport {
        &self.last_render
    }

    /// The highlighted document as HTML.
    pub fn html(&self) -> String {
        to_html(&self.tree, self.root)
    }

    /// Persisted form of every range, by order.
    pub fn records(&self) -> Vec<PersistedRange> {
        self.store.iter().map(PersistedRange::from_range).collect()
    }

    pub fn records_json(&self) -> Result<String, RecordError> {
        records_to_json(&self.records())
    }

    /// Load previously persisted ranges.
    ///
    /// Records that cannot be parsed, no longer resolve, or repeat an id
    /// are dropped with one error event each; the rest are stored.
    pub fn restore(&mut self, records: Vec<PersistedRange>) -> RestoreReport {
        self.renderer.revert(&mut self.tree, self.root);
        let mut report = RestoreReport::default();

        for record in records {
            match self.restore_one(record) {
                Ok(id) => report.restored.push(id),
                Err(e) => {
                    warn!("Dropping persisted highlight: {e}");
                    self.events.error(&e);
                    report.dropped += 1;
                }
            }
        }

        self.render();
        debug!(
            "Restored {} highlight(s), dropped {}",
            report.restored.len(),
            report.dropped
        );
        report
    }

    /// [`Self::restore`] from a JSON array of records.
    ///
    /// Entries without the record shape are dropped like unresolvable
    /// ones. Only JSON that is not an array fails the whole call.
    pub fn restore_json(&mut self, json: &str) -> Result<RestoreReport, SessionError> {
        let (records, malformed) = match records_from_json_lenient(json) {
            Ok(parsed) => parsed,
            Err(e) => {
                let e = SessionError::from(e);
                self.events.error(&e);
                return Err(e);
            }
        };

        let dropped = malformed.len();
        for e in malformed {
            let e = SessionError::from(e);
            warn!("Dropping persisted highlight: {e}");
            self.events.error(&e);
        }

        let mut report = self.restore(records);
        report.dropped += dropped;
        Ok(report)
    }

    fn restore_one(&mut self, record: PersistedRange) -> Result<RangeId, SessionError> {
        let range = record.into_range(self.kind)?;
        let locator = TreeLocator::new(&self.tree, self.root, self.kind);
        if range.span(&locator).is_none_or(|span| span.is_empty()) {
            return Err(SessionError::UnresolvedRecord(range.id));
        }
        if self.store.get(range.id).is_some() {
            return Err(SessionError::DuplicateRecord(range.id));
        }

        let id = range.id;
        self.store.insert_restored(range);
        Ok(id)
    }

    /// Save a selection made in the displayed (highlighted) document.
    pub fn select(&mut self, start: Position, end: Position) -> Result<AddOutcome, SessionError> {
        let start = self.offset_of(start)?;
        let end = self.offset_of(end)?;
        self.select_offsets(start, end)
    }

    /// Save a selection given as global character offsets.
    pub fn select_offsets(&mut self, start: usize, end: usize) -> Result<AddOutcome, SessionError> {
        self.renderer.revert(&mut self.tree, self.root);
        let result = self.add_span(Span::new(start, end));
        self.render();

        let outcome = result?;
        for removed in &outcome.removed {
            self.events.range_deleted(removed.id);
        }
        self.events.range_created(&outcome.range);
        Ok(outcome)
    }

    fn add_span(&mut self, span: Span) -> Result<AddOutcome, SessionError> {
        if span.is_empty() {
            return Err(RangeError::EmptySelection.into());
        }
        let locator = TreeLocator::new(&self.tree, self.root, self.kind);
        let start = locator.boundary_at(span.start, Affinity::Forward)?;
        let end = locator.boundary_at(span.end, Affinity::Backward)?;
        let text = locator.text_in(span);
        Ok(self.store.add(&locator, start, end, text)?)
    }

    /// Erase highlighting between two positions of the displayed document.
    pub fn erase(&mut self, start: Position, end: Position) -> Result<ReconcileOutcome, SessionError> {
        let start = self.offset_of(start)?;
        let end = self.offset_of(end)?;
        self.erase_offsets(start, end)
    }

    pub fn erase_offsets(
        &mut self,
        start: usize,
        end: usize,
    ) -> Result<ReconcileOutcome, SessionError> {
        self.renderer.revert(&mut self.tree, self.root);
        let locator = TreeLocator::new(&self.tree, self.root, self.kind);
        let result = self.store.split_on_erase(&locator, Span::new(start, end));
        self.render();

        let outcome = result?;
        self.notify(&outcome);
        Ok(outcome)
    }

    /// Coalesce all touching ranges.
    pub fn merge_all(&mut self) -> ReconcileOutcome {
        self.renderer.revert(&mut self.tree, self.root);
        let locator = TreeLocator::new(&self.tree, self.root, self.kind);
        let outcome = self.store.merge_all(&locator);
        self.render();

        self.notify(&outcome);
        outcome
    }

    /// Delete a range. Unknown ids are ignored.
    pub fn delete(&mut self, id: RangeId) -> Option<HighlightRange> {
        let removed = self.store.delete(id)?;
        self.render();
        self.events.range_deleted(id);
        Some(removed)
    }

    /// Delete the range whose marker encloses `node`, if any.
    pub fn click(&mut self, node: NodeId) -> Option<HighlightRange> {
        let id = self.renderer.marker_id_at(&self.tree, node)?;
        self.delete(id)
    }

    /// Delete every range.
    pub fn clear(&mut self) -> Vec<RangeId> {
        let ids = self.store.clear();
        self.render();
        for &id in &ids {
            self.events.range_deleted(id);
        }
        ids
    }

    fn offset_of(&self, position: Position) -> Result<usize, SessionError> {
        self.tree
            .global_offset(self.root, position)
            .ok_or(SessionError::InvalidPosition(position))
    }

    fn render(&mut self) {
        self.last_render = self.renderer.render(&mut self.tree, self.root, &self.store);
    }

    fn notify(&mut self, outcome: &ReconcileOutcome) {
        for removed in &outcome.removed {
            self.events.range_deleted(removed.id);
        }
        for created in &outcome.created {
            self.events.range_created(created);
        }
    }
}
