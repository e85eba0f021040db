//! Position addressing and highlight range engine.
//!
//! - [`tree`]: arena document tree the engine works on
//! - [`html`]: HTML to tree and back
//! - [`addressing`]: structure-relative addresses for tree positions
//! - [`ranges`]: the range store and its overlap policies
//! - [`render`]: drawing ranges into the tree as marker elements
//! - [`persist`]: storage record shape
//! - [`session`]: everything above behind selection events
//! - [`io`]: record files on disk

pub mod addressing;
pub mod html;
pub mod io;
pub mod persist;
pub mod ranges;
pub mod render;
pub mod session;
pub mod tree;

// Re-export key types for easier usage
pub use addressing::{Address, AddressKind, AddressParseError, AddressingError, Boundary};
pub use html::{parse_html, to_html};
pub use io::IoError;
pub use persist::{PersistedRange, RecordError};
pub use ranges::{
    AddOutcome, HighlightRange, Locator, OverlapPolicy, RangeError, RangeId, RangeStore,
    ReconcileOutcome, Span, TreeLocator,
};
pub use render::{MarkerStyle, RenderReport, Renderer};
pub use session::{HighlightSession, RangeEvents, RecordedEvents, RestoreReport, SessionError};
pub use tree::{Affinity, DocumentTree, NodeId, Position};
