//! Storage record shape for highlight ranges.
//!
//! This is the unit exchanged with any storage backend:
//!
//! ```json
//! {
//!   "id": 3,
//!   "order": 2,
//!   "startAddress": "p:1/#text:1",
//!   "startOffset": 0,
//!   "endAddress": "p:1/#text:1",
//!   "endOffset": 5,
//!   "text": "React",
//!   "timestamp": "2024-05-01T10:00:00.000Z"
//! }
//! ```
//!
//! Addresses are stored in their serialized form, so reading a record back
//! needs to know which [`AddressKind`] the deployment uses.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::addressing::{Address, AddressKind, AddressParseError, Boundary};
use crate::ranges::{HighlightRange, RangeId};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Record {id}: invalid address: {source}")]
    Address {
        id: u64,
        #[source]
        source: AddressParseError,
    },
    #[error("Record {id}: invalid timestamp '{value}': {source}")]
    Timestamp {
        id: u64,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("Malformed record: {0}")]
    Malformed(serde_json::Error),
    #[error("Invalid records JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A highlight range as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRange {
    pub id: u64,
    pub order: u64,
    pub start_address: String,
    pub start_offset: usize,
    pub end_address: String,
    pub end_offset: usize,
    pub text: String,
    /// RFC 3339 creation time
    pub timestamp: String,
}

impl PersistedRange {
    pub fn from_range(range: &HighlightRange) -> Self {
        Self {
            id: range.id.0,
            order: range.order,
            start_address: range.start.address.to_string(),
            start_offset: range.start.offset,
            end_address: range.end.address.to_string(),
            end_offset: range.end.offset,
            text: range.text.clone(),
            timestamp: range.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Parse the record's addresses and timestamp.
    ///
    /// This does not check the addresses resolve; that depends on the document.
    pub fn into_range(self, kind: AddressKind) -> Result<HighlightRange, RecordError> {
        let id = self.id;
        let parse = |s: &str| {
            Address::parse(kind, s).map_err(|source| RecordError::Address { id, source })
        };
        let start = Boundary::new(parse(&self.start_address)?, self.start_offset);
        let end = Boundary::new(parse(&self.end_address)?, self.end_offset);
        let created_at = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|source| RecordError::Timestamp {
                id,
                value: self.timestamp.clone(),
                source,
            })?
            .with_timezone(&Utc);

        Ok(HighlightRange {
            id: RangeId(id),
            order: self.order,
            start,
            end,
            text: self.text,
            created_at,
        })
    }
}

/// Parse a JSON array of records, failing on the first bad one.
pub fn records_from_json(json: &str) -> Result<Vec<PersistedRange>, RecordError> {
    Ok(serde_json::from_str(json)?)
}

/// Parse a JSON array of records, setting aside the ones that do not have
/// the record shape.
///
/// Only a document that is not a JSON array at all is an error.
pub fn records_from_json_lenient(
    json: &str,
) -> Result<(Vec<PersistedRange>, Vec<RecordError>), RecordError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut records = Vec::with_capacity(values.len());
    let mut errors = Vec::new();

    for value in values {
        match serde_json::from_value::<PersistedRange>(value) {
            Ok(record) => records.push(record),
            Err(e) => errors.push(RecordError::Malformed(e)),
        }
    }
    Ok((records, errors))
}

pub fn records_to_json(records: &[PersistedRange]) -> Result<String, RecordError> {
    Ok(serde_json::to_string_pretty(records)?)
}
