use crate::html::parse_html;
use crate::persist::{PersistedRange, RecordError, records_to_json};
use crate::tree::DocumentTree;
use relative_path::{RelativePath, RelativePathBuf};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid document path: {0}")]
    InvalidDocumentPath(PathBuf),
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Read a file below `storage_root`
pub fn read_file(relative_path: &RelativePath, storage_root: &Path) -> Result<String, IoError> {
    let absolute_path = relative_path.to_path(storage_root);
    if !absolute_path.exists() {
        return Err(IoError::NotFound(absolute_path));
    }
    fs::read_to_string(&absolute_path).map_err(IoError::Io)
}

/// Write a file below `storage_root`, creating parent directories
pub fn write_file(
    relative_path: &RelativePath,
    storage_root: &Path,
    content: &str,
) -> Result<(), IoError> {
    let absolute_path = relative_path.to_path(storage_root);

    if let Some(parent) = absolute_path.parent() {
        fs::create_dir_all(parent).map_err(IoError::Io)?;
    }

    fs::write(&absolute_path, content).map_err(IoError::Io)
}

/// Where the records of a document are kept: `<document stem>.json`
pub fn records_path_for(document: &Path) -> Result<RelativePathBuf, IoError> {
    let stem = document
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| IoError::InvalidDocumentPath(document.to_path_buf()))?;
    Ok(RelativePathBuf::from(format!("{stem}.json")))
}

/// Raw JSON of a records file, `None` if nothing was saved yet
pub fn read_records_json(
    relative_path: &RelativePath,
    storage_root: &Path,
) -> Result<Option<String>, IoError> {
    match read_file(relative_path, storage_root) {
        Ok(json) => Ok(Some(json)),
        Err(IoError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn write_records(
    relative_path: &RelativePath,
    storage_root: &Path,
    records: &[PersistedRange],
) -> Result<(), IoError> {
    let json = records_to_json(records)?;
    write_file(relative_path, storage_root, &json)
}

/// Load and parse an HTML document
pub fn read_document(path: &Path) -> Result<DocumentTree, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    let html = fs::read_to_string(path)?;
    Ok(parse_html(&html))
}
