/// Auto-increment table migration.
pub mod migrate;
/// SQLite-backed store.
pub mod sqlite;

use std::path::Path;

use thiserror::Error;

use crate::{
    record::{QrRecord, RecordDraft, ValidationError},
    types::{RecordId, SortOrder},
};

/// Failures surfaced by a [`RecordStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Input rejected before any write.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// No live record carries this id.
    #[error("no record with id {0}")]
    NotFound(RecordId),
    /// The database rejected or could not complete the operation.
    #[error("storage failure: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Filesystem failure while preparing the database location.
    #[error("storage I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A removed record plus the outcome of its image cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedRecord {
    /// The record as it was before deletion.
    pub record: QrRecord,
    /// False when the image file could not be removed.
    pub image_removed: bool,
}

/// Durable collection of generation records.
///
/// Ids are assigned with [`crate::core::slots::lowest_free_slot`] and never
/// renumbered by deletes.
pub trait RecordStore: Send {
    /// Validates `draft` and inserts it under the lowest free id.
    fn create(&mut self, draft: RecordDraft, qr_filename: &str) -> StoreResult<QrRecord>;

    /// Records by creation time, truncated to `limit` when given.
    fn list(&self, order: SortOrder, limit: Option<usize>) -> StoreResult<Vec<QrRecord>>;

    /// Record with `id`, if live.
    fn get(&self, id: RecordId) -> StoreResult<Option<QrRecord>>;

    /// Removes the record and, best effort, its image file.
    fn delete(&mut self, id: RecordId) -> StoreResult<DeletedRecord>;

    /// Number of live records.
    fn count(&self) -> StoreResult<usize>;

    /// Releases the store. The default does nothing.
    fn close(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

/// Deletes the image behind `qr_filename`, logging instead of failing.
///
/// An already missing file counts as removed.
pub(crate) fn remove_image_best_effort(qr_filename: &str) -> bool {
    let path = Path::new(qr_filename);
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "qr image already absent");
            true
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove qr image");
            false
        }
    }
}
