//! Runtime event stream payloads.

use std::path::PathBuf;

use crate::types::RecordId;

/// Events emitted from the single-writer runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrEvent {
    /// A QR code was rendered and its record stored.
    Generated {
        /// New record id.
        id: RecordId,
    },
    /// A record was removed.
    Deleted {
        /// Removed record id.
        id: RecordId,
    },
    /// The spreadsheet mirror was rewritten.
    Exported {
        /// Spreadsheet file.
        path: PathBuf,
        /// Rows written.
        rows: usize,
    },
}
