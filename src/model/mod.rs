//! Data models for csvn.
//!
//! This module contains all domain models:
//! - Import (ledger entry)
//! - PersistentRow and RowSnapshot
//! - Note and Tag

pub mod import;
pub mod note;
pub mod row;

pub use import::{Import, ImportDetail, ImportSummary, RowWithNotes};
pub use note::{Note, NoteStatus, NoteUpdate, Tag};
pub use row::{PersistentRow, RowData, RowIdentifier, RowSnapshot};

/// Render Unix milliseconds as RFC 3339 for JSON output.
#[must_use]
pub fn format_timestamp(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_default()
}
