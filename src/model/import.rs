//! Import ledger models.

use serde::{Deserialize, Serialize};

use super::note::Note;
use super::row::RowData;

/// One ingestion event of a tabular file.
///
/// Immutable once written; the ledger's incrementing `id` doubles as the
/// chronological order of imports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub id: i64,
    pub filename: String,
    /// Unix milliseconds
    pub timestamp: i64,
    /// Raw count of data records in the upload (skipped rows included)
    pub row_count: i64,
    pub primary_key_column: String,
    /// Header names in file order; empty when no schema record exists
    pub column_schema: Vec<String>,
    /// SHA-256 of the uploaded bytes
    pub content_hash: Option<String>,
}

/// Result of a completed import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub import_id: i64,
    pub filename: String,
    pub row_count: i64,
    pub primary_key: String,
    /// Records reconciled into a row identity and snapshotted
    pub imported_count: usize,
    /// Records skipped by policy (missing/empty key, repeated key)
    pub skipped_count: usize,
    /// Row identities created by this import
    pub new_rows: usize,
    pub content_hash: String,
}

/// One row of an import detail view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowWithNotes {
    pub row_id: i64,
    pub primary_key_value: String,
    pub data: RowData,
    /// Non-deleted notes, newest first
    pub notes: Vec<Note>,
}

/// An import joined with its snapshots and the notes on each row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportDetail {
    pub import: Import,
    pub columns: Vec<String>,
    pub rows: Vec<RowWithNotes>,
}
