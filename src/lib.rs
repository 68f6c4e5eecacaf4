//! csvn - Track CSV imports over time and annotate rows with notes
//!
//! This crate provides the core functionality for the `csvn` CLI tool:
//! an import reconciliation engine that detects the primary key of an
//! arbitrary CSV file, recognizes the same logical row across imports,
//! and keeps notes and tags attached to those rows.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`detect`] - Primary-key detection (column scorer and detector)
//! - [`ingest`] - Upload parsing, reconciliation and the import pipeline
//! - [`model`] - Data types (Import, PersistentRow, RowSnapshot, Note, Tag)
//! - [`storage`] - SQLite database layer (ledger, rows, notes)
//! - [`config`] - Configuration management
//! - [`validate`] - Status and tag normalization
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod ingest;
pub mod model;
pub mod storage;
pub mod validate;

pub use error::{Error, Result};

/// Global silent mode flag for `--silent` output.
///
/// When set, create/mutate commands print only the ID instead of full
/// output. Avoids threading a `silent` bool through every handler signature.
pub static SILENT: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Global dry-run flag for `--dry-run`.
///
/// When set, mutate commands preview what would happen without writing.
pub static DRY_RUN: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Global CSV output flag (set when `--format csv`).
pub static CSV_OUTPUT: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Check if silent mode is active.
#[inline]
pub fn is_silent() -> bool {
    SILENT.load(std::sync::atomic::Ordering::Relaxed)
}

/// Check if dry-run mode is active.
#[inline]
pub fn is_dry_run() -> bool {
    DRY_RUN.load(std::sync::atomic::Ordering::Relaxed)
}

/// Check if CSV output is requested.
#[inline]
pub fn is_csv() -> bool {
    CSV_OUTPUT.load(std::sync::atomic::Ordering::Relaxed)
}

/// Escape a value for CSV output (wrap in quotes if it contains commas, quotes, or newlines).
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
