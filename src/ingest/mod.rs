//! Upload ingestion.
//!
//! - [`parse`] - Decoding and CSV parsing
//! - [`hash`] - Content hashing of raw uploads
//! - [`reconcile`] - Row identity upserts and snapshots
//! - [`import`] - The end-to-end import pipeline

pub mod hash;
pub mod import;
pub mod parse;
pub mod reconcile;

pub use hash::content_hash;
pub use import::{import_upload, Importer};
pub use parse::{decode_upload, parse_upload, ParsedRecord, ParsedTable};
pub use reconcile::{ReconcileStats, Reconciler};
