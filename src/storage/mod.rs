//! SQLite storage layer for csvn.
//!
//! This module provides the persistence layer using SQLite with:
//! - WAL mode for concurrent reads
//! - Transaction discipline for atomic writes
//! - Audit events for history
//!
//! # Submodules
//!
//! - [`events`] - Audit event storage
//! - [`ledger`] - Import ledger (imports, schemas, detail views)
//! - [`migrations`] - Upgrades for older databases
//! - [`notes`] - Annotation store (notes and tags)
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Storage handle, transactions and row identities

pub mod events;
pub mod ledger;
pub mod migrations;
pub mod notes;
pub mod schema;
pub mod sqlite;

pub use schema::Schema;
pub use sqlite::{MutationContext, SqliteStorage};
