//! SQLite storage implementation.
//!
//! This module provides the storage handle for csvn. Every write goes
//! through [`SqliteStorage::mutate`], which runs the closure inside one
//! IMMEDIATE transaction and writes the collected audit events on commit.

use crate::error::{Error, Result};
use crate::model::{PersistentRow, RowData, RowIdentifier, RowSnapshot};
use crate::storage::events::{insert_event, Event, EventType};
use crate::storage::schema::Schema;
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation, tracking side effects.
///
/// Passed to mutation closures to record audit events that are written
/// just before the transaction commits.
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: String,
    /// Actor performing the operation.
    pub actor: String,
    /// Events to write at the end of the transaction.
    pub events: Vec<Event>,
}

impl MutationContext {
    /// Create a new mutation context.
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            events: Vec::new(),
        }
    }

    /// Record an event for this operation.
    pub fn record_event(&mut self, entity_type: &str, entity_id: &str, event_type: EventType) {
        self.events
            .push(Event::new(entity_type, entity_id, event_type, &self.actor));
    }

    /// Record an event with old/new values for field tracking.
    pub fn record_change(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        event_type: EventType,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        self.events.push(
            Event::new(entity_type, entity_id, event_type, &self.actor)
                .with_values(old_value, new_value),
        );
    }

    /// Record an event carrying a free-form comment.
    pub fn record_comment(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        event_type: EventType,
        comment: &str,
    ) {
        self.events.push(
            Event::new(entity_type, entity_id, event_type, &self.actor).with_comment(comment),
        );
    }
}

impl SqliteStorage {
    /// Open a database at the given path with the current schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_schema(path, &Schema::current(), None)
    }

    /// Open a database, applying `schema`, with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_schema(path: &Path, schema: &Schema, timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Default 5 second timeout
        conn.busy_timeout(Duration::from_millis(timeout_ms.unwrap_or(5000)))?;

        schema.apply(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Schema::current().apply(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// This method:
    /// 1. Begins an IMMEDIATE transaction (for write locking)
    /// 2. Executes the mutation closure
    /// 3. Writes audit events
    /// 4. Commits (or rolls back on error)
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op, actor);

        // Dropping `tx` on the error path rolls back
        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            insert_event(&tx, event)?;
        }

        tx.commit()?;

        Ok(result)
    }

    // ==================
    // Row Operations
    // ==================

    /// Get a row identity by internal id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_row(&self, id: i64) -> Result<Option<PersistentRow>> {
        Ok(query_row_by_id(&self.conn, id)?)
    }

    /// Find a row identity by exact primary-key value.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_row_by_key(&self, primary_key_value: &str) -> Result<Option<PersistentRow>> {
        Ok(query_row_by_key(&self.conn, primary_key_value)?)
    }

    /// Resolve a row identifier (internal id first, then primary key).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn resolve_row(&self, identifier: &RowIdentifier) -> Result<Option<PersistentRow>> {
        Ok(resolve_row_in(&self.conn, identifier)?)
    }

    /// All snapshots of a row, oldest import first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or stored data is not valid JSON.
    pub fn row_history(&self, row_id: i64) -> Result<Vec<RowSnapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT snapshot_id, row_id, import_id, data
             FROM csv_row_snapshots
             WHERE row_id = ?1
             ORDER BY import_id ASC",
        )?;

        let raw = stmt
            .query_map([row_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(id, row_id, import_id, data)| {
                Ok(RowSnapshot {
                    id,
                    row_id,
                    import_id,
                    data: serde_json::from_str::<RowData>(&data)?,
                })
            })
            .collect()
    }

    /// Remove a row with its snapshots, notes and note-tag links.
    ///
    /// Tags themselves survive. All deletes run in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RowNotFound` if the identifier does not resolve.
    pub fn purge_row(&mut self, identifier: &RowIdentifier, actor: &str) -> Result<PersistentRow> {
        self.mutate("purge_row", actor, |tx, ctx| {
            let row = resolve_row_in(tx, identifier)?.ok_or_else(|| Error::RowNotFound {
                id: identifier.to_string(),
            })?;

            tx.execute(
                "DELETE FROM note_tags WHERE note_id IN (SELECT note_id FROM notes WHERE row_id = ?1)",
                [row.id],
            )?;
            let notes = tx.execute("DELETE FROM notes WHERE row_id = ?1", [row.id])?;
            let snapshots = tx.execute("DELETE FROM csv_row_snapshots WHERE row_id = ?1", [row.id])?;
            tx.execute("DELETE FROM csv_rows WHERE row_id = ?1", [row.id])?;

            info!(
                row_id = row.id,
                key = %row.primary_key_value,
                notes,
                snapshots,
                "Purged row"
            );
            ctx.record_comment(
                "row",
                &row.id.to_string(),
                EventType::RowPurged,
                &format!(
                    "key={} notes={notes} snapshots={snapshots}",
                    row.primary_key_value
                ),
            );

            Ok(row)
        })
    }
}

// ==================
// Connection-level helpers (usable inside a transaction)
// ==================

const ROW_COLUMNS: &str =
    "row_id, primary_key_value, first_import_id, last_seen_import_id, is_orphaned";

pub(crate) fn query_row_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<PersistentRow>> {
    conn.query_row(
        &format!("SELECT {ROW_COLUMNS} FROM csv_rows WHERE row_id = ?1"),
        [id],
        map_persistent_row,
    )
    .optional()
}

pub(crate) fn query_row_by_key(
    conn: &Connection,
    primary_key_value: &str,
) -> rusqlite::Result<Option<PersistentRow>> {
    conn.query_row(
        &format!("SELECT {ROW_COLUMNS} FROM csv_rows WHERE primary_key_value = ?1"),
        [primary_key_value],
        map_persistent_row,
    )
    .optional()
}

/// Single lookup path for [`RowIdentifier`] resolution.
pub(crate) fn resolve_row_in(
    conn: &Connection,
    identifier: &RowIdentifier,
) -> rusqlite::Result<Option<PersistentRow>> {
    if let RowIdentifier::ByInternalId { id, .. } = identifier {
        if let Some(row) = query_row_by_id(conn, *id)? {
            return Ok(Some(row));
        }
    }
    query_row_by_key(conn, identifier.primary_key_value())
}

/// True when a statement was rejected by a UNIQUE or PRIMARY KEY constraint.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}

// Helper to map csv_rows rows
fn map_persistent_row(row: &rusqlite::Row) -> rusqlite::Result<PersistentRow> {
    Ok(PersistentRow {
        id: row.get(0)?,
        primary_key_value: row.get(1)?,
        first_import_id: row.get(2)?,
        last_seen_import_id: row.get(3)?,
        is_orphaned: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_row(storage: &mut SqliteStorage, key: &str) -> i64 {
        storage
            .mutate("test_insert", "tester", |tx, _| {
                tx.execute(
                    "INSERT INTO csv_rows (primary_key_value, is_orphaned) VALUES (?1, 1)",
                    [key],
                )?;
                Ok(tx.last_insert_rowid())
            })
            .unwrap()
    }

    #[test]
    fn test_open_memory() {
        let storage = SqliteStorage::open_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_open_file_applies_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("csvn.db");
        let storage = SqliteStorage::open(&path).unwrap();
        let count: i64 = storage
            .conn()
            .query_row("SELECT COUNT(*) FROM csv_rows", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_resolve_row_prefers_internal_id() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let first = insert_row(&mut storage, "alpha");
        let second = insert_row(&mut storage, "1");
        assert_eq!(first, 1);

        // "1" names internal row 1 before the row whose key is "1"
        let row = storage.resolve_row(&RowIdentifier::parse("1")).unwrap().unwrap();
        assert_eq!(row.primary_key_value, "alpha");

        let row = storage
            .resolve_row(&RowIdentifier::parse(&second.to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(row.primary_key_value, "1");

        let row = storage.resolve_row(&RowIdentifier::parse("alpha")).unwrap().unwrap();
        assert_eq!(row.id, first);

        assert!(storage.resolve_row(&RowIdentifier::parse("zzz")).unwrap().is_none());
    }

    #[test]
    fn test_numeric_key_falls_back_to_primary_key() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        insert_row(&mut storage, "alpha");
        insert_row(&mut storage, "1001");

        let row = storage.resolve_row(&RowIdentifier::parse("1001")).unwrap().unwrap();
        assert_eq!(row.primary_key_value, "1001");
    }

    #[test]
    fn test_mutate_rolls_back_on_error() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let result: Result<()> = storage.mutate("failing", "tester", |tx, _| {
            tx.execute("INSERT INTO csv_rows (primary_key_value) VALUES ('x')", [])?;
            Err(Error::Other("boom".to_string()))
        });
        assert!(result.is_err());
        assert!(storage.find_row_by_key("x").unwrap().is_none());
    }

    #[test]
    fn test_unique_violation_detection() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        insert_row(&mut storage, "dup");
        let err = storage
            .conn()
            .execute("INSERT INTO csv_rows (primary_key_value) VALUES ('dup')", [])
            .unwrap_err();
        assert!(is_unique_violation(&err));
        assert!(!is_unique_violation(&rusqlite::Error::QueryReturnedNoRows));
    }

    #[test]
    fn test_purge_missing_row() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let err = storage
            .purge_row(&RowIdentifier::parse("ghost"), "tester")
            .unwrap_err();
        assert!(matches!(err, Error::RowNotFound { .. }));
    }
}
