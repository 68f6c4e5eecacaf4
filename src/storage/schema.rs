//! Database schema definitions.
//!
//! The schema is an explicit [`Schema`] value (base DDL plus ordered
//! migrations) built once by the caller and handed to
//! [`SqliteStorage::open_with_schema`](super::SqliteStorage::open_with_schema).

use super::migrations::{run_migrations, Migration, MIGRATIONS};
use rusqlite::{Connection, Result};

/// Current schema version for migration tracking.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the csvn database.
///
/// Note: Timestamps are stored as INTEGER (Unix milliseconds). Foreign keys
/// carry no ON DELETE actions; cascades are explicit multi-table deletes.
pub const SCHEMA_SQL: &str = r"
-- ====================
-- Schema Version Tracking
-- ====================

CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- ====================
-- Import Ledger
-- ====================

-- Imports: one row per successful upload
CREATE TABLE IF NOT EXISTS csv_imports (
    import_id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    import_timestamp INTEGER NOT NULL,
    row_count INTEGER NOT NULL DEFAULT 0,
    primary_key_column TEXT NOT NULL DEFAULT 'ID',
    content_hash TEXT
);

CREATE INDEX IF NOT EXISTS idx_csv_imports_timestamp ON csv_imports(import_timestamp DESC);

-- Import Schemas: ordered header names (JSON array), at most one per import
CREATE TABLE IF NOT EXISTS csv_import_schemas (
    import_id INTEGER PRIMARY KEY,
    columns TEXT NOT NULL,
    FOREIGN KEY (import_id) REFERENCES csv_imports(import_id)
);

-- Rows: durable identity of a logical record across imports
CREATE TABLE IF NOT EXISTS csv_rows (
    row_id INTEGER PRIMARY KEY AUTOINCREMENT,
    primary_key_value TEXT NOT NULL UNIQUE,
    first_import_id INTEGER,
    last_seen_import_id INTEGER,
    is_orphaned INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (first_import_id) REFERENCES csv_imports(import_id),
    FOREIGN KEY (last_seen_import_id) REFERENCES csv_imports(import_id)
);

CREATE INDEX IF NOT EXISTS idx_csv_rows_last_seen ON csv_rows(last_seen_import_id);

-- Row Snapshots: per-import field values (JSON object in column order)
CREATE TABLE IF NOT EXISTS csv_row_snapshots (
    snapshot_id INTEGER PRIMARY KEY AUTOINCREMENT,
    row_id INTEGER NOT NULL,
    import_id INTEGER NOT NULL,
    data TEXT NOT NULL,
    FOREIGN KEY (row_id) REFERENCES csv_rows(row_id),
    FOREIGN KEY (import_id) REFERENCES csv_imports(import_id),
    UNIQUE(row_id, import_id)
);

CREATE INDEX IF NOT EXISTS idx_csv_row_snapshots_import ON csv_row_snapshots(import_id);
CREATE INDEX IF NOT EXISTS idx_csv_row_snapshots_row ON csv_row_snapshots(row_id);

-- ====================
-- Annotations
-- ====================

-- Tags: shared, unique regardless of case
CREATE TABLE IF NOT EXISTS tags (
    tag_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
    created_timestamp INTEGER NOT NULL
);

-- Notes: mutable annotations on rows, soft-deleted only
CREATE TABLE IF NOT EXISTS notes (
    note_id INTEGER PRIMARY KEY AUTOINCREMENT,
    row_id INTEGER NOT NULL,
    note_text TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Open',
    created_timestamp INTEGER NOT NULL,
    updated_timestamp INTEGER NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (row_id) REFERENCES csv_rows(row_id),
    CHECK (status IN ('Open', 'In Progress', 'Resolved', 'Closed'))
);

CREATE INDEX IF NOT EXISTS idx_notes_row ON notes(row_id);
CREATE INDEX IF NOT EXISTS idx_notes_created ON notes(created_timestamp DESC);

-- Note Tags: many-to-many
CREATE TABLE IF NOT EXISTS note_tags (
    note_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL,
    PRIMARY KEY (note_id, tag_id),
    FOREIGN KEY (note_id) REFERENCES notes(note_id),
    FOREIGN KEY (tag_id) REFERENCES tags(tag_id)
);

CREATE INDEX IF NOT EXISTS idx_note_tags_tag ON note_tags(tag_id);

-- ====================
-- Audit Trail
-- ====================

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_type TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    actor TEXT NOT NULL,
    old_value TEXT,
    new_value TEXT,
    comment TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);
";

/// Schema definition applied when a storage handle is opened.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub base_sql: &'static str,
    pub migrations: &'static [Migration],
    pub version: i32,
}

impl Schema {
    /// The schema this build of csvn expects.
    #[must_use]
    pub const fn current() -> Self {
        Self {
            base_sql: SCHEMA_SQL,
            migrations: MIGRATIONS,
            version: CURRENT_SCHEMA_VERSION,
        }
    }

    /// Apply the schema to the database.
    ///
    /// Sets pragmas, runs the base DDL, then pending migrations.
    /// Idempotent because all statements use `IF NOT EXISTS`.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQL execution fails or pragmas cannot be set.
    pub fn apply(&self, conn: &Connection) -> Result<()> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;

        conn.execute_batch(self.base_sql)?;

        run_migrations(conn, self.migrations)?;

        conn.execute(
            "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![
                format!("v{}", self.version),
                chrono::Utc::now().timestamp_millis()
            ],
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_schema() {
        let conn = Connection::open_in_memory().unwrap();
        Schema::current().apply(&conn).expect("Failed to apply schema");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "csv_imports",
            "csv_import_schemas",
            "csv_rows",
            "csv_row_snapshots",
            "notes",
            "tags",
            "note_tags",
            "events",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        Schema::current().apply(&conn).expect("First apply failed");
        Schema::current().apply(&conn).expect("Second apply failed");
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = Connection::open_in_memory().unwrap();
        Schema::current().apply(&conn).unwrap();

        let fk_enabled: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk_enabled, 1);
    }

    #[test]
    fn test_primary_key_value_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        Schema::current().apply(&conn).unwrap();

        conn.execute("INSERT INTO csv_rows (primary_key_value) VALUES ('1')", [])
            .unwrap();
        let dup = conn.execute("INSERT INTO csv_rows (primary_key_value) VALUES ('1')", []);
        assert!(dup.is_err());
    }

    #[test]
    fn test_status_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        Schema::current().apply(&conn).unwrap();
        conn.execute("INSERT INTO csv_rows (primary_key_value) VALUES ('k')", [])
            .unwrap();

        let ok = conn.execute(
            "INSERT INTO notes (row_id, note_text, status, created_timestamp, updated_timestamp)
             VALUES (1, 'n', 'In Progress', 0, 0)",
            [],
        );
        assert!(ok.is_ok());

        let bad = conn.execute(
            "INSERT INTO notes (row_id, note_text, status, created_timestamp, updated_timestamp)
             VALUES (1, 'n', 'bogus', 0, 0)",
            [],
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_tag_names_unique_ignoring_case() {
        let conn = Connection::open_in_memory().unwrap();
        Schema::current().apply(&conn).unwrap();

        conn.execute("INSERT INTO tags (name, created_timestamp) VALUES ('Urgent', 0)", [])
            .unwrap();
        let dup = conn.execute("INSERT INTO tags (name, created_timestamp) VALUES ('urgent', 0)", []);
        assert!(dup.is_err());
    }
}
