//! Import ledger: the append-only registry of import events.
//!
//! Writes happen inside the import transaction through the
//! connection-level helpers; reads are methods on [`SqliteStorage`].

use crate::error::{Error, Result};
use crate::model::{Import, ImportDetail, RowData, RowWithNotes};
use crate::storage::sqlite::SqliteStorage;
use rusqlite::{Connection, OptionalExtension};

/// Ledger fields for a new import.
#[derive(Debug, Clone)]
pub(crate) struct NewImport<'a> {
    pub filename: &'a str,
    pub timestamp: i64,
    pub row_count: i64,
    pub primary_key_column: &'a str,
    pub content_hash: &'a str,
}

/// Insert an import record and return its id.
pub(crate) fn insert_import(conn: &Connection, import: &NewImport<'_>) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO csv_imports (filename, import_timestamp, row_count, primary_key_column, content_hash)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            import.filename,
            import.timestamp,
            import.row_count,
            import.primary_key_column,
            import.content_hash,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Store the ordered header names for an import.
pub(crate) fn insert_schema(conn: &Connection, import_id: i64, columns: &[String]) -> Result<()> {
    let json = serde_json::to_string(columns)?;
    conn.execute(
        "INSERT INTO csv_import_schemas (import_id, columns) VALUES (?1, ?2)",
        rusqlite::params![import_id, json],
    )?;
    Ok(())
}

const IMPORT_SELECT: &str = "SELECT i.import_id, i.filename, i.import_timestamp, i.row_count,
        i.primary_key_column, i.content_hash, s.columns
     FROM csv_imports i
     LEFT JOIN csv_import_schemas s ON s.import_id = i.import_id";

impl SqliteStorage {
    /// List all imports, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_imports(&self) -> Result<Vec<Import>> {
        let mut stmt = self.conn().prepare(&format!(
            "{IMPORT_SELECT} ORDER BY i.import_timestamp DESC, i.import_id DESC"
        ))?;
        let rows = stmt.query_map([], map_import_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    /// Get one import by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_import(&self, id: i64) -> Result<Option<Import>> {
        let import = self
            .conn()
            .query_row(
                &format!("{IMPORT_SELECT} WHERE i.import_id = ?1"),
                [id],
                map_import_row,
            )
            .optional()?;
        Ok(import)
    }

    /// Most recent import whose upload bytes hashed to `content_hash`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_import_by_hash(&self, content_hash: &str) -> Result<Option<i64>> {
        let id = self
            .conn()
            .query_row(
                "SELECT import_id FROM csv_imports WHERE content_hash = ?1
                 ORDER BY import_id DESC LIMIT 1",
                [content_hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// An import with the rows it snapshotted, in file order, and the
    /// live notes on each row.
    ///
    /// # Errors
    ///
    /// Returns `ImportNotFound` for an unknown id.
    pub fn import_detail(&self, id: i64) -> Result<ImportDetail> {
        let import = self.get_import(id)?.ok_or(Error::ImportNotFound { id })?;

        let mut stmt = self.conn().prepare(
            "SELECT s.row_id, r.primary_key_value, s.data
             FROM csv_row_snapshots s
             JOIN csv_rows r ON r.row_id = s.row_id
             WHERE s.import_id = ?1
             ORDER BY s.snapshot_id ASC",
        )?;
        let raw = stmt
            .query_map([id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let row_ids: Vec<i64> = raw.iter().map(|(row_id, _, _)| *row_id).collect();
        let mut notes = self.notes_for_rows(&row_ids)?;

        let mut rows = Vec::with_capacity(raw.len());
        for (row_id, primary_key_value, data) in raw {
            rows.push(RowWithNotes {
                row_id,
                primary_key_value,
                data: serde_json::from_str::<RowData>(&data)?,
                notes: notes.remove(&row_id).unwrap_or_default(),
            });
        }

        let columns = if import.column_schema.is_empty() {
            rows.first()
                .map(|r| r.data.columns().map(ToString::to_string).collect())
                .unwrap_or_default()
        } else {
            import.column_schema.clone()
        };

        Ok(ImportDetail {
            import,
            columns,
            rows,
        })
    }
}

// Helper to map import rows
fn map_import_row(row: &rusqlite::Row) -> rusqlite::Result<Import> {
    let columns: Option<String> = row.get(6)?;
    let column_schema = columns
        .map(|json| serde_json::from_str::<Vec<String>>(&json))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?
        .unwrap_or_default();

    Ok(Import {
        id: row.get(0)?,
        filename: row.get(1)?,
        timestamp: row.get(2)?,
        row_count: row.get(3)?,
        primary_key_column: row.get(4)?,
        content_hash: row.get(5)?,
        column_schema,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_import<'a>(filename: &'a str, timestamp: i64) -> NewImport<'a> {
        NewImport {
            filename,
            timestamp,
            row_count: 0,
            primary_key_column: "id",
            content_hash: "abc",
        }
    }

    #[test]
    fn test_insert_and_list_newest_first() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage
            .mutate("test", "tester", |tx, _| {
                let a = insert_import(tx, &new_import("a.csv", 100))?;
                insert_schema(tx, a, &["id".to_string(), "name".to_string()])?;
                insert_import(tx, &new_import("b.csv", 200))?;
                // same timestamp as b: the higher id is newer
                insert_import(tx, &new_import("c.csv", 200))?;
                Ok(())
            })
            .unwrap();

        let imports = storage.list_imports().unwrap();
        let names: Vec<_> = imports.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(names, vec!["c.csv", "b.csv", "a.csv"]);
        assert_eq!(imports[2].column_schema, vec!["id", "name"]);
        assert!(imports[0].column_schema.is_empty());
    }

    #[test]
    fn test_import_detail_unknown_id() {
        let storage = SqliteStorage::open_memory().unwrap();
        let err = storage.import_detail(42).unwrap_err();
        assert!(matches!(err, Error::ImportNotFound { id: 42 }));
    }

    #[test]
    fn test_find_import_by_hash() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage
            .mutate("test", "tester", |tx, _| {
                insert_import(tx, &new_import("a.csv", 1))?;
                insert_import(tx, &new_import("b.csv", 2))?;
                Ok(())
            })
            .unwrap();
        assert_eq!(storage.find_import_by_hash("abc").unwrap(), Some(2));
        assert_eq!(storage.find_import_by_hash("nope").unwrap(), None);
    }
}
