//! Row reconciliation: maps each record of an import onto a persistent
//! row identity and writes its per-import snapshot.
//!
//! Runs on the import's transaction; any error rolls the whole import back.

use std::collections::HashSet;

use crate::error::Result;
use crate::ingest::ParsedRecord;
use crate::model::RowData;
use crate::storage::sqlite::{is_unique_violation, query_row_by_key};
use rusqlite::Connection;
use tracing::debug;

/// Aggregate counts of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Records mapped to a row and snapshotted
    pub imported: usize,
    /// Records skipped by policy
    pub skipped: usize,
    /// Row identities created by this pass
    pub new_rows: usize,
}

/// Reconciles the records of a single import.
pub struct Reconciler<'a> {
    conn: &'a Connection,
    import_id: i64,
    seen: HashSet<String>,
    stats: ReconcileStats,
}

impl<'a> Reconciler<'a> {
    #[must_use]
    pub fn new(conn: &'a Connection, import_id: i64) -> Self {
        Self {
            conn,
            import_id,
            seen: HashSet::new(),
            stats: ReconcileStats::default(),
        }
    }

    /// Walk `records` in input order.
    ///
    /// Records with a missing or blank key are skipped, as are repeats of a
    /// key already reconciled in this import.
    ///
    /// # Errors
    ///
    /// Returns an error on any database failure.
    pub fn run(
        mut self,
        headers: &[String],
        records: &[ParsedRecord],
        primary_key_column: &str,
    ) -> Result<ReconcileStats> {
        for (line, record) in records.iter().enumerate() {
            let Some(key) = record
                .get(primary_key_column)
                .map(str::trim)
                .filter(|k| !k.is_empty())
            else {
                debug!(record = line + 1, "Skipping record without key");
                self.stats.skipped += 1;
                continue;
            };

            if !self.seen.insert(key.to_string()) {
                debug!(record = line + 1, key, "Skipping repeated key");
                self.stats.skipped += 1;
                continue;
            }

            let row_id = self.upsert_row(key)?;
            self.write_snapshot(row_id, &snapshot_data(headers, record))?;
            self.stats.imported += 1;
        }

        Ok(self.stats)
    }

    /// Find or create the row identity for `key` and mark it seen.
    fn upsert_row(&mut self, key: &str) -> Result<i64> {
        if let Some(row) = query_row_by_key(self.conn, key)? {
            self.touch_row(row.id)?;
            return Ok(row.id);
        }

        match self.conn.execute(
            "INSERT INTO csv_rows (primary_key_value, first_import_id, last_seen_import_id, is_orphaned)
             VALUES (?1, ?2, ?2, 0)",
            rusqlite::params![key, self.import_id],
        ) {
            Ok(_) => {
                self.stats.new_rows += 1;
                Ok(self.conn.last_insert_rowid())
            }
            Err(e) if is_unique_violation(&e) => {
                // Another writer created it first: treat as an update
                debug!(key, "Row created concurrently, updating instead");
                let row = query_row_by_key(self.conn, key)?.ok_or(e)?;
                self.touch_row(row.id)?;
                Ok(row.id)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn touch_row(&self, row_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE csv_rows
             SET last_seen_import_id = ?1,
                 is_orphaned = 0,
                 first_import_id = COALESCE(first_import_id, ?1)
             WHERE row_id = ?2",
            rusqlite::params![self.import_id, row_id],
        )?;
        Ok(())
    }

    fn write_snapshot(&self, row_id: i64, data: &RowData) -> Result<()> {
        let json = serde_json::to_string(data)?;
        self.conn.execute(
            "INSERT INTO csv_row_snapshots (row_id, import_id, data) VALUES (?1, ?2, ?3)",
            rusqlite::params![row_id, self.import_id, json],
        )?;
        Ok(())
    }
}

/// Column-ordered snapshot of a record; missing cells become "".
fn snapshot_data(headers: &[String], record: &ParsedRecord) -> RowData {
    if headers.is_empty() {
        return record
            .columns()
            .map(|c| (c.to_string(), record.get(c).unwrap_or_default().to_string()))
            .collect();
    }
    headers
        .iter()
        .map(|h| (h.clone(), record.get(h).unwrap_or_default().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ledger::{insert_import, NewImport};
    use crate::storage::SqliteStorage;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn record(headers: &[String], values: &[Option<&str>]) -> ParsedRecord {
        ParsedRecord::from_fields(headers, values.iter().map(|v| v.map(ToString::to_string)))
    }

    fn reconcile(
        storage: &mut SqliteStorage,
        headers: &[String],
        records: &[ParsedRecord],
        key: &str,
    ) -> (i64, ReconcileStats) {
        storage
            .mutate("test_import", "tester", |tx, _| {
                let import_id = insert_import(
                    tx,
                    &NewImport {
                        filename: "t.csv",
                        timestamp: 0,
                        row_count: records.len() as i64,
                        primary_key_column: key,
                        content_hash: "",
                    },
                )?;
                let stats = Reconciler::new(tx, import_id).run(headers, records, key)?;
                Ok((import_id, stats))
            })
            .unwrap()
    }

    fn count(storage: &SqliteStorage, table: &str) -> i64 {
        storage
            .conn()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_new_rows_and_snapshots() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let h = headers(&["Name", "ID", "Email"]);
        let records = vec![
            record(&h, &[Some("A"), Some("1"), Some("a@x")]),
            record(&h, &[Some("B"), Some("2"), Some("b@x")]),
        ];

        let (import_id, stats) = reconcile(&mut storage, &h, &records, "ID");
        assert_eq!(stats, ReconcileStats { imported: 2, skipped: 0, new_rows: 2 });
        assert_eq!(count(&storage, "csv_rows"), 2);
        assert_eq!(count(&storage, "csv_row_snapshots"), 2);

        let row = storage.find_row_by_key("1").unwrap().unwrap();
        assert_eq!(row.first_import_id, Some(import_id));
        assert_eq!(row.last_seen_import_id, Some(import_id));
        assert!(!row.is_orphaned);

        let history = storage.row_history(row.id).unwrap();
        assert_eq!(history[0].data.get("Email"), Some("a@x"));
        assert_eq!(history[0].data.columns().collect::<Vec<_>>(), vec!["Name", "ID", "Email"]);
    }

    #[test]
    fn test_reimport_updates_existing_rows() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let h = headers(&["ID", "Name"]);
        let records = vec![record(&h, &[Some("1"), Some("A")]), record(&h, &[Some("2"), Some("B")])];

        let (first, _) = reconcile(&mut storage, &h, &records, "ID");
        let (second, stats) = reconcile(&mut storage, &h, &records, "ID");

        assert_eq!(stats.new_rows, 0);
        assert_eq!(stats.imported, 2);
        assert_eq!(count(&storage, "csv_rows"), 2);
        assert_eq!(count(&storage, "csv_row_snapshots"), 4);

        let row = storage.find_row_by_key("2").unwrap().unwrap();
        assert_eq!(row.first_import_id, Some(first));
        assert_eq!(row.last_seen_import_id, Some(second));

        let history = storage.row_history(row.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].data, history[1].data);
    }

    #[test]
    fn test_missing_and_blank_keys_are_skipped() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let h = headers(&["ID", "Name"]);
        let records = vec![
            record(&h, &[Some(""), Some("x")]),
            record(&h, &[Some("   "), Some("y")]),
            record(&h, &[None, None]),
        ];

        let (_, stats) = reconcile(&mut storage, &h, &records, "ID");
        assert_eq!(stats, ReconcileStats { imported: 0, skipped: 3, new_rows: 0 });
        assert_eq!(count(&storage, "csv_rows"), 0);
        assert_eq!(count(&storage, "csv_row_snapshots"), 0);
    }

    #[test]
    fn test_key_is_trimmed() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let h = headers(&["ID"]);
        let records = vec![record(&h, &[Some("  k1 ")])];
        reconcile(&mut storage, &h, &records, "ID");
        assert!(storage.find_row_by_key("k1").unwrap().is_some());
    }

    #[test]
    fn test_repeated_key_first_occurrence_wins() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let h = headers(&["ID", "Name"]);
        let records = vec![
            record(&h, &[Some("1"), Some("first")]),
            record(&h, &[Some("1"), Some("second")]),
        ];

        let (_, stats) = reconcile(&mut storage, &h, &records, "ID");
        assert_eq!(stats, ReconcileStats { imported: 1, skipped: 1, new_rows: 1 });

        let row = storage.find_row_by_key("1").unwrap().unwrap();
        let history = storage.row_history(row.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].data.get("Name"), Some("first"));
    }

    #[test]
    fn test_orphan_row_is_adopted() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage
            .create_note("unseen-key", "early", None, &[], true, "tester")
            .unwrap();

        let h = headers(&["ID"]);
        let records = vec![record(&h, &[Some("unseen-key")])];
        let (import_id, stats) = reconcile(&mut storage, &h, &records, "ID");

        assert_eq!(stats.new_rows, 0);
        let row = storage.find_row_by_key("unseen-key").unwrap().unwrap();
        assert!(!row.is_orphaned);
        assert_eq!(row.first_import_id, Some(import_id));
        assert_eq!(row.last_seen_import_id, Some(import_id));
    }

    #[test]
    fn test_short_record_snapshot_uses_empty_strings() {
        let h = headers(&["ID", "Name", "Email"]);
        let rec = record(&h, &[Some("1")]);
        let data = snapshot_data(&h, &rec);
        assert_eq!(data.get("Name"), Some(""));
        assert_eq!(data.len(), 3);
    }
}
