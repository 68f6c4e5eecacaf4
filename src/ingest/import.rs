//! The import pipeline: parse, detect the key, reconcile.

use crate::detect::detect_primary_key;
use crate::error::Result;
use crate::ingest::hash::content_hash;
use crate::ingest::parse::parse_upload;
use crate::ingest::reconcile::Reconciler;
use crate::model::ImportSummary;
use crate::storage::events::EventType;
use crate::storage::ledger::{insert_import, insert_schema, NewImport};
use crate::storage::sqlite::SqliteStorage;
use tracing::info;

/// Runs uploads through the reconciliation engine.
///
/// Each upload is all-or-nothing: the import record, its schema, every
/// row upsert and every snapshot commit together or not at all.
pub struct Importer<'a> {
    storage: &'a mut SqliteStorage,
    actor: &'a str,
}

impl<'a> Importer<'a> {
    #[must_use]
    pub fn new(storage: &'a mut SqliteStorage, actor: &'a str) -> Self {
        Self { storage, actor }
    }

    /// Import one upload.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` for an empty upload or missing header row,
    /// or a database error (after rolling back).
    pub fn import(&mut self, filename: &str, bytes: &[u8]) -> Result<ImportSummary> {
        let table = parse_upload(bytes)?;
        let primary_key = detect_primary_key(&table.headers, &table.records)?;
        let hash = content_hash(bytes);

        if let Some(previous) = self.storage.find_import_by_hash(&hash)? {
            info!(
                filename,
                previous_import = previous,
                "Upload is identical to an earlier import"
            );
        }

        let row_count = i64::try_from(table.row_count()).unwrap_or(i64::MAX);
        let timestamp = chrono::Utc::now().timestamp_millis();

        let summary = self.storage.mutate("import", self.actor, |tx, ctx| {
            let import_id = insert_import(
                tx,
                &NewImport {
                    filename,
                    timestamp,
                    row_count,
                    primary_key_column: &primary_key,
                    content_hash: &hash,
                },
            )?;
            insert_schema(tx, import_id, &table.headers)?;

            let stats =
                Reconciler::new(tx, import_id).run(&table.headers, &table.records, &primary_key)?;

            ctx.record_comment(
                "import",
                &import_id.to_string(),
                EventType::ImportCreated,
                &format!(
                    "file={filename} key={primary_key} imported={} skipped={}",
                    stats.imported, stats.skipped
                ),
            );

            Ok(ImportSummary {
                import_id,
                filename: filename.to_string(),
                row_count,
                primary_key: primary_key.clone(),
                imported_count: stats.imported,
                skipped_count: stats.skipped,
                new_rows: stats.new_rows,
                content_hash: hash.clone(),
            })
        })?;

        info!(
            import_id = summary.import_id,
            filename,
            primary_key = %summary.primary_key,
            rows = summary.row_count,
            imported = summary.imported_count,
            skipped = summary.skipped_count,
            new_rows = summary.new_rows,
            "Import complete"
        );

        Ok(summary)
    }
}

/// Import one upload into `storage`.
///
/// # Errors
///
/// See [`Importer::import`].
pub fn import_upload(
    storage: &mut SqliteStorage,
    filename: &str,
    bytes: &[u8],
    actor: &str,
) -> Result<ImportSummary> {
    Importer::new(storage, actor).import(filename, bytes)
}
