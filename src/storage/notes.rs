//! Annotation store: notes and tags on persistent rows.
//!
//! Notes never disappear physically in normal flow; deletion flips
//! `is_deleted` and every read filters on it. Tags are shared and matched
//! case-insensitively.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::model::{Note, NoteStatus, NoteUpdate, PersistentRow, RowIdentifier, Tag};
use crate::storage::events::{get_events, Event, EventType};
use crate::storage::sqlite::{
    is_unique_violation, query_row_by_key, resolve_row_in, MutationContext, SqliteStorage,
};
use crate::validate::{normalize_status, normalize_tags, require_text};
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

const NOTE_SELECT: &str = "SELECT n.note_id, n.row_id, r.primary_key_value, n.note_text, n.status,
        n.created_timestamp, n.updated_timestamp, n.is_deleted
     FROM notes n
     JOIN csv_rows r ON r.row_id = n.row_id";

impl SqliteStorage {
    /// Attach a note to a row named by internal id or primary-key value.
    ///
    /// With `auto_create_rows` an unknown identifier gets a new orphan row
    /// (no import association) instead of failing with `RowNotFound`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for blank text or identifier,
    /// `InvalidStatus` for an unknown status, or `RowNotFound`.
    pub fn create_note(
        &mut self,
        identifier: &str,
        text: &str,
        status: Option<&str>,
        tags: &[String],
        auto_create_rows: bool,
        actor: &str,
    ) -> Result<Note> {
        let identifier = RowIdentifier::parse(identifier);
        if identifier.is_empty() {
            return Err(Error::InvalidArgument(
                "row identifier must not be empty".to_string(),
            ));
        }
        require_text(text)?;
        let status = status.map(normalize_status).transpose()?.unwrap_or_default();
        let tags = normalize_tags(tags);

        self.mutate("create_note", actor, |tx, ctx| {
            let row = match resolve_row_in(tx, &identifier)? {
                Some(row) => row,
                None if auto_create_rows => create_orphan_row(tx, &identifier, ctx)?,
                None => {
                    return Err(Error::RowNotFound {
                        id: identifier.to_string(),
                    });
                }
            };

            let now = chrono::Utc::now().timestamp_millis();
            tx.execute(
                "INSERT INTO notes (row_id, note_text, status, created_timestamp, updated_timestamp, is_deleted)
                 VALUES (?1, ?2, ?3, ?4, ?4, 0)",
                rusqlite::params![row.id, text, status.as_str(), now],
            )?;
            let note_id = tx.last_insert_rowid();

            link_tags(tx, note_id, &tags, ctx)?;

            ctx.record_change(
                "note",
                &note_id.to_string(),
                EventType::NoteCreated,
                None,
                Some(status.as_str().to_string()),
            );

            load_note(tx, note_id)?.ok_or(Error::NoteNotFound { id: note_id })
        })
    }

    /// Get a note by id, including soft-deleted notes.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_note(&self, id: i64) -> Result<Option<Note>> {
        load_note(self.conn(), id)
    }

    /// All live notes, newest created first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_notes(&self) -> Result<Vec<Note>> {
        load_notes(
            self.conn(),
            "WHERE n.is_deleted = 0 ORDER BY n.created_timestamp DESC, n.note_id DESC",
            [],
        )
    }

    /// Live notes on one row, newest created first.
    ///
    /// # Errors
    ///
    /// Returns `RowNotFound` if the identifier does not resolve.
    pub fn list_notes_for_row(&self, identifier: &str) -> Result<Vec<Note>> {
        let identifier = RowIdentifier::parse(identifier);
        let row = self
            .resolve_row(&identifier)?
            .ok_or_else(|| Error::RowNotFound {
                id: identifier.to_string(),
            })?;
        notes_on_row(self.conn(), row.id)
    }

    /// Apply a partial update. `tags: Some(vec![])` clears every tag link
    /// but leaves the tags themselves in place.
    ///
    /// # Errors
    ///
    /// Returns `NoteNotFound` if the note is missing or deleted,
    /// `InvalidStatus` or `InvalidArgument` for bad input.
    pub fn update_note(&mut self, id: i64, update: &NoteUpdate, actor: &str) -> Result<Note> {
        if let Some(text) = &update.text {
            require_text(text)?;
        }
        let status = update.status.as_deref().map(normalize_status).transpose()?;
        let tags = update.tags.as_deref().map(normalize_tags);

        self.mutate("update_note", actor, |tx, ctx| {
            let existing = load_live_note(tx, id)?;
            let now = chrono::Utc::now().timestamp_millis();

            if let Some(text) = &update.text {
                tx.execute(
                    "UPDATE notes SET note_text = ?1 WHERE note_id = ?2",
                    rusqlite::params![text, id],
                )?;
            }

            if let Some(status) = status {
                tx.execute(
                    "UPDATE notes SET status = ?1 WHERE note_id = ?2",
                    rusqlite::params![status.as_str(), id],
                )?;
            }

            if let Some(tags) = &tags {
                tx.execute("DELETE FROM note_tags WHERE note_id = ?1", [id])?;
                link_tags(tx, id, tags, ctx)?;
            }

            // Never move backwards, even when two writes land in the same millisecond
            tx.execute(
                "UPDATE notes SET updated_timestamp = MAX(?1, updated_timestamp) WHERE note_id = ?2",
                rusqlite::params![now, id],
            )?;

            ctx.record_change(
                "note",
                &id.to_string(),
                EventType::NoteUpdated,
                Some(existing.status.as_str().to_string()),
                status.map(|s| s.as_str().to_string()),
            );

            load_note(tx, id)?.ok_or(Error::NoteNotFound { id })
        })
    }

    /// Soft-delete a note.
    ///
    /// # Errors
    ///
    /// Returns `NoteNotFound` if the note is missing or already deleted.
    pub fn delete_note(&mut self, id: i64, actor: &str) -> Result<Note> {
        self.mutate("delete_note", actor, |tx, ctx| {
            load_live_note(tx, id)?;
            let now = chrono::Utc::now().timestamp_millis();
            tx.execute(
                "UPDATE notes SET is_deleted = 1, updated_timestamp = MAX(?1, updated_timestamp)
                 WHERE note_id = ?2",
                rusqlite::params![now, id],
            )?;
            ctx.record_event("note", &id.to_string(), EventType::NoteDeleted);
            load_note(tx, id)?.ok_or(Error::NoteNotFound { id })
        })
    }

    /// Every tag, alphabetical ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self.conn().prepare(
            "SELECT tag_id, name, created_timestamp FROM tags ORDER BY name COLLATE NOCASE ASC, tag_id ASC",
        )?;
        let tags = stmt
            .query_map([], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    /// Audit trail of a note, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `NoteNotFound` for an id that never existed.
    pub fn note_events(&self, id: i64) -> Result<Vec<Event>> {
        if self.get_note(id)?.is_none() {
            return Err(Error::NoteNotFound { id });
        }
        Ok(get_events(self.conn(), "note", &id.to_string(), None)?)
    }

    /// Live notes for each of `row_ids`, newest first per row.
    pub(crate) fn notes_for_rows(&self, row_ids: &[i64]) -> Result<HashMap<i64, Vec<Note>>> {
        let mut by_row = HashMap::with_capacity(row_ids.len());
        for &row_id in row_ids {
            let notes = notes_on_row(self.conn(), row_id)?;
            if !notes.is_empty() {
                by_row.insert(row_id, notes);
            }
        }
        Ok(by_row)
    }
}

// ==================
// Connection-level helpers (usable inside a transaction)
// ==================

fn create_orphan_row(
    conn: &Connection,
    identifier: &RowIdentifier,
    ctx: &mut MutationContext,
) -> Result<PersistentRow> {
    let key = identifier.primary_key_value();
    match conn.execute(
        "INSERT INTO csv_rows (primary_key_value, first_import_id, last_seen_import_id, is_orphaned)
         VALUES (?1, NULL, NULL, 1)",
        [key],
    ) {
        Ok(_) => {
            let id = conn.last_insert_rowid();
            ctx.record_comment("row", &id.to_string(), EventType::RowCreated, key);
        }
        Err(e) if is_unique_violation(&e) => {
            debug!(key, "Row created concurrently, reusing it");
        }
        Err(e) => return Err(e.into()),
    }

    query_row_by_key(conn, key)?.ok_or_else(|| Error::RowNotFound {
        id: key.to_string(),
    })
}

fn get_or_create_tag(conn: &Connection, name: &str, ctx: &mut MutationContext) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT tag_id FROM tags WHERE name = ?1 COLLATE NOCASE",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO tags (name, created_timestamp) VALUES (?1, ?2)",
        rusqlite::params![name, chrono::Utc::now().timestamp_millis()],
    )?;
    let id = conn.last_insert_rowid();
    ctx.record_comment("tag", &id.to_string(), EventType::TagCreated, name);
    Ok(id)
}

fn link_tags(
    conn: &Connection,
    note_id: i64,
    tags: &[String],
    ctx: &mut MutationContext,
) -> Result<()> {
    for name in tags {
        let tag_id = get_or_create_tag(conn, name, ctx)?;
        conn.execute(
            "INSERT OR IGNORE INTO note_tags (note_id, tag_id) VALUES (?1, ?2)",
            rusqlite::params![note_id, tag_id],
        )?;
    }
    Ok(())
}

fn tags_for_note(conn: &Connection, note_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT t.name FROM tags t
         JOIN note_tags nt ON nt.tag_id = t.tag_id
         WHERE nt.note_id = ?1
         ORDER BY t.name COLLATE NOCASE ASC",
    )?;
    let names = stmt
        .query_map([note_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(names)
}

fn load_notes<P: rusqlite::Params>(conn: &Connection, tail: &str, params: P) -> Result<Vec<Note>> {
    let mut stmt = conn.prepare(&format!("{NOTE_SELECT} {tail}"))?;
    let mut notes = stmt
        .query_map(params, map_note_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for note in &mut notes {
        note.tags = tags_for_note(conn, note.id)?;
    }
    Ok(notes)
}

fn load_note(conn: &Connection, id: i64) -> Result<Option<Note>> {
    Ok(load_notes(conn, "WHERE n.note_id = ?1", [id])?.into_iter().next())
}

fn load_live_note(conn: &Connection, id: i64) -> Result<Note> {
    load_note(conn, id)?
        .filter(|note| !note.is_deleted)
        .ok_or(Error::NoteNotFound { id })
}

fn notes_on_row(conn: &Connection, row_id: i64) -> Result<Vec<Note>> {
    load_notes(
        conn,
        "WHERE n.row_id = ?1 AND n.is_deleted = 0
         ORDER BY n.created_timestamp DESC, n.note_id DESC",
        [row_id],
    )
}

// Helper to map note rows; tags are filled in afterwards
fn map_note_row(row: &rusqlite::Row) -> rusqlite::Result<Note> {
    let status: String = row.get(4)?;
    Ok(Note {
        id: row.get(0)?,
        row_id: row.get(1)?,
        primary_key_value: row.get(2)?,
        text: row.get(3)?,
        status: NoteStatus::from_stored(&status),
        tags: Vec::new(),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        is_deleted: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn tag_count(storage: &SqliteStorage) -> i64 {
        storage
            .conn()
            .query_row("SELECT COUNT(*) FROM tags", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_create_note_on_unseen_key_creates_orphan_row() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let note = storage
            .create_note("unseen-key", "check this", None, &[], true, "tester")
            .unwrap();

        assert_eq!(note.status, NoteStatus::Open);
        assert_eq!(note.primary_key_value, "unseen-key");

        let row = storage.find_row_by_key("unseen-key").unwrap().unwrap();
        assert!(row.is_orphaned);
        assert_eq!(row.first_import_id, None);
        assert_eq!(row.id, note.row_id);

        let rows: i64 = storage
            .conn()
            .query_row("SELECT COUNT(*) FROM csv_rows", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_create_note_without_auto_create() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let err = storage
            .create_note("ghost", "text", None, &[], false, "tester")
            .unwrap_err();
        assert!(matches!(err, Error::RowNotFound { .. }));
        assert!(storage.find_row_by_key("ghost").unwrap().is_none());
    }

    #[test]
    fn test_create_note_validates_before_writing() {
        let mut storage = SqliteStorage::open_memory().unwrap();

        let err = storage
            .create_note("k", "text", Some("bogus"), &[], true, "tester")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStatus { .. }));

        let err = storage
            .create_note("k", "   ", None, &[], true, "tester")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = storage
            .create_note("  ", "text", None, &[], true, "tester")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        assert!(storage.find_row_by_key("k").unwrap().is_none());
    }

    #[test]
    fn test_status_is_normalized() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let note = storage
            .create_note("k", "text", Some("  resolved "), &[], true, "tester")
            .unwrap();
        assert_eq!(note.status, NoteStatus::Resolved);

        let note = storage
            .create_note("k", "text", Some("in progress"), &[], true, "tester")
            .unwrap();
        assert_eq!(note.status, NoteStatus::InProgress);
    }

    #[test]
    fn test_tags_dedupe_case_insensitively_and_are_shared() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let first = storage
            .create_note("a", "one", None, &tags(&["Urgent", "urgent", " billing "]), true, "tester")
            .unwrap();
        assert_eq!(first.tags, vec!["billing", "Urgent"]);

        let second = storage
            .create_note("b", "two", None, &tags(&["URGENT"]), true, "tester")
            .unwrap();
        // matched against the existing tag, spelling of the first use wins
        assert_eq!(second.tags, vec!["Urgent"]);
        assert_eq!(tag_count(&storage), 2);
    }

    #[test]
    fn test_clearing_tags_keeps_tag_entities() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let note = storage
            .create_note("a", "one", None, &tags(&["x", "y"]), true, "tester")
            .unwrap();

        let update = NoteUpdate {
            tags: Some(Vec::new()),
            ..Default::default()
        };
        let updated = storage.update_note(note.id, &update, "tester").unwrap();

        assert!(updated.tags.is_empty());
        assert_eq!(updated.text, "one");
        assert_eq!(tag_count(&storage), 2);
        assert!(updated.updated_at >= note.updated_at);
    }

    #[test]
    fn test_update_only_touches_given_fields() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let note = storage
            .create_note("a", "one", Some("open"), &tags(&["x"]), true, "tester")
            .unwrap();

        let update = NoteUpdate {
            status: Some("closed".to_string()),
            ..Default::default()
        };
        let updated = storage.update_note(note.id, &update, "tester").unwrap();
        assert_eq!(updated.status, NoteStatus::Closed);
        assert_eq!(updated.text, "one");
        assert_eq!(updated.tags, vec!["x"]);

        let events = storage.note_events(note.id).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, EventType::NoteUpdated);
        assert_eq!(events[1].old_value.as_deref(), Some("Open"));
        assert_eq!(events[1].new_value.as_deref(), Some("Closed"));
    }

    #[test]
    fn test_update_rejects_bad_status_without_changes() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let note = storage
            .create_note("a", "one", None, &[], true, "tester")
            .unwrap();
        let update = NoteUpdate {
            text: Some("two".to_string()),
            status: Some("bogus".to_string()),
            ..Default::default()
        };
        assert!(storage.update_note(note.id, &update, "tester").is_err());
        assert_eq!(storage.get_note(note.id).unwrap().unwrap().text, "one");
    }

    #[test]
    fn test_deleted_notes_are_hidden_and_immutable() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let keep = storage.create_note("a", "keep", None, &[], true, "tester").unwrap();
        let gone = storage.create_note("a", "gone", None, &[], true, "tester").unwrap();

        storage.delete_note(gone.id, "tester").unwrap();

        let ids: Vec<_> = storage.list_notes().unwrap().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![keep.id]);
        assert_eq!(storage.list_notes_for_row("a").unwrap().len(), 1);

        let update = NoteUpdate {
            text: Some("back".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            storage.update_note(gone.id, &update, "tester").unwrap_err(),
            Error::NoteNotFound { .. }
        ));
        assert!(matches!(
            storage.delete_note(gone.id, "tester").unwrap_err(),
            Error::NoteNotFound { .. }
        ));
        // still physically present
        assert!(storage.get_note(gone.id).unwrap().unwrap().is_deleted);
    }

    #[test]
    fn test_list_notes_newest_first() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let a = storage.create_note("r", "a", None, &[], true, "tester").unwrap();
        let b = storage.create_note("r", "b", None, &[], true, "tester").unwrap();
        let ids: Vec<_> = storage.list_notes().unwrap().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[test]
    fn test_list_notes_for_unknown_row() {
        let storage = SqliteStorage::open_memory().unwrap();
        assert!(matches!(
            storage.list_notes_for_row("nope").unwrap_err(),
            Error::RowNotFound { .. }
        ));
    }

    #[test]
    fn test_note_by_internal_row_id() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let first = storage.create_note("alpha", "a", None, &[], true, "tester").unwrap();
        let by_id = storage
            .create_note(&first.row_id.to_string(), "b", None, &[], true, "tester")
            .unwrap();
        assert_eq!(by_id.row_id, first.row_id);
        assert_eq!(storage.list_notes_for_row("alpha").unwrap().len(), 2);
    }

    #[test]
    fn test_list_tags_alphabetical() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage
            .create_note("a", "t", None, &tags(&["beta", "Alpha", "gamma"]), true, "tester")
            .unwrap();
        let names: Vec<_> = storage.list_tags().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Alpha", "beta", "gamma"]);
    }
}
