//! Row command implementations.

use crate::cli::RowCommands;
use crate::cli::commands::note::{status_label, NoteOutput};
use crate::cli::commands::{open_storage, resolve_actor};
use crate::error::{Error, Result};
use crate::model::{PersistentRow, RowData, RowIdentifier};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct SnapshotItem<'a> {
    import_id: i64,
    data: &'a RowData,
}

#[derive(Serialize)]
struct RowShowOutput<'a> {
    success: bool,
    row: &'a PersistentRow,
    snapshots: Vec<SnapshotItem<'a>>,
    notes: Vec<NoteOutput>,
}

/// Execute row commands.
pub fn execute(
    command: &RowCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        RowCommands::Show { row } => show(row, db_path, json),
        RowCommands::Purge { row } => purge(row, db_path, actor, json),
    }
}

fn show(row: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let identifier = RowIdentifier::parse(row);
    let row = storage
        .resolve_row(&identifier)?
        .ok_or_else(|| Error::RowNotFound {
            id: identifier.to_string(),
        })?;

    let history = storage.row_history(row.id)?;
    let notes = storage.list_notes_for_row(&row.id.to_string())?;

    if json {
        let output = RowShowOutput {
            success: true,
            row: &row,
            snapshots: history
                .iter()
                .map(|s| SnapshotItem {
                    import_id: s.import_id,
                    data: &s.data,
                })
                .collect(),
            notes: notes.iter().map(NoteOutput::from).collect(),
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    let orphan = if row.is_orphaned { " (orphan)" } else { "" };
    println!(
        "Row #{} {}{}",
        row.id,
        row.primary_key_value.bold(),
        orphan.yellow()
    );
    match (row.first_import_id, row.last_seen_import_id) {
        (Some(first), Some(last)) => println!("  Seen in imports #{first} to #{last}"),
        _ => println!("  Not seen in any import"),
    }

    if !history.is_empty() {
        println!();
        println!("{}", "Snapshots".cyan().bold());
        for snapshot in &history {
            let fields: Vec<String> = snapshot
                .data
                .iter()
                .map(|(column, value)| format!("{column}={value}"))
                .collect();
            println!("  #{} {}", snapshot.import_id, fields.join(", "));
        }
    }

    if !notes.is_empty() {
        println!();
        println!("{}", "Notes".cyan().bold());
        for note in &notes {
            println!("  #{} {} {}", note.id, status_label(note.status), note.text);
        }
    }

    Ok(())
}

fn purge(row: &str, db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let identifier = RowIdentifier::parse(row);

    if crate::is_dry_run() {
        let row = storage
            .resolve_row(&identifier)?
            .ok_or_else(|| Error::RowNotFound {
                id: identifier.to_string(),
            })?;
        let snapshots = storage.row_history(row.id)?.len();
        if json {
            let output = serde_json::json!({
                "success": true,
                "dry_run": true,
                "row_id": row.id,
                "primary_key_value": row.primary_key_value,
                "snapshots": snapshots,
            });
            println!("{output}");
        } else {
            println!(
                "Would purge row #{} {} and its {snapshots} snapshot(s) and notes",
                row.id, row.primary_key_value
            );
        }
        return Ok(());
    }

    let actor = resolve_actor(actor);
    let row = storage.purge_row(&identifier, &actor)?;

    if crate::is_silent() {
        println!("{}", row.id);
        return Ok(());
    }

    if json {
        let output = serde_json::json!({
            "success": true,
            "row_id": row.id,
            "primary_key_value": row.primary_key_value,
            "purged": true
        });
        println!("{output}");
    } else {
        println!("Purged row #{} {}", row.id, row.primary_key_value);
    }

    Ok(())
}
