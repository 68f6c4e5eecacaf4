//! Note command implementations.

use crate::cli::commands::{open_storage, resolve_actor};
use crate::cli::{NoteCommands, NoteCreateArgs, NoteUpdateArgs};
use crate::config::load_settings;
use crate::error::{Error, Result};
use crate::model::{format_timestamp, Note, NoteStatus, NoteUpdate};
use crate::storage::events::Event;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::path::PathBuf;

/// JSON shape of a note, shared with `imports rows`.
#[derive(Serialize)]
pub(crate) struct NoteOutput {
    note_id: i64,
    row_id: i64,
    primary_key_value: String,
    note_text: String,
    status: &'static str,
    tags: Vec<String>,
    created_timestamp: String,
    updated_timestamp: String,
}

impl From<&Note> for NoteOutput {
    fn from(note: &Note) -> Self {
        Self {
            note_id: note.id,
            row_id: note.row_id,
            primary_key_value: note.primary_key_value.clone(),
            note_text: note.text.clone(),
            status: note.status.as_str(),
            tags: note.tags.clone(),
            created_timestamp: format_timestamp(note.created_at),
            updated_timestamp: format_timestamp(note.updated_at),
        }
    }
}

#[derive(Serialize)]
struct NoteResponse {
    success: bool,
    #[serde(flatten)]
    note: NoteOutput,
}

#[derive(Serialize)]
struct NoteListOutput {
    success: bool,
    notes: Vec<NoteOutput>,
    count: usize,
}

#[derive(Serialize)]
struct EventOutput<'a> {
    event_type: &'static str,
    actor: &'a str,
    old_value: Option<&'a str>,
    new_value: Option<&'a str>,
    comment: Option<&'a str>,
    created_at: String,
}

impl<'a> From<&'a Event> for EventOutput<'a> {
    fn from(event: &'a Event) -> Self {
        Self {
            event_type: event.event_type.as_str(),
            actor: &event.actor,
            old_value: event.old_value.as_deref(),
            new_value: event.new_value.as_deref(),
            comment: event.comment.as_deref(),
            created_at: format_timestamp(event.created_at),
        }
    }
}

#[derive(Serialize)]
struct NoteHistoryOutput<'a> {
    success: bool,
    note_id: i64,
    events: Vec<EventOutput<'a>>,
}

/// Execute note commands.
pub fn execute(
    command: &NoteCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        NoteCommands::Create(args) => create(args, db_path, actor, json),
        NoteCommands::List => list(db_path, json),
        NoteCommands::ByRow { row } => by_row(row, db_path, json),
        NoteCommands::Update(args) => update(args, db_path, actor, json),
        NoteCommands::Delete { id } => delete(*id, db_path, actor, json),
        NoteCommands::History { id } => history(*id, db_path, json),
    }
}

fn create(
    args: &NoteCreateArgs,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);
    let settings = load_settings()?;

    let note = storage.create_note(
        &args.row,
        &args.text,
        args.status.as_deref(),
        &args.tags,
        settings.auto_create_rows(),
        &actor,
    )?;

    print_note("Created note", &note, json)
}

fn list(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let notes = storage.list_notes()?;
    print_notes(&notes, json)
}

fn by_row(row: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let notes = storage.list_notes_for_row(row)?;
    print_notes(&notes, json)
}

fn update(
    args: &NoteUpdateArgs,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let tags = if args.clear_tags {
        Some(Vec::new())
    } else if args.tags.is_empty() {
        None
    } else {
        Some(args.tags.clone())
    };
    let changes = NoteUpdate {
        text: args.text.clone(),
        status: args.status.clone(),
        tags,
    };
    if changes.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to update (use --text, --status, --tag or --clear-tags)".to_string(),
        ));
    }

    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);
    let note = storage.update_note(args.id, &changes, &actor)?;

    print_note("Updated note", &note, json)
}

fn delete(id: i64, db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);
    storage.delete_note(id, &actor)?;

    if crate::is_silent() {
        println!("{id}");
        return Ok(());
    }

    if json {
        let output = serde_json::json!({
            "success": true,
            "note_id": id,
            "deleted": true
        });
        println!("{output}");
    } else {
        println!("Deleted note #{id}");
    }

    Ok(())
}

fn history(id: i64, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let events = storage.note_events(id)?;

    if json {
        let output = NoteHistoryOutput {
            success: true,
            note_id: id,
            events: events.iter().map(EventOutput::from).collect(),
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("History of note #{id}:");
    for event in &events {
        let change = match (&event.old_value, &event.new_value) {
            (Some(old), Some(new)) if old != new => format!(" {old} → {new}"),
            (None, Some(new)) => format!(" {new}"),
            _ => String::new(),
        };
        println!(
            "  {} {}{} by {}",
            format_timestamp(event.created_at).dimmed(),
            event.event_type.as_str(),
            change,
            event.actor
        );
    }

    Ok(())
}

fn print_note(verb: &str, note: &Note, json: bool) -> Result<()> {
    if crate::is_silent() {
        println!("{}", note.id);
        return Ok(());
    }

    if json {
        let output = NoteResponse {
            success: true,
            note: NoteOutput::from(note),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{verb} #{} on row {}", note.id, note.primary_key_value.bold());
        print_note_line(note);
    }

    Ok(())
}

fn print_notes(notes: &[Note], json: bool) -> Result<()> {
    if crate::is_csv() {
        println!("note_id,row_id,primary_key_value,status,tags,note_text");
        for n in notes {
            println!(
                "{},{},{},{},{},{}",
                n.id,
                n.row_id,
                crate::csv_escape(&n.primary_key_value),
                n.status,
                crate::csv_escape(&n.tags.join(";")),
                crate::csv_escape(&n.text)
            );
        }
    } else if json {
        let output = NoteListOutput {
            success: true,
            count: notes.len(),
            notes: notes.iter().map(NoteOutput::from).collect(),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if notes.is_empty() {
        println!("No notes found.");
    } else {
        println!("Notes ({} found):", notes.len());
        println!();
        for note in notes {
            println!("#{} on {}", note.id, note.primary_key_value.bold());
            print_note_line(note);
        }
    }

    Ok(())
}

fn print_note_line(note: &Note) {
    let tags = if note.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", note.tags.join(", "))
    };
    println!(
        "  {} {}{}",
        status_label(note.status),
        note.text,
        tags.dimmed()
    );
}

pub(crate) fn status_label(status: NoteStatus) -> ColoredString {
    let label = format!("({status})");
    match status {
        NoteStatus::Open => label.yellow(),
        NoteStatus::InProgress => label.cyan(),
        NoteStatus::Resolved => label.green(),
        NoteStatus::Closed => label.dimmed(),
    }
}
