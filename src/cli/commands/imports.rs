//! Import ledger browsing commands.

use crate::cli::ImportsCommands;
use crate::cli::commands::note::{status_label, NoteOutput};
use crate::cli::commands::open_storage;
use crate::error::Result;
use crate::model::{format_timestamp, Import, ImportDetail, RowData};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct ImportItem<'a> {
    import_id: i64,
    filename: &'a str,
    row_count: i64,
    timestamp: String,
    primary_key: &'a str,
}

impl<'a> From<&'a Import> for ImportItem<'a> {
    fn from(import: &'a Import) -> Self {
        Self {
            import_id: import.id,
            filename: &import.filename,
            row_count: import.row_count,
            timestamp: format_timestamp(import.timestamp),
            primary_key: &import.primary_key_column,
        }
    }
}

#[derive(Serialize)]
struct ImportListOutput<'a> {
    success: bool,
    imports: Vec<ImportItem<'a>>,
}

#[derive(Serialize)]
struct ImportHeader<'a> {
    #[serde(flatten)]
    item: ImportItem<'a>,
    columns: &'a [String],
    content_hash: Option<&'a str>,
}

#[derive(Serialize)]
struct RowItem<'a> {
    row_id: i64,
    primary_key_value: &'a str,
    data: &'a RowData,
    notes: Vec<NoteOutput>,
}

#[derive(Serialize)]
struct ImportRowsOutput<'a> {
    success: bool,
    import: ImportHeader<'a>,
    columns: &'a [String],
    rows: Vec<RowItem<'a>>,
}

/// Execute import ledger commands.
pub fn execute(command: &ImportsCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    match command {
        ImportsCommands::List => list(db_path, json),
        ImportsCommands::Rows { id } => rows(*id, db_path, json),
    }
}

fn list(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let imports = storage.list_imports()?;

    if crate::is_csv() {
        println!("import_id,filename,row_count,timestamp,primary_key");
        for i in &imports {
            println!(
                "{},{},{},{},{}",
                i.id,
                crate::csv_escape(&i.filename),
                i.row_count,
                format_timestamp(i.timestamp),
                crate::csv_escape(&i.primary_key_column)
            );
        }
    } else if json {
        let output = ImportListOutput {
            success: true,
            imports: imports.iter().map(ImportItem::from).collect(),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if imports.is_empty() {
        println!("No imports found.");
    } else {
        println!("Imports ({} found):", imports.len());
        println!();
        for i in &imports {
            println!(
                "#{} {} {}",
                i.id,
                i.filename.bold(),
                format_timestamp(i.timestamp).dimmed()
            );
            println!("  {} rows, key: {}", i.row_count, i.primary_key_column);
        }
    }

    Ok(())
}

fn rows(id: i64, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let detail = storage.import_detail(id)?;

    if json {
        let output = ImportRowsOutput {
            success: true,
            import: ImportHeader {
                item: ImportItem::from(&detail.import),
                columns: &detail.columns,
                content_hash: detail.import.content_hash.as_deref(),
            },
            columns: &detail.columns,
            rows: detail
                .rows
                .iter()
                .map(|r| RowItem {
                    row_id: r.row_id,
                    primary_key_value: &r.primary_key_value,
                    data: &r.data,
                    notes: r.notes.iter().map(NoteOutput::from).collect(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    print_detail(&detail);
    Ok(())
}

fn print_detail(detail: &ImportDetail) {
    let import = &detail.import;
    println!(
        "Import #{} {} ({} rows, key: {})",
        import.id,
        import.filename.bold(),
        import.row_count,
        import.primary_key_column
    );
    println!("{}", detail.columns.join(" | ").dimmed());

    for row in &detail.rows {
        let values: Vec<&str> = detail
            .columns
            .iter()
            .map(|c| row.data.get(c).unwrap_or_default())
            .collect();
        println!("{}  {}", format!("[{}]", row.row_id).dimmed(), values.join(" | "));
        for note in &row.notes {
            println!("    {} {}", status_label(note.status), note.text);
        }
    }
}
