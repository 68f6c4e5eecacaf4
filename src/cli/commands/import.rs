//! Import command implementation.

use crate::cli::ImportArgs;
use crate::cli::commands::{open_storage, resolve_actor};
use crate::detect::detect_primary_key;
use crate::error::Result;
use crate::ingest::{import_upload, parse_upload};
use crate::model::ImportSummary;
use colored::Colorize;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Output for a completed import.
#[derive(Serialize)]
struct ImportOutput<'a> {
    success: bool,
    #[serde(flatten)]
    summary: &'a ImportSummary,
}

/// Output for `--dry-run`.
#[derive(Serialize)]
struct ImportPreview<'a> {
    success: bool,
    dry_run: bool,
    filename: &'a str,
    row_count: usize,
    primary_key: &'a str,
    columns: &'a [String],
}

/// Execute the import command.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the upload is not a usable
/// CSV, or the import fails (nothing is written in that case).
pub fn execute(
    args: &ImportArgs,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let bytes = read_upload(&args.file)?;
    let filename = args
        .name
        .clone()
        .unwrap_or_else(|| default_filename(&args.file));

    if crate::is_dry_run() {
        return preview(&filename, &bytes, json);
    }

    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);
    let summary = import_upload(&mut storage, &filename, &bytes, &actor)?;

    if crate::is_silent() {
        println!("{}", summary.import_id);
        return Ok(());
    }

    if json {
        let output = ImportOutput {
            success: true,
            summary: &summary,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!(
            "{} {} as import #{}",
            "Imported".green().bold(),
            summary.filename,
            summary.import_id
        );
        println!("  Primary key: {}", summary.primary_key.bold());
        println!(
            "  Rows: {} ({} imported, {} skipped, {} new)",
            summary.row_count, summary.imported_count, summary.skipped_count, summary.new_rows
        );
    }

    Ok(())
}

fn preview(filename: &str, bytes: &[u8], json: bool) -> Result<()> {
    let table = parse_upload(bytes)?;
    let primary_key = detect_primary_key(&table.headers, &table.records)?;

    if json {
        let output = ImportPreview {
            success: true,
            dry_run: true,
            filename,
            row_count: table.row_count(),
            primary_key: &primary_key,
            columns: &table.headers,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Would import {filename}");
        println!("  Primary key: {}", primary_key.bold());
        println!("  Rows: {}", table.row_count());
        println!("  Columns: {}", table.headers.join(", "));
    }

    Ok(())
}

fn read_upload(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut bytes = Vec::new();
        std::io::stdin().read_to_end(&mut bytes)?;
        return Ok(bytes);
    }
    Ok(std::fs::read(path)?)
}

fn default_filename(path: &Path) -> String {
    if path.as_os_str() == "-" {
        return "stdin.csv".to_string();
    }
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string())
}
