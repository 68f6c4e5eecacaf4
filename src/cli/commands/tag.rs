//! Tag command implementations.

use crate::cli::TagCommands;
use crate::cli::commands::open_storage;
use crate::error::Result;
use crate::model::format_timestamp;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct TagItem<'a> {
    tag_id: i64,
    name: &'a str,
    created_timestamp: String,
}

#[derive(Serialize)]
struct TagListOutput<'a> {
    success: bool,
    tags: Vec<TagItem<'a>>,
    count: usize,
}

/// Execute tag commands.
pub fn execute(command: &TagCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    match command {
        TagCommands::List => list(db_path, json),
    }
}

fn list(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let tags = storage.list_tags()?;

    if crate::is_csv() {
        println!("tag_id,name");
        for t in &tags {
            println!("{},{}", t.id, crate::csv_escape(&t.name));
        }
    } else if json {
        let items: Vec<TagItem> = tags
            .iter()
            .map(|t| TagItem {
                tag_id: t.id,
                name: &t.name,
                created_timestamp: format_timestamp(t.created_at),
            })
            .collect();
        let output = TagListOutput {
            success: true,
            count: items.len(),
            tags: items,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if tags.is_empty() {
        println!("No tags found.");
    } else {
        for t in &tags {
            println!("{}", t.name);
        }
    }

    Ok(())
}
