//! Create the csvn database.
//!
//! The database lives at `~/.csvnotes/data/csvnotes.db` unless `--db`,
//! `CSVN_DB` or `CSVN_TEST_DB` point elsewhere. The schema is applied on
//! creation so later commands open a ready database.

use crate::config::resolve_db_path;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct InitOutput {
    success: bool,
    database: PathBuf,
    reset: bool,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if the database exists and `force` is not
/// set, or an error if the directory or database cannot be created.
pub fn execute(db_path: Option<&PathBuf>, force: bool, json: bool) -> Result<()> {
    let db_path = resolve_db_path(db_path.map(|p| p.as_path()))
        .ok_or_else(|| Error::Config("Could not determine csvn home directory".to_string()))?;

    let existed = db_path.exists();
    if existed && !force {
        return Err(Error::AlreadyInitialized { path: db_path });
    }

    if existed {
        remove_database(&db_path)?;
    }

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    // Opening applies the schema
    SqliteStorage::open(&db_path)?;

    if crate::is_silent() {
        println!("{}", db_path.display());
        return Ok(());
    }

    if json {
        let output = InitOutput {
            success: true,
            database: db_path,
            reset: existed,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        if existed {
            println!("Reinitialized csvn database");
        } else {
            println!("Initialized csvn database");
        }
        println!("  Database: {}", db_path.display());
        println!();
        println!("Next: Run 'csvn import <file.csv>' to record your first import.");
    }

    Ok(())
}

/// Remove a database file together with its WAL side files.
fn remove_database(db_path: &Path) -> Result<()> {
    fs::remove_file(db_path)?;
    for suffix in ["-wal", "-shm"] {
        let mut side = db_path.as_os_str().to_owned();
        side.push(suffix);
        let side = PathBuf::from(side);
        if side.exists() {
            fs::remove_file(side)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_database_with_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("csvn.db");

        execute(Some(&path), false, true).unwrap();

        assert!(path.exists());
        let storage = SqliteStorage::open(&path).unwrap();
        assert!(storage.list_imports().unwrap().is_empty());
    }

    #[test]
    fn test_init_fails_if_already_initialized() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("csvn.db");

        assert!(execute(Some(&path), false, true).is_ok());
        let result = execute(Some(&path), false, true);
        assert!(matches!(result, Err(Error::AlreadyInitialized { .. })));
    }

    #[test]
    fn test_init_force_resets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("csvn.db");
        execute(Some(&path), false, true).unwrap();

        {
            let mut storage = SqliteStorage::open(&path).unwrap();
            storage
                .create_note("k", "text", None, &[], true, "tester")
                .unwrap();
        }

        execute(Some(&path), true, true).unwrap();
        let storage = SqliteStorage::open(&path).unwrap();
        assert!(storage.list_notes().unwrap().is_empty());
    }
}
