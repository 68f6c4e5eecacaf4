//! Command implementations.

pub mod completions;
pub mod config;
pub mod import;
pub mod imports;
pub mod init;
pub mod note;
pub mod row;
pub mod tag;
pub mod version;

use crate::config::{default_actor, resolve_db_path};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use std::path::PathBuf;

/// Open the database, failing with `NotInitialized` if it does not exist yet.
pub(crate) fn open_storage(db_path: Option<&PathBuf>) -> Result<SqliteStorage> {
    let db_path = resolve_db_path(db_path.map(|p| p.as_path())).ok_or(Error::NotInitialized)?;

    if !db_path.exists() {
        return Err(Error::NotInitialized);
    }

    SqliteStorage::open(&db_path)
}

pub(crate) fn resolve_actor(actor: Option<&str>) -> String {
    actor.map(ToString::to_string).unwrap_or_else(default_actor)
}
