//! Configuration management.
//!
//! This module resolves the csvn home directory, the database path and
//! the audit actor, and loads user settings from `config.json`.
//!
//! # Layout
//!
//! - **Database**: `~/.csvnotes/data/csvnotes.db`
//! - **Test database**: `~/.csvnotes/test/csvnotes.db` (with `CSVN_TEST_DB=1`)
//! - **Settings**: `~/.csvnotes/config.json`
//!
//! `CSVN_HOME` replaces `~/.csvnotes` for all three.

mod settings;

pub use settings::{
    config_path, load_settings, load_settings_from, save_settings, save_settings_to,
    NoteSettings, Settings, SETTING_KEYS,
};

use std::path::{Path, PathBuf};

/// Get the csvn home directory.
///
/// `CSVN_HOME` if set, otherwise `~/.csvnotes/`.
#[must_use]
pub fn global_csvn_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("CSVN_HOME") {
        if !home.trim().is_empty() {
            return Some(PathBuf::from(home));
        }
    }
    directories::BaseDirs::new().map(|b| b.home_dir().join(".csvnotes"))
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `CSVN_TEST_DB=1` (or any non-empty value
/// other than `0`/`false`). This redirects database operations to an
/// isolated test database.
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("CSVN_TEST_DB").is_ok_and(|v| is_truthy(&v))
}

fn is_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}

/// Get the test database path.
#[must_use]
pub fn test_db_path() -> Option<PathBuf> {
    global_csvn_dir().map(|dir| dir.join("test").join("csvnotes.db"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. `explicit_path` (the `--db` flag, which clap also fills from `CSVN_DB`)
/// 2. `CSVN_TEST_DB` → test database
/// 3. Global location: `~/.csvnotes/data/csvnotes.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_db_path();
    }

    global_csvn_dir().map(|dir| dir.join("data").join("csvnotes.db"))
}

/// Get the default actor name for the audit trail.
///
/// Priority:
/// 1. `CSVN_ACTOR` environment variable
/// 2. Git user name
/// 3. System username
/// 4. "unknown"
#[must_use]
pub fn default_actor() -> String {
    if let Ok(actor) = std::env::var("CSVN_ACTOR") {
        if !actor.is_empty() {
            return actor;
        }
    }

    if let Ok(output) = std::process::Command::new("git")
        .args(["config", "user.name"])
        .output()
    {
        if output.status.success() {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !name.is_empty() {
                return name;
            }
        }
    }

    if let Ok(user) = std::env::var("USER") {
        return user;
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_actor() {
        let actor = default_actor();
        assert!(!actor.is_empty());
    }

    #[test]
    fn test_resolve_db_path_with_explicit() {
        let explicit = PathBuf::from("/custom/path/db.sqlite");
        let result = resolve_db_path(Some(&explicit));
        assert_eq!(result, Some(explicit));
    }

    #[test]
    fn test_resolve_db_path_default_name() {
        let path = resolve_db_path(None).unwrap();
        assert!(path.ends_with("csvnotes.db"));
    }

    #[test]
    fn test_test_db_path_is_separate() {
        let global = global_csvn_dir().unwrap();
        let test = test_db_path().unwrap();

        assert!(test.to_string_lossy().contains("test"));
        assert!(test.ends_with("csvnotes.db"));
        assert_ne!(global.join("data").join("csvnotes.db"), test);
    }

    #[test]
    fn test_truthy_values() {
        for falsy in ["", "0", "false", "FALSE"] {
            assert!(!is_truthy(falsy), "{falsy:?}");
        }
        for truthy in ["1", "true", "yes"] {
            assert!(is_truthy(truthy), "{truthy:?}");
        }
    }
}
