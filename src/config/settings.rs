//! User settings stored in `config.json`.
//!
//! Every field is optional so that a partial file (or none at all) falls
//! back to defaults, and unknown sections written by newer releases survive
//! a load/save cycle.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::global_csvn_dir;

/// Keys accepted by `csvn config set`.
pub const SETTING_KEYS: &[&str] = &["notes.auto_create_rows"];

/// Top-level settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<NoteSettings>,

    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// Annotation store settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSettings {
    /// Create an orphan row when a note names an unknown identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_create_rows: Option<bool>,
}

impl Settings {
    /// Whether notes on unknown identifiers create orphan rows (default on).
    #[must_use]
    pub fn auto_create_rows(&self) -> bool {
        self.notes
            .as_ref()
            .and_then(|n| n.auto_create_rows)
            .unwrap_or(true)
    }

    /// Current value of every known key, defaults filled in.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![("notes.auto_create_rows", self.auto_create_rows().to_string())]
    }

    /// Set one key from its string form.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an unknown key or a malformed value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "notes.auto_create_rows" => {
                let flag = parse_bool(value).ok_or_else(|| {
                    Error::InvalidArgument(format!("{key} expects true or false, got '{value}'"))
                })?;
                self.notes.get_or_insert_with(NoteSettings::default).auto_create_rows = Some(flag);
                Ok(())
            }
            _ => Err(Error::InvalidArgument(format!(
                "unknown setting '{key}' (known: {})",
                SETTING_KEYS.join(", ")
            ))),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Get the settings file path.
///
/// # Errors
///
/// Returns `Config` if the home directory cannot be determined.
pub fn config_path() -> Result<PathBuf> {
    global_csvn_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Load settings from the default location.
///
/// # Errors
///
/// Returns `Config` if the file exists but cannot be read or parsed.
pub fn load_settings() -> Result<Settings> {
    load_settings_from(&config_path()?)
}

/// Load settings from `path`; a missing file yields defaults.
///
/// # Errors
///
/// Returns `Config` if the file exists but cannot be read or parsed.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Save settings to the default location.
///
/// # Errors
///
/// Returns `Config` if the file cannot be written.
pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&config_path()?, settings)
}

/// Save settings to `path`, creating parent directories.
///
/// # Errors
///
/// Returns `Config` if the file cannot be written.
pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

    fs::write(path, content)
        .map_err(|e| Error::Config(format!("Failed to write config file: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join("config.json")).unwrap();
        assert!(settings.auto_create_rows());
    }

    #[test]
    fn test_set_and_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut settings = Settings::default();
        settings.set("notes.auto_create_rows", "false").unwrap();
        save_settings_to(&path, &settings).unwrap();

        let loaded = load_settings_from(&path).unwrap();
        assert!(!loaded.auto_create_rows());
        assert_eq!(loaded.entries(), vec![("notes.auto_create_rows", "false".to_string())]);
    }

    #[test]
    fn test_unknown_sections_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"future": {"x": 1}, "notes": {"auto_create_rows": true}}"#).unwrap();

        let mut settings = load_settings_from(&path).unwrap();
        settings.set("notes.auto_create_rows", "off").unwrap();
        save_settings_to(&path, &settings).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["future"]["x"], 1);
        assert_eq!(raw["notes"]["auto_create_rows"], false);
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.set("nope", "true"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            settings.set("notes.auto_create_rows", "maybe"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_settings_from(&path), Err(Error::Config(_))));
    }
}
