//! Settings commands.

use crate::cli::ConfigCommands;
use crate::config::{config_path, load_settings, save_settings};
use crate::error::Result;
use std::collections::BTreeMap;

/// Execute config commands.
pub fn execute(command: &ConfigCommands, json: bool) -> Result<()> {
    match command {
        ConfigCommands::Show => show(json),
        ConfigCommands::Set { key, value } => set(key, value, json),
    }
}

fn show(json: bool) -> Result<()> {
    let settings = load_settings()?;
    let path = config_path()?;

    if json {
        let values: BTreeMap<_, _> = settings.entries().into_iter().collect();
        let output = serde_json::json!({
            "success": true,
            "path": path,
            "settings": values,
        });
        println!("{output}");
    } else {
        println!("Settings ({}):", path.display());
        for (key, value) in settings.entries() {
            println!("  {key} = {value}");
        }
    }

    Ok(())
}

fn set(key: &str, value: &str, json: bool) -> Result<()> {
    let mut settings = load_settings()?;
    settings.set(key, value)?;
    save_settings(&settings)?;

    let current = settings
        .entries()
        .into_iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
        .unwrap_or_default();

    if json {
        let output = serde_json::json!({
            "success": true,
            "key": key,
            "value": current,
        });
        println!("{output}");
    } else {
        println!("Set {key} = {current}");
    }

    Ok(())
}
