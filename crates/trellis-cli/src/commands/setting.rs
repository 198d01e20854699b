//! System setting handlers

use anyhow::{Context, Result};

use trellis_core::{SettingsStore, SqliteStore};

use crate::output::{Output, OutputFormat};

/// Show one setting, or all of them
pub fn get(store: &SqliteStore, key: Option<String>, output: &Output) -> Result<()> {
    match key {
        Some(key) => {
            let value = store.get_system_setting(&key)?;
            match output.format {
                OutputFormat::Json => output.print_json(&serde_json::json!({ key: value })),
                OutputFormat::Quiet => println!("{}", value),
                OutputFormat::Human => println!("{} = {}", key, value),
            }
        }
        None => output.print_settings(&store.get_system_settings()?),
    }
    Ok(())
}

pub fn set(store: &SqliteStore, key: &str, value: &str, output: &Output) -> Result<()> {
    store
        .set_system_setting(key, value)
        .context("Failed to save setting")?;
    output.success(&format!("Set {} = {}", key, value));
    Ok(())
}
