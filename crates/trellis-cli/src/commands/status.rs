//! Status command handler

use anyhow::Result;

use trellis_core::SqliteStore;

use crate::output::{Output, OutputFormat};

/// Show database location and row counts
pub fn show(store: &SqliteStore, output: &Output) -> Result<()> {
    let stats = store.stats()?;
    let location = stats
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ":memory:".to_string());

    match output.format {
        OutputFormat::Json => output.print_json(&serde_json::json!({
            "database": location,
            "schema_version": stats.schema_version,
            "counts": {
                "blocks": stats.blocks,
                "boards": stats.boards,
                "users": stats.users
            }
        })),
        OutputFormat::Quiet => println!("{}", stats.blocks),
        OutputFormat::Human => {
            println!("Trellis Status");
            println!("==============");
            println!();
            println!("Database: {}", location);
            if let Some(version) = stats.schema_version {
                println!("Schema:   v{}", version);
            }
            println!();
            println!("Contents:");
            println!("  Blocks: {}", stats.blocks);
            println!("  Boards: {}", stats.boards);
            println!("  Users:  {}", stats.users);
        }
    }
    Ok(())
}
