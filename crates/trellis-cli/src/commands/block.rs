//! Block command handlers

use anyhow::{Context, Result};

use trellis_core::subtree::{delete_subtree, get_subtree};
use trellis_core::{Block, BlockStore, BlockType, SqliteStore};

use crate::output::Output;

/// Arguments for creating or overwriting a block
pub struct AddArgs {
    pub block_type: String,
    pub id: Option<String>,
    pub parent: Option<String>,
    pub team: Option<String>,
    pub title: Option<String>,
    pub fields: Option<String>,
}

/// Insert a block
pub fn add(store: &SqliteStore, args: AddArgs, user_id: Option<&str>, output: &Output) -> Result<()> {
    let block_type = BlockType::from(args.block_type);
    let mut block = match args.id {
        Some(id) => Block::with_id(id, block_type),
        None => Block::new(block_type),
    };

    if let Some(parent) = args.parent {
        block.parent_id = parent;
    }
    if let Some(team) = args.team {
        block.team_id = team;
    }
    if let Some(title) = args.title {
        block.title = title;
    }
    if let Some(raw) = args.fields {
        block.fields = serde_json::from_str(&raw).context("Invalid --fields JSON")?;
    }
    if let Some(user_id) = user_id {
        block.created_by = user_id.to_string();
        block.modified_by = user_id.to_string();
    }

    store.insert_block(&block).context("Failed to insert block")?;

    // Re-read to pick up derived board and team
    let stored = store.get_block(&block.id)?.unwrap_or(block);
    output.success(&format!("Saved block: {}", stored.id));
    output.print_block(&stored);
    Ok(())
}

/// Show a single block
pub fn show(store: &SqliteStore, id: &str, output: &Output) -> Result<()> {
    let block = store
        .get_block(id)?
        .ok_or_else(|| anyhow::anyhow!("Block not found: {}", id))?;
    output.print_block(&block);
    Ok(())
}

/// List blocks by parent and/or type
pub fn list(
    store: &SqliteStore,
    parent: Option<String>,
    block_type: Option<String>,
    output: &Output,
) -> Result<()> {
    let block_type = block_type.map(BlockType::from);
    let blocks = match (parent, block_type) {
        (Some(parent), Some(t)) => store.get_blocks_with_parent_and_type(&parent, &t)?,
        (Some(parent), None) => store.get_blocks_with_parent(&parent)?,
        (None, Some(t)) => store.get_blocks_with_type(&t)?,
        (None, None) => store.get_all_blocks()?,
    };
    output.print_blocks(&blocks);
    Ok(())
}

/// Show a block and its descendants
pub fn tree(store: &SqliteStore, id: &str, depth: usize, output: &Output) -> Result<()> {
    let blocks = get_subtree(store, id, depth).context("Failed to resolve subtree")?;
    output.print_tree(&blocks);
    Ok(())
}

/// Delete a block, optionally with its descendants
pub fn delete(
    store: &SqliteStore,
    id: &str,
    recursive: bool,
    depth: Option<usize>,
    output: &Output,
) -> Result<()> {
    if recursive {
        let count = delete_subtree(store, id, depth.unwrap_or(usize::MAX))
            .context("Failed to delete subtree")?;
        output.success(&format!("Deleted {} block(s)", count));
        if output.is_json() {
            output.print_json(&serde_json::json!({ "deleted": count }));
        }
    } else {
        store.delete_block(id).context("Failed to delete block")?;
        output.success(&format!("Deleted block: {}", id));
    }
    Ok(())
}
