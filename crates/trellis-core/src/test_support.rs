//! Fixture builders shared by unit tests

use chrono::{Duration, Utc};

use crate::models::{Block, BlockType};

/// A root board with a fixed id
pub fn board(id: &str, title: &str, team_id: &str) -> Block {
    let mut board = Block::with_id(id, BlockType::Board);
    board.title = title.to_string();
    board.team_id = team_id.to_string();
    board
}

/// A child block with a fixed id
pub fn block(id: &str, parent_id: &str, block_type: BlockType) -> Block {
    let mut block = Block::with_id(id, block_type);
    block.parent_id = parent_id.to_string();
    block
}

/// A child block created `offset_ms` after now, for deterministic ordering
pub fn block_at(id: &str, parent_id: &str, block_type: BlockType, offset_ms: i64) -> Block {
    let mut block = block(id, parent_id, block_type);
    block.created_at = Utc::now() + Duration::milliseconds(offset_ms);
    block.updated_at = block.created_at;
    block
}
