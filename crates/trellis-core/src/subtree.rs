//! Bounded-depth subtree resolution
//!
//! Materializes "a block and everything under it down to N levels" with one
//! indexed parent lookup per expanded block. Depth counts levels including
//! the root: depth 2 is the root and its children, depth 3 adds
//! grandchildren.
//!
//! The result is a read snapshot assembled from several queries; blocks
//! written concurrently may or may not appear in it.

use std::collections::HashSet;

use tracing::debug;

use crate::models::Block;
use crate::storage::StoreResult;
use crate::store::BlockStore;

/// Root plus direct children
pub fn get_sub_tree2<S: BlockStore + ?Sized>(store: &S, block_id: &str) -> StoreResult<Vec<Block>> {
    get_subtree(store, block_id, 2)
}

/// Root, children and grandchildren
pub fn get_sub_tree3<S: BlockStore + ?Sized>(store: &S, block_id: &str) -> StoreResult<Vec<Block>> {
    get_subtree(store, block_id, 3)
}

/// Breadth-first walk limited to `max_depth` levels
///
/// The root comes first, followed by each level in turn. A missing root
/// yields an empty list rather than an error; storage failures still
/// propagate. Blocks already visited are skipped, so rows that form a
/// cycle cannot make the walk revisit them.
pub fn get_subtree<S: BlockStore + ?Sized>(
    store: &S,
    block_id: &str,
    max_depth: usize,
) -> StoreResult<Vec<Block>> {
    if max_depth == 0 {
        return Ok(Vec::new());
    }
    let Some(root) = store.get_block(block_id)? else {
        return Ok(Vec::new());
    };

    let mut seen = HashSet::from([root.id.clone()]);
    let mut blocks = vec![root];
    let mut level_start = 0;

    for _ in 1..max_depth {
        let level_end = blocks.len();
        if level_start == level_end {
            break;
        }
        for i in level_start..level_end {
            let parent_id = blocks[i].id.clone();
            for child in store.get_blocks_with_parent(&parent_id)? {
                if seen.insert(child.id.clone()) {
                    blocks.push(child);
                }
            }
        }
        level_start = level_end;
    }

    debug!(block_id, max_depth, count = blocks.len(), "resolved subtree");
    Ok(blocks)
}

/// Delete a block and its descendants down to `max_depth` levels
///
/// Blocks are removed deepest level first so a concurrent reader never sees
/// a child whose parent is already gone. This is not atomic: a failure part
/// way through leaves the shallower levels in place. Returns the number of
/// blocks deleted.
pub fn delete_subtree<S: BlockStore + ?Sized>(
    store: &S,
    block_id: &str,
    max_depth: usize,
) -> StoreResult<usize> {
    let blocks = get_subtree(store, block_id, max_depth)?;
    for block in blocks.iter().rev() {
        store.delete_block(&block.id)?;
    }
    debug!(block_id, count = blocks.len(), "deleted subtree");
    Ok(blocks.len())
}
