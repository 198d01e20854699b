//! Storage contracts
//!
//! The core talks to persistence only through these traits. One
//! implementation, [`SqliteStore`](crate::storage::SqliteStore), backs all of
//! them; components take the store by reference so a process builds a
//! single instance and hands it around.
//!
//! ## Usage
//!
//! ```ignore
//! let store = SqliteStore::open(&config)?;
//!
//! let board = Block::board("Roadmap", "team-1");
//! store.insert_block(&board)?;
//!
//! let cards = store.get_blocks_with_parent_and_type(&board.id, &BlockType::Card)?;
//! ```

use std::collections::BTreeMap;

use crate::models::{Block, BlockType, BoardMember, User};
use crate::storage::StoreResult;

/// Persistence of generic typed tree nodes
///
/// Each operation is atomic for the single record it touches. Nothing here
/// cascades; multi-record compositions live in [`crate::subtree`].
pub trait BlockStore: Send + Sync {
    /// Immediate children of `parent_id` with the given type; `""` means roots
    fn get_blocks_with_parent_and_type(
        &self,
        parent_id: &str,
        block_type: &BlockType,
    ) -> StoreResult<Vec<Block>>;

    /// Immediate children of `parent_id` of any type
    fn get_blocks_with_parent(&self, parent_id: &str) -> StoreResult<Vec<Block>>;

    /// Every block of a type, across the whole store
    fn get_blocks_with_type(&self, block_type: &BlockType) -> StoreResult<Vec<Block>>;

    /// Full scan, meant for bulk export
    fn get_all_blocks(&self) -> StoreResult<Vec<Block>>;

    /// A single block, or `None` when absent
    fn get_block(&self, block_id: &str) -> StoreResult<Option<Block>>;

    /// Parent of a block; `NotFound` when the block is absent
    fn get_parent_id(&self, block_id: &str) -> StoreResult<String>;

    /// Insert or overwrite a block
    ///
    /// Rejects self-parenting, cycles and parents that do not exist. Roots
    /// (empty `parent_id`) are always accepted.
    fn insert_block(&self, block: &Block) -> StoreResult<()>;

    /// Remove exactly one block; children are left in place
    fn delete_block(&self, block_id: &str) -> StoreResult<()>;

    /// Release backend resources; calling it twice is fine
    fn shutdown(&self) -> StoreResult<()>;
}

/// Account records with unique email and username
pub trait UserStore: Send + Sync {
    fn get_user_by_id(&self, user_id: &str) -> StoreResult<User>;
    fn get_user_by_email(&self, email: &str) -> StoreResult<User>;
    fn get_user_by_username(&self, username: &str) -> StoreResult<User>;

    /// Create an account; `Conflict` when id, email or username is taken
    fn create_user(&self, user: &User) -> StoreResult<()>;

    /// Update an account in place; `NotFound` for unknown ids
    fn update_user(&self, user: &User) -> StoreResult<()>;
}

/// Flat key-value configuration map
pub trait SettingsStore: Send + Sync {
    fn get_system_settings(&self) -> StoreResult<BTreeMap<String, String>>;
    fn get_system_setting(&self, key: &str) -> StoreResult<String>;
    fn set_system_setting(&self, key: &str, value: &str) -> StoreResult<()>;
}

/// Team and board memberships
pub trait MembershipStore: Send + Sync {
    fn add_team_member(&self, team_id: &str, user_id: &str) -> StoreResult<()>;
    fn remove_team_member(&self, team_id: &str, user_id: &str) -> StoreResult<()>;
    fn is_team_member(&self, team_id: &str, user_id: &str) -> StoreResult<bool>;
    fn teams_for_user(&self, user_id: &str) -> StoreResult<Vec<String>>;

    /// Insert or replace a board membership
    fn save_board_member(&self, member: &BoardMember) -> StoreResult<()>;
    fn delete_board_member(&self, board_id: &str, user_id: &str) -> StoreResult<()>;
    fn board_members(&self, board_id: &str) -> StoreResult<Vec<BoardMember>>;
    fn board_memberships_for_user(&self, user_id: &str) -> StoreResult<Vec<BoardMember>>;
}

/// Everything the workspace persists
pub trait Store: BlockStore + UserStore + SettingsStore + MembershipStore {}

impl<T> Store for T where T: BlockStore + UserStore + SettingsStore + MembershipStore {}
