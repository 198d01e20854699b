//! Trellis Core Library
//!
//! Data-access and query core of a collaborative board workspace. All
//! content is stored as generic typed blocks forming a forest: a board is a
//! root block, and views, cards and their contents hang beneath it.
//!
//! # Architecture
//!
//! - **Store**: SQLite-backed block, user, settings and membership storage
//! - **Subtree**: bounded-depth descendant resolution on top of the block store
//! - **Search**: permission- and guest-aware board search
//!
//! # Quick Start
//!
//! ```text
//! let store = SqliteStore::open(&Config::load()?)?;
//!
//! let board = Block::board("Roadmap", "team-1");
//! store.insert_block(&board)?;
//! let tree = subtree::get_sub_tree3(&store, &board.id)?;
//!
//! let perms = StorePermissions::new(&store);
//! let engine = SearchEngine::new(&store, &perms, &perms);
//! let boards = engine.search_boards(&SearchQuery::all_teams("road", user_id))?;
//! ```
//!
//! # Modules
//!
//! - `store`: Storage contracts (main entry point)
//! - `storage`: SQLite schema, store and error types
//! - `models`: Blocks, users and memberships
//! - `subtree`: Subtree resolution and cascading delete
//! - `search`: Board search engine
//! - `permissions`: Permission and guest collaborators
//! - `audit`: Audit records for search calls
//! - `config`: Application configuration

pub mod audit;
pub mod config;
pub mod models;
pub mod permissions;
pub mod search;
pub mod storage;
pub mod store;
pub mod subtree;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use models::{Block, BlockType, BoardMember, BoardRole, BoardVisibility, User};
pub use permissions::{GuestClassifier, Permission, PermissionChecker, StorePermissions};
pub use search::{BoardIndex, SearchEngine, SearchField, SearchQuery, SearchScope};
pub use storage::{ErrorKind, SqliteStore, StoreError, StoreResult, StoreStats};
pub use store::{BlockStore, MembershipStore, SettingsStore, Store, UserStore};
