//! SQLite schema for the block store
//!
//! Blocks are kept in one table regardless of type. The indexes mirror the
//! lookups the store exposes: by parent and type, by type alone, and boards by
//! team for search.

use rusqlite::{Connection, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Blocks: one row per tree node, any type.
        -- parent_id is not a foreign key: deletes never cascade and orphans
        -- stay queryable by parent.
        CREATE TABLE IF NOT EXISTS blocks (
            id TEXT PRIMARY KEY,
            parent_id TEXT NOT NULL DEFAULT '',
            root_id TEXT NOT NULL DEFAULT '',
            type TEXT NOT NULL,
            team_id TEXT NOT NULL DEFAULT '',
            title TEXT NOT NULL DEFAULT '',
            fields TEXT NOT NULL DEFAULT '{}',
            created_by TEXT NOT NULL DEFAULT '',
            modified_by TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        -- Accounts
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL DEFAULT '',
            is_guest INTEGER NOT NULL DEFAULT 0,
            props TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            delete_at INTEGER
        );

        -- Flat key-value settings
        CREATE TABLE IF NOT EXISTS system_settings (
            id TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Team membership (many-to-many)
        CREATE TABLE IF NOT EXISTS team_members (
            team_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            PRIMARY KEY (team_id, user_id)
        );

        -- Explicit board membership (many-to-many)
        CREATE TABLE IF NOT EXISTS board_members (
            board_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            scheme_admin INTEGER NOT NULL DEFAULT 0,
            scheme_editor INTEGER NOT NULL DEFAULT 0,
            scheme_viewer INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (board_id, user_id)
        );

        -- Indexes for common query patterns

        -- Children of a parent, optionally by type
        CREATE INDEX IF NOT EXISTS idx_blocks_parent_type ON blocks(parent_id, type);

        -- Maintenance scans by type
        CREATE INDEX IF NOT EXISTS idx_blocks_type ON blocks(type);

        -- Everything on one board
        CREATE INDEX IF NOT EXISTS idx_blocks_root_id ON blocks(root_id);

        -- Boards of a team (search candidates)
        CREATE INDEX IF NOT EXISTS idx_blocks_team_type ON blocks(team_id, type);

        -- Teams and boards of a user
        CREATE INDEX IF NOT EXISTS idx_team_members_user ON team_members(user_id);
        CREATE INDEX IF NOT EXISTS idx_board_members_user ON board_members(user_id);
        "#,
    )?;

    // Set schema version
    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if schema needs initialization or migration
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}
