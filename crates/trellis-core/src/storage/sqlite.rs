//! SQLite-backed store
//!
//! Implements every storage contract on a single connection guarded by a
//! mutex. Each public operation takes the lock for exactly one statement or
//! one transaction, so single-record writes are all-or-nothing while
//! multi-step compositions made by callers are not.
//!
//! ## Tables
//!
//! - `blocks` - All tree nodes, indexed by parent/type and team/type
//! - `users` - Accounts, unique on email and username
//! - `system_settings` - Flat key-value pairs
//! - `team_members` / `board_members` - Memberships used by search

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Params, Row};
use tracing::{debug, info};

use crate::config::Config;
use crate::models::{Block, BlockType, BoardMember, User};
use crate::search::BoardIndex;
use crate::storage::error::{unique_violation_column, StoreError, StoreResult};
use crate::storage::schema::{get_schema_version, init_schema, needs_init};
use crate::store::{BlockStore, MembershipStore, SettingsStore, UserStore};

const BLOCK_COLUMNS: &str = "id, parent_id, root_id, type, team_id, title, fields, \
                             created_by, modified_by, created_at, updated_at";

const USER_COLUMNS: &str =
    "id, username, email, password, is_guest, props, created_at, updated_at, delete_at";

/// Row counts and location of an open store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub path: Option<PathBuf>,
    pub schema_version: Option<i32>,
    pub blocks: i64,
    pub boards: i64,
    pub users: i64,
}

/// SQLite implementation of the store traits
pub struct SqliteStore {
    /// `None` once shut down
    conn: Mutex<Option<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open or create the database described by `config`
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let path = config.sqlite_path();
        Self::open_path(&path, config.busy_timeout())
            .with_context(|| format!("Failed to open SQLite database at {:?}", path))
    }

    /// Open or create a database file
    pub fn open_path(path: &Path, busy_timeout: Duration) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        if needs_init(&conn) {
            init_schema(&conn)?;
        }

        info!("Opened block store at {:?} (journal_mode={})", path, mode);

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: None,
        })
    }

    /// Database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Row counts for status reporting
    pub fn stats(&self) -> StoreResult<StoreStats> {
        self.with_conn(|conn| {
            let count = |sql: &str| -> StoreResult<i64> {
                Ok(conn.query_row(sql, [], |row| row.get(0))?)
            };
            Ok(StoreStats {
                path: self.path.clone(),
                schema_version: get_schema_version(conn)?,
                blocks: count("SELECT COUNT(*) FROM blocks")?,
                boards: count("SELECT COUNT(*) FROM blocks WHERE type = 'board'")?,
                users: count("SELECT COUNT(*) FROM users")?,
            })
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        f(conn)
    }

    fn with_conn_mut<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut guard = self.conn.lock();
        let conn = guard.as_mut().ok_or(StoreError::Closed)?;
        f(conn)
    }

    fn query_blocks<P: Params>(&self, sql: &str, params: P) -> StoreResult<Vec<Block>> {
        self.with_conn(|conn| query_blocks(conn, sql, params))
    }

    fn get_user_where(&self, column: &'static str, value: &str) -> StoreResult<User> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        let row = self.with_conn(|conn| {
            Ok(conn
                .query_row(&sql, params![value], UserRow::from_row)
                .optional()?)
        })?;

        match row {
            Some(row) => row.into_user(),
            None => Err(StoreError::not_found("user", value)),
        }
    }
}

// ==================== Block Store ====================

impl BlockStore for SqliteStore {
    fn get_blocks_with_parent_and_type(
        &self,
        parent_id: &str,
        block_type: &BlockType,
    ) -> StoreResult<Vec<Block>> {
        self.query_blocks(
            &format!(
                "SELECT {} FROM blocks WHERE parent_id = ? AND type = ? ORDER BY created_at, id",
                BLOCK_COLUMNS
            ),
            params![parent_id, block_type.as_str()],
        )
    }

    fn get_blocks_with_parent(&self, parent_id: &str) -> StoreResult<Vec<Block>> {
        self.query_blocks(
            &format!(
                "SELECT {} FROM blocks WHERE parent_id = ? ORDER BY created_at, id",
                BLOCK_COLUMNS
            ),
            params![parent_id],
        )
    }

    fn get_blocks_with_type(&self, block_type: &BlockType) -> StoreResult<Vec<Block>> {
        self.query_blocks(
            &format!(
                "SELECT {} FROM blocks WHERE type = ? ORDER BY created_at, id",
                BLOCK_COLUMNS
            ),
            params![block_type.as_str()],
        )
    }

    fn get_all_blocks(&self) -> StoreResult<Vec<Block>> {
        self.query_blocks(
            &format!("SELECT {} FROM blocks ORDER BY created_at, id", BLOCK_COLUMNS),
            [],
        )
    }

    fn get_block(&self, block_id: &str) -> StoreResult<Option<Block>> {
        let mut blocks = self.query_blocks(
            &format!("SELECT {} FROM blocks WHERE id = ?", BLOCK_COLUMNS),
            params![block_id],
        )?;
        Ok(blocks.pop())
    }

    fn get_parent_id(&self, block_id: &str) -> StoreResult<String> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT parent_id FROM blocks WHERE id = ?",
                params![block_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("block", block_id))
        })
    }

    fn insert_block(&self, block: &Block) -> StoreResult<()> {
        if block.id.is_empty() {
            return Err(StoreError::BadRequest("block id must not be empty".into()));
        }
        if block.parent_id == block.id {
            return Err(StoreError::SelfParent {
                block_id: block.id.clone(),
            });
        }
        let fields = serde_json::to_string(&block.fields)?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let (root_id, team_id) = if block.is_root() {
                (block.id.clone(), block.team_id.clone())
            } else {
                let parent: Option<(String, String)> = tx
                    .query_row(
                        "SELECT root_id, team_id FROM blocks WHERE id = ?",
                        params![block.parent_id],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;

                let (parent_root, parent_team) = parent.ok_or_else(|| StoreError::MissingParent {
                    block_id: block.id.clone(),
                    parent_id: block.parent_id.clone(),
                })?;

                ensure_not_ancestor(&tx, &block.id, &block.parent_id)?;

                (parent_root, parent_team)
            };

            let previous: Option<(String, String)> = tx
                .query_row(
                    "SELECT root_id, team_id FROM blocks WHERE id = ?",
                    params![block.id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            tx.execute(
                r#"
                INSERT INTO blocks (id, parent_id, root_id, type, team_id, title, fields,
                                    created_by, modified_by, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT(id) DO UPDATE SET
                    parent_id = excluded.parent_id,
                    root_id = excluded.root_id,
                    type = excluded.type,
                    team_id = excluded.team_id,
                    title = excluded.title,
                    fields = excluded.fields,
                    modified_by = excluded.modified_by,
                    updated_at = excluded.updated_at
                "#,
                params![
                    block.id,
                    block.parent_id,
                    root_id,
                    block.block_type.as_str(),
                    team_id,
                    block.title,
                    fields,
                    block.created_by,
                    block.modified_by,
                    block.created_at.timestamp_millis(),
                    block.updated_at.timestamp_millis(),
                ],
            )?;

            // A moved or re-teamed block drags its descendants along
            let mut rehomed = 0;
            if previous.is_some_and(|prev| prev != (root_id.clone(), team_id.clone())) {
                rehomed = tx.execute(
                    r#"
                    WITH RECURSIVE descendants(id) AS (
                        SELECT id FROM blocks WHERE parent_id = ?1
                        UNION
                        SELECT b.id FROM blocks b JOIN descendants d ON b.parent_id = d.id
                    )
                    UPDATE blocks SET root_id = ?2, team_id = ?3
                    WHERE id IN (SELECT id FROM descendants)
                    "#,
                    params![block.id, root_id, team_id],
                )?;
            }

            tx.commit()?;
            debug!(
                block_id = %block.id,
                rehomed,
                parent_id = %block.parent_id,
                block_type = %block.block_type,
                "inserted block"
            );
            Ok(())
        })
    }

    fn delete_block(&self, block_id: &str) -> StoreResult<()> {
        let deleted = self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM blocks WHERE id = ?", params![block_id])?)
        })?;
        debug!(block_id, deleted, "deleted block");
        Ok(())
    }

    fn shutdown(&self) -> StoreResult<()> {
        let conn = self.conn.lock().take();
        if let Some(conn) = conn {
            conn.close().map_err(|(_, e)| StoreError::Database(e))?;
            info!("Block store shut down");
        }
        Ok(())
    }
}

// ==================== User Directory ====================

impl UserStore for SqliteStore {
    fn get_user_by_id(&self, user_id: &str) -> StoreResult<User> {
        self.get_user_where("id", user_id)
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<User> {
        self.get_user_where("email", email)
    }

    fn get_user_by_username(&self, username: &str) -> StoreResult<User> {
        self.get_user_where("username", username)
    }

    fn create_user(&self, user: &User) -> StoreResult<()> {
        let props = serde_json::to_string(&user.props)?;
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO users (id, username, email, password, is_guest, props,
                                   created_at, updated_at, delete_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    user.id,
                    user.username,
                    user.email,
                    user.password,
                    user.is_guest,
                    props,
                    user.created_at.timestamp_millis(),
                    user.updated_at.timestamp_millis(),
                    user.delete_at.map(|t| t.timestamp_millis()),
                ],
            )
            .map_err(|e| user_conflict(e, user))?;
            Ok(())
        })?;
        debug!(user_id = %user.id, "created user");
        Ok(())
    }

    fn update_user(&self, user: &User) -> StoreResult<()> {
        let props = serde_json::to_string(&user.props)?;
        let updated = self.with_conn(|conn| {
            conn.execute(
                r#"
                UPDATE users
                SET username = ?, email = ?, password = ?, is_guest = ?, props = ?,
                    updated_at = ?, delete_at = ?
                WHERE id = ?
                "#,
                params![
                    user.username,
                    user.email,
                    user.password,
                    user.is_guest,
                    props,
                    user.updated_at.timestamp_millis(),
                    user.delete_at.map(|t| t.timestamp_millis()),
                    user.id,
                ],
            )
            .map_err(|e| user_conflict(e, user))
        })?;

        if updated == 0 {
            return Err(StoreError::not_found("user", &user.id));
        }
        Ok(())
    }
}

// ==================== System Settings ====================

impl SettingsStore for SqliteStore {
    fn get_system_settings(&self) -> StoreResult<BTreeMap<String, String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, value FROM system_settings")?;
            let settings = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<BTreeMap<String, String>, _>>()?;
            Ok(settings)
        })
    }

    fn get_system_setting(&self, key: &str) -> StoreResult<String> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM system_settings WHERE id = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("setting", key))
        })
    }

    fn set_system_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO system_settings (id, value) VALUES (?, ?)
                ON CONFLICT(id) DO UPDATE SET value = excluded.value
                "#,
                params![key, value],
            )?;
            Ok(())
        })
    }
}

// ==================== Memberships ====================

impl MembershipStore for SqliteStore {
    fn add_team_member(&self, team_id: &str, user_id: &str) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO team_members (team_id, user_id) VALUES (?, ?)",
                params![team_id, user_id],
            )?;
            Ok(())
        })
    }

    fn remove_team_member(&self, team_id: &str, user_id: &str) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM team_members WHERE team_id = ? AND user_id = ?",
                params![team_id, user_id],
            )?;
            Ok(())
        })
    }

    fn is_team_member(&self, team_id: &str, user_id: &str) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT 1 FROM team_members WHERE team_id = ? AND user_id = ?")?;
            Ok(stmt.exists(params![team_id, user_id])?)
        })
    }

    fn teams_for_user(&self, user_id: &str) -> StoreResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT team_id FROM team_members WHERE user_id = ? ORDER BY team_id")?;
            let teams = stmt
                .query_map(params![user_id], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(teams)
        })
    }

    fn save_board_member(&self, member: &BoardMember) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT OR REPLACE INTO board_members
                    (board_id, user_id, scheme_admin, scheme_editor, scheme_viewer)
                VALUES (?, ?, ?, ?, ?)
                "#,
                params![
                    member.board_id,
                    member.user_id,
                    member.scheme_admin,
                    member.scheme_editor,
                    member.scheme_viewer,
                ],
            )?;
            Ok(())
        })
    }

    fn delete_board_member(&self, board_id: &str, user_id: &str) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM board_members WHERE board_id = ? AND user_id = ?",
                params![board_id, user_id],
            )?;
            Ok(())
        })
    }

    fn board_members(&self, board_id: &str) -> StoreResult<Vec<BoardMember>> {
        self.with_conn(|conn| {
            query_board_members(
                conn,
                "WHERE board_id = ? ORDER BY user_id",
                params![board_id],
            )
        })
    }

    fn board_memberships_for_user(&self, user_id: &str) -> StoreResult<Vec<BoardMember>> {
        self.with_conn(|conn| {
            query_board_members(conn, "WHERE user_id = ? ORDER BY board_id", params![user_id])
        })
    }
}

// ==================== Search index ====================

impl BoardIndex for SqliteStore {
    fn teams_for_user(&self, user_id: &str) -> StoreResult<Vec<String>> {
        MembershipStore::teams_for_user(self, user_id)
    }

    fn boards_for_teams(&self, team_ids: &[String]) -> StoreResult<Vec<Block>> {
        if team_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; team_ids.len()].join(", ");
        self.query_blocks(
            &format!(
                "SELECT {} FROM blocks WHERE type = 'board' AND parent_id = '' \
                 AND team_id IN ({}) ORDER BY title, id",
                BLOCK_COLUMNS, placeholders
            ),
            params_from_iter(team_ids.iter()),
        )
    }

    fn board_memberships_for_user(&self, user_id: &str) -> StoreResult<Vec<BoardMember>> {
        MembershipStore::board_memberships_for_user(self, user_id)
    }
}

// ==================== Internal structs ====================

struct BlockRow {
    id: String,
    parent_id: String,
    root_id: String,
    block_type: String,
    team_id: String,
    title: String,
    fields: String,
    created_by: String,
    modified_by: String,
    created_at: i64,
    updated_at: i64,
}

impl BlockRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            root_id: row.get(2)?,
            block_type: row.get(3)?,
            team_id: row.get(4)?,
            title: row.get(5)?,
            fields: row.get(6)?,
            created_by: row.get(7)?,
            modified_by: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn into_block(self) -> StoreResult<Block> {
        Ok(Block {
            id: self.id,
            parent_id: self.parent_id,
            root_id: self.root_id,
            block_type: BlockType::from(self.block_type),
            team_id: self.team_id,
            title: self.title,
            fields: serde_json::from_str(&self.fields)?,
            created_by: self.created_by,
            modified_by: self.modified_by,
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
        })
    }
}

struct UserRow {
    id: String,
    username: String,
    email: String,
    password: String,
    is_guest: bool,
    props: String,
    created_at: i64,
    updated_at: i64,
    delete_at: Option<i64>,
}

impl UserRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password: row.get(3)?,
            is_guest: row.get(4)?,
            props: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            delete_at: row.get(8)?,
        })
    }

    fn into_user(self) -> StoreResult<User> {
        Ok(User {
            id: self.id,
            username: self.username,
            email: self.email,
            password: self.password,
            is_guest: self.is_guest,
            props: serde_json::from_str(&self.props)?,
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
            delete_at: self.delete_at.map(from_millis),
        })
    }
}

// ==================== Helpers ====================

fn query_blocks<P: Params>(conn: &Connection, sql: &str, params: P) -> StoreResult<Vec<Block>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, BlockRow::from_row)?;

    let mut blocks = Vec::new();
    for row in rows {
        blocks.push(row?.into_block()?);
    }
    Ok(blocks)
}

fn query_board_members<P: Params>(
    conn: &Connection,
    filter: &str,
    params: P,
) -> StoreResult<Vec<BoardMember>> {
    let sql = format!(
        "SELECT board_id, user_id, scheme_admin, scheme_editor, scheme_viewer \
         FROM board_members {}",
        filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let members = stmt
        .query_map(params, |row| {
            Ok(BoardMember {
                board_id: row.get(0)?,
                user_id: row.get(1)?,
                scheme_admin: row.get(2)?,
                scheme_editor: row.get(3)?,
                scheme_viewer: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(members)
}

/// Fail if `block_id` already appears among the ancestors of `parent_id`
fn ensure_not_ancestor(conn: &Connection, block_id: &str, parent_id: &str) -> StoreResult<()> {
    let mut stmt = conn.prepare("SELECT parent_id FROM blocks WHERE id = ?")?;
    let mut seen = HashSet::new();
    let mut current = parent_id.to_string();

    while seen.insert(current.clone()) {
        let next: Option<String> = stmt
            .query_row(params![current], |row| row.get(0))
            .optional()?;
        match next {
            Some(next) if next == block_id => {
                return Err(StoreError::Cycle {
                    block_id: block_id.to_string(),
                    parent_id: parent_id.to_string(),
                });
            }
            Some(next) if !next.is_empty() => current = next,
            _ => break,
        }
    }
    Ok(())
}

fn user_conflict(error: rusqlite::Error, user: &User) -> StoreError {
    let (field, value) = match unique_violation_column(&error) {
        Some("email") => ("email", &user.email),
        Some("username") => ("username", &user.username),
        Some("id") => ("id", &user.id),
        _ => return StoreError::Database(error),
    };
    StoreError::Conflict {
        entity: "user",
        field,
        value: value.clone(),
    }
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}
