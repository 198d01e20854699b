//! Command handlers

pub mod block;
pub mod config;
pub mod member;
pub mod search;
pub mod setting;
pub mod status;
pub mod user;

use anyhow::{bail, Result};

use trellis_core::{ErrorKind, SqliteStore, User, UserStore};

/// Look a user up by id, then username, then email
pub fn resolve_user(store: &SqliteStore, ident: &str) -> Result<User> {
    let lookups: [fn(&SqliteStore, &str) -> trellis_core::StoreResult<User>; 3] = [
        |s, v| s.get_user_by_id(v),
        |s, v| s.get_user_by_username(v),
        |s, v| s.get_user_by_email(v),
    ];

    for lookup in lookups {
        match lookup(store, ident) {
            Ok(user) => return Ok(user),
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        }
    }
    bail!("User not found: {}", ident)
}

/// The acting principal: `--user`, falling back to the configured default
pub fn require_principal(store: &SqliteStore, user: Option<&str>) -> Result<User> {
    match user {
        Some(ident) => resolve_user(store, ident),
        None => bail!("No user given. Pass --user or set default_user in the config file."),
    }
}
