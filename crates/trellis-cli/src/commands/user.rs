//! User command handlers

use anyhow::{Context, Result};

use trellis_core::{SqliteStore, User, UserStore};

use crate::commands::resolve_user;
use crate::output::Output;

/// Create an account
pub fn add(
    store: &SqliteStore,
    username: String,
    email: String,
    guest: bool,
    output: &Output,
) -> Result<()> {
    let user = if guest {
        User::guest(username, email)
    } else {
        User::new(username, email)
    };
    store.create_user(&user).context("Failed to create user")?;

    output.success(&format!("Created user: {}", user.id));
    output.print_user(&user);
    Ok(())
}

/// Show an account by id, username or email
pub fn show(store: &SqliteStore, ident: &str, output: &Output) -> Result<()> {
    let user = resolve_user(store, ident)?;
    output.print_user(&user);
    Ok(())
}

/// Flip the guest flag on an account
pub fn set_guest(store: &SqliteStore, ident: &str, guest: bool, output: &Output) -> Result<()> {
    let mut user = resolve_user(store, ident)?;
    user.is_guest = guest;
    user.updated_at = chrono::Utc::now();
    store.update_user(&user).context("Failed to update user")?;

    output.success(&format!(
        "{} is {} a guest",
        user.username,
        if guest { "now" } else { "no longer" }
    ));
    Ok(())
}
