//! Team and board membership handlers

use anyhow::{anyhow, Context, Result};

use trellis_core::{BoardMember, BoardRole, MembershipStore, SqliteStore};

use crate::commands::resolve_user;
use crate::output::Output;

pub fn join_team(store: &SqliteStore, team_id: &str, ident: &str, output: &Output) -> Result<()> {
    let user = resolve_user(store, ident)?;
    store
        .add_team_member(team_id, &user.id)
        .context("Failed to add team member")?;
    output.success(&format!("{} joined team {}", user.username, team_id));
    Ok(())
}

pub fn leave_team(store: &SqliteStore, team_id: &str, ident: &str, output: &Output) -> Result<()> {
    let user = resolve_user(store, ident)?;
    store
        .remove_team_member(team_id, &user.id)
        .context("Failed to remove team member")?;
    output.success(&format!("{} left team {}", user.username, team_id));
    Ok(())
}

pub fn add_board_member(
    store: &SqliteStore,
    board_id: &str,
    ident: &str,
    role: &str,
    output: &Output,
) -> Result<()> {
    let role: BoardRole = role.parse().map_err(|e: String| anyhow!(e))?;
    let user = resolve_user(store, ident)?;
    store
        .save_board_member(&BoardMember::new(board_id, &user.id, role))
        .context("Failed to save board member")?;
    output.success(&format!("{} added to board {}", user.username, board_id));
    Ok(())
}

pub fn remove_board_member(
    store: &SqliteStore,
    board_id: &str,
    ident: &str,
    output: &Output,
) -> Result<()> {
    let user = resolve_user(store, ident)?;
    store
        .delete_board_member(board_id, &user.id)
        .context("Failed to remove board member")?;
    output.success(&format!("{} removed from board {}", user.username, board_id));
    Ok(())
}

pub fn list_board_members(store: &SqliteStore, board_id: &str, output: &Output) -> Result<()> {
    let members = store.board_members(board_id)?;
    output.print_members(&members);
    Ok(())
}
