//! Search command handler

use anyhow::Result;
use tracing::debug;

use trellis_core::audit::audited_search;
use trellis_core::{SearchEngine, SearchQuery, SearchScope, SqliteStore, StorePermissions};

use crate::output::Output;

/// Search boards visible to the principal
pub fn search(
    store: &SqliteStore,
    user_id: &str,
    term: String,
    team: Option<String>,
    field: Option<String>,
    output: &Output,
) -> Result<()> {
    // Answered here, the engine is never consulted
    if term.is_empty() {
        output.print_blocks(&[]);
        return Ok(());
    }

    let query = SearchQuery {
        term,
        field,
        user_id: user_id.to_string(),
        scope: match team {
            Some(team_id) => SearchScope::Team(team_id),
            None => SearchScope::AllTeams,
        },
    };

    let perms = StorePermissions::new(store);
    let engine = SearchEngine::new(store, &perms, &perms);
    let boards = audited_search(&engine, &query)?;
    debug!("search returned {} board(s)", boards.len());

    output.print_blocks(&boards);
    Ok(())
}
