//! Audit records for search calls
//!
//! Advisory telemetry: a wrapped search that gets past request validation
//! and the team permission check emits one record through `tracing` on
//! target `trellis::audit`, whether it then succeeded or not. A bad field,
//! a denied team and an empty term are not audited. The search result is
//! passed back untouched.

use std::fmt;

use tracing::info;

use crate::models::Block;
use crate::search::{SearchEngine, SearchQuery, SearchScope};
use crate::storage::{ErrorKind, StoreResult};

/// Outcome recorded for an audited call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Fail,
    Success,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditStatus::Fail => f.write_str("fail"),
            AuditStatus::Success => f.write_str("success"),
        }
    }
}

/// One audit entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub event: &'static str,
    pub user_id: String,
    pub team_id: Option<String>,
    pub status: AuditStatus,
    pub boards_count: Option<usize>,
}

impl AuditRecord {
    /// A record that starts out failed until marked otherwise
    pub fn new(event: &'static str, user_id: impl Into<String>) -> Self {
        Self {
            event,
            user_id: user_id.into(),
            team_id: None,
            status: AuditStatus::Fail,
            boards_count: None,
        }
    }

    pub fn success(&mut self) {
        self.status = AuditStatus::Success;
    }

    /// Emit the record
    pub fn log(&self) {
        info!(
            target: "trellis::audit",
            event = self.event,
            user_id = %self.user_id,
            team_id = self.team_id.as_deref().unwrap_or(""),
            status = %self.status,
            boards_count = self.boards_count.unwrap_or(0),
            "audit"
        );
    }
}

/// Audit record describing a search call and its outcome
pub fn search_record(query: &SearchQuery, result: &StoreResult<Vec<Block>>) -> AuditRecord {
    let mut record = match &query.scope {
        SearchScope::Team(team_id) => {
            let mut record = AuditRecord::new("searchBoards", &query.user_id);
            record.team_id = Some(team_id.clone());
            record
        }
        SearchScope::AllTeams => AuditRecord::new("searchAllBoards", &query.user_id),
    };
    if let Ok(boards) = result {
        record.boards_count = Some(boards.len());
        record.success();
    }
    record
}

/// Whether a search outcome gets an audit record
pub fn is_audited(query: &SearchQuery, result: &StoreResult<Vec<Block>>) -> bool {
    match result {
        Err(e) => !matches!(e.kind(), ErrorKind::BadRequest | ErrorKind::Permission),
        Ok(_) => !query.term.is_empty(),
    }
}

/// Run a search and log its audit record
pub fn audited_search(engine: &SearchEngine<'_>, query: &SearchQuery) -> StoreResult<Vec<Block>> {
    let result = engine.search_boards(query);
    if is_audited(query, &result) {
        search_record(query, &result).log();
    }
    result
}
