//! Board search
//!
//! Resolves a free-text term against the boards a principal may see, either
//! within one team or across every team the principal belongs to.
//!
//! Validation and permission failures are raised before any candidate is
//! fetched, so a failed search never returns partial matches.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Block, BoardMember, BoardVisibility};
use crate::permissions::{GuestClassifier, Permission, PermissionChecker};
use crate::storage::{StoreError, StoreResult};

/// Attribute a search term is matched against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    #[default]
    Title,
    PropertyName,
}

impl SearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::PropertyName => "property_name",
        }
    }
}

impl FromStr for SearchField {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(SearchField::Title),
            "property_name" => Ok(SearchField::PropertyName),
            other => Err(StoreError::BadRequest(format!(
                "invalid search field: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where to look for boards
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    /// One team; the principal must be able to view it
    Team(String),
    /// Every team the principal belongs to and may view
    AllTeams,
}

/// A single search request
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub term: String,
    /// Raw field name; `None` or empty means title
    pub field: Option<String>,
    pub user_id: String,
    pub scope: SearchScope,
}

impl SearchQuery {
    /// Title search across all of the user's teams
    pub fn all_teams(term: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            field: None,
            user_id: user_id.into(),
            scope: SearchScope::AllTeams,
        }
    }

    /// Title search within one team
    pub fn in_team(
        term: impl Into<String>,
        user_id: impl Into<String>,
        team_id: impl Into<String>,
    ) -> Self {
        Self {
            term: term.into(),
            field: None,
            user_id: user_id.into(),
            scope: SearchScope::Team(team_id.into()),
        }
    }

    /// Match against a different field
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Parsed search field
    pub fn search_field(&self) -> StoreResult<SearchField> {
        match self.field.as_deref() {
            None | Some("") => Ok(SearchField::Title),
            Some(raw) => raw.parse(),
        }
    }
}

/// Store-side lookups the search engine needs
pub trait BoardIndex {
    /// Teams the user belongs to
    fn teams_for_user(&self, user_id: &str) -> StoreResult<Vec<String>>;

    /// Root board blocks of the given teams
    fn boards_for_teams(&self, team_ids: &[String]) -> StoreResult<Vec<Block>>;

    /// Explicit board memberships of the user
    fn board_memberships_for_user(&self, user_id: &str) -> StoreResult<Vec<BoardMember>>;
}

/// Search over boards visible to a principal
pub struct SearchEngine<'a> {
    index: &'a dyn BoardIndex,
    permissions: &'a dyn PermissionChecker,
    guests: &'a dyn GuestClassifier,
}

impl<'a> SearchEngine<'a> {
    pub fn new(
        index: &'a dyn BoardIndex,
        permissions: &'a dyn PermissionChecker,
        guests: &'a dyn GuestClassifier,
    ) -> Self {
        Self {
            index,
            permissions,
            guests,
        }
    }

    /// Boards matching `query`, ordered by title
    pub fn search_boards(&self, query: &SearchQuery) -> StoreResult<Vec<Block>> {
        let field = query.search_field()?;
        let user_id = query.user_id.as_str();

        if let SearchScope::Team(team_id) = &query.scope {
            if !self
                .permissions
                .has_permission_to_team(user_id, team_id, Permission::ViewTeam)?
            {
                return Err(StoreError::Permission("access denied to team".into()));
            }
        }

        if query.term.is_empty() {
            return Ok(Vec::new());
        }

        let is_guest = self.guests.is_guest(user_id)?;

        let teams = match &query.scope {
            SearchScope::Team(team_id) => vec![team_id.clone()],
            SearchScope::AllTeams => {
                let mut visible = Vec::new();
                for team_id in self.index.teams_for_user(user_id)? {
                    if self
                        .permissions
                        .has_permission_to_team(user_id, &team_id, Permission::ViewTeam)?
                    {
                        visible.push(team_id);
                    }
                }
                visible
            }
        };
        if teams.is_empty() {
            return Ok(Vec::new());
        }

        let member_of: HashSet<String> = self
            .index
            .board_memberships_for_user(user_id)?
            .into_iter()
            .map(|m| m.board_id)
            .collect();

        let term = query.term.to_lowercase();
        let mut seen = HashSet::new();
        let mut boards: Vec<Block> = self
            .index
            .boards_for_teams(&teams)?
            .into_iter()
            .filter(|board| !board.is_template())
            .filter(|board| {
                member_of.contains(&board.id)
                    || (!is_guest && board.visibility() == BoardVisibility::Open)
            })
            .filter(|board| matches_term(board, field, &term))
            .filter(|board| seen.insert(board.id.clone()))
            .collect();

        boards.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });

        debug!(
            user_id,
            field = %field,
            is_guest,
            teams = teams.len(),
            boards_count = boards.len(),
            "searched boards"
        );
        Ok(boards)
    }
}

/// `term` must already be lowercase
fn matches_term(board: &Block, field: SearchField, term: &str) -> bool {
    match field {
        SearchField::Title => board.title.to_lowercase().contains(term),
        SearchField::PropertyName => board
            .property_names()
            .iter()
            .any(|name| name.to_lowercase().contains(term)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoardRole, User, FIELD_CARD_PROPERTIES, FIELD_IS_TEMPLATE};
    use crate::permissions::StorePermissions;
    use crate::storage::{ErrorKind, SqliteStore};
    use crate::store::{BlockStore, MembershipStore, UserStore};
    use crate::test_support::board;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Wraps a real store and counts every collaborator call
    struct Counting<'a> {
        store: &'a SqliteStore,
        index_calls: AtomicUsize,
        permission_calls: AtomicUsize,
        guest_calls: AtomicUsize,
    }

    impl<'a> Counting<'a> {
        fn new(store: &'a SqliteStore) -> Self {
            Self {
                store,
                index_calls: AtomicUsize::new(0),
                permission_calls: AtomicUsize::new(0),
                guest_calls: AtomicUsize::new(0),
            }
        }

        fn engine(&self) -> SearchEngine<'_> {
            SearchEngine::new(self, self, self)
        }

        fn total(&self) -> usize {
            self.index_calls.load(Ordering::SeqCst)
                + self.permission_calls.load(Ordering::SeqCst)
                + self.guest_calls.load(Ordering::SeqCst)
        }
    }

    impl BoardIndex for Counting<'_> {
        fn teams_for_user(&self, user_id: &str) -> StoreResult<Vec<String>> {
            self.index_calls.fetch_add(1, Ordering::SeqCst);
            BoardIndex::teams_for_user(self.store, user_id)
        }

        fn boards_for_teams(&self, team_ids: &[String]) -> StoreResult<Vec<Block>> {
            self.index_calls.fetch_add(1, Ordering::SeqCst);
            self.store.boards_for_teams(team_ids)
        }

        fn board_memberships_for_user(&self, user_id: &str) -> StoreResult<Vec<BoardMember>> {
            self.index_calls.fetch_add(1, Ordering::SeqCst);
            BoardIndex::board_memberships_for_user(self.store, user_id)
        }
    }

    impl PermissionChecker for Counting<'_> {
        fn has_permission_to_team(
            &self,
            user_id: &str,
            team_id: &str,
            permission: Permission,
        ) -> StoreResult<bool> {
            self.permission_calls.fetch_add(1, Ordering::SeqCst);
            StorePermissions::new(self.store).has_permission_to_team(user_id, team_id, permission)
        }
    }

    impl GuestClassifier for Counting<'_> {
        fn is_guest(&self, user_id: &str) -> StoreResult<bool> {
            self.guest_calls.fetch_add(1, Ordering::SeqCst);
            StorePermissions::new(self.store).is_guest(user_id)
        }
    }

    /// Boards A "Roadmap" and B "Budget" in T1, plus a member and a guest.
    /// The guest is a member of T1 but only of board B.
    fn seeded() -> (SqliteStore, User, User) {
        let store = SqliteStore::open_in_memory().unwrap();

        let mut a = board("A", "Roadmap", "T1");
        a.set_visibility(BoardVisibility::Open);
        let mut b = board("B", "Budget", "T1");
        b.set_visibility(BoardVisibility::Open);
        store.insert_block(&a).unwrap();
        store.insert_block(&b).unwrap();

        let member = User::new("umember", "member@example.com");
        let guest = User::guest("uguest", "guest@example.com");
        store.create_user(&member).unwrap();
        store.create_user(&guest).unwrap();

        store.add_team_member("T1", &member.id).unwrap();
        store.add_team_member("T1", &guest.id).unwrap();
        store
            .save_board_member(&BoardMember::new("B", &guest.id, BoardRole::Viewer))
            .unwrap();

        (store, member, guest)
    }

    fn ids(boards: &[Block]) -> Vec<&str> {
        boards.iter().map(|b| b.id.as_str()).collect()
    }

    fn search(store: &SqliteStore, query: &SearchQuery) -> StoreResult<Vec<Block>> {
        let perms = StorePermissions::new(store);
        SearchEngine::new(store, &perms, &perms).search_boards(query)
    }

    #[test]
    fn test_member_title_search_in_team() {
        let (store, member, _) = seeded();
        let results = search(&store, &SearchQuery::in_team("road", &member.id, "T1")).unwrap();
        assert_eq!(ids(&results), vec!["A"]);
    }

    #[test]
    fn test_guest_only_sees_member_boards() {
        let (store, member, guest) = seeded();

        let as_member = search(&store, &SearchQuery::in_team("d", &member.id, "T1")).unwrap();
        assert_eq!(ids(&as_member), vec!["B", "A"]);

        let as_guest = search(&store, &SearchQuery::in_team("d", &guest.id, "T1")).unwrap();
        assert_eq!(ids(&as_guest), vec!["B"]);
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let (store, member, _) = seeded();
        let results = search(&store, &SearchQuery::all_teams("ROAD", &member.id)).unwrap();
        assert_eq!(ids(&results), vec!["A"]);
    }

    #[test]
    fn test_empty_term_makes_no_backend_query() {
        let (store, member, _) = seeded();
        let counting = Counting::new(&store);

        let results = counting
            .engine()
            .search_boards(&SearchQuery::all_teams("", &member.id))
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(counting.total(), 0);
    }

    #[test]
    fn test_bogus_field_is_bad_request_without_queries() {
        let (store, member, _) = seeded();
        let counting = Counting::new(&store);

        let query = SearchQuery::in_team("road", &member.id, "T1").with_field("bogus");
        let err = counting.engine().search_boards(&query).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(counting.total(), 0);
    }

    #[test]
    fn test_team_permission_denied_before_search() {
        let (store, _, _) = seeded();
        let outsider = User::new("outsider", "outsider@example.com");
        store.create_user(&outsider).unwrap();
        let counting = Counting::new(&store);

        let err = counting
            .engine()
            .search_boards(&SearchQuery::in_team("road", &outsider.id, "T1"))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Permission);
        assert_eq!(counting.permission_calls.load(Ordering::SeqCst), 1);
        assert_eq!(counting.index_calls.load(Ordering::SeqCst), 0);
        assert_eq!(counting.guest_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_term_in_foreign_team_is_still_denied() {
        let (store, _, _) = seeded();
        let outsider = User::new("outsider", "outsider@example.com");
        store.create_user(&outsider).unwrap();
        let counting = Counting::new(&store);

        let err = counting
            .engine()
            .search_boards(&SearchQuery::in_team("", &outsider.id, "T1"))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Permission);
        assert_eq!(counting.permission_calls.load(Ordering::SeqCst), 1);
        assert_eq!(counting.index_calls.load(Ordering::SeqCst), 0);
        assert_eq!(counting.guest_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_term_in_own_team_stops_after_permission() {
        let (store, member, _) = seeded();
        let counting = Counting::new(&store);

        let results = counting
            .engine()
            .search_boards(&SearchQuery::in_team("", &member.id, "T1"))
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(counting.permission_calls.load(Ordering::SeqCst), 1);
        assert_eq!(counting.index_calls.load(Ordering::SeqCst), 0);
        assert_eq!(counting.guest_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_guest_across_all_teams() {
        let (store, member, guest) = seeded();
        let mut other = board("D", "Dashboard", "T2");
        other.set_visibility(BoardVisibility::Open);
        store.insert_block(&other).unwrap();
        store.add_team_member("T2", &member.id).unwrap();
        store.add_team_member("T2", &guest.id).unwrap();
        let counting = Counting::new(&store);

        let as_guest = counting
            .engine()
            .search_boards(&SearchQuery::all_teams("d", &guest.id))
            .unwrap();
        assert_eq!(ids(&as_guest), vec!["B"]);
        assert_eq!(counting.guest_calls.load(Ordering::SeqCst), 1);
        // teams_for_user, board_memberships_for_user, boards_for_teams
        assert_eq!(counting.index_calls.load(Ordering::SeqCst), 3);

        let as_member = search(&store, &SearchQuery::all_teams("d", &member.id)).unwrap();
        assert_eq!(ids(&as_member), vec!["B", "D", "A"]);
    }

    #[test]
    fn test_private_boards_need_membership() {
        let (store, member, _) = seeded();
        store
            .insert_block(&board("P", "Roadmap secret", "T1"))
            .unwrap();

        let results = search(&store, &SearchQuery::in_team("roadmap", &member.id, "T1")).unwrap();
        assert_eq!(ids(&results), vec!["A"]);

        store
            .save_board_member(&BoardMember::new("P", &member.id, BoardRole::Editor))
            .unwrap();
        let results = search(&store, &SearchQuery::in_team("roadmap", &member.id, "T1")).unwrap();
        assert_eq!(ids(&results), vec!["A", "P"]);
    }

    #[test]
    fn test_templates_are_excluded() {
        let (store, member, _) = seeded();
        let mut template = board("TPL", "Roadmap template", "T1");
        template.set_visibility(BoardVisibility::Open);
        template.set_field(FIELD_IS_TEMPLATE, json!(true));
        store.insert_block(&template).unwrap();

        let results = search(&store, &SearchQuery::all_teams("roadmap", &member.id)).unwrap();
        assert_eq!(ids(&results), vec!["A"]);
    }

    #[test]
    fn test_property_name_search_dedupes() {
        let (store, member, _) = seeded();
        let mut a = store.get_block("A").unwrap().unwrap();
        a.set_field(
            FIELD_CARD_PROPERTIES,
            json!([
                { "id": "p1", "name": "Status", "type": "select" },
                { "id": "p2", "name": "Statute", "type": "text" }
            ]),
        );
        store.insert_block(&a).unwrap();

        let query = SearchQuery::in_team("stat", &member.id, "T1").with_field("property_name");
        let results = search(&store, &query).unwrap();
        assert_eq!(ids(&results), vec!["A"]);

        let by_title = SearchQuery::in_team("stat", &member.id, "T1").with_field("title");
        assert!(search(&store, &by_title).unwrap().is_empty());
    }

    #[test]
    fn test_all_teams_spans_memberships_only() {
        let (store, member, _) = seeded();
        let mut other = board("C", "Road trip", "T2");
        other.set_visibility(BoardVisibility::Open);
        store.insert_block(&other).unwrap();

        let results = search(&store, &SearchQuery::all_teams("road", &member.id)).unwrap();
        assert_eq!(ids(&results), vec!["A"]);

        store.add_team_member("T2", &member.id).unwrap();
        let results = search(&store, &SearchQuery::all_teams("road", &member.id)).unwrap();
        assert_eq!(ids(&results), vec!["C", "A"]);
    }

    #[test]
    fn test_child_blocks_never_match() {
        let (store, member, _) = seeded();
        let mut card = crate::test_support::block("c1", "A", crate::models::BlockType::Card);
        card.title = "Road card".to_string();
        store.insert_block(&card).unwrap();

        let results = search(&store, &SearchQuery::all_teams("road", &member.id)).unwrap();
        assert_eq!(ids(&results), vec!["A"]);
    }

    #[test]
    fn test_unknown_user_fails() {
        let (store, _, _) = seeded();
        store.add_team_member("T1", "ghost").unwrap();
        let err = search(&store, &SearchQuery::in_team("road", "ghost", "T1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_search_field_parsing() {
        assert_eq!("title".parse::<SearchField>().unwrap(), SearchField::Title);
        assert_eq!(
            "property_name".parse::<SearchField>().unwrap(),
            SearchField::PropertyName
        );
        assert!("Title".parse::<SearchField>().is_err());
        assert_eq!(
            SearchQuery::all_teams("x", "u").with_field("").search_field().unwrap(),
            SearchField::Title
        );
        assert_eq!(
            serde_json::to_string(&SearchField::PropertyName).unwrap(),
            "\"property_name\""
        );
    }
}
