//! Permission collaborators consulted by search
//!
//! Both checks are fallible calls: implementations may hit a database or a
//! remote service, and callers ask again on every invocation.

use crate::storage::StoreResult;
use crate::store::{MembershipStore, UserStore};

/// Team-level permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Permission {
    ViewTeam,
}

/// Decides whether a principal holds a team permission
pub trait PermissionChecker {
    fn has_permission_to_team(
        &self,
        user_id: &str,
        team_id: &str,
        permission: Permission,
    ) -> StoreResult<bool>;
}

/// Tells guests apart from full members
pub trait GuestClassifier {
    fn is_guest(&self, user_id: &str) -> StoreResult<bool>;
}

/// Store-backed checks: team membership grants `ViewTeam`
pub struct StorePermissions<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: ?Sized> StorePermissions<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

impl<S: MembershipStore + ?Sized> PermissionChecker for StorePermissions<'_, S> {
    fn has_permission_to_team(
        &self,
        user_id: &str,
        team_id: &str,
        permission: Permission,
    ) -> StoreResult<bool> {
        match permission {
            Permission::ViewTeam => self.store.is_team_member(team_id, user_id),
        }
    }
}

impl<S: UserStore + ?Sized> GuestClassifier for StorePermissions<'_, S> {
    fn is_guest(&self, user_id: &str) -> StoreResult<bool> {
        Ok(self.store.get_user_by_id(user_id)?.is_guest)
    }
}
