use std::collections::BTreeMap;

use receiptdesk_core::{DomainError, DomainResult, UserId};

use crate::user::{User, UserRole};

/// In-memory account directory keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDirectory {
    users: BTreeMap<UserId, User>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    /// Like [`get`](Self::get) but `NotFound` when absent.
    pub fn require(&self, id: UserId) -> DomainResult<&User> {
        self.get(id)
            .ok_or_else(|| DomainError::not_found(format!("user {id}")))
    }

    /// Look up a branch account; the administrator is not a branch.
    pub fn require_branch(&self, id: UserId) -> DomainResult<&User> {
        let user = self.require(id)?;
        if user.role() != UserRole::Branch {
            return Err(DomainError::validation(format!("user {id} is not a branch")));
        }
        Ok(user)
    }

    pub fn find_by_username(&self, username: &str) -> Option<&User> {
        let wanted = username.trim();
        self.users.values().find(|u| u.username() == wanted)
    }

    /// Whether `username` belongs to an account other than `except`.
    pub fn username_taken(&self, username: &str, except: Option<UserId>) -> bool {
        self.find_by_username(username)
            .is_some_and(|u| Some(u.id_typed()) != except)
    }

    pub fn insert(&mut self, user: User) {
        self.users.insert(user.id_typed(), user);
    }

    pub fn remove(&mut self, id: UserId) -> Option<User> {
        self.users.remove(&id)
    }

    pub fn all(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Branch accounts only, ordered by branch name.
    pub fn branches(&self) -> Vec<&User> {
        let mut out: Vec<&User> = self
            .users
            .values()
            .filter(|u| u.role() == UserRole::Branch)
            .collect();
        out.sort_by(|a, b| a.display_name().cmp(b.display_name()));
        out
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Replace every account at once (remote import).
    pub fn replace_all(&mut self, users: impl IntoIterator<Item = User>) {
        self.users = users.into_iter().map(|u| (u.id_typed(), u)).collect();
    }
}
