//! Ownership scope shared by task lists and tags

use super::transactional::{TagRow, TaskListRow};

/// The owning context of a list or tag: one workspace or one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Workspace(i64),
    User(i64),
}

impl Scope {
    /// Build a scope from the nullable column pair. Both or neither set is invalid.
    pub fn from_columns(workspace_id: Option<i64>, user_id: Option<i64>) -> Option<Self> {
        match (workspace_id, user_id) {
            (Some(w), None) => Some(Self::Workspace(w)),
            (None, Some(u)) => Some(Self::User(u)),
            _ => None,
        }
    }

    pub fn workspace_id(&self) -> Option<i64> {
        match self {
            Self::Workspace(id) => Some(*id),
            Self::User(_) => None,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Self::User(id) => Some(*id),
            Self::Workspace(_) => None,
        }
    }
}

impl TaskListRow {
    pub fn scope(&self) -> Option<Scope> {
        Scope::from_columns(self.workspace_id, self.user_id)
    }
}

impl TagRow {
    pub fn scope(&self) -> Option<Scope> {
        Scope::from_columns(self.workspace_id, self.user_id)
    }
}
