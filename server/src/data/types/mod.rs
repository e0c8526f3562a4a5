//! Shared data types for the SQLite store

mod enums;
mod params;
mod scope;
mod transactional;

pub use enums::{TaskPriority, TaskStatus};
pub use params::{PageWindow, SortOrder, TaskFilter, TaskSortBy};
pub use scope::Scope;

pub use transactional::{
    ActivityRow, AssigneeRow, CommentRow, CommentWithAuthorRow, MembershipRow, TagRow,
    TaskEdgeRow, TaskListRow, TaskListSummaryRow, TaskRow, TaskTagRow, UndoRow, UserRef, UserRow,
    UserSettingsRow, WorkspaceRow, WorkspaceWithRole,
};
