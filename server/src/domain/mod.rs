//! Task engine: access control, hierarchy, tags, assignments, undo and
//! change events over the SQLite store

pub mod access;
pub mod accounts;
pub mod activity;
pub mod assignments;
pub mod comments;
pub mod engine;
pub mod error;
pub mod events;
pub mod hierarchy;
pub mod query;
pub mod tags;
pub mod task_lists;
pub mod tasks;
pub mod undo;

pub use accounts::Account;
pub use activity::ActivityPage;
pub use comments::CommentView;
pub use engine::TaskEngine;
pub use error::{DomainError, DomainResult};
pub use events::{EventPublisher, RealtimeEvent, TopicEventPublisher, user_topic, workspace_topic};
pub use query::{TaskDetail, TaskPage, TaskQuery};
pub use tags::{NewTagInput, TagRef, TagUpdateInput};
pub use task_lists::{CreateTaskListInput, TaskListUpdateOutcome};
pub use tasks::{BulkUpdateInput, CreateTaskInput, DeleteOutcome, UpdateOutcome, UpdateTaskInput};
pub use undo::UndoOutcome;
