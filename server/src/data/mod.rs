//! Data storage layer
//!
//! - `sqlite` - Transactional store for users, workspaces, tasks and their satellites
//! - `topics` - In-process pub/sub used for realtime fan-out
//! - `types` - Row types and query parameters shared with the domain layer

pub mod sqlite;
pub mod topics;
pub mod types;

pub use sqlite::{SqliteError, SqliteService};
pub use topics::TopicService;
