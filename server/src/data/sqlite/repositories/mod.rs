//! Repository functions for the SQLite store
//!
//! Every function takes `&mut SqliteConnection` so callers can run several of
//! them inside one transaction (`&mut *tx`) or on a plain pooled connection.

pub mod activity;
pub mod assignment;
pub mod comment;
pub mod tag;
pub mod task;
pub mod task_list;
pub mod undo;
pub mod user;
pub mod workspace;
