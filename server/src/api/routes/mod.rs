//! API route handlers

pub mod activity;
pub mod auth;
pub mod events;
pub mod health;
pub mod search;
pub mod tags;
pub mod task_lists;
pub mod tasks;
pub mod undo;
pub mod workspaces;
