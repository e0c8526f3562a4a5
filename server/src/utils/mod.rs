//! Utility functions for the application

pub mod crypto;
pub mod path;
pub mod sql;
pub mod time;
