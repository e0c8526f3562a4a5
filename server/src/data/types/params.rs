//! Query parameter types for task listings

use std::fmt;
use std::str::FromStr;

use super::enums::TaskStatus;

/// Sort key for task listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskSortBy {
    /// Manual `position_order`
    #[default]
    Custom,
    /// `due_datetime`, tasks without a deadline always last
    Deadline,
    /// Fixed rank High, Medium, Low
    Priority,
    CreatedAt,
}

impl FromStr for TaskSortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "custom" => Ok(Self::Custom),
            "deadline" => Ok(Self::Deadline),
            "priority" => Ok(Self::Priority),
            "created_at" => Ok(Self::CreatedAt),
            other => Err(format!(
                "Invalid sort_by '{}'. Valid options: custom, deadline, priority, created_at",
                other
            )),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!(
                "Invalid sort_order '{}'. Valid options: asc, desc",
                other
            )),
        }
    }
}

/// Filters applied on top of "active tasks of one list"
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub statuses: Vec<TaskStatus>,
    /// Tags referenced by id; matches any active linked tag
    pub tag_ids: Vec<i64>,
    /// Tags referenced by name; matches any active linked tag
    pub tag_names: Vec<String>,
    pub assigned_user_ids: Vec<i64>,
    /// Inclusive lower bound on `due_datetime`
    pub due_start: Option<i64>,
    /// Inclusive upper bound on `due_datetime`
    pub due_end: Option<i64>,
}

impl TaskFilter {
    pub fn has_tag_filter(&self) -> bool {
        !self.tag_ids.is_empty() || !self.tag_names.is_empty()
    }
}

/// Clamped page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub page_size: u32,
}

impl PageWindow {
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}
