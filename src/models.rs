// Data models for the todo store

use chrono::{DateTime, Utc};
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum title length, counted in characters after trimming
pub const MIN_TITLE_LEN: usize = 3;

/// Task identifier
///
/// Derived from the creation time in milliseconds, so ids sort in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i64>()
            .map(TaskId)
            .map_err(|e| eyre!("Invalid task id {:?}: {}", s, e))
    }
}

/// A single todo item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub(crate) fn new(id: TaskId, title: String, description: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title,
            description,
            completed: false,
            created_at,
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.completed
    }

    /// Merge the fields present in `patch` over this task.
    ///
    /// `id` and `created_at` are never touched. The title is assumed to be
    /// validated already.
    pub(crate) fn apply(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
    }
}

/// Partial field set for updating a task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }
}

/// Validate a task title, returning it trimmed
pub fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(eyre!("Title is required"));
    }
    if trimmed.chars().count() < MIN_TITLE_LEN {
        return Err(eyre!("Title must be at least {} characters", MIN_TITLE_LEN));
    }
    Ok(trimmed.to_string())
}
