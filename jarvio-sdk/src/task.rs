//! Task and subtask data structures

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::flow::{Flow, FlowBlock};

/// Status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Done,
}

/// Status of a subtask within a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubtaskStatus {
    NotStarted,
    InProgress,
    Done,
    Skipped,
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskStatus::NotStarted => "Not Started",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        };
        write!(f, "{}", label)
    }
}

impl fmt::Display for SubtaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SubtaskStatus::NotStarted => "Not Started",
            SubtaskStatus::InProgress => "In Progress",
            SubtaskStatus::Done => "Done",
            SubtaskStatus::Skipped => "Skipped",
        };
        write!(f, "{}", label)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        };
        write!(f, "{}", label)
    }
}

/// One ordered, completable unit of work within a task
///
/// Array index in the parent's `subtasks` list is the execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub done: bool,
    pub status: SubtaskStatus,
    pub priority: Priority,
    pub category: String,
    /// Automation block this subtask was generated from, if any
    pub block: Option<FlowBlock>,
}

impl Subtask {
    pub fn new(title: String, description: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            done: false,
            status: SubtaskStatus::NotStarted,
            priority: Priority::Medium,
            category: "General".to_string(),
            block: None,
        }
    }

    /// Whether this subtask no longer blocks progression
    pub fn is_resolved(&self) -> bool {
        self.done || self.status == SubtaskStatus::Skipped
    }
}

/// A manual step the user performed, recorded from a work-log marker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkLogEntry {
    pub subtask_index: usize,
    pub entry: String,
    pub timestamp: DateTime<Local>,
}

impl WorkLogEntry {
    pub fn new(subtask_index: usize, entry: String) -> Self {
        Self {
            subtask_index,
            entry,
            timestamp: Local::now(),
        }
    }
}

/// A task with an ordered list of subtasks
///
/// Created via the API or store, mutated by subtask completion, never
/// deleted automatically. `version` increments on every stored write and
/// backs the store's compare-and-set updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub category: String,
    pub subtasks: Vec<Subtask>,
    /// Flow template this task was instantiated from (embedded by value)
    pub flow: Option<Flow>,
    pub version: i64,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

impl Task {
    pub fn new(title: String, description: String) -> Self {
        let now = Local::now();
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            status: TaskStatus::NotStarted,
            priority: Priority::Medium,
            category: "General".to_string(),
            subtasks: Vec::new(),
            flow: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Flow template this task was created from, if any
    pub fn flow(&self) -> Option<&Flow> {
        self.flow.as_ref()
    }

    /// Whether every subtask is done or skipped
    pub fn is_complete(&self) -> bool {
        !self.subtasks.is_empty() && self.subtasks.iter().all(|s| s.is_resolved())
    }

    /// Count of resolved subtasks out of the total
    pub fn progress(&self) -> (usize, usize) {
        let resolved = self.subtasks.iter().filter(|s| s.is_resolved()).count();
        (resolved, self.subtasks.len())
    }
}
