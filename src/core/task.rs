//! Task data model for the dependency graph.
//!
//! Tasks are the atomic units of work synthesized from a requirements
//! document. Each task carries the files it is expected to touch, its
//! acceptance criteria, a priority, an owning role, and the identifiers of
//! the tasks it depends on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default prefix for generated task identifiers.
pub const DEFAULT_ID_PREFIX: &str = "TASK";

/// Default zero-pad width for the numeric part of task identifiers.
pub const DEFAULT_ID_WIDTH: usize = 3;

/// Unique identifier for a task within a graph.
///
/// Generated identifiers have the form `PREFIX-NNN`; the numeric suffix is
/// the sequence counter used to order tasks that write the same file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Wrap an existing identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric counter encoded after the last `-`, if any.
    pub fn sequence_number(&self) -> Option<u64> {
        self.0.rsplit_once('-')?.1.parse().ok()
    }

    /// Whether this task was numbered strictly before `other`.
    ///
    /// Identifiers without a numeric suffix are never ordered.
    pub fn is_earlier_than(&self, other: &TaskId) -> bool {
        match (self.sequence_number(), other.sequence_number()) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Sequence generator for task identifiers, scoped to one parse pass.
///
/// Each call to [`TaskIdSequence::next_id`] yields the next zero-padded
/// identifier. A fresh sequence starts at 1.
#[derive(Debug, Clone)]
pub struct TaskIdSequence {
    prefix: String,
    width: usize,
    next: u64,
}

impl TaskIdSequence {
    /// Create a sequence with a custom prefix and pad width.
    pub fn new(prefix: impl Into<String>, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            width,
            next: 1,
        }
    }

    /// Produce the next identifier and advance the counter.
    pub fn next_id(&mut self) -> TaskId {
        let id = TaskId(format!(
            "{}-{:0width$}",
            self.prefix,
            self.next,
            width = self.width
        ));
        self.next += 1;
        id
    }

    /// Number of identifiers issued so far.
    pub fn issued(&self) -> u64 {
        self.next - 1
    }
}

impl Default for TaskIdSequence {
    fn default() -> Self {
        Self::new(DEFAULT_ID_PREFIX, DEFAULT_ID_WIDTH)
    }
}

/// Task priority inferred from the section title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// Role that owns a task, inferred from its target files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Backend,
    Frontend,
    Testing,
    Documentation,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Backend => write!(f, "backend"),
            Role::Frontend => write!(f, "frontend"),
            Role::Testing => write!(f, "testing"),
            Role::Documentation => write!(f, "documentation"),
        }
    }
}

/// Task status in its lifecycle.
///
/// The graph builder only ever emits `Pending`; executors overlay the other
/// states onto a copy of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task created but not yet started.
    #[default]
    Pending,
    /// Task is currently being executed.
    InProgress,
    /// Task completed successfully.
    Completed,
    /// Task failed.
    Failed,
    /// Task cannot start because a dependency failed.
    Blocked,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Blocked => write!(f, "blocked"),
        }
    }
}

/// A single unit of work in the task graph.
///
/// Treated as immutable once built: the `with_*` methods consume the task
/// and return an updated copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for this task.
    pub id: TaskId,
    /// Section title the task was synthesized from.
    pub title: String,
    /// Short description of what the task should accomplish.
    pub description: String,
    /// Role expected to carry out the task.
    pub assigned_role: Role,
    /// Inferred priority.
    pub priority: Priority,
    /// Tree-relative files the task touches, sorted and deduplicated.
    pub target_files: BTreeSet<String>,
    /// Acceptance criteria in document order.
    pub criteria: Vec<String>,
    /// Identifiers of the tasks that must complete first.
    pub dependencies: BTreeSet<TaskId>,
    /// Current execution status.
    #[serde(default)]
    pub status: TaskStatus,
}

impl Task {
    /// Create a pending task with no files, criteria or dependencies.
    pub fn new(id: TaskId, title: &str, description: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            description: description.to_string(),
            assigned_role: Role::default(),
            priority: Priority::default(),
            target_files: BTreeSet::new(),
            criteria: Vec::new(),
            dependencies: BTreeSet::new(),
            status: TaskStatus::Pending,
        }
    }

    pub fn with_target_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_criteria(mut self, criteria: Vec<String>) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.assigned_role = role;
        self
    }

    /// Replace the dependency set.
    pub fn with_dependencies<I>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = TaskId>,
    {
        self.dependencies = dependencies.into_iter().collect();
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Check whether the task touches the given file.
    pub fn touches(&self, file: &str) -> bool {
        self.target_files.contains(file)
    }

    /// Check if the task is in a terminal state (Completed or Failed).
    pub fn is_finished(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Failed)
    }
}
