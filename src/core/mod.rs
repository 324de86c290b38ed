//! Core domain models for task planning.
//!
//! This module contains the fundamental data structures used throughout
//! the planner: tasks, their identifiers, and the dependency graph.

pub mod dag;
pub mod task;

pub use dag::{Batch, DependencyType, TaskGraph};
pub use task::{Priority, Role, Task, TaskId, TaskIdSequence, TaskStatus};
