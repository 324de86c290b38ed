//! Turn a requirements document into an ordered, conflict-annotated task
//! graph.
//!
//! The pipeline runs in four stages:
//! - [`planning`] splits the document into sections and synthesizes tasks
//! - [`analysis`] extracts file-level imports from the source tree
//! - [`graph`] resolves task dependencies and file contention
//! - [`planner`] ties the stages together into a [`PlanOutput`]

pub mod analysis;
pub mod config;
pub mod core;
pub mod error;
pub mod graph;
pub mod log;
pub mod planner;
pub mod planning;

pub use config::Config;
pub use core::{Batch, Task, TaskGraph, TaskId, TaskStatus};
pub use error::{Error, Result};
pub use planner::{PlanOutput, Planner};
