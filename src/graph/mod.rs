//! Dependency resolution and contention analysis over synthesized tasks.

pub mod conflicts;
pub mod resolver;

pub use conflicts::{ConflictEntry, ConflictReport, RiskLevel, UnorderedWriters};
pub use resolver::{file_related, GraphResolver, RejectedEdge, Resolution};
