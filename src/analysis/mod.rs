//! Static analysis of the source tree.
//!
//! Import extraction produces file-level edges, which feed cycle detection,
//! import statistics, and static task dependencies in the graph resolver.
//! Complexity metrics and endpoint extraction are per-file reports.

pub mod complexity;
pub mod cycles;
pub mod endpoints;
pub mod imports;
pub mod stats;
pub mod tree;

pub use complexity::{analyze_complexity, Complexity};
pub use cycles::{detect_cycles, ImportCycle};
pub use endpoints::{extract_endpoints, Endpoint};
pub use imports::{parse_imports, FileEdge, ImportExtractor, ModuleRef};
pub use stats::{file_organization, FileCount, ImportStats};
pub use tree::{FsSourceTree, MemorySourceTree, SourceTree};
