//! Integration test suite for taskgraph.
//!
//! These tests run the full pipeline from a requirements document and an
//! on-disk source tree to a task graph, batches and conflict report.
//!
//! # Test Categories
//!
//! - `pipeline_e2e`: Full planning runs against fixture projects
//! - `graph_properties`: Ordering invariants over many task sets
//! - `execution`: Status overlays and failure propagation on a plan

mod fixtures;

mod execution;
mod graph_properties;
mod pipeline_e2e;
