//! Task dependency resolution.
//!
//! Edges come from three sources, added in this order:
//! 1. same-file sequencing: a later task depends on every earlier task that
//!    writes one of its files (acyclic because ids strictly increase)
//! 2. layer ordering between tasks whose files are related
//! 3. static imports between files owned by different tasks
//!
//! Layer and import edges that would close a cycle are skipped and reported
//! as [`RejectedEdge`]s, so the returned graph is always acyclic.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use crate::analysis::{detect_cycles, FileEdge, ImportCycle};
use crate::config::Config;
use crate::core::{DependencyType, Task, TaskGraph, TaskId};
use crate::Result;

/// A candidate dependency that was not inserted because it would have
/// closed a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedEdge {
    /// The task that would have had to finish first.
    pub from: TaskId,
    /// The task that would have gained the dependency.
    pub to: TaskId,
    pub reason: DependencyType,
}

/// Result of resolving a task set against the import graph.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub graph: TaskGraph,
    /// Cycles among the tasks' target files. Advisory only.
    pub import_cycles: Vec<ImportCycle>,
    pub rejected_edges: Vec<RejectedEdge>,
}

/// Kinds of file that take part in the file relation between tasks.
#[derive(Debug, Default, Clone, Copy)]
struct FileKinds {
    models: bool,
    schemas: bool,
    database: bool,
    auth_utility: bool,
    auth_router: bool,
    router: bool,
}

impl FileKinds {
    fn of(task: &Task) -> Self {
        let mut kinds = Self::default();
        for file in &task.target_files {
            kinds.models |= file.contains("models.py");
            kinds.schemas |= file.contains("schemas.py");
            kinds.database |= file.contains("database.py");
            kinds.auth_utility |= file.contains("auth.py") && !file.contains("routers");
            kinds.auth_router |= file.contains("routers/auth.py");
            kinds.router |= file.contains("routers/");
        }
        kinds
    }

    /// One direction of the relation: `self` holds the supporting file,
    /// `other` the file built on top of it.
    fn supports(&self, other: &FileKinds) -> bool {
        (self.models && other.schemas)
            || (self.database && (other.models || other.schemas))
            || (self.auth_utility && other.auth_router)
            || (self.schemas && other.router)
    }
}

/// Whether two tasks' files are coupled: a shared file, or one of the known
/// supporting pairs in either direction.
pub fn file_related(a: &Task, b: &Task) -> bool {
    if a.target_files.iter().any(|file| b.touches(file)) {
        return true;
    }
    let (kinds_a, kinds_b) = (FileKinds::of(a), FileKinds::of(b));
    kinds_a.supports(&kinds_b) || kinds_b.supports(&kinds_a)
}

pub struct GraphResolver<'a> {
    config: &'a Config,
}

impl<'a> GraphResolver<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Layer of a task: the highest layer among its target files.
    pub fn task_layer(&self, task: &Task) -> u32 {
        task.target_files
            .iter()
            .map(|file| self.config.file_layer(file))
            .max()
            .unwrap_or(0)
    }

    /// Build the dependency graph for `tasks`.
    ///
    /// Dependencies already listed on the tasks are discarded; the graph is
    /// rebuilt from the rules alone. `file_edges` is the import graph of the
    /// source tree.
    ///
    /// # Errors
    /// Fails on duplicate task ids.
    pub fn resolve(&self, tasks: Vec<Task>, file_edges: &[FileEdge]) -> Result<Resolution> {
        let mut graph = TaskGraph::new();
        for task in tasks {
            graph.add_task(task)?;
        }
        let tasks: Vec<Task> = graph.all_tasks().into_iter().cloned().collect();
        let mut rejected = Vec::new();

        let same_file = self.add_same_file_edges(&mut graph, &tasks)?;
        let layer = self.add_layer_edges(&mut graph, &tasks, &mut rejected)?;
        let imports = self.add_import_edges(&mut graph, &tasks, file_edges, &mut rejected)?;

        let target_files: BTreeSet<&str> = tasks
            .iter()
            .flat_map(|task| task.target_files.iter().map(String::as_str))
            .collect();
        let local_edges: Vec<FileEdge> = file_edges
            .iter()
            .filter(|edge| {
                target_files.contains(edge.from.as_str()) && target_files.contains(edge.to.as_str())
            })
            .cloned()
            .collect();
        let import_cycles = detect_cycles(&local_edges);

        info!(
            tasks = graph.task_count(),
            same_file,
            layer,
            imports,
            rejected = rejected.len(),
            cycles = import_cycles.len(),
            "resolved task graph"
        );

        Ok(Resolution {
            graph,
            import_cycles,
            rejected_edges: rejected,
        })
    }

    fn add_same_file_edges(&self, graph: &mut TaskGraph, tasks: &[Task]) -> Result<usize> {
        let mut writers: BTreeMap<&str, Vec<&Task>> = BTreeMap::new();
        for task in tasks {
            for file in &task.target_files {
                writers.entry(file.as_str()).or_default().push(task);
            }
        }

        let mut added = 0;
        for (file, mut owners) in writers {
            if owners.len() < 2 {
                continue;
            }
            owners.sort_by(|a, b| {
                a.id.sequence_number()
                    .cmp(&b.id.sequence_number())
                    .then_with(|| a.id.cmp(&b.id))
            });
            for (i, later) in owners.iter().enumerate() {
                for earlier in &owners[..i] {
                    if !earlier.id.is_earlier_than(&later.id) {
                        continue;
                    }
                    let reason = DependencyType::SameFile {
                        files: vec![file.to_string()],
                    };
                    // Id order is a total order, so these edges cannot form
                    // a cycle among themselves.
                    if graph.add_dependency(&earlier.id, &later.id, reason)? {
                        added += 1;
                    }
                }
            }
        }
        debug!(added, "same-file edges");
        Ok(added)
    }

    fn add_layer_edges(
        &self,
        graph: &mut TaskGraph,
        tasks: &[Task],
        rejected: &mut Vec<RejectedEdge>,
    ) -> Result<usize> {
        let layers: Vec<u32> = tasks.iter().map(|task| self.task_layer(task)).collect();

        let mut added = 0;
        for (i, upper) in tasks.iter().enumerate() {
            for (j, lower) in tasks.iter().enumerate() {
                if layers[j] >= layers[i] || !file_related(upper, lower) {
                    continue;
                }
                let reason = DependencyType::Layer {
                    from_layer: layers[j],
                    to_layer: layers[i],
                };
                if insert_guarded(graph, &lower.id, &upper.id, reason, rejected)? {
                    added += 1;
                }
            }
        }
        debug!(added, "layer edges");
        Ok(added)
    }

    fn add_import_edges(
        &self,
        graph: &mut TaskGraph,
        tasks: &[Task],
        file_edges: &[FileEdge],
        rejected: &mut Vec<RejectedEdge>,
    ) -> Result<usize> {
        let mut owners: BTreeMap<&str, Vec<&TaskId>> = BTreeMap::new();
        for task in tasks {
            for file in &task.target_files {
                owners.entry(file.as_str()).or_default().push(&task.id);
            }
        }
        let mut imports: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for edge in file_edges {
            imports
                .entry(edge.from.as_str())
                .or_default()
                .insert(edge.to.as_str());
        }

        let mut added = 0;
        for task in tasks {
            // owning task -> imported files it provides
            let mut providers: BTreeMap<&TaskId, Vec<String>> = BTreeMap::new();
            for file in &task.target_files {
                let Some(deps) = imports.get(file.as_str()) else {
                    continue;
                };
                for dep in deps {
                    for owner in owners.get(dep).into_iter().flatten() {
                        if *owner != &task.id {
                            providers.entry(owner).or_default().push(dep.to_string());
                        }
                    }
                }
            }

            for (owner, mut files) in providers {
                files.sort();
                files.dedup();
                let reason = DependencyType::StaticImport { files };
                if insert_guarded(graph, owner, &task.id, reason, rejected)? {
                    added += 1;
                }
            }
        }
        debug!(added, "static import edges");
        Ok(added)
    }
}

/// Add an edge unless it would close a cycle, in which case it is recorded
/// in `rejected`. Other errors still propagate.
fn insert_guarded(
    graph: &mut TaskGraph,
    from: &TaskId,
    to: &TaskId,
    reason: DependencyType,
    rejected: &mut Vec<RejectedEdge>,
) -> Result<bool> {
    if graph.depends_on(from, to) {
        warn!(%from, %to, %reason, "skipping dependency that would close a cycle");
        rejected.push(RejectedEdge {
            from: from.clone(),
            to: to.clone(),
            reason,
        });
        return Ok(false);
    }
    graph.add_dependency(from, to, reason)
}
