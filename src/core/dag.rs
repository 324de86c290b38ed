//! Task graph (directed acyclic graph) for dependency management.
//!
//! This module provides the TaskGraph structure that represents task
//! dependencies as a directed acyclic graph, enabling batched parallel
//! execution of independent tasks. Edges point from the task that must
//! complete first to the task that depends on it.

use crate::core::task::{Task, TaskId, TaskStatus};
use crate::error::{Error, Result};
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use petgraph::Direction;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Why one task depends on another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum DependencyType {
    /// The dependency sits on a strictly lower layer and the two tasks'
    /// files are related.
    Layer { from_layer: u32, to_layer: u32 },
    /// Both tasks write the same files; the earlier task goes first.
    SameFile { files: Vec<String> },
    /// A file of the dependent task imports a file of the dependency.
    StaticImport { files: Vec<String> },
    /// Present in the task's dependency list when the graph was loaded.
    Declared,
}

impl std::fmt::Display for DependencyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyType::Layer {
                from_layer,
                to_layer,
            } => write!(f, "layer {} -> {}", from_layer, to_layer),
            DependencyType::SameFile { files } => write!(f, "same file: {}", files.join(", ")),
            DependencyType::StaticImport { files } => write!(f, "imports: {}", files.join(", ")),
            DependencyType::Declared => write!(f, "declared"),
        }
    }
}

/// A set of tasks with no dependency edges among them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Batch index (1-based for display)
    pub index: usize,
    /// Task ids in this batch, sorted.
    pub task_ids: Vec<TaskId>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.task_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.task_ids.is_empty()
    }
}

/// The task dependency graph.
///
/// Nodes are tasks, and edges carry the reason for the dependency. Each
/// node's `dependencies` set is kept in sync with its incoming edges.
#[derive(Clone)]
pub struct TaskGraph {
    /// The underlying directed graph.
    graph: DiGraph<Task, DependencyType>,
    /// Index mapping from TaskId to NodeIndex for fast lookups.
    task_index: HashMap<TaskId, NodeIndex>,
}

impl TaskGraph {
    /// Create a new empty TaskGraph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            task_index: HashMap::new(),
        }
    }

    /// Build a graph from tasks whose `dependencies` are already filled in,
    /// e.g. tasks loaded back from JSON.
    ///
    /// # Errors
    /// Fails on duplicate ids, unknown or self dependencies, and cycles.
    pub fn from_tasks(tasks: Vec<Task>) -> Result<Self> {
        let mut graph = Self::new();
        let mut declared = Vec::new();
        for task in tasks {
            for dep in &task.dependencies {
                declared.push((dep.clone(), task.id.clone()));
            }
            graph.add_task(task.with_dependencies([]))?;
        }
        for (from, to) in declared {
            graph.add_dependency(&from, &to, DependencyType::Declared)?;
        }
        Ok(graph)
    }

    /// Add a task to the graph.
    ///
    /// Any dependencies listed on the task are ignored; edges are only
    /// created through [`TaskGraph::add_dependency`].
    ///
    /// # Errors
    /// Returns [`Error::DuplicateTaskId`] if a task with the same id exists.
    pub fn add_task(&mut self, task: Task) -> Result<NodeIndex> {
        if self.task_index.contains_key(&task.id) {
            return Err(Error::DuplicateTaskId(task.id.to_string()));
        }

        let id = task.id.clone();
        let index = self.graph.add_node(task.with_dependencies([]));
        self.task_index.insert(id, index);
        Ok(index)
    }

    /// Add a dependency between two tasks.
    ///
    /// The dependency indicates that `from` must complete before `to` can
    /// start. Returns `Ok(false)` when the two tasks are already connected
    /// by a direct edge.
    ///
    /// # Errors
    /// Returns an error if:
    /// - `from` and `to` are the same task
    /// - Either task is not found in the graph
    /// - Adding the edge would create a cycle
    pub fn add_dependency(
        &mut self,
        from: &TaskId,
        to: &TaskId,
        dep_type: DependencyType,
    ) -> Result<bool> {
        if from == to {
            return Err(Error::SelfDependency(from.to_string()));
        }

        let from_index = self.index_of(from)?;
        let to_index = self.index_of(to)?;

        if self.graph.find_edge(from_index, to_index).is_some() {
            return Ok(false);
        }

        if has_path_connecting(&self.graph, to_index, from_index, None) {
            return Err(Error::Validation(format!(
                "Adding dependency from {} to {} would create a cycle",
                from, to
            )));
        }

        self.graph.add_edge(from_index, to_index, dep_type);
        self.graph[to_index].dependencies.insert(from.clone());
        Ok(true)
    }

    fn index_of(&self, id: &TaskId) -> Result<NodeIndex> {
        self.task_index
            .get(id)
            .copied()
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    /// Get a reference to a task by its ID.
    pub fn get_task(&self, id: &TaskId) -> Option<&Task> {
        self.task_index
            .get(id)
            .and_then(|&index| self.graph.node_weight(index))
    }

    /// Get the number of tasks in the graph.
    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of dependencies (edges) in the graph.
    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check if a direct dependency exists between two tasks.
    pub fn has_dependency(&self, from: &TaskId, to: &TaskId) -> bool {
        if let (Some(&from_idx), Some(&to_idx)) =
            (self.task_index.get(from), self.task_index.get(to))
        {
            self.graph.find_edge(from_idx, to_idx).is_some()
        } else {
            false
        }
    }

    /// Whether `task` depends on `dependency` directly or transitively.
    pub fn depends_on(&self, task: &TaskId, dependency: &TaskId) -> bool {
        match (self.task_index.get(dependency), self.task_index.get(task)) {
            (Some(&from), Some(&to)) if from != to => {
                has_path_connecting(&self.graph, from, to, None)
            }
            _ => false,
        }
    }

    /// Get the dependency type between two tasks, if one exists.
    pub fn get_dependency(&self, from: &TaskId, to: &TaskId) -> Option<&DependencyType> {
        let from_idx = self.task_index.get(from)?;
        let to_idx = self.task_index.get(to)?;
        let edge = self.graph.find_edge(*from_idx, *to_idx)?;
        self.graph.edge_weight(edge)
    }

    /// Get all tasks that the given task depends on (predecessors).
    pub fn get_dependencies(&self, id: &TaskId) -> Vec<&Task> {
        self.neighbours(id, Direction::Incoming)
    }

    /// Get all tasks that depend on the given task (successors).
    pub fn get_dependents(&self, id: &TaskId) -> Vec<&Task> {
        self.neighbours(id, Direction::Outgoing)
    }

    fn neighbours(&self, id: &TaskId, direction: Direction) -> Vec<&Task> {
        if let Some(&index) = self.task_index.get(id) {
            self.graph
                .neighbors_directed(index, direction)
                .filter_map(|neighbor| self.graph.node_weight(neighbor))
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Get all tasks in insertion order.
    pub fn all_tasks(&self) -> Vec<&Task> {
        self.graph.node_weights().collect()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    // ========== Scheduling Operations ==========

    /// Split the graph into parallel-eligible batches.
    ///
    /// Each batch holds the tasks whose dependencies are all in earlier
    /// batches. Task ids within a batch are sorted.
    ///
    /// # Errors
    /// Returns an error if no progress can be made, which only happens when
    /// the graph contains a cycle.
    pub fn batches(&self) -> Result<Vec<Batch>> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|index| {
                self.graph
                    .neighbors_directed(index, Direction::Incoming)
                    .count()
            })
            .collect();
        let mut current: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|index| in_degree[index.index()] == 0)
            .collect();
        let mut batches = Vec::new();
        let mut placed = 0;

        while !current.is_empty() {
            placed += current.len();
            let mut next = Vec::new();
            for &index in &current {
                for dependent in self.graph.neighbors_directed(index, Direction::Outgoing) {
                    in_degree[dependent.index()] -= 1;
                    if in_degree[dependent.index()] == 0 {
                        next.push(dependent);
                    }
                }
            }

            let mut task_ids: Vec<TaskId> = current
                .iter()
                .map(|&index| self.graph[index].id.clone())
                .collect();
            task_ids.sort();
            batches.push(Batch {
                index: batches.len() + 1,
                task_ids,
            });
            current = next;
        }

        if placed != self.graph.node_count() {
            return Err(Error::Validation(format!(
                "Cycle detected: {} of {} tasks could not be batched",
                self.graph.node_count() - placed,
                self.graph.node_count()
            )));
        }

        Ok(batches)
    }

    /// Get tasks in topological order (respecting dependencies).
    ///
    /// # Errors
    /// Returns an error if the graph contains a cycle (should never happen
    /// since add_dependency validates against cycles).
    pub fn topological_order(&self) -> Result<Vec<&Task>> {
        let sorted = toposort(&self.graph, None).map_err(|cycle| {
            let task_id = self
                .graph
                .node_weight(cycle.node_id())
                .map(|t| t.id.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            Error::Validation(format!("Cycle detected at task: {}", task_id))
        })?;

        Ok(sorted
            .into_iter()
            .filter_map(|index| self.graph.node_weight(index))
            .collect())
    }

    /// Get all tasks ready to execute (dependencies satisfied).
    ///
    /// A task is ready if it is not yet completed and all of its
    /// dependencies are in the completed set.
    pub fn ready_tasks<'a>(&'a self, completed: &HashSet<TaskId>) -> Vec<&'a Task> {
        self.graph
            .node_indices()
            .filter_map(|index| {
                let task = self.graph.node_weight(index)?;

                if completed.contains(&task.id) {
                    return None;
                }

                let deps_satisfied = self
                    .graph
                    .neighbors_directed(index, Direction::Incoming)
                    .all(|dep_index| completed.contains(&self.graph[dep_index].id));

                if deps_satisfied {
                    Some(task)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Tasks that transitively depend on any of the failed tasks and so
    /// may never start.
    pub fn blocked_by(&self, failed: &HashSet<TaskId>) -> BTreeSet<TaskId> {
        let mut blocked = BTreeSet::new();
        for id in failed {
            let Some(&start) = self.task_index.get(id) else {
                continue;
            };
            let mut bfs = Bfs::new(&self.graph, start);
            while let Some(index) = bfs.next(&self.graph) {
                if index != start {
                    blocked.insert(self.graph[index].id.clone());
                }
            }
        }
        blocked.retain(|id| !failed.contains(id));
        blocked
    }

    /// Return a copy of the graph with one task's status replaced.
    ///
    /// # Errors
    /// Returns [`Error::TaskNotFound`] if the task is not in the graph.
    pub fn with_status(&self, id: &TaskId, status: TaskStatus) -> Result<Self> {
        let index = self.index_of(id)?;
        let mut updated = self.clone();
        updated.graph[index].status = status;
        Ok(updated)
    }

    /// Return a copy of the graph in which every unfinished task that
    /// transitively depends on a failed task is marked blocked.
    pub fn propagate_failures(&self) -> Self {
        let failed: HashSet<TaskId> = self
            .graph
            .node_weights()
            .filter(|task| task.status == TaskStatus::Failed)
            .map(|task| task.id.clone())
            .collect();

        let mut updated = self.clone();
        for id in self.blocked_by(&failed) {
            let index = self.task_index[&id];
            let task = &mut updated.graph[index];
            if !task.is_finished() {
                task.status = TaskStatus::Blocked;
            }
        }
        updated
    }

    /// Check if all tasks in the graph are complete.
    pub fn all_complete(&self, completed: &HashSet<TaskId>) -> bool {
        self.task_index.keys().all(|id| completed.contains(id))
    }
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("tasks", &self.task_count())
            .field("dependencies", &self.dependency_count())
            .finish()
    }
}

/// Serialized as the list of tasks, each carrying its dependency ids.
impl Serialize for TaskGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.graph.node_weights())
    }
}

impl<'de> Deserialize<'de> for TaskGraph {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tasks = Vec::<Task>::deserialize(deserializer)?;
        TaskGraph::from_tasks(tasks).map_err(serde::de::Error::custom)
    }
}
