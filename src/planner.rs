//! End-to-end planning: requirements document + source tree → task graph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

use crate::analysis::{ImportCycle, ImportExtractor, SourceTree};
use crate::config::Config;
use crate::core::{Batch, Task, TaskGraph, TaskIdSequence};
use crate::graph::{ConflictReport, GraphResolver, RejectedEdge};
use crate::planning::{sectionize, synthesize};
use crate::{Error, Result};

/// Everything a planning run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutput {
    pub graph: TaskGraph,
    pub batches: Vec<Batch>,
    pub conflicts: ConflictReport,
    pub import_cycles: Vec<ImportCycle>,
    pub rejected_edges: Vec<RejectedEdge>,
}

impl PlanOutput {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

/// Read a requirements document, mapping a missing file to
/// [`Error::RequirementsNotFound`].
pub fn read_document(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::RequirementsNotFound(path.to_path_buf()),
        _ => Error::Io(e),
    })
}

pub struct Planner {
    config: Config,
}

impl Planner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Plan from a requirements document on disk.
    ///
    /// # Errors
    /// Returns [`Error::RequirementsNotFound`] when the document does not
    /// exist; no partial output is produced.
    pub fn plan(&self, document: &Path, tree: &dyn SourceTree) -> Result<PlanOutput> {
        let text = read_document(document)?;
        info!(document = %document.display(), "planning from requirements");
        self.plan_text(&text, tree)
    }

    /// Plan from requirements text already in memory.
    pub fn plan_text(&self, text: &str, tree: &dyn SourceTree) -> Result<PlanOutput> {
        let tasks = self.tasks_from_text(text);

        let extractor = ImportExtractor::new(&self.config.source);
        let target_files: BTreeSet<&str> = tasks
            .iter()
            .flat_map(|task| task.target_files.iter().map(String::as_str))
            .collect();
        let file_edges = extractor.file_edges(tree, target_files);
        debug!(edges = file_edges.len(), "extracted file edges");

        let conflicts = ConflictReport::analyze(&tasks, &self.config.risk);
        let resolution = GraphResolver::new(&self.config).resolve(tasks, &file_edges)?;
        let batches = resolution.graph.batches()?;

        info!(
            tasks = resolution.graph.task_count(),
            batches = batches.len(),
            contended = conflicts.contended().count(),
            "plan complete"
        );

        Ok(PlanOutput {
            graph: resolution.graph,
            batches,
            conflicts,
            import_cycles: resolution.import_cycles,
            rejected_edges: resolution.rejected_edges,
        })
    }

    /// Sectionize and synthesize only, with a fresh id sequence.
    pub fn tasks_from_text(&self, text: &str) -> Vec<Task> {
        let sections = sectionize(text);
        let mut ids = TaskIdSequence::new(&self.config.ids.prefix, self.config.ids.width);
        synthesize(&sections, &mut ids)
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
