//! Import statistics and file organization summaries.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::cycles::{detect_cycles, ImportCycle};
use super::imports::ImportExtractor;
use super::tree::SourceTree;
use crate::core::task::Task;

/// How many entries the ranked lists keep.
pub const TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCount {
    pub file: String,
    pub count: usize,
}

/// Import statistics over a set of files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub total_files: usize,
    pub total_imports: usize,
    /// Files imported by the most other files.
    pub most_imported_files: Vec<FileCount>,
    /// Files with the most resolved imports.
    pub files_with_most_imports: Vec<FileCount>,
    pub circular_imports: Vec<ImportCycle>,
}

impl ImportStats {
    /// Analyze `files` (deduplicated) within `tree`.
    ///
    /// Cycles are only searched among the analyzed files themselves.
    pub fn collect<'a, I>(extractor: &ImportExtractor, tree: &dyn SourceTree, files: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let files: BTreeSet<&str> = files.into_iter().collect();
        let mut imports: BTreeMap<String, usize> = BTreeMap::new();
        let mut imported: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_imports = 0;

        for file in &files {
            let deps = extractor.file_dependencies(tree, file);
            total_imports += deps.len();
            imports.insert(file.to_string(), deps.len());
            for dep in deps {
                *imported.entry(dep).or_default() += 1;
            }
        }

        let edges: Vec<_> = extractor
            .file_edges(tree, files.iter().copied())
            .into_iter()
            .filter(|edge| files.contains(edge.to.as_str()))
            .collect();

        Self {
            total_files: files.len(),
            total_imports,
            most_imported_files: top_n(imported),
            files_with_most_imports: top_n(imports),
            circular_imports: detect_cycles(&edges),
        }
    }
}

/// Highest counts first, ties broken by path.
fn top_n(counts: BTreeMap<String, usize>) -> Vec<FileCount> {
    let mut ranked: Vec<FileCount> = counts
        .into_iter()
        .map(|(file, count)| FileCount { file, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.file.cmp(&b.file)));
    ranked.truncate(TOP_N);
    ranked
}

/// Target files grouped by directory; top-level files go under `root`.
pub fn file_organization(tasks: &[Task]) -> BTreeMap<String, Vec<String>> {
    let mut organization: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for file in tasks.iter().flat_map(|task| task.target_files.iter()) {
        let directory = match file.rsplit_once('/') {
            Some((dir, _)) => dir.to_string(),
            None => "root".to_string(),
        };
        organization.entry(directory).or_default().insert(file.clone());
    }
    organization
        .into_iter()
        .map(|(dir, files)| (dir, files.into_iter().collect()))
        .collect()
}
