//! File contention analysis.
//!
//! Risk is classified purely by how many tasks write a file, whether or not
//! the graph already orders those tasks.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use crate::config::RiskThresholds;
use crate::core::{Task, TaskGraph, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Classify a contender count against the thresholds.
    pub fn classify(contenders: usize, thresholds: &RiskThresholds) -> Self {
        if contenders >= thresholds.critical {
            RiskLevel::Critical
        } else if contenders >= thresholds.high {
            RiskLevel::High
        } else if contenders >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictEntry {
    pub risk_level: RiskLevel,
    pub task_ids: BTreeSet<TaskId>,
}

/// Two tasks that write the same file with no path between them in the
/// graph, so an executor may run them at the same time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnorderedWriters {
    pub file: String,
    pub first: TaskId,
    pub second: TaskId,
}

/// Per-file contention, keyed by file path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConflictReport {
    pub entries: BTreeMap<String, ConflictEntry>,
}

impl ConflictReport {
    /// Collect the writers of every file touched by at least one task.
    pub fn analyze<'a, I>(tasks: I, thresholds: &RiskThresholds) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut writers: BTreeMap<String, BTreeSet<TaskId>> = BTreeMap::new();
        for task in tasks {
            for file in &task.target_files {
                writers
                    .entry(file.clone())
                    .or_default()
                    .insert(task.id.clone());
            }
        }

        let entries = writers
            .into_iter()
            .map(|(file, task_ids)| {
                let risk_level = RiskLevel::classify(task_ids.len(), thresholds);
                (
                    file,
                    ConflictEntry {
                        risk_level,
                        task_ids,
                    },
                )
            })
            .collect();

        Self { entries }
    }

    pub fn get(&self, file: &str) -> Option<&ConflictEntry> {
        self.entries.get(file)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Files written by more than one task.
    pub fn contended(&self) -> impl Iterator<Item = (&String, &ConflictEntry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.task_ids.len() > 1)
    }

    /// Entries by descending risk, then descending contender count, then path.
    pub fn ranked(&self) -> Vec<(&String, &ConflictEntry)> {
        let mut ranked: Vec<_> = self.entries.iter().collect();
        ranked.sort_by(|(file_a, a), (file_b, b)| {
            b.risk_level
                .cmp(&a.risk_level)
                .then_with(|| b.task_ids.len().cmp(&a.task_ids.len()))
                .then_with(|| file_a.cmp(file_b))
        });
        ranked
    }

    /// Pairs of writers of the same file that the graph leaves unordered.
    pub fn unordered_writers(&self, graph: &TaskGraph) -> Vec<UnorderedWriters> {
        let mut pairs = Vec::new();
        for (file, entry) in self.contended() {
            let ids: Vec<&TaskId> = entry.task_ids.iter().collect();
            for (i, first) in ids.iter().enumerate() {
                for second in &ids[i + 1..] {
                    if !graph.depends_on(first, second) && !graph.depends_on(second, first) {
                        pairs.push(UnorderedWriters {
                            file: file.clone(),
                            first: (*first).clone(),
                            second: (*second).clone(),
                        });
                    }
                }
            }
        }
        pairs
    }

    /// Human-readable report grouped by risk level.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut current: Option<RiskLevel> = None;

        for (file, entry) in self.ranked() {
            if current != Some(entry.risk_level) {
                if current.is_some() {
                    out.push('\n');
                }
                let _ = writeln!(out, "[{}]", entry.risk_level.to_string().to_uppercase());
                current = Some(entry.risk_level);
            }
            let ids: Vec<&str> = entry.task_ids.iter().map(TaskId::as_str).collect();
            let _ = writeln!(
                out,
                "  {} ({} tasks): {}",
                file,
                entry.task_ids.len(),
                ids.join(", ")
            );
        }

        out
    }
}
