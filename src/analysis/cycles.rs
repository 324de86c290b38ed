//! Import cycle detection over file edges.
//!
//! Depth-first search with an explicit stack and a per-node colour stored
//! in an indexed array: unvisited, on the current path, or fully resolved.
//! Reaching a node that is still on the path closes a cycle.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::warn;

use super::imports::FileEdge;

/// Files forming one import cycle, starting at the cycle's entry point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportCycle {
    pub files: Vec<String>,
}

impl std::fmt::Display for ImportCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.files.join(" -> "))?;
        if let Some(first) = self.files.first() {
            write!(f, " -> {}", first)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Unvisited,
    OnPath,
    Done,
}

/// Find cycles among the files named in `edges`.
///
/// Traversal starts from files in sorted order and follows neighbours in
/// sorted order, so the result is deterministic.
pub fn detect_cycles(edges: &[FileEdge]) -> Vec<ImportCycle> {
    let nodes: Vec<&str> = edges
        .iter()
        .flat_map(|e| [e.from.as_str(), e.to.as_str()])
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index: BTreeMap<&str, usize> = nodes.iter().enumerate().map(|(i, n)| (*n, i)).collect();

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for edge in edges {
        adjacency[index[edge.from.as_str()]].push(index[edge.to.as_str()]);
    }
    for neighbours in &mut adjacency {
        neighbours.sort_unstable();
        neighbours.dedup();
    }

    let mut color = vec![Color::Unvisited; nodes.len()];
    let mut cycles = Vec::new();
    let mut seen: HashSet<Vec<usize>> = HashSet::new();

    for start in 0..nodes.len() {
        if color[start] != Color::Unvisited {
            continue;
        }
        // (node, index of the next neighbour to visit)
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        color[start] = Color::OnPath;

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            let Some(&neighbour) = adjacency[node].get(next) else {
                color[node] = Color::Done;
                stack.pop();
                continue;
            };
            frame.1 += 1;

            match color[neighbour] {
                Color::Unvisited => {
                    color[neighbour] = Color::OnPath;
                    stack.push((neighbour, 0));
                }
                Color::OnPath => {
                    let entry = stack
                        .iter()
                        .position(|(n, _)| *n == neighbour)
                        .unwrap_or(0);
                    let members: Vec<usize> = stack[entry..].iter().map(|(n, _)| *n).collect();
                    if seen.insert(members.clone()) {
                        let cycle = ImportCycle {
                            files: members.iter().map(|&n| nodes[n].to_string()).collect(),
                        };
                        warn!(cycle = %cycle, "import cycle detected");
                        cycles.push(cycle);
                    }
                }
                Color::Done => {}
            }
        }
    }

    cycles
}
