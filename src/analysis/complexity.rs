//! Per-file size and structure metrics.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::imports::parse_python;
use super::tree::SourceTree;

/// Block statements that add a nesting level. `elif`/`else` clauses stay at
/// the level of their `if`.
const NESTING_KINDS: &[&str] = &[
    "if_statement",
    "for_statement",
    "while_statement",
    "with_statement",
    "try_statement",
];

const IMPORT_KINDS: &[&str] = &[
    "import_statement",
    "import_from_statement",
    "future_import_statement",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complexity {
    pub file: String,
    /// Newline-separated segments, so a trailing newline counts as a line.
    pub lines_of_code: usize,
    /// Function and method definitions, `async def` included.
    pub functions: usize,
    pub classes: usize,
    /// Import statements, resolvable or not.
    pub imports: usize,
    pub max_nesting_depth: usize,
}

/// Metrics for `file`, or `None` when it is missing, undecodable or does
/// not parse.
pub fn analyze_complexity(tree: &dyn SourceTree, file: &str) -> Option<Complexity> {
    let source = String::from_utf8(tree.read(file).ok()?).ok()?;
    let Some(parsed) = parse_python(&source) else {
        debug!(file, "source failed to parse, no complexity metrics");
        return None;
    };

    let mut complexity = Complexity {
        file: file.to_string(),
        lines_of_code: source.split('\n').count(),
        ..Complexity::default()
    };

    let mut stack = vec![(parsed.root_node(), 0usize)];
    while let Some((node, depth)) = stack.pop() {
        let kind = node.kind();
        let depth = if NESTING_KINDS.contains(&kind) {
            depth + 1
        } else {
            depth
        };
        complexity.max_nesting_depth = complexity.max_nesting_depth.max(depth);

        match kind {
            "function_definition" => complexity.functions += 1,
            "class_definition" => complexity.classes += 1,
            k if IMPORT_KINDS.contains(&k) => complexity.imports += 1,
            _ => {}
        }

        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                stack.push((child, depth));
            }
        }
    }

    Some(complexity)
}
