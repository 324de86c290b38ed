//! Import extraction and resolution for Python source trees.
//!
//! Each source file is parsed with tree-sitter and every `import x.y` and
//! `from .x import y` statement is resolved to a file inside the tree.
//! Unresolvable references (third-party packages, missing modules) are
//! dropped, and a file that cannot be decoded or parsed contributes no
//! dependencies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};
use tree_sitter::{Node, Parser, Tree};

use super::tree::SourceTree;
use crate::config::SourceConfig;

/// A module reference taken from one import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRef {
    /// Dotted module path without the leading dots.
    pub module: String,
    /// Number of leading dots; 0 for absolute imports.
    pub level: usize,
    /// Names listed after `import` in a `from` statement.
    pub names: Vec<String>,
}

impl ModuleRef {
    fn parse(reference: &str) -> Self {
        let module = reference.trim_start_matches('.');
        Self {
            module: module.to_string(),
            level: reference.len() - module.len(),
            names: Vec::new(),
        }
    }
}

/// `(dependent file, depended-on file)` produced by one analysis pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileEdge {
    pub from: String,
    pub to: String,
}

/// Parse `source` as Python. `None` when it does not parse cleanly.
pub(crate) fn parse_python(source: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&tree_sitter_python::LANGUAGE.into()) {
        warn!(error = %e, "failed to load python grammar");
        return None;
    }
    let tree = parser.parse(source, None)?;
    if tree.root_node().has_error() {
        return None;
    }
    Some(tree)
}

/// Parse `source` and collect its import statements.
///
/// Returns `None` when the source does not parse cleanly.
pub fn parse_imports(source: &str) -> Option<Vec<ModuleRef>> {
    let tree = parse_python(source)?;
    let root = tree.root_node();

    let bytes = source.as_bytes();
    let mut refs = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for name in node.children_by_field_name("name", &mut cursor) {
                    if let Some(module) = imported_module(&name, bytes) {
                        refs.push(ModuleRef::parse(module));
                    }
                }
            }
            "import_from_statement" => {
                let Some(module) = node
                    .child_by_field_name("module_name")
                    .and_then(|m| m.utf8_text(bytes).ok())
                else {
                    continue;
                };
                let mut reference = ModuleRef::parse(module);
                let mut cursor = node.walk();
                reference.names = node
                    .children_by_field_name("name", &mut cursor)
                    .filter_map(|name| imported_module(&name, bytes))
                    .map(str::to_string)
                    .collect();
                refs.push(reference);
            }
            _ => {
                for i in 0..node.child_count() {
                    if let Some(child) = node.child(i) {
                        stack.push(child);
                    }
                }
            }
        }
    }

    Some(refs)
}

/// Text of a `dotted_name`, or of the original name in an `aliased_import`.
fn imported_module<'a>(node: &Node, bytes: &'a [u8]) -> Option<&'a str> {
    match node.kind() {
        "dotted_name" => node.utf8_text(bytes).ok(),
        "aliased_import" => node.child_by_field_name("name")?.utf8_text(bytes).ok(),
        _ => None,
    }
}

/// Resolves import statements to files inside a [`SourceTree`].
#[derive(Debug, Clone)]
pub struct ImportExtractor {
    suffix: String,
    package_marker: String,
}

impl Default for ImportExtractor {
    fn default() -> Self {
        Self::new(&SourceConfig::default())
    }
}

impl ImportExtractor {
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            suffix: format!(".{}", config.suffix.trim_start_matches('.')),
            package_marker: config.package_marker.clone(),
        }
    }

    /// Whether `path` has the recognized source suffix.
    pub fn is_source_file(&self, path: &str) -> bool {
        path.ends_with(&self.suffix)
    }

    /// Files inside `tree` other than `path` itself that `path` imports.
    ///
    /// Non-source files, missing files, and files that fail to decode or
    /// parse all yield an empty set.
    pub fn file_dependencies(&self, tree: &dyn SourceTree, path: &str) -> BTreeSet<String> {
        if !self.is_source_file(path) || !tree.is_file(path) {
            return BTreeSet::new();
        }
        let source = match tree.read(path).map(String::from_utf8) {
            Ok(Ok(source)) => source,
            Ok(Err(_)) => {
                debug!(path, "source is not valid UTF-8, skipping");
                return BTreeSet::new();
            }
            Err(e) => {
                debug!(path, error = %e, "failed to read source, skipping");
                return BTreeSet::new();
            }
        };
        let Some(refs) = parse_imports(&source) else {
            debug!(path, "source failed to parse, skipping");
            return BTreeSet::new();
        };

        // `from . import x` in a package marker resolves the package to itself
        refs.iter()
            .flat_map(|reference| self.resolve(tree, reference, path))
            .filter(|file| file != path)
            .collect()
    }

    /// Edges for every file in `files`, sorted.
    pub fn file_edges<'a, I>(&self, tree: &dyn SourceTree, files: I) -> Vec<FileEdge>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut edges = BTreeSet::new();
        for file in files {
            for dep in self.file_dependencies(tree, file) {
                edges.insert(FileEdge {
                    from: file.to_string(),
                    to: dep,
                });
            }
        }
        edges.into_iter().collect()
    }

    /// Files a single module reference resolves to.
    ///
    /// The module itself resolves to at most one file. For `from` imports,
    /// each imported name that is itself a module adds its file too.
    pub fn resolve(
        &self,
        tree: &dyn SourceTree,
        reference: &ModuleRef,
        current_file: &str,
    ) -> Vec<String> {
        let base = if reference.level == 0 {
            String::new()
        } else {
            ancestor_dir(current_file, reference.level)
        };
        let module_path = join_path(&base, &reference.module.replace('.', "/"));
        if module_path.is_empty() && reference.level == 0 {
            return Vec::new();
        }

        let mut resolved = Vec::new();
        if let Some(file) = self.probe(tree, &module_path) {
            resolved.push(file);
        }
        for name in &reference.names {
            let submodule = join_path(&module_path, &name.replace('.', "/"));
            if let Some(file) = self.probe(tree, &submodule) {
                resolved.push(file);
            }
        }
        resolved
    }

    /// Package marker first, then the flat source file.
    fn probe(&self, tree: &dyn SourceTree, module_path: &str) -> Option<String> {
        let package = join_path(module_path, &self.package_marker);
        if tree.is_file(&package) {
            return Some(package);
        }
        if module_path.is_empty() {
            return None;
        }
        let flat = format!("{}{}", module_path, self.suffix);
        tree.is_file(&flat).then_some(flat)
    }
}

/// Directory containing `file`, walked up one level per dot beyond the
/// first. Stops at the tree root.
fn ancestor_dir(file: &str, level: usize) -> String {
    let mut dir = parent_dir(file);
    for _ in 1..level {
        dir = parent_dir(dir);
    }
    dir.to_string()
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn join_path(dir: &str, rest: &str) -> String {
    match (dir.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => dir.to_string(),
        (false, false) => format!("{}/{}", dir, rest),
    }
}
