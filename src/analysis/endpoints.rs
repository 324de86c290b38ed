//! Route extraction from decorator-style web handlers.
//!
//! Matches `@router.get("/path")`-style decorators. This is a textual scan,
//! not a parse, so it also works on files that do not parse cleanly.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::tree::SourceTree;

static ROUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@\w+\.(get|post|put|delete|patch)\(\s*["']([^"']+)["']"#).unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub method: String,
    pub path: String,
    pub file: String,
}

/// Endpoints declared in `file`, in source order.
///
/// Missing or undecodable files yield an empty list.
pub fn extract_endpoints(tree: &dyn SourceTree, file: &str) -> Vec<Endpoint> {
    let Ok(bytes) = tree.read(file) else {
        return Vec::new();
    };
    let Ok(source) = String::from_utf8(bytes) else {
        return Vec::new();
    };

    ROUTE_RE
        .captures_iter(&source)
        .map(|caps| Endpoint {
            method: caps[1].to_uppercase(),
            path: caps[2].to_string(),
            file: file.to_string(),
        })
        .collect()
}
