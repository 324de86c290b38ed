//! Keyword rule tables for task inference.
//!
//! Target files, priority and role are inferred from ordered tables
//! rather than branching code, so each table can be inspected and
//! extended on its own. Matching is case-insensitive substring search, so
//! `UserModel` and `OAuth` match `model` and `auth`. Terms listed in
//! [`WORD_START_TERMS`] must begin a word, so `orm` does not fire inside
//! `information`.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::core::task::{Priority, Role};

/// HTTP methods and words meaning "endpoint"/"API". Case-sensitive.
///
/// Method boundaries are ASCII-only so `GETで` still reads as a method.
static ENDPOINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u:\b)(?:POST|GET|PUT|DELETE|PATCH)(?-u:\b)|API|エンドポイント|(?i:endpoint)")
        .unwrap()
});

/// Terms that occur inside unrelated words (`information`, `platform`).
pub const WORD_START_TERMS: &[&str] = &["orm"];

/// First path-like token, e.g. `/projects/{id}` yields `projects`.
static RESOURCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/([\w-]+)").unwrap());

const ENDPOINT_WORDS: &[&str] = &["エンドポイント", "endpoint"];
const AUTH_ROUTE_TERMS: &[&str] = &[
    "/auth",
    "認証",
    "ログイン",
    "登録",
    "login",
    "authentication",
    "register",
    "signup",
];
const TASK_TERMS: &[&str] = &["タスク", "task"];
const AUTH_TEST_TERMS: &[&str] = &["認証", "auth"];
const API_TERMS: &[&str] = &["api", "エンドポイント", "endpoint"];

pub const AUTH_ROUTER: &str = "backend/routers/auth.py";
pub const TASKS_ROUTER: &str = "backend/routers/tasks.py";
pub const AUTH_UTILITY: &str = "backend/auth.py";
pub const AUTH_TESTS: &str = "tests/test_auth_endpoints.py";
pub const TASK_TESTS: &str = "tests/test_tasks_endpoints.py";
pub const INTEGRATION_TESTS: &str = "tests/test_integration.py";

/// Title and criteria of a section, prepared for matching.
#[derive(Debug, Clone)]
pub struct InferenceText {
    raw: String,
    lower: String,
}

impl InferenceText {
    pub fn new(title: &str, criteria: &[String]) -> Self {
        let mut raw = title.to_string();
        for criterion in criteria {
            raw.push(' ');
            raw.push_str(criterion);
        }
        let lower = raw.to_lowercase();
        Self { raw, lower }
    }

    pub fn has_any(&self, terms: &[&str]) -> bool {
        terms.iter().any(|term| contains_term(&self.lower, term))
    }

    fn reads_as_endpoint(&self) -> bool {
        ENDPOINT_RE.is_match(&self.raw)
    }
}

/// Whether `haystack` contains `term`, honouring [`WORD_START_TERMS`].
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if !WORD_START_TERMS.contains(&term) {
        return haystack.contains(term);
    }
    haystack.match_indices(term).any(|(at, _)| {
        haystack[..at]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_ascii_alphanumeric())
    })
}

/// What fires a file rule.
#[derive(Debug, Clone, Copy)]
pub enum Trigger {
    /// The text reads as an HTTP endpoint description.
    Endpoint,
    /// Any of the listed terms occurs.
    Keywords(&'static [&'static str]),
}

/// Which file a fired rule contributes.
#[derive(Debug, Clone, Copy)]
pub enum Target {
    Fixed(&'static str),
    /// Auth router, tasks router, or a router named after the first path.
    Router,
    /// Auth utilities, unless the text reads as an endpoint.
    AuthUtility,
    /// One of the three test modules.
    TestSuite,
}

impl Target {
    fn resolve(&self, text: &InferenceText) -> Option<String> {
        match self {
            Target::Fixed(file) => Some((*file).to_string()),
            Target::Router => {
                if text.has_any(AUTH_ROUTE_TERMS) {
                    Some(AUTH_ROUTER.to_string())
                } else if text.raw.contains("/task")
                    || (text.has_any(TASK_TERMS) && text.has_any(ENDPOINT_WORDS))
                {
                    Some(TASKS_ROUTER.to_string())
                } else {
                    RESOURCE_RE
                        .captures(&text.raw)
                        .map(|caps| format!("backend/routers/{}.py", caps[1].to_lowercase()))
                }
            }
            Target::AuthUtility => {
                if text.has_any(ENDPOINT_WORDS) {
                    None
                } else {
                    Some(AUTH_UTILITY.to_string())
                }
            }
            Target::TestSuite => {
                if text.has_any(AUTH_TEST_TERMS) {
                    Some(AUTH_TESTS.to_string())
                } else if text.has_any(TASK_TERMS) && text.has_any(API_TERMS) {
                    Some(TASK_TESTS.to_string())
                } else {
                    Some(INTEGRATION_TESTS.to_string())
                }
            }
        }
    }
}

/// One row of the target-file table.
#[derive(Debug, Clone, Copy)]
pub struct FileRule {
    pub name: &'static str,
    pub trigger: Trigger,
    pub target: Target,
}

impl FileRule {
    pub fn apply(&self, text: &InferenceText) -> Option<String> {
        let fired = match self.trigger {
            Trigger::Endpoint => text.reads_as_endpoint(),
            Trigger::Keywords(terms) => text.has_any(terms),
        };
        if fired {
            self.target.resolve(text)
        } else {
            None
        }
    }
}

pub static FILE_RULES: &[FileRule] = &[
    FileRule {
        name: "router",
        trigger: Trigger::Endpoint,
        target: Target::Router,
    },
    FileRule {
        name: "models",
        trigger: Trigger::Keywords(&["モデル", "model", "データモデル", "orm"]),
        target: Target::Fixed("backend/models.py"),
    },
    FileRule {
        name: "database",
        trigger: Trigger::Keywords(&["データベース", "database", "db設定", "sqlalchemy"]),
        target: Target::Fixed("backend/database.py"),
    },
    FileRule {
        name: "schemas",
        trigger: Trigger::Keywords(&["スキーマ", "schema", "pydantic", "バリデーション", "validation"]),
        target: Target::Fixed("backend/schemas.py"),
    },
    FileRule {
        name: "auth_utility",
        trigger: Trigger::Keywords(&[
            "jwt",
            "トークン",
            "パスワード",
            "ハッシュ",
            "bcrypt",
            "token",
            "password",
            "hash",
        ]),
        target: Target::AuthUtility,
    },
    FileRule {
        name: "dependencies",
        trigger: Trigger::Keywords(&[
            "ミドルウェア",
            "middleware",
            "依存関係",
            "dependencies",
            "dependency injection",
        ]),
        target: Target::Fixed("backend/dependencies.py"),
    },
    FileRule {
        name: "main",
        trigger: Trigger::Keywords(&["fastapi", "アプリケーション設定", "main.py", "cors"]),
        target: Target::Fixed("backend/main.py"),
    },
    FileRule {
        name: "tests",
        trigger: Trigger::Keywords(&["テスト", "test"]),
        target: Target::TestSuite,
    },
    FileRule {
        name: "manifest",
        trigger: Trigger::Keywords(&["requirements.txt", "依存パッケージ", "パッケージ", "package list"]),
        target: Target::Fixed("requirements.txt"),
    },
    FileRule {
        name: "readme",
        trigger: Trigger::Keywords(&["readme", "ドキュメント", "セットアップ手順", "documentation"]),
        target: Target::Fixed("README.md"),
    },
];

/// Checked in order; the first table with a matching term wins.
pub static PRIORITY_RULES: &[(Priority, &[&str])] = &[
    (
        Priority::High,
        &[
            "データベース",
            "database",
            "モデル",
            "model",
            "認証",
            "auth",
            "requirements",
            "manifest",
            "セキュリティ",
            "security",
        ],
    ),
    (
        Priority::Low,
        &["readme", "ドキュメント", "documentation", "削除", "delete"],
    ),
];

/// Path markers checked in order against the joined target files.
pub static ROLE_RULES: &[(&str, Role)] = &[
    ("tests/", Role::Testing),
    ("backend/", Role::Backend),
    ("frontend/", Role::Frontend),
    ("README", Role::Documentation),
    (".md", Role::Documentation),
];

/// Union of every matching file rule, sorted and deduplicated.
pub fn infer_target_files(text: &InferenceText) -> BTreeSet<String> {
    FILE_RULES.iter().filter_map(|rule| rule.apply(text)).collect()
}

pub fn infer_priority(title: &str) -> Priority {
    let lower = title.to_lowercase();
    PRIORITY_RULES
        .iter()
        .find(|(_, terms)| terms.iter().any(|term| contains_term(&lower, term)))
        .map(|(priority, _)| *priority)
        .unwrap_or_default()
}

pub fn infer_role(target_files: &BTreeSet<String>) -> Role {
    let joined = target_files
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    ROLE_RULES
        .iter()
        .find(|(marker, _)| joined.contains(marker))
        .map(|(_, role)| *role)
        .unwrap_or_default()
}
