//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - Materializing source trees in a temporary directory
//! - Sample requirements documents
//! - Pseudo-random task sets for property checks

use std::collections::HashSet;
use std::path::PathBuf;
use tempfile::TempDir;

use taskgraph::analysis::FsSourceTree;
use taskgraph::core::{Task, TaskGraph, TaskId};

/// A source tree in a temporary directory.
pub struct TestProject {
    /// The temporary directory containing the project.
    pub temp_dir: TempDir,
    /// Path to the project root.
    pub path: PathBuf,
}

impl TestProject {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().to_path_buf();
        Self { temp_dir, path }
    }

    /// The todo service matching [`TODO_REQUIREMENTS`], with its imports.
    pub fn todo_service() -> Self {
        let project = Self::new();
        project.write("backend/__init__.py", "");
        project.write("backend/database.py", "import sqlalchemy\n\nBase = object\n");
        project.write("backend/models.py", "from .database import Base\n\nclass Todo(Base): ...\n");
        project.write("backend/schemas.py", "from pydantic import BaseModel\n");
        project.write("backend/routers/__init__.py", "");
        project.write(
            "backend/routers/todos.py",
            "from .. import schemas\nfrom ..models import Todo\n\n@router.get(\"/todos\")\ndef list_todos(): ...\n",
        );
        project.write(
            "backend/main.py",
            "from fastapi import FastAPI\nfrom .routers import todos\n",
        );
        project.write("tests/test_integration.py", "from backend.main import app\n");
        project
    }

    /// Write a file relative to the project root, creating directories.
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.path.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directory");
        }
        std::fs::write(path, contents).expect("Failed to write file");
    }

    /// Write a requirements document and return its path.
    pub fn document(&self, contents: &str) -> PathBuf {
        let path = self.path.join("requirements.md");
        std::fs::write(&path, contents).expect("Failed to write document");
        path
    }

    pub fn tree(&self) -> FsSourceTree {
        FsSourceTree::new(&self.path)
    }
}

/// Requirements for a small todo service. Yields seven tasks:
///
/// | id       | file                     | layer |
/// |----------|--------------------------|-------|
/// | TASK-001 | backend/database.py      | 1     |
/// | TASK-002 | backend/models.py        | 2     |
/// | TASK-003 | backend/schemas.py       | 3     |
/// | TASK-004 | backend/routers/todos.py | 7     |
/// | TASK-005 | backend/main.py          | 8     |
/// | TASK-006 | tests/test_integration.py| 9     |
/// | TASK-007 | README.md                | 10    |
pub const TODO_REQUIREMENTS: &str = "\
# Todo API Requirements

## Overview
This service manages personal todo items.

```
## Not a section
- not a criterion
```

## Database Setup
- SQLAlchemy engine and session factory
- SQLite database file

## Data Models
- User model with email and display name
- Todo model with title, done flag and owner

## Request Schemas
- Pydantic schemas for todo create and update

## Todo Endpoints
- GET /todos lists the current user's todos
- POST /todos creates a todo

## Application Entry
- FastAPI app with CORS enabled

## Tests
- Integration tests for the todo workflow

## Documentation
- README with setup steps
";

/// Four sections that all land on the application entry point.
pub const CONTENDED_REQUIREMENTS: &str = "\
## Startup
- FastAPI application factory

## Cross-origin
- CORS origins from settings

## Health
- FastAPI health probe

## Shutdown
- FastAPI shutdown hook closes CORS cache
";

pub fn ids(tasks: &[&Task]) -> Vec<String> {
    tasks.iter().map(|t| t.id.to_string()).collect()
}

pub fn id(s: &str) -> TaskId {
    TaskId::from(s)
}

/// Small linear congruential generator; deterministic across runs.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

pub const FILE_POOL: &[&str] = &[
    "requirements.txt",
    "backend/database.py",
    "backend/models.py",
    "backend/schemas.py",
    "backend/auth.py",
    "backend/dependencies.py",
    "backend/routers/auth.py",
    "backend/routers/tasks.py",
    "backend/main.py",
    "tests/test_integration.py",
    "README.md",
];

/// `count` tasks, each writing one to three files from [`FILE_POOL`].
pub fn random_tasks(rng: &mut Lcg, count: usize) -> Vec<Task> {
    (1..=count)
        .map(|n| {
            let files: Vec<&str> = (0..1 + rng.next(3))
                .map(|_| FILE_POOL[rng.next(FILE_POOL.len())])
                .collect();
            Task::new(TaskId::new(format!("TASK-{:03}", n)), "generated", "")
                .with_target_files(files)
        })
        .collect()
}

/// Every dependency of a batch member sits in an earlier batch.
pub fn assert_batches_valid(graph: &TaskGraph) {
    let batches = graph.batches().expect("graph must batch");
    let mut done: HashSet<TaskId> = HashSet::new();
    let mut seen = 0;
    for batch in &batches {
        for task_id in &batch.task_ids {
            let task = graph.get_task(task_id).expect("batched task exists");
            for dep in &task.dependencies {
                assert!(
                    done.contains(dep),
                    "{} in batch {} depends on {} which is not in an earlier batch",
                    task_id,
                    batch.index,
                    dep
                );
            }
        }
        done.extend(batch.task_ids.iter().cloned());
        seen += batch.len();
    }
    assert_eq!(seen, graph.task_count(), "every task appears in exactly one batch");
}
