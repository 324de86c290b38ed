//! End-to-end planning runs.
//!
//! Each test writes a requirements document and (usually) a source tree to
//! a temporary directory and runs the whole pipeline.

use taskgraph::analysis::{ImportExtractor, MemorySourceTree, SourceTree};
use taskgraph::core::{DependencyType, Priority, Role};
use taskgraph::graph::RiskLevel;
use taskgraph::{Config, Error, PlanOutput, Planner};

use crate::fixtures::{assert_batches_valid, id, ids, TestProject, CONTENDED_REQUIREMENTS, TODO_REQUIREMENTS};

// ============================================================================
// Full pipeline
// ============================================================================

#[test]
fn test_todo_service_plan() {
    let project = TestProject::todo_service();
    let document = project.document(TODO_REQUIREMENTS);

    let output = Planner::default()
        .plan(&document, &project.tree())
        .expect("plan should succeed");
    let graph = &output.graph;

    assert_eq!(
        ids(&graph.all_tasks()),
        vec!["TASK-001", "TASK-002", "TASK-003", "TASK-004", "TASK-005", "TASK-006", "TASK-007"]
    );

    let todos = graph.get_task(&id("TASK-004")).unwrap();
    assert!(todos.touches("backend/routers/todos.py"));
    assert_eq!(todos.assigned_role, Role::Backend);

    let tests = graph.get_task(&id("TASK-006")).unwrap();
    assert!(tests.touches("tests/test_integration.py"));
    assert_eq!(tests.assigned_role, Role::Testing);

    let docs = graph.get_task(&id("TASK-007")).unwrap();
    assert_eq!(docs.assigned_role, Role::Documentation);
    assert_eq!(docs.priority, Priority::Low);

    assert!(output.import_cycles.is_empty());
    assert!(output.rejected_edges.is_empty());
    assert_batches_valid(graph);
}

#[test]
fn test_layer_and_import_edges() {
    let project = TestProject::todo_service();
    let output = Planner::default()
        .plan(&project.document(TODO_REQUIREMENTS), &project.tree())
        .unwrap();
    let graph = &output.graph;

    // database -> models -> schemas -> router by layer
    assert!(matches!(
        graph.get_dependency(&id("TASK-001"), &id("TASK-002")),
        Some(DependencyType::Layer { from_layer: 1, to_layer: 2 })
    ));
    assert!(graph.has_dependency(&id("TASK-002"), &id("TASK-003")));
    assert!(graph.has_dependency(&id("TASK-003"), &id("TASK-004")));

    // router imports models; main imports the router; tests import main
    assert!(matches!(
        graph.get_dependency(&id("TASK-002"), &id("TASK-004")),
        Some(DependencyType::StaticImport { .. })
    ));
    assert!(matches!(
        graph.get_dependency(&id("TASK-004"), &id("TASK-005")),
        Some(DependencyType::StaticImport { .. })
    ));
    assert!(graph.has_dependency(&id("TASK-005"), &id("TASK-006")));

    // the README stands alone
    assert!(graph.get_task(&id("TASK-007")).unwrap().dependencies.is_empty());
}

#[test]
fn test_todo_service_batches() {
    let project = TestProject::todo_service();
    let output = Planner::default()
        .plan(&project.document(TODO_REQUIREMENTS), &project.tree())
        .unwrap();

    let batches: Vec<Vec<String>> = output
        .batches
        .iter()
        .map(|b| b.task_ids.iter().map(|t| t.to_string()).collect())
        .collect();
    assert_eq!(
        batches,
        vec![
            vec!["TASK-001", "TASK-007"],
            vec!["TASK-002"],
            vec!["TASK-003"],
            vec!["TASK-004"],
            vec!["TASK-005"],
            vec!["TASK-006"],
        ]
    );
}

#[test]
fn test_without_source_tree_only_rules_apply() {
    let output = Planner::default()
        .plan_text(TODO_REQUIREMENTS, &MemorySourceTree::new())
        .unwrap();
    let graph = &output.graph;

    assert_eq!(graph.task_count(), 7);
    assert!(!graph.has_dependency(&id("TASK-004"), &id("TASK-005")));
    assert!(graph.has_dependency(&id("TASK-003"), &id("TASK-004")));
}

#[test]
fn test_plan_json_output() {
    let project = TestProject::todo_service();
    let output = Planner::default()
        .plan(&project.document(TODO_REQUIREMENTS), &project.tree())
        .unwrap();

    let path = project.path.join("out/plan.json");
    output.write_json(&path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

    let first = &json["graph"][0];
    assert_eq!(first["id"], "TASK-001");
    assert_eq!(first["assigned_role"], "backend");
    assert_eq!(first["priority"], "high");
    assert_eq!(first["target_files"][0], "backend/database.py");
    assert!(first["dependencies"].as_array().unwrap().is_empty());
    assert_eq!(json["graph"][1]["dependencies"][0], "TASK-001");
    assert_eq!(json["conflicts"]["backend/main.py"]["risk_level"], "low");

    let loaded = PlanOutput::read_json(&path).unwrap();
    assert_eq!(loaded.batches, output.batches);
}

// ============================================================================
// Documents
// ============================================================================

#[test]
fn test_overview_only_document() {
    let project = TestProject::new();
    let document = project.document("# Project\n\n## Overview\nJust prose here.\n");
    let output = Planner::default().plan(&document, &project.tree()).unwrap();

    assert!(output.graph.is_empty());
    assert!(output.batches.is_empty());
    assert!(output.conflicts.is_empty());
}

#[test]
fn test_user_authentication_section() {
    let output = Planner::default()
        .plan_text(
            "## User Authentication\n- POST /auth/login エンドポイントを実装\n",
            &MemorySourceTree::new(),
        )
        .unwrap();

    let task = output.graph.get_task(&id("TASK-001")).unwrap();
    assert!(task.touches("backend/routers/auth.py"));
    assert_eq!(task.assigned_role, Role::Backend);
    assert_eq!(task.priority, Priority::High);
}

#[test]
fn test_missing_document_is_fatal() {
    let project = TestProject::new();
    let missing = project.path.join("nope.md");
    let err = Planner::default()
        .plan(&missing, &project.tree())
        .unwrap_err();
    assert!(matches!(err, Error::RequirementsNotFound(ref p) if p == &missing));
}

#[test]
fn test_project_config_changes_ids() {
    let project = TestProject::todo_service();
    project.write("taskgraph.toml", "[ids]\nprefix = \"REQ\"\nwidth = 4\n");
    let config = Config::load_for(&project.path).unwrap();

    let output = Planner::new(config)
        .plan(&project.document(TODO_REQUIREMENTS), &project.tree())
        .unwrap();
    assert!(output.graph.get_task(&id("REQ-0001")).is_some());
    assert_batches_valid(&output.graph);
}

// ============================================================================
// Conflicts and diagnostics
// ============================================================================

#[test]
fn test_contended_entry_point() {
    let output = Planner::default()
        .plan_text(CONTENDED_REQUIREMENTS, &MemorySourceTree::new())
        .unwrap();

    let entry = output.conflicts.get("backend/main.py").unwrap();
    assert_eq!(entry.risk_level, RiskLevel::Critical);
    assert_eq!(entry.task_ids.len(), 4);

    // same-file sequencing leaves no unordered pair
    assert!(output.conflicts.unordered_writers(&output.graph).is_empty());
    assert_eq!(output.batches.len(), 4);
}

#[test]
fn test_import_cycle_is_reported_not_fatal() {
    let project = TestProject::new();
    project.write("backend/models.py", "from . import schemas\n");
    project.write("backend/schemas.py", "from . import models\n");
    let document = project.document(
        "## Data Models\n- ORM model classes\n\n## Schemas\n- Pydantic validation\n",
    );

    let output = Planner::default().plan(&document, &project.tree()).unwrap();

    assert_eq!(output.import_cycles.len(), 1);
    assert_eq!(
        output.import_cycles[0].files,
        vec!["backend/models.py", "backend/schemas.py"]
    );
    assert!(output.graph.topological_order().is_ok());
    assert_batches_valid(&output.graph);
}

#[test]
fn test_unresolvable_and_broken_sources() {
    let project = TestProject::new();
    project.write("app/service.py", "import requests\nfrom numpy import array\n");
    project.write("app/broken.py", "def (:\n");
    std::fs::write(project.path.join("app/binary.py"), [0xffu8, 0xfe, 0x00]).unwrap();

    let tree = project.tree();
    let extractor = ImportExtractor::default();
    assert!(extractor.file_dependencies(&tree, "app/service.py").is_empty());
    assert!(extractor.file_dependencies(&tree, "app/broken.py").is_empty());
    assert!(extractor.file_dependencies(&tree, "app/binary.py").is_empty());
    assert!(extractor.file_dependencies(&tree, "app/missing.py").is_empty());
    assert_eq!(tree.files().len(), 3);
}
