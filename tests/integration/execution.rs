//! Driving a plan the way an external executor would.

use std::collections::HashSet;

use taskgraph::analysis::MemorySourceTree;
use taskgraph::core::{TaskId, TaskStatus};
use taskgraph::{Planner, TaskGraph};

use crate::fixtures::{id, TestProject, TODO_REQUIREMENTS};

fn todo_plan() -> TaskGraph {
    let project = TestProject::todo_service();
    Planner::default()
        .plan(&project.document(TODO_REQUIREMENTS), &project.tree())
        .unwrap()
        .graph
}

fn ready_ids(graph: &TaskGraph, completed: &HashSet<TaskId>) -> Vec<String> {
    let mut ready: Vec<String> = graph
        .ready_tasks(completed)
        .iter()
        .map(|t| t.id.to_string())
        .collect();
    ready.sort();
    ready
}

#[test]
fn test_sequential_execution_drains_graph() {
    let graph = todo_plan();
    let mut completed: HashSet<TaskId> = HashSet::new();
    let mut rounds = 0;

    while !graph.all_complete(&completed) {
        let ready = graph.ready_tasks(&completed);
        assert!(!ready.is_empty(), "graph stalled with work remaining");
        let ids: Vec<TaskId> = ready.iter().map(|t| t.id.clone()).collect();
        completed.extend(ids);
        rounds += 1;
    }

    assert_eq!(rounds, graph.batches().unwrap().len());
}

#[test]
fn test_first_round_matches_first_batch() {
    let graph = todo_plan();
    let first = &graph.batches().unwrap()[0];
    let expected: Vec<String> = first.task_ids.iter().map(|t| t.to_string()).collect();
    assert_eq!(ready_ids(&graph, &HashSet::new()), expected);
}

#[test]
fn test_failed_models_block_downstream() {
    let graph = todo_plan();
    let graph = graph
        .with_status(&id("TASK-001"), TaskStatus::Completed)
        .unwrap()
        .with_status(&id("TASK-002"), TaskStatus::Failed)
        .unwrap();

    let blocked = graph.blocked_by(&HashSet::from([id("TASK-002")]));
    assert!(blocked.contains(&id("TASK-003")));
    assert!(blocked.contains(&id("TASK-004")));
    assert!(blocked.contains(&id("TASK-006")));
    assert!(!blocked.contains(&id("TASK-001")));
    assert!(!blocked.contains(&id("TASK-007")));

    let propagated = graph.propagate_failures();
    let status = |s: &str| propagated.get_task(&id(s)).unwrap().status;
    assert_eq!(status("TASK-001"), TaskStatus::Completed);
    assert_eq!(status("TASK-002"), TaskStatus::Failed);
    assert_eq!(status("TASK-005"), TaskStatus::Blocked);
    assert_eq!(status("TASK-007"), TaskStatus::Pending);

    // the input graph is untouched
    assert_eq!(graph.get_task(&id("TASK-005")).unwrap().status, TaskStatus::Pending);
}

#[test]
fn test_independent_tasks_unaffected_by_failure() {
    let graph = Planner::default()
        .plan_text(
            "## Docs\n- README refresh\n\n## Models\n- ORM model for users\n",
            &MemorySourceTree::new(),
        )
        .unwrap()
        .graph;

    let failed = graph
        .with_status(&id("TASK-002"), TaskStatus::Failed)
        .unwrap()
        .propagate_failures();
    assert_eq!(failed.get_task(&id("TASK-001")).unwrap().status, TaskStatus::Pending);
    assert_eq!(ready_ids(&failed, &HashSet::new()), vec!["TASK-001", "TASK-002"]);
}
