//! Ordering invariants checked over many generated task sets.

use std::collections::{BTreeSet, HashSet};

use taskgraph::analysis::{FileEdge, MemorySourceTree};
use taskgraph::config::RiskThresholds;
use taskgraph::graph::{ConflictReport, GraphResolver, RiskLevel};
use taskgraph::planning::sectionize;
use taskgraph::{Config, Planner};

use crate::fixtures::{assert_batches_valid, random_tasks, Lcg, FILE_POOL, TODO_REQUIREMENTS};

const ROUNDS: u64 = 200;

/// Random import edges between pool files, cycles included.
fn random_edges(rng: &mut Lcg) -> Vec<FileEdge> {
    (0..rng.next(12))
        .map(|_| FileEdge {
            from: FILE_POOL[rng.next(FILE_POOL.len())].to_string(),
            to: FILE_POOL[rng.next(FILE_POOL.len())].to_string(),
        })
        .collect()
}

#[test]
fn test_resolved_graphs_are_acyclic() {
    let config = Config::default();
    let resolver = GraphResolver::new(&config);

    for seed in 0..ROUNDS {
        let mut rng = Lcg::new(seed);
        let count = 1 + rng.next(15);
        let tasks = random_tasks(&mut rng, count);
        let edges = random_edges(&mut rng);

        let resolution = resolver.resolve(tasks, &edges).unwrap();
        let order = resolution
            .graph
            .topological_order()
            .unwrap_or_else(|e| panic!("seed {}: {}", seed, e));

        let unique: HashSet<_> = order.iter().map(|t| &t.id).collect();
        assert_eq!(unique.len(), count, "seed {}: order covers every task once", seed);
        assert_batches_valid(&resolution.graph);
    }
}

#[test]
fn test_same_file_writers_follow_id_order() {
    let config = Config::default();
    let resolver = GraphResolver::new(&config);

    for seed in 0..ROUNDS {
        let mut rng = Lcg::new(seed);
        let count = 2 + rng.next(12);
        let tasks = random_tasks(&mut rng, count);
        let edges = random_edges(&mut rng);
        let resolution = resolver.resolve(tasks.clone(), &edges).unwrap();
        let graph = &resolution.graph;

        for earlier in &tasks {
            for later in &tasks {
                let shares = earlier.target_files.iter().any(|f| later.touches(f));
                if shares && earlier.id.is_earlier_than(&later.id) {
                    assert!(
                        graph.depends_on(&later.id, &earlier.id),
                        "seed {}: {} should follow {}",
                        seed,
                        later.id,
                        earlier.id
                    );
                }
            }
        }
    }
}

#[test]
fn test_batches_have_no_internal_edges() {
    let config = Config::default();
    let resolver = GraphResolver::new(&config);

    for seed in 0..ROUNDS {
        let mut rng = Lcg::new(seed);
        let count = 1 + rng.next(15);
        let tasks = random_tasks(&mut rng, count);
        let resolution = resolver.resolve(tasks, &random_edges(&mut rng)).unwrap();
        let graph = &resolution.graph;

        for batch in graph.batches().unwrap() {
            for a in &batch.task_ids {
                for b in &batch.task_ids {
                    assert!(!graph.has_dependency(a, b), "seed {}: {} -> {} in one batch", seed, a, b);
                }
            }
        }
    }
}

#[test]
fn test_conflict_counts_match_writers() {
    let thresholds = RiskThresholds::default();
    for seed in 0..ROUNDS {
        let mut rng = Lcg::new(seed);
        let count = 1 + rng.next(10);
        let tasks = random_tasks(&mut rng, count);
        let report = ConflictReport::analyze(&tasks, &thresholds);

        for (file, entry) in &report.entries {
            let writers: BTreeSet<_> = tasks
                .iter()
                .filter(|t| t.touches(file))
                .map(|t| t.id.clone())
                .collect();
            assert_eq!(entry.task_ids, writers);
            assert_eq!(entry.risk_level, RiskLevel::classify(writers.len(), &thresholds));
        }
    }
}

#[test]
fn test_planning_is_deterministic() {
    assert_eq!(sectionize(TODO_REQUIREMENTS), sectionize(TODO_REQUIREMENTS));

    let planner = Planner::default();
    let tree = MemorySourceTree::new()
        .with_file("backend/models.py", "from .database import Base\n")
        .with_file("backend/database.py", "");
    let first = planner.plan_text(TODO_REQUIREMENTS, &tree).unwrap();
    let second = planner.plan_text(TODO_REQUIREMENTS, &tree).unwrap();

    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}
