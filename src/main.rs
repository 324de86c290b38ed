use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;

use taskgraph::analysis::{
    analyze_complexity, extract_endpoints, FsSourceTree, ImportExtractor, ImportStats, SourceTree,
};
use taskgraph::config::PROJECT_CONFIG_FILE;
use taskgraph::graph::{ConflictReport, RiskLevel};
use taskgraph::planner::read_document;
use taskgraph::{Config, PlanOutput, Planner, Result};

/// taskgraph - requirements document to ordered task graph
#[derive(Parser, Debug)]
#[command(name = "taskgraph")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    TASKGRAPH_DEBUG=1     Enable debug logging (alternative to --debug)\n    RUST_LOG=<filter>     Override the log filter"
)]
pub struct Cli {
    /// Enable debug logging (writes to ~/.taskgraph/taskgraph.log)
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Build the task graph, batches and conflict report
    Plan {
        /// Requirements document
        document: PathBuf,

        /// Source tree root used for import analysis and config lookup
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Also write the full plan as JSON to this path
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Show only the file conflict report
    Conflicts {
        /// Requirements document
        document: PathBuf,

        #[arg(long, default_value = ".")]
        root: PathBuf,
    },

    /// Import statistics for source files (all source files if none given)
    Imports {
        #[arg(long, default_value = ".")]
        root: PathBuf,

        files: Vec<String>,
    },

    /// HTTP endpoints declared in source files (all source files if none given)
    Endpoints {
        #[arg(long, default_value = ".")]
        root: PathBuf,

        files: Vec<String>,
    },

    /// Size and nesting metrics for source files (all source files if none given)
    Complexity {
        #[arg(long, default_value = ".")]
        root: PathBuf,

        files: Vec<String>,
    },

    /// Print the effective configuration
    Config {
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Also write it to taskgraph.toml in the root
        #[arg(long)]
        write: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    taskgraph::log::init_with_debug(cli.debug);
    info!(command = ?cli.command, "taskgraph starting");

    match cli.command {
        Command::Plan {
            document,
            root,
            json,
        } => run_plan(&document, &root, json.as_deref()),
        Command::Conflicts { document, root } => run_conflicts(&document, &root),
        Command::Imports { root, files } => run_imports(&root, files),
        Command::Endpoints { root, files } => run_endpoints(&root, files),
        Command::Complexity { root, files } => run_complexity(&root, files),
        Command::Config { root, write } => run_config(&root, write),
    }
}

fn run_plan(document: &Path, root: &Path, json: Option<&Path>) -> Result<()> {
    let config = Config::load_for(root)?;
    let tree = FsSourceTree::new(root);
    let planner = Planner::new(config);
    let output = planner.plan(document, &tree)?;

    print_plan(&output);

    if let Some(path) = json {
        output.write_json(path)?;
        println!();
        println!("Plan written to {}", path.display());
    }
    Ok(())
}

fn print_plan(output: &PlanOutput) {
    let graph = &output.graph;
    println!(
        "{} tasks, {} dependencies, {} batches",
        graph.task_count(),
        graph.dependency_count(),
        output.batches.len()
    );

    for batch in &output.batches {
        println!();
        println!("Batch {}:", batch.index);
        for id in &batch.task_ids {
            let Some(task) = graph.get_task(id) else {
                continue;
            };
            let deps: Vec<&str> = task.dependencies.iter().map(|d| d.as_str()).collect();
            println!(
                "  {} [{}/{}] {}",
                task.id, task.priority, task.assigned_role, task.title
            );
            if !deps.is_empty() {
                println!("      after: {}", deps.join(", "));
            }
        }
    }

    if !output.import_cycles.is_empty() {
        println!();
        println!("Import cycles:");
        for cycle in &output.import_cycles {
            println!("  {}", cycle);
        }
    }

    if !output.rejected_edges.is_empty() {
        println!();
        println!("Skipped dependencies (would create a cycle):");
        for edge in &output.rejected_edges {
            println!("  {} -> {} ({})", edge.from, edge.to, edge.reason);
        }
    }

    let unordered = output.conflicts.unordered_writers(graph);
    if !unordered.is_empty() {
        println!();
        println!("Unordered writers (must be serialized by the executor):");
        for pair in &unordered {
            println!("  {}: {} / {}", pair.file, pair.first, pair.second);
        }
    }

    println!();
    print_conflicts(&output.conflicts);
}

fn print_conflicts(report: &ConflictReport) {
    println!("File conflicts:");
    for line in report.render().lines() {
        println!("{}", colorize(line));
    }
}

/// Color risk headings for terminal output.
fn colorize(line: &str) -> String {
    let color = match line.trim_start_matches('[').trim_end_matches(']') {
        "CRITICAL" => Some(RiskLevel::Critical),
        "HIGH" => Some(RiskLevel::High),
        "MEDIUM" => Some(RiskLevel::Medium),
        "LOW" => Some(RiskLevel::Low),
        _ => None,
    }
    .map(|level| match level {
        RiskLevel::Critical => "\x1b[31m", // Red
        RiskLevel::High => "\x1b[33m",     // Yellow
        RiskLevel::Medium => "\x1b[34m",   // Blue
        RiskLevel::Low => "\x1b[90m",      // Gray
    });

    match color {
        Some(code) => format!("{}{}\x1b[0m", code, line),
        None => line.to_string(),
    }
}

fn run_conflicts(document: &Path, root: &Path) -> Result<()> {
    let config = Config::load_for(root)?;
    let text = read_document(document)?;
    let planner = Planner::new(config);
    let tasks = planner.tasks_from_text(&text);
    let report = ConflictReport::analyze(&tasks, &planner.config().risk);
    print_conflicts(&report);
    Ok(())
}

/// The given files, or every source file under the root when none are given.
fn source_files(tree: &FsSourceTree, extractor: &ImportExtractor, files: Vec<String>) -> Vec<String> {
    if !files.is_empty() {
        return files;
    }
    tree.files()
        .into_iter()
        .filter(|f| extractor.is_source_file(f))
        .collect()
}

fn run_imports(root: &Path, files: Vec<String>) -> Result<()> {
    let config = Config::load_for(root)?;
    let tree = FsSourceTree::new(root);
    let extractor = ImportExtractor::new(&config.source);
    let files = source_files(&tree, &extractor, files);

    let stats = ImportStats::collect(&extractor, &tree, files.iter().map(String::as_str));
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn run_endpoints(root: &Path, files: Vec<String>) -> Result<()> {
    let config = Config::load_for(root)?;
    let tree = FsSourceTree::new(root);
    let extractor = ImportExtractor::new(&config.source);

    for file in source_files(&tree, &extractor, files) {
        for endpoint in extract_endpoints(&tree, &file) {
            println!("{:<7} {}  ({})", endpoint.method, endpoint.path, endpoint.file);
        }
    }
    Ok(())
}

fn run_complexity(root: &Path, files: Vec<String>) -> Result<()> {
    let config = Config::load_for(root)?;
    let tree = FsSourceTree::new(root);
    let extractor = ImportExtractor::new(&config.source);

    let metrics: Vec<_> = source_files(&tree, &extractor, files)
        .iter()
        .filter_map(|file| analyze_complexity(&tree, file))
        .collect();
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}

fn run_config(root: &Path, write: bool) -> Result<()> {
    let config = Config::load_for(root)?;
    print!("{}", toml::to_string_pretty(&config)?);
    if write {
        let path = root.join(PROJECT_CONFIG_FILE);
        config.save_to(&path)?;
        println!();
        println!("Config written to {}", path.display());
    }
    Ok(())
}
