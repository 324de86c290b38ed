//! Logging setup for the taskgraph binary.
//!
//! Log levels:
//! - WARN: Recoverable surprises (import cycles, skipped dependencies)
//! - INFO: Stage summaries (plan complete, graph resolved)
//! - DEBUG: Per-stage detail (dropped sections, edge counts, skipped files)
//!
//! Debug mode can be enabled with `--debug` flag or `TASKGRAPH_DEBUG=1` env
//! var. `RUST_LOG` takes precedence over both when set.

use std::fs::File;
use std::sync::Mutex;

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::EnvFilter;

pub const DEBUG_ENV: &str = "TASKGRAPH_DEBUG";

/// Wall-clock timestamps in local time, millisecond precision.
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Initialize logging to ~/.taskgraph/taskgraph.log with explicit debug
/// mode setting.
///
/// Logging is silently disabled when the log file cannot be created.
pub fn init_with_debug(debug: bool) {
    let debug_enabled = debug || debug_requested(std::env::var(DEBUG_ENV).ok().as_deref());

    let Some(dir) = dirs::home_dir().map(|h| h.join(".taskgraph")) else {
        return;
    };
    let _ = std::fs::create_dir_all(&dir);
    let path = dir.join("taskgraph.log");
    // Truncate file on startup
    let Ok(file) = File::create(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug_enabled)));

    // A subscriber may already be installed (tests, embedding callers)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(LocalTime)
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init();
}

fn debug_requested(value: Option<&str>) -> bool {
    value
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn default_directive(debug: bool) -> &'static str {
    if debug {
        "taskgraph=debug"
    } else {
        "taskgraph=info"
    }
}
