//! Logging infrastructure for cachelab.
//!
//! Structured logging on top of the `tracing` ecosystem:
//!
//! - JSON lines written to `~/.cachelab/logs/cachelab.log` (rotated daily)
//! - Compact, human-readable console output on stderr
//! - `RUST_LOG` overrides the default filter
//!
//! ## Example
//!
//! ```no_run
//! use cachelab_core::logging;
//!
//! let _guard = logging::init_logging(None, false).expect("logging init");
//!
//! tracing::info!("cachelab started");
//! tracing::debug!(model = "global.anthropic.claude-sonnet-4-5-20250929-v1:0", "pricing lookup");
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::error::{LabError, Result};

/// Log file name inside the log directory.
pub const LOG_FILE_NAME: &str = "cachelab.log";

/// Guard that must be held to ensure log flushing on shutdown.
///
/// Dropping it flushes pending entries to the log file.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the cachelab logging system.
///
/// Sets up a JSON file layer in `log_dir` (default `~/.cachelab/logs/`) and a
/// console layer on stderr. With `verbose` the default level is DEBUG,
/// otherwise INFO.
///
/// The returned [`LogGuard`] must outlive all logging.
pub fn init_logging(log_dir: Option<PathBuf>, verbose: bool) -> Result<LogGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };

    std::fs::create_dir_all(&log_dir).map_err(|e| LabError::DirectoryCreation {
        path: log_dir.clone(),
        source: e,
    })?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_span_list(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(verbose)
        .with_line_number(verbose)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::debug!(log_dir = %log_dir.display(), verbose, "logging initialized");

    Ok(LogGuard {
        _file_guard: Some(file_guard),
    })
}

/// Filter directive used when `RUST_LOG` is unset.
///
/// Covers the binary and both library crates.
pub fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("cachelab={level},cachelab_core={level},cachelab_cost={level}")
}

/// Initialize minimal console-only logging for testing.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Get the default log directory path.
///
/// Returns `~/.cachelab/logs/`
pub fn default_log_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| LabError::internal("HOME environment variable not set"))?;

    Ok(PathBuf::from(home).join(".cachelab").join("logs"))
}

/// Log a cost computation under the `cachelab::cost` target.
///
/// # Example
///
/// ```ignore
/// log_cost_event!(model = "sonnet", total_tokens = 1000, cost_usd = 0.003);
/// ```
#[macro_export]
macro_rules! log_cost_event {
    ($($field:tt)*) => {
        tracing::info!(
            target: "cachelab::cost",
            $($field)*,
            "cost event"
        )
    };
}
