//! Trace sink initialization.
//!
//! Every step of the shell (lines read, forks, redirections, exec failures,
//! waits) is recorded as a `tracing` event in a trace file, never on the
//! terminal. Forked children write to the same file; the writer is a plain
//! append-mode file without a background thread, so a child's lines survive
//! even though it leaves through `_exit`.
//!
//! # Configuration
//!
//! The level comes from `--log-level`, else from the `MYSHELL_LOG` environment
//! variable (any env-filter directive), else `info`:
//! - `MYSHELL_LOG=debug` - also record descriptor plumbing
//! - `MYSHELL_LOG=warn` - only failures

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::subscriber::DefaultGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

const LOG_ENV: &str = "MYSHELL_LOG";

/// Keeps the trace subscriber installed; dropping it uninstalls it.
pub struct LogGuard {
    _default: DefaultGuard,
    path: PathBuf,
}

impl LogGuard {
    /// File the trace is written to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Installs the trace subscriber for the current thread.
///
/// Forked children inherit the installation along with the thread.
pub fn init_logging(config: &LogConfig) -> Result<LogGuard> {
    let path = match &config.file {
        Some(path) => path.clone(),
        None => default_log_path(),
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .with_context(|| format!("Log path has no file name: {}", path.display()))?
        .to_string_lossy()
        .into_owned();

    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(&dir)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let file_layer = fmt::layer()
        .with_writer(appender)
        .with_ansi(false) // No ANSI colors in log files
        .with_target(true)
        .with_line_number(true);

    let env_filter = match config.level {
        Some(level) => EnvFilter::new(level.as_directive()),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let default = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .set_default();

    tracing::debug!("Logging initialized - writing to {}", path.display());

    Ok(LogGuard {
        _default: default,
        path,
    })
}

/// `logs/myshell.<timestamp>.log` next to the executable, or under the
/// current directory when the executable path is unknown.
fn default_log_path() -> PathBuf {
    let log_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("logs")))
        .unwrap_or_else(|| PathBuf::from("logs"));

    let timestamp = Local::now().format("%Y-%m-%d-%H-%M-%S");
    log_dir.join(format!("myshell.{}.log", timestamp))
}
