//! Runtime configuration assembled from the command line and environment.

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::cli::{CliArgs, LogLevel};

/// Where and how much to trace.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Explicit trace file; `None` picks a timestamped file.
    pub file: Option<PathBuf>,
    /// Explicit level; `None` defers to `MYSHELL_LOG`.
    pub level: Option<LogLevel>,
}

#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Line to run once (non-interactive mode).
    pub line: Option<String>,
    pub prompt: String,
    pub max_line_len: usize,
    pub log: LogConfig,
}

impl ShellConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        if args.max_line_len == 0 {
            bail!("--max-line-len must be at least 1");
        }

        Ok(Self {
            line: args.line,
            prompt: args.prompt,
            max_line_len: args.max_line_len,
            log: LogConfig {
                file: args.log_file,
                level: args.log_level,
            },
        })
    }
}
