//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::shell::reader::DEFAULT_MAX_LINE_LEN;

pub const DEFAULT_PROMPT: &str = "myshell-% ";

/// Command-line arguments for `myshell`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "myshell",
    version,
    about = "A small shell: one or two commands, a pipe, and < > >> redirection.",
    long_about = None
)]
pub struct CliArgs {
    /// Run this line once and exit instead of starting the interactive loop.
    #[arg(value_name = "LINE")]
    pub line: Option<String>,

    /// Trace file to append to.
    ///
    /// Default: `logs/myshell.<timestamp>.log` next to the executable.
    #[arg(long, value_name = "PATH", env = "MYSHELL_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MYSHELL_LOG` (an env-filter directive) or `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Prompt printed before each line in interactive mode.
    #[arg(long, value_name = "TEXT", default_value = DEFAULT_PROMPT)]
    pub prompt: String,

    /// Longest accepted input line, in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_LINE_LEN)]
    pub max_line_len: usize,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
