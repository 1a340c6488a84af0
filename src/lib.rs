//! myshell - a small Unix shell built around a fork/exec execution engine
//!
//! This library provides the pieces behind the `myshell` binary:
//! - Parsing a line into a command descriptor (one or two commands, a pipe,
//!   `<`, `>` and `>>` redirection)
//! - Redirecting standard streams with save/restore semantics
//! - Executing descriptors as child processes and waiting for them
//! - The interactive session and its trace sink
//!
//! # Example
//!
//! ```no_run
//! use myshell::shell::{parse_line, Engine, ParsedLine};
//!
//! let engine = Engine::new();
//! if let Ok(ParsedLine::Command(descriptor)) = parse_line("ls -l | wc -l > count.txt") {
//!     let outcome = engine.execute(&descriptor);
//!     println!("pipeline {}", outcome);
//! }
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod shell;
pub mod utils;

// Re-export commonly used types
pub use app::App;
pub use error::ShellError;
pub use shell::{CommandDescriptor, Engine, Outcome, Strategy};
