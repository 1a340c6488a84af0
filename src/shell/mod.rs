//! Shell parsing and process execution.
//!
//! This module turns a line of input into a [`CommandDescriptor`] and runs it
//! with the [`Engine`], which forks children, wires pipes and redirections,
//! and waits for them to finish.

pub mod command;
pub mod engine;
pub mod parser;
pub mod reader;
pub mod redirect;

pub use command::{ArgVector, CommandDescriptor, OutputMode, OutputTarget, Strategy};
pub use engine::{Engine, Outcome};
pub use parser::{parse_line, ParsedLine};
pub use reader::LineReader;

#[cfg(test)]
static PROCESS_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Serializes tests that fork or move the test process's own standard streams.
#[cfg(test)]
pub(crate) fn serial() -> std::sync::MutexGuard<'static, ()> {
    PROCESS_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
