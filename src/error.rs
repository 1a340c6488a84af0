//! Error types shared across the shell.
//!
//! Each layer has its own small error enum (redirection, parsing, line input);
//! `ShellError` gathers them for callers that deal with more than one layer.
//! The binary edge (`main`, `App::run`) works with `anyhow::Result` on top.

use std::path::PathBuf;

use thiserror::Error;

/// Failures of the redirection manager.
#[derive(Error, Debug)]
pub enum RedirectError {
    /// The target file could not be opened (missing, no permission, ...).
    #[error("Could not open file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Saving a duplicate of the standard stream failed.
    #[error("Could not save {slot}: {source}")]
    Save {
        slot: &'static str,
        #[source]
        source: nix::Error,
    },

    /// Placing the new descriptor onto the standard stream failed.
    #[error("Could not overlay descriptor onto {slot}: {source}")]
    Overlay {
        slot: &'static str,
        #[source]
        source: nix::Error,
    },
}

/// Syntax errors in a single input line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing file name after '{0}'")]
    MissingTarget(&'static str),

    #[error("unexpected '{found}' after '{operator}'")]
    UnexpectedOperator {
        operator: &'static str,
        found: String,
    },

    #[error("only two commands may be connected with '|'")]
    TooManyStages,

    #[error("missing command on the {0} side of '|'")]
    EmptyStage(&'static str),

    #[error("redirection without a command")]
    MissingCommand,
}

/// Failures while reading a line of input.
#[derive(Error, Debug)]
pub enum LineError {
    #[error("input line longer than {max} bytes was discarded")]
    TooLong { max: usize },

    #[error("input is not valid UTF-8")]
    InvalidUtf8,

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-wide error taxonomy.
#[derive(Error, Debug)]
pub enum ShellError {
    /// Process or pipe creation failed.
    #[error("{what} failed: {source}")]
    Resource {
        what: &'static str,
        #[source]
        source: nix::Error,
    },

    #[error(transparent)]
    Redirect(#[from] RedirectError),

    /// The target program could not be located or invoked.
    #[error("could not execute \"{program}\": {source}")]
    Exec {
        program: String,
        #[source]
        source: nix::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Input(#[from] LineError),
}
