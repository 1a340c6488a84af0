//! Utility modules for common functionality.
//!
//! Currently only the trace sink setup lives here.

pub mod logger;
