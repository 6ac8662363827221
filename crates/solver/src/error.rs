use std::fmt;
use std::path::PathBuf;

use crate::config::SolverKind;

/// Errors from locating, running, or reading back an external solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// No usable binary for the solver kind at the given path (or
    /// anywhere on the search path, for auto-detection).
    NotFound(SolverKind, PathBuf),
    /// The solver process failed to start, accept input, or exit.
    Process(String),
    /// The solver ran but produced output we could not parse.
    Parse(String),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::NotFound(kind, path) => {
                write!(f, "{kind} binary not found at {}", path.display())
            }
            SolverError::Process(msg) => write!(f, "solver process error: {msg}"),
            SolverError::Parse(msg) => write!(f, "unparseable solver output: {msg}"),
        }
    }
}

impl std::error::Error for SolverError {}
