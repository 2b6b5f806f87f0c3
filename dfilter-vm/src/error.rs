//! Compilation error types.

use thiserror::Error;

/// Any error produced while compiling a filter expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Syntax-level rejection, with the byte offset the scanner or grammar
/// stopped at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError { message: message.into(), position }
    }
}

/// Semantic rejection. Carries the user-facing message; the checker stops at
/// the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TypeError(pub String);

impl From<dfilter_types::ValueError> for TypeError {
    fn from(e: dfilter_types::ValueError) -> Self {
        TypeError(e.to_string())
    }
}
