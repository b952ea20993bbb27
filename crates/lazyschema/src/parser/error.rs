//! Parse error types for expression templates.

use thiserror::Error;

/// An error that occurred during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A syntax error with location information.
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// Unexpected end of input, typically an unterminated `${`.
    #[error("unexpected end of input at {line}:{column}")]
    UnexpectedEof { line: usize, column: usize },
}
