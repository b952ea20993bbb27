//! Error types for tree evaluation, mutation and loading.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;
use std::path::PathBuf;

use strsim::levenshtein;
use thiserror::Error;

use crate::parser::ParseError;
use crate::types::{AncestorError, PathError};

/// Errors that occur while loading a document.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File I/O error when reading the document.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The document is not valid JSON.
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    /// The document root must be a mapping.
    #[error("document root must be an object, found {found}")]
    NotAnObject { found: &'static str },
}

/// An error that occurred while evaluating a path.
///
/// Cloneable so one failed evaluation can be handed to every caller that
/// was waiting on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// A path transitively depends on itself.
    #[error("cyclic reference detected: {}", chain.join(" -> "))]
    CycleDetected { chain: Vec<String> },

    /// The evaluation chain grew deeper than the configured limit.
    #[error("maximum evaluation depth {limit} exceeded at '{path}'")]
    DepthExceeded { limit: usize, path: String },

    /// An expression referenced a path that does not exist.
    #[error("reference not found: '{path}'")]
    ReferenceNotFound { path: String },

    /// A `^` reference climbed above the document root.
    #[error("reference '{path}' walks above the document root")]
    AncestorOutOfRange { path: String },

    /// A path string could not be parsed.
    #[error("invalid path '{path}'")]
    InvalidPath { path: String },

    /// A call named neither a built-in nor a registered resolver.
    #[error("unknown resolver '{name}'{}", format_suggestions(suggestions))]
    UnknownResolver {
        name: String,
        suggestions: Vec<String>,
    },

    /// A registered resolver reported failure.
    #[error("resolver '{name}' failed: {message}")]
    Resolver { name: String, message: String },

    /// A built-in was called with the wrong number of arguments.
    #[error("'{name}' expects {expected} arguments, got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    /// A built-in could not convert its argument.
    #[error("{builtin}() cannot convert {value}")]
    Coercion { builtin: String, value: String },

    /// An operator was applied to values it does not support.
    #[error("type error: {message}")]
    Type { message: String },

    #[error("division by zero")]
    DivisionByZero,

    /// The expression text at `path` is malformed.
    #[error("in '{path}': {source}")]
    Syntax {
        path: String,
        #[source]
        source: ParseError,
    },
}

impl EvalError {
    /// Broad category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::CycleDetected { .. } => ErrorKind::CycleDetected,
            EvalError::DepthExceeded { .. } => ErrorKind::DepthExceeded,
            _ => ErrorKind::Evaluation,
        }
    }
}

/// Coarse classification of evaluation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CycleDetected,
    DepthExceeded,
    /// Resolver failure, missing reference, malformed expression and the like.
    Evaluation,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            ErrorKind::CycleDetected => "cycle",
            ErrorKind::DepthExceeded => "depth",
            ErrorKind::Evaluation => "evaluation",
        };
        write!(f, "{name}")
    }
}

/// Errors from `set` and `delete`. These never pass through the error hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetError {
    /// The key names one of the node access methods.
    #[error("'{key}' is a reserved key and cannot be set")]
    ReservedKey { key: String },

    /// The parent of the target holds a scalar.
    #[error("'{path}' is not an object or array")]
    NotAContainer { path: String },

    #[error("invalid path '{path}'")]
    InvalidPath { path: String },

    #[error("path '{path}' walks above the document root")]
    AncestorOutOfRange { path: String },

    /// Array writes may replace an element or append one past the end.
    #[error("index {index} out of bounds for array of length {len} at '{path}'")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },
}

/// Failure reported by a resolver function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ResolverError {
    pub message: String,
}

impl ResolverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for ResolverError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ResolverError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!("; did you mean: {}?", suggestions.join(", "))
    }
}

/// Compute typo suggestions for an unknown name.
///
/// Allows an edit distance of 1 for names of three characters or fewer and
/// 2 otherwise, returning at most three candidates, closest first.
pub fn compute_suggestions(name: &str, available: &[String]) -> Vec<String> {
    let max_distance = if name.len() <= 3 { 1 } else { 2 };
    let mut suggestions: Vec<(usize, &String)> = available
        .iter()
        .filter_map(|candidate| {
            let dist = levenshtein(name, candidate);
            (dist > 0 && dist <= max_distance).then_some((dist, candidate))
        })
        .collect();

    suggestions.sort();
    suggestions
        .into_iter()
        .take(3)
        .map(|(_, s)| s.clone())
        .collect()
}

impl From<PathError> for EvalError {
    fn from(error: PathError) -> Self {
        EvalError::InvalidPath { path: error.0 }
    }
}

impl From<AncestorError> for EvalError {
    fn from(error: AncestorError) -> Self {
        EvalError::AncestorOutOfRange { path: error.0 }
    }
}

impl From<PathError> for SetError {
    fn from(error: PathError) -> Self {
        SetError::InvalidPath { path: error.0 }
    }
}

impl From<AncestorError> for SetError {
    fn from(error: AncestorError) -> Self {
        SetError::AncestorOutOfRange { path: error.0 }
    }
}
