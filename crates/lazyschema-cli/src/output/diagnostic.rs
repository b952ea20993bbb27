//! Miette diagnostic wrapper for malformed JSON documents.
//!
//! Note: This module has an exception for `unused_assignments` because miette
//! derive macros read struct fields in generated code that rustc cannot track.
#![allow(unused_assignments)]

use std::path::Path;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// A miette-compatible diagnostic for JSON syntax errors.
///
/// Note: Fields are read by miette derive macros, not directly by code.
#[derive(Debug, Error, Diagnostic)]
#[error("invalid JSON: {message}")]
#[diagnostic(code(lzs::json))]
pub struct DocumentDiagnostic {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    message: String,

    #[help]
    help: Option<String>,
}

impl DocumentDiagnostic {
    /// Create a diagnostic from a serde_json error with source context.
    pub fn from_json_error(path: &Path, content: &str, err: &serde_json::Error) -> Self {
        let (line, column) = (err.line(), err.column());

        // Convert line:column to byte offset.
        let offset = content
            .lines()
            .take(line.saturating_sub(1))
            .map(|l| l.len() + 1)
            .sum::<usize>()
            + column.saturating_sub(1);

        // Clamp offset to content length to avoid miette panic on out-of-bounds
        let offset = offset.min(content.len());

        let help = err
            .is_eof()
            .then(|| "the document ends before its root object is closed".to_string());

        DocumentDiagnostic {
            src: NamedSource::new(path.display().to_string(), content.to_string()),
            span: (offset, 1).into(),
            message: err.to_string(),
            help,
        }
    }
}
