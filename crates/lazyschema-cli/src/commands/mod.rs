//! CLI command implementations.

mod check;
mod get;
mod variants;

use std::fs::read_to_string;
use std::path::Path;

use lazyschema::{Context, Tree, TreeOptions};
use miette::{miette, Result};
use serde_json::Value;

use crate::output::DocumentDiagnostic;

pub use check::{run_check, CheckArgs};
pub use get::{run_get, GetArgs};
pub use variants::{run_variants, VariantsArgs};

/// Parse a key=value context entry.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid context entry '{}': expected dimension=value", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// Build a request context from `--ctx` entries.
fn context_from(entries: &[(String, String)]) -> Context {
    entries.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

/// Read a JSON document and build a tree over it.
fn load_tree(path: &Path) -> Result<Tree> {
    let content = read_to_string(path)
        .map_err(|e| miette!("Cannot read document {}: {}", path.display(), e))?;
    let document: Value = match serde_json::from_str(&content) {
        Ok(document) => document,
        Err(e) => {
            let diagnostic = DocumentDiagnostic::from_json_error(path, &content, &e);
            return Err(diagnostic.into());
        }
    };
    Tree::new(document, TreeOptions::default())
        .map_err(|e| miette!("Invalid document {}: {}", path.display(), e))
}
