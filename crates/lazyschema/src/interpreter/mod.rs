//! Lazy evaluation engine for expression trees.
//!
//! A [`Tree`] owns the document, the memo cache and the options. Reads walk
//! the document with variant selection, evaluate the expression keys they
//! meet, and record every path an evaluation read so writes can invalidate
//! precisely.

mod builtins;
mod cache;
mod context;
mod document;
mod error;
mod evaluator;
mod node;
mod operators;
mod options;
mod plural;
mod registry;
mod tree;
mod variant;

pub use builtins::builtin_names;
pub use document::{RESERVED_KEYS, VariantCandidate, VariantGroup};
pub use error::{
    ErrorKind, EvalError, LoadError, ResolverError, SetError, compute_suggestions,
};
pub use node::{Field, Node};
pub use options::{ErrorAction, ErrorHook, GetOptions, TreeOptions, error_hook};
pub use plural::plural_category;
pub use registry::{Resolver, ResolverRegistry};
pub use tree::Tree;
pub use variant::{ScoredVariant, rank_variants, resolve_variant};
