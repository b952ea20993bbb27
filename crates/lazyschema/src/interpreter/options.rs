//! Construction and per-call options.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use bon::Builder;
use serde_json::Value;

use crate::interpreter::{EvalError, ResolverRegistry};
use crate::types::Context;

/// What the error hook wants done with a failed evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorAction {
    /// Propagate the error to the caller.
    Throw,
    /// Use the per-call fallback, else the configured fallback, else `null`.
    Fallback,
    /// Use this value in place of the failed result.
    Value(Value),
}

/// Called once per evaluation failure with the error and the path where it
/// arose.
pub type ErrorHook = Arc<dyn Fn(&EvalError, &str) -> ErrorAction + Send + Sync>;

/// Wrap a closure as an [`ErrorHook`].
pub fn error_hook<F>(f: F) -> ErrorHook
where
    F: Fn(&EvalError, &str) -> ErrorAction + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Options fixed when a [`Tree`](crate::Tree) is built.
///
/// # Example
///
/// ```
/// use lazyschema::{Context, ErrorAction, TreeOptions, error_hook};
///
/// let options = TreeOptions::builder()
///     .max_depth(16)
///     .context(Context::new().with("lang", "es"))
///     .on_error(error_hook(|_, _| ErrorAction::Fallback))
///     .build();
/// assert_eq!(options.max_depth, 16);
/// ```
#[derive(Builder, Clone)]
pub struct TreeOptions {
    /// Longest chain of nested expression evaluations allowed.
    #[builder(default = 100)]
    pub max_depth: usize,

    /// Global request context; `$context` entries and per-call contexts
    /// layer on top of it.
    #[builder(default)]
    pub context: Context,

    #[builder(default)]
    pub resolvers: ResolverRegistry,

    /// Without a hook every evaluation failure propagates.
    pub on_error: Option<ErrorHook>,

    /// Value used when the hook answers [`ErrorAction::Fallback`].
    pub fallback: Option<Value>,
}

impl Default for TreeOptions {
    fn default() -> Self {
        TreeOptions::builder().build()
    }
}

impl Debug for TreeOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("TreeOptions")
            .field("max_depth", &self.max_depth)
            .field("context", &self.context)
            .field("resolvers", &self.resolvers)
            .field("on_error", &self.on_error.is_some())
            .field("fallback", &self.fallback)
            .finish()
    }
}

/// Options for one `get` call.
#[derive(Builder, Debug, Clone, Default)]
pub struct GetOptions {
    /// Re-evaluate the target even if a cached result is fresh, and store
    /// the new result.
    #[builder(default)]
    pub fresh: bool,

    /// Returned when the path is missing or the hook asks for a fallback.
    pub fallback: Option<Value>,

    /// Layered over the global context for this call only.
    pub context: Option<Context>,
}
