//! Lazy, memoized expressions over JSON documents.
//!
//! Keys that start with `.` hold `${...}` templates evaluated on first read.
//! Sibling keys such as `greet:es` or `greet:es:formal` are variants of one
//! slot, chosen per read from the request context.

pub mod interpreter;
pub mod parser;
pub mod types;

pub use interpreter::{
    ErrorAction, ErrorHook, ErrorKind, EvalError, Field, GetOptions, LoadError, Node,
    RESERVED_KEYS, Resolver, ResolverError, ResolverRegistry, ScoredVariant, SetError, Tree,
    TreeOptions, VariantCandidate, VariantGroup, builtin_names, compute_suggestions, error_hook,
    plural_category, rank_variants, resolve_variant,
};
pub use types::{
    Context, Dimension, Path, PathError, ValueExt, VariantKey, canonical_language, classify_tag,
};

/// Creates a [`Context`] from dimension/value pairs.
///
/// # Example
///
/// ```
/// use lazyschema::context;
///
/// let ctx = context! { "lang" => "es", "gender" => "f" };
/// assert_eq!(ctx.language(), Some("es"));
/// assert_eq!(ctx.get("gender"), Some("f"));
/// ```
#[macro_export]
macro_rules! context {
    {} => {
        $crate::Context::new()
    };
    { $($key:expr => $value:expr),+ $(,)? } => {
        {
            let mut context = $crate::Context::new();
            $(
                context.insert($key, $value);
            )+
            context
        }
    };
}
