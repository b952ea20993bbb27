mod context;
mod dimension;
mod path;
mod value;
mod variant_key;

pub use context::Context;
pub use dimension::{Dimension, FORMALITIES, GENDERS, canonical_language, classify_tag};
pub use path::{
    AncestorError, CONTEXT_KEY, EXPRESSION_MARKER, PARENT, Path, PathError, logical_segment,
};
pub use value::{ValueExt, child_value, descend};
pub use variant_key::VariantKey;
