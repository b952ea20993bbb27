//! Variant key scoring and selection.
//!
//! Sibling keys sharing a base name (`greet`, `greet:es`, `.greet:es:f`)
//! compete for a request context. Each candidate scores the sum of the
//! weights of the dimensions it matches; ties go to the candidate with the
//! fewest dimensions the request did not match, then to the smallest key.
//! If nothing scores, the plain base key wins when present.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use tracing::trace;

use crate::types::{Context, Dimension, VariantKey};

/// A candidate key with its score against one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredVariant<'k> {
    pub key: &'k str,
    pub score: u32,
    /// Candidate dimensions the request did not match.
    pub extras: usize,
    pub plain: bool,
}

/// Score every key whose base name is `base`, best first.
///
/// The order is total, so it does not depend on the order of `keys`.
pub fn rank_variants<'k>(
    base: &str,
    context: &Context,
    keys: impl IntoIterator<Item = &'k str>,
) -> Vec<ScoredVariant<'k>> {
    let requested = context.requested();
    let mut scored: Vec<ScoredVariant<'k>> = keys
        .into_iter()
        .filter_map(|key| {
            let parsed = VariantKey::parse(key);
            (parsed.base() == base).then(|| score(key, &parsed, &requested))
        })
        .collect();
    scored.sort_by_key(|s| (Reverse(s.score), s.extras, s.key));
    scored
}

/// Pick the key that best serves `context` among the variants of `base`.
///
/// Returns `None` when no candidate matches the request and there is no
/// plain base key to fall back to.
///
/// # Example
///
/// ```
/// use lazyschema::{Context, resolve_variant};
///
/// let keys = ["base", "base:es", "base:f", "base:es:f"];
/// let ctx = Context::new().with("lang", "es").with("gender", "f");
/// assert_eq!(resolve_variant("base", &ctx, keys), Some("base:es:f"));
///
/// let ctx = Context::new().with("lang", "fr");
/// assert_eq!(resolve_variant("base", &ctx, ["base", "base:es"]), Some("base"));
/// ```
pub fn resolve_variant<'k>(
    base: &str,
    context: &Context,
    keys: impl IntoIterator<Item = &'k str>,
) -> Option<&'k str> {
    let ranked = rank_variants(base, context, keys);
    let best = ranked.first()?;
    if best.score > 0 {
        return Some(best.key);
    }
    ranked
        .iter()
        .filter(|s| s.plain)
        .map(|s| s.key)
        .min()
}

fn score<'k>(
    key: &'k str,
    parsed: &VariantKey,
    requested: &BTreeMap<Dimension, String>,
) -> ScoredVariant<'k> {
    let mut total = 0;
    let mut extras = 0;
    for (dimension, value) in parsed.dimensions() {
        if matches_request(dimension, value, requested) {
            total += dimension.weight();
        } else {
            extras += 1;
        }
    }
    trace!(key, score = total, extras, "scored variant");
    ScoredVariant {
        key,
        score: total,
        extras,
        plain: parsed.is_plain(),
    }
}

fn matches_request(
    dimension: &Dimension,
    value: &str,
    requested: &BTreeMap<Dimension, String>,
) -> bool {
    let Some(wanted) = requested.get(dimension) else {
        return false;
    };
    match dimension {
        // An unnamed tag like `:beta` is switched on by `beta=true`.
        Dimension::Custom(name) if name == value => wanted == value || wanted == "true",
        _ => wanted == value,
    }
}
