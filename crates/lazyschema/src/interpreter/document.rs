//! Structural access to the raw document: key selection, lookup, writes and
//! whole-document walks.
//!
//! Nothing here evaluates expressions. Lookups stop at the first expression
//! key they meet and report the remaining segments to the caller.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::interpreter::SetError;
use crate::interpreter::variant::{ScoredVariant, rank_variants, resolve_variant};
use crate::types::{
    CONTEXT_KEY, Context, EXPRESSION_MARKER, Path, VariantKey, child_value, logical_segment,
};

/// Keys that name the node access methods and cannot be written.
pub const RESERVED_KEYS: &[&str] = &["get", "set", "has", "delete", "clear", "keys"];

/// An expression key found while walking a path.
#[derive(Debug, Clone)]
pub(crate) struct ExpressionSite {
    /// Concrete path of the expression key.
    pub path: Path,
    pub text: String,
    /// Effective context at the mapping that owns the key.
    pub context: Context,
    /// Segments of the requested path below the expression.
    pub rest: Vec<String>,
}

impl ExpressionSite {
    /// Path of the mapping that owns the expression key.
    pub fn owner(&self) -> Path {
        self.path.parent().unwrap_or_default()
    }
}

/// Outcome of walking a path through the raw document.
#[derive(Debug)]
pub(crate) enum Located<'d> {
    Missing,
    Static {
        path: Path,
        value: &'d Value,
        context: Context,
    },
    Expression(ExpressionSite),
}

/// Context entries declared by a mapping itself.
pub(crate) fn own_context(value: &Value) -> Context {
    value
        .get(CONTEXT_KEY)
        .map(Context::from_value)
        .unwrap_or_default()
}

/// Pick the key of `map` that `segment` addresses under `context`.
///
/// A segment carrying a variant suffix or the expression marker names its key
/// exactly. A bare name competes across every variant of that base name,
/// expression keys included.
pub(crate) fn select_key<'m>(
    map: &'m Map<String, Value>,
    segment: &str,
    context: &Context,
) -> Option<&'m str> {
    if segment.contains(':') || segment.starts_with(EXPRESSION_MARKER) {
        return map.get_key_value(segment).map(|(k, _)| k.as_str());
    }
    resolve_variant(segment, context, map.keys().map(String::as_str))
}

/// Walk `path` from the document root.
pub(crate) fn locate<'d>(document: &'d Value, path: &Path, base: &Context) -> Located<'d> {
    let mut current = document;
    let mut concrete = Path::root();
    let mut context = base.merge(&own_context(document));
    for (i, segment) in path.segments().iter().enumerate() {
        let (key, value) = match current {
            Value::Object(map) => {
                let Some(key) = select_key(map, segment, &context) else {
                    return Located::Missing;
                };
                (key.to_string(), &map[key])
            }
            Value::Array(_) => match child_value(current, segment) {
                Some(value) => (segment.clone(), value),
                None => return Located::Missing,
            },
            _ => return Located::Missing,
        };
        concrete = concrete.child(key.as_str());
        if let (true, Value::String(text)) = (is_expression_key(&key), value) {
            return Located::Expression(ExpressionSite {
                path: concrete,
                text: text.clone(),
                context,
                rest: path.segments()[i + 1..].to_vec(),
            });
        }
        if value.is_object() {
            context = context.merge(&own_context(value));
        }
        current = value;
    }
    Located::Static {
        path: concrete,
        value: current,
        context,
    }
}

pub(crate) fn is_expression_key(key: &str) -> bool {
    key.starts_with(EXPRESSION_MARKER)
}

fn reserved(segment: &str) -> Option<String> {
    let base = logical_segment(segment);
    RESERVED_KEYS
        .contains(&base)
        .then(|| base.to_string())
}

/// The key that holds the same slot with the expression marker toggled.
fn counterpart(key: &str) -> String {
    match key.strip_prefix(EXPRESSION_MARKER) {
        Some(plain) => plain.to_string(),
        None => format!("{EXPRESSION_MARKER}{key}"),
    }
}

/// Write `value` at `path`, creating intermediate mappings as needed.
///
/// Intermediate segments select their key the way reads do under `base`,
/// so a write lands in the mapping a later read of the same path reaches.
/// Writing `name` replaces `.name` and vice versa, so a slot holds either a
/// static value or an expression, never both.
pub(crate) fn write(
    document: &mut Value,
    path: &Path,
    value: Value,
    base: &Context,
) -> Result<(), SetError> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Err(SetError::InvalidPath {
            path: path.to_string(),
        });
    };
    if let Some(key) = reserved(last) {
        return Err(SetError::ReservedKey { key });
    }
    let mut context = base.merge(&own_context(document));
    let mut current = document;
    for (i, segment) in parents.iter().enumerate() {
        let here = path.prefix(i);
        current = match current {
            Value::Object(map) => {
                let key = match select_key(map, segment, &context) {
                    Some(key) if is_expression_key(key) => {
                        return Err(SetError::NotAContainer {
                            path: here.child(key).to_string(),
                        });
                    }
                    Some(key) => key.to_string(),
                    None => {
                        if let Some(key) = reserved(segment) {
                            return Err(SetError::ReservedKey { key });
                        }
                        map.insert(segment.clone(), Value::Object(Map::new()));
                        segment.clone()
                    }
                };
                let child = &mut map[key.as_str()];
                if child.is_object() {
                    context = context.merge(&own_context(child));
                }
                child
            }
            Value::Array(items) => {
                let len = items.len();
                let index = array_index(&here, segment)?;
                items.get_mut(index).ok_or(SetError::IndexOutOfBounds {
                    path: here.to_string(),
                    index,
                    len,
                })?
            }
            _ => {
                return Err(SetError::NotAContainer {
                    path: here.to_string(),
                });
            }
        };
    }
    let here = path.prefix(parents.len());
    match current {
        Value::Object(map) => {
            map.shift_remove(&counterpart(last));
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index = array_index(&here, last)?;
            match index.cmp(&items.len()) {
                Ordering::Less => items[index] = value,
                Ordering::Equal => items.push(value),
                Ordering::Greater => {
                    return Err(SetError::IndexOutOfBounds {
                        path: here.to_string(),
                        index,
                        len: items.len(),
                    });
                }
            }
            Ok(())
        }
        _ => Err(SetError::NotAContainer {
            path: here.to_string(),
        }),
    }
}

fn array_index(here: &Path, segment: &str) -> Result<usize, SetError> {
    segment.parse().map_err(|_| SetError::InvalidPath {
        path: here.child(segment).to_string(),
    })
}

/// Remove the slot at `path`. Returns whether anything was removed.
///
/// Both the plain key and its expression counterpart are removed; variant
/// siblings are left alone.
pub(crate) fn remove(document: &mut Value, path: &Path) -> Result<bool, SetError> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Err(SetError::InvalidPath {
            path: path.to_string(),
        });
    };
    let mut current = document;
    for segment in parents {
        current = match current {
            Value::Object(map) => match map.get_mut(segment.as_str()) {
                Some(child) => child,
                None => return Ok(false),
            },
            Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                Some(child) => child,
                None => return Ok(false),
            },
            _ => return Ok(false),
        };
    }
    Ok(match current {
        Value::Object(map) => {
            let plain = map.shift_remove(last.as_str()).is_some();
            let marked = map.shift_remove(&counterpart(last)).is_some();
            plain || marked
        }
        Value::Array(items) => match last.parse::<usize>() {
            Ok(index) if index < items.len() => {
                items.remove(index);
                true
            }
            _ => false,
        },
        _ => false,
    })
}

/// Base names of a mapping's keys in document order, without `$context`.
pub(crate) fn base_names(map: &Map<String, Value>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for key in map.keys().filter(|k| k.as_str() != CONTEXT_KEY) {
        let base = VariantKey::parse(key).base().to_string();
        if !names.contains(&base) {
            names.push(base);
        }
    }
    names
}

/// Concrete paths of every expression key in the document.
pub(crate) fn expression_paths(document: &Value) -> Vec<Path> {
    let mut found = Vec::new();
    collect_expressions(document, &Path::root(), &mut found);
    found
}

fn collect_expressions(value: &Value, at: &Path, found: &mut Vec<Path>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = at.child(key.as_str());
                if is_expression_key(key) && child.is_string() {
                    found.push(path);
                } else {
                    collect_expressions(child, &path, found);
                }
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_expressions(child, &at.child(i.to_string()), found);
            }
        }
        _ => {}
    }
}

/// One candidate of a variant group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantCandidate {
    pub key: String,
    pub score: u32,
    pub extras: usize,
}

impl From<&ScoredVariant<'_>> for VariantCandidate {
    fn from(scored: &ScoredVariant<'_>) -> Self {
        Self {
            key: scored.key.to_string(),
            score: scored.score,
            extras: scored.extras,
        }
    }
}

/// Sibling keys sharing a base name, ranked for one context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantGroup {
    /// Path of the slot, by base name.
    pub path: Path,
    /// Best first.
    pub candidates: Vec<VariantCandidate>,
    /// The key reads of `path` resolve to, if any.
    pub winner: Option<String>,
}

/// Every base name that has at least one suffixed key.
pub(crate) fn variant_groups(document: &Value, base: &Context) -> Vec<VariantGroup> {
    let mut groups = Vec::new();
    collect_groups(document, &Path::root(), base, &mut groups);
    groups
}

fn collect_groups(value: &Value, at: &Path, context: &Context, groups: &mut Vec<VariantGroup>) {
    match value {
        Value::Object(map) => {
            let context = context.merge(&own_context(value));
            for name in base_names(map) {
                let keys = map.keys().map(String::as_str);
                let ranked = rank_variants(&name, &context, keys);
                if ranked.iter().any(|s| !VariantKey::parse(s.key).is_plain()) {
                    groups.push(VariantGroup {
                        path: at.child(name.as_str()),
                        candidates: ranked.iter().map(VariantCandidate::from).collect(),
                        winner: resolve_variant(&name, &context, map.keys().map(String::as_str))
                            .map(str::to_string),
                    });
                }
            }
            for (key, child) in map {
                if key != CONTEXT_KEY {
                    collect_groups(child, &at.child(key.as_str()), &context, groups);
                }
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_groups(child, &at.child(i.to_string()), context, groups);
            }
        }
        _ => {}
    }
}
