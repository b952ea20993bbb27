use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::dimension::Dimension;

/// A request context: dimension name to requested value.
///
/// Contexts are supplied globally, per call, and per node through the
/// reserved `$context` entry; they are merged root to leaf with the later
/// layer winning.
///
/// # Example
///
/// ```
/// use lazyschema::Context;
///
/// let global = Context::new().with("lang", "en").with("gender", "f");
/// let node = Context::new().with("lang", "es");
/// let merged = global.merge(&node);
/// assert_eq!(merged.language(), Some("es"));
/// assert_eq!(merged.get("gender"), Some("f"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(BTreeMap<String, String>);

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, dimension: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(dimension, value);
        self
    }

    pub fn insert(&mut self, dimension: impl Into<String>, value: impl Into<String>) {
        self.0.insert(dimension.into(), value.into());
    }

    pub fn get(&self, dimension: &str) -> Option<&str> {
        self.0.get(dimension).map(String::as_str)
    }

    /// The requested language, under either `lang` or `language`.
    pub fn language(&self) -> Option<&str> {
        self.get("language").or_else(|| self.get("lang"))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Layer `overrides` on top of this context.
    pub fn merge(&self, overrides: &Context) -> Context {
        if overrides.is_empty() {
            return self.clone();
        }
        let mut merged = self.0.clone();
        merged.extend(overrides.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self(merged)
    }

    /// Stable textual identity, used to key cached results.
    pub fn fingerprint(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Read a `$context` entry. Scalars are stringified; nested values are ignored.
    pub fn from_value(value: &Value) -> Context {
        let Value::Object(map) = value else {
            return Context::new();
        };
        map.iter()
            .filter_map(|(k, v)| {
                let text = match v {
                    Value::String(s) => s.clone(),
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                Some((k.clone(), text))
            })
            .collect()
    }

    /// The request as classified, normalized dimensions.
    pub fn requested(&self) -> BTreeMap<Dimension, String> {
        self.0
            .iter()
            .map(|(name, value)| {
                let dimension = Dimension::from_name(name);
                let value = dimension.normalize(value);
                (dimension, value)
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Context {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
