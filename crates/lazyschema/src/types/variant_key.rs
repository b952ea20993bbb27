use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt::{Display, Formatter, Result as FmtResult};

use super::dimension::{Dimension, classify_tag};
use super::path::EXPRESSION_MARKER;

/// A document key split into its base name and variant dimensions.
///
/// Keys take the form `[.]base[:tag]*`. The leading marker flags expression
/// text; each colon-separated tag is classified into a [`Dimension`].
/// Parsing never fails and does not depend on tag order.
///
/// # Example
///
/// ```
/// use lazyschema::VariantKey;
///
/// let a = VariantKey::parse(".greet:es:f");
/// let b = VariantKey::parse(".greet:f:es");
/// assert_eq!(a, b);
/// assert_eq!(a.base(), "greet");
/// assert!(a.is_expression());
/// assert_eq!(a.dimensions().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantKey {
    base: String,
    expression: bool,
    dimensions: BTreeMap<Dimension, String>,
}

impl VariantKey {
    pub fn parse(key: &str) -> Self {
        let (expression, unmarked) = match key.strip_prefix(EXPRESSION_MARKER) {
            Some(rest) => (true, rest),
            None => (false, key),
        };
        let mut parts = unmarked.split(':');
        let base = parts.next().unwrap_or_default().to_string();
        let mut dimensions = BTreeMap::new();
        for tag in parts.filter(|t| !t.is_empty()) {
            let (dimension, value) = classify_tag(tag);
            // A repeated dimension keeps its smallest value so the result
            // stays independent of tag order.
            match dimensions.entry(dimension) {
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
                Entry::Occupied(mut slot) => {
                    if value < *slot.get() {
                        slot.insert(value);
                    }
                }
            }
        }
        Self {
            base,
            expression,
            dimensions,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn is_expression(&self) -> bool {
        self.expression
    }

    pub fn dimensions(&self) -> &BTreeMap<Dimension, String> {
        &self.dimensions
    }

    /// True when the key has no variant suffix.
    pub fn is_plain(&self) -> bool {
        self.dimensions.is_empty()
    }
}

impl Display for VariantKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.expression {
            write!(f, "{EXPRESSION_MARKER}")?;
        }
        write!(f, "{}", self.base)?;
        for (dimension, value) in &self.dimensions {
            match dimension {
                Dimension::Custom(name) if name == value => write!(f, ":{value}")?,
                Dimension::Custom(name) => write!(f, ":{name}={value}")?,
                _ => write!(f, ":{value}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_key_has_no_dimensions() {
        let key = VariantKey::parse("title");
        assert_eq!(key.base(), "title");
        assert!(key.is_plain());
        assert!(!key.is_expression());
    }

    #[test]
    fn unknown_tags_become_custom_dimensions() {
        let key = VariantKey::parse("banner:beta:es");
        assert_eq!(
            key.dimensions().get(&Dimension::Custom("beta".to_string())),
            Some(&"beta".to_string())
        );
        assert_eq!(
            key.dimensions().get(&Dimension::Language),
            Some(&"es".to_string())
        );
    }

    #[test]
    fn repeated_dimension_is_order_independent() {
        assert_eq!(VariantKey::parse("k:fr:es"), VariantKey::parse("k:es:fr"));
        assert_eq!(
            VariantKey::parse("k:fr:es").dimensions()[&Dimension::Language],
            "es"
        );
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(VariantKey::parse(".greet:f:es").to_string(), ".greet:es:f");
        assert_eq!(VariantKey::parse("x:tier=gold").to_string(), "x:tier=gold");
    }
}
