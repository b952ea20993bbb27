use std::fmt::{Display, Formatter, Result as FmtResult};

use icu_locale_core::LanguageIdentifier;
use serde::{Deserialize, Serialize};

/// Gender tags recognized in variant suffixes.
pub const GENDERS: &[&str] = &["m", "f", "n"];

/// Formality tags recognized in variant suffixes.
pub const FORMALITIES: &[&str] = &["formal", "informal"];

/// A dimension along which sibling variant keys differ.
///
/// The well-known dimensions carry fixed scoring weights; every other tag is
/// a custom dimension.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Language,
    Gender,
    Formality,
    Custom(String),
}

impl Dimension {
    /// Resolve a request-context dimension name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "lang" | "language" => Dimension::Language,
            "gender" => Dimension::Gender,
            "formality" => Dimension::Formality,
            other => Dimension::Custom(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Dimension::Language => "lang",
            Dimension::Gender => "gender",
            Dimension::Formality => "formality",
            Dimension::Custom(name) => name,
        }
    }

    /// Score contributed when a candidate matches the request on this dimension.
    pub fn weight(&self) -> u32 {
        match self {
            Dimension::Language => 1000,
            Dimension::Gender => 100,
            Dimension::Formality => 50,
            Dimension::Custom(_) => 10,
        }
    }

    /// Normalize a value for comparison on this dimension.
    pub fn normalize(&self, value: &str) -> String {
        match self {
            Dimension::Language => {
                canonical_language(value).unwrap_or_else(|| value.to_string())
            }
            Dimension::Gender | Dimension::Formality => value.to_ascii_lowercase(),
            Dimension::Custom(_) => value.to_string(),
        }
    }
}

impl Display for Dimension {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name())
    }
}

/// Classify one colon-separated tag from a variant suffix.
///
/// A tag in `name=value` form names its dimension explicitly. Otherwise the
/// gender and formality enums are tried first, then the language pattern;
/// anything else degrades to a custom dimension whose name is the tag itself.
///
/// ```
/// use lazyschema::{Dimension, classify_tag};
///
/// assert_eq!(classify_tag("es-mx"), (Dimension::Language, "es-MX".to_string()));
/// assert_eq!(classify_tag("f"), (Dimension::Gender, "f".to_string()));
/// assert_eq!(classify_tag("beta"), (Dimension::Custom("beta".into()), "beta".to_string()));
/// ```
pub fn classify_tag(tag: &str) -> (Dimension, String) {
    if let Some((name, value)) = tag.split_once('=') {
        let dimension = Dimension::from_name(name);
        let value = dimension.normalize(value);
        return (dimension, value);
    }
    let lowered = tag.to_ascii_lowercase();
    if GENDERS.contains(&lowered.as_str()) {
        return (Dimension::Gender, lowered);
    }
    if FORMALITIES.contains(&lowered.as_str()) {
        return (Dimension::Formality, lowered);
    }
    if let Some(language) = canonical_language(tag) {
        return (Dimension::Language, language);
    }
    (Dimension::Custom(tag.to_string()), tag.to_string())
}

/// Canonical BCP-47 form of a language tag, if `tag` is one.
///
/// Accepts a 2–5 letter language subtag with optional script and region,
/// and rejects variant subtags.
pub fn canonical_language(tag: &str) -> Option<String> {
    let id: LanguageIdentifier = tag.parse().ok()?;
    let len = id.language.as_str().len();
    if !(2..=5).contains(&len) || !id.variants.is_empty() {
        return None;
    }
    Some(id.to_string())
}
