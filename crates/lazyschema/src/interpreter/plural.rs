//! CLDR plural category resolution for the `plural()` built-in.
//!
//! Plural rules are cached per thread per language to avoid re-creating
//! `PluralRules` instances on every call.

use std::cell::RefCell;

use icu_locale_core::{LanguageIdentifier, Locale, locale};
use icu_plurals::{PluralCategory, PluralRuleType, PluralRules};

use crate::types::canonical_language;

thread_local! {
    /// Per-thread cache of `PluralRules` keyed by canonical language tag.
    static PLURAL_RULES_CACHE: RefCell<Vec<(String, PluralRules)>> = const { RefCell::new(Vec::new()) };
}

/// Build `PluralRules` for a language tag, falling back to English for
/// tags that do not parse.
fn build_rules(lang: &str) -> Option<PluralRules> {
    let loc = lang
        .parse::<LanguageIdentifier>()
        .map(Locale::from)
        .unwrap_or_else(|_| locale!("en"));
    PluralRules::try_new(loc.into(), PluralRuleType::Cardinal.into()).ok()
}

/// Translate a `PluralCategory` enum to its string representation.
fn category_str(category: PluralCategory) -> &'static str {
    match category {
        PluralCategory::Zero => "zero",
        PluralCategory::One => "one",
        PluralCategory::Two => "two",
        PluralCategory::Few => "few",
        PluralCategory::Many => "many",
        PluralCategory::Other => "other",
    }
}

/// Get CLDR plural category for a number in a given language.
///
/// Returns one of: "zero", "one", "two", "few", "many", "other".
///
/// # Examples
///
/// ```
/// use lazyschema::plural_category;
///
/// assert_eq!(plural_category("en", 1), "one");
/// assert_eq!(plural_category("en", 2), "other");
/// assert_eq!(plural_category("ru", 2), "few");
/// assert_eq!(plural_category("ru", 5), "many");
/// ```
pub fn plural_category(lang: &str, n: i64) -> &'static str {
    let code = canonical_language(lang).unwrap_or_else(|| "en".to_string());
    PLURAL_RULES_CACHE.with_borrow_mut(|cache| {
        if let Some((_, rules)) = cache.iter().find(|(cached, _)| *cached == code) {
            return category_str(rules.category_for(n));
        }
        let Some(rules) = build_rules(&code) else {
            return "other";
        };
        let category = category_str(rules.category_for(n));
        cache.push((code, rules));
        category
    })
}
