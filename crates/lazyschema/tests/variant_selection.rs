//! Integration tests for variant-key resolution.

use lazyschema::{Context, GetOptions, Tree, TreeOptions, context, rank_variants, resolve_variant};
use pretty_assertions::assert_eq;
use serde_json::json;

const KEYS: &[&str] = &["base", "base:es", "base:f", "base:es:f"];

// =========================================================================
// Scoring
// =========================================================================

#[test]
fn language_and_gender_beat_either_alone() {
    let ctx = context! { "lang" => "es", "gender" => "f" };
    assert_eq!(resolve_variant("base", &ctx, KEYS.iter().copied()), Some("base:es:f"));

    let ranked = rank_variants("base", &ctx, KEYS.iter().copied());
    assert_eq!(ranked[0].key, "base:es:f");
    assert_eq!(ranked[0].score, 1100);
    assert_eq!(ranked[1].key, "base:es");
    assert_eq!(ranked[1].score, 1000);
}

#[test]
fn tie_goes_to_fewest_extra_dimensions() {
    let ctx = context! { "lang" => "es" };
    let keys = ["base", "base:es", "base:es:formal"];
    assert_eq!(resolve_variant("base", &ctx, keys), Some("base:es"));

    // Order of the candidates does not matter.
    let keys = ["base:es:formal", "base:es", "base"];
    assert_eq!(resolve_variant("base", &ctx, keys), Some("base:es"));
}

#[test]
fn no_matching_candidate_falls_back_to_plain_key() {
    let ctx = context! { "lang" => "fr" };
    assert_eq!(resolve_variant("base", &ctx, ["base", "base:es"]), Some("base"));
}

#[test]
fn no_plain_key_and_no_match_resolves_to_nothing() {
    let ctx = context! { "lang" => "fr" };
    assert_eq!(resolve_variant("base", &ctx, ["base:es", "base:de"]), None);
}

#[test]
fn tag_order_in_key_is_irrelevant() {
    let ctx = context! { "lang" => "es", "gender" => "f" };
    assert_eq!(resolve_variant("base", &ctx, ["base", "base:f:es"]), Some("base:f:es"));
}

#[test]
fn formality_outranks_custom_tags() {
    let ctx = context! { "formality" => "formal", "beta" => "true" };
    let keys = ["msg", "msg:beta", "msg:formal"];
    assert_eq!(resolve_variant("msg", &ctx, keys), Some("msg:formal"));
}

#[test]
fn partial_match_still_beats_plain_key() {
    let ctx = context! { "lang" => "es", "gender" => "m" };
    // The gender tag does not match, the language tag does.
    let ranked = rank_variants("base", &ctx, ["base", "base:es:f"]);
    assert_eq!(ranked[0].key, "base:es:f");
    assert_eq!(ranked[0].extras, 1);
    assert_eq!(resolve_variant("base", &ctx, ["base", "base:es:f"]), Some("base:es:f"));
}

// =========================================================================
// Variant Reads Through a Tree
// =========================================================================

fn greetings() -> serde_json::Value {
    json!({
        "greet": "Hello",
        "greet:es": "Hola",
        "greet:es:f": "Bienvenida",
        "spanish": {
            "$context": { "lang": "es" },
            "greet": "Hello",
            "greet:es": "Hola"
        }
    })
}

#[tokio::test]
async fn global_context_picks_variant() {
    let options = TreeOptions::builder().context(context! { "lang" => "es" }).build();
    let tree = Tree::new(greetings(), options).unwrap();
    assert_eq!(tree.get("greet").await.unwrap(), Some(json!("Hola")));
}

#[tokio::test]
async fn per_call_context_overrides_global() {
    let tree = Tree::from_json(greetings()).unwrap();
    assert_eq!(tree.get("greet").await.unwrap(), Some(json!("Hello")));

    let options = GetOptions::builder()
        .context(context! { "lang" => "es", "gender" => "f" })
        .build();
    assert_eq!(tree.get_with("greet", options).await.unwrap(), Some(json!("Bienvenida")));
}

#[tokio::test]
async fn context_entry_applies_to_its_subtree_only() {
    let tree = Tree::from_json(greetings()).unwrap();
    assert_eq!(tree.get("spanish.greet").await.unwrap(), Some(json!("Hola")));
    assert_eq!(tree.get("greet").await.unwrap(), Some(json!("Hello")));
}

#[tokio::test]
async fn materialized_mapping_collapses_variants_and_omits_context() {
    let tree = Tree::from_json(greetings()).unwrap();
    assert_eq!(tree.get("spanish").await.unwrap(), Some(json!({ "greet": "Hola" })));
}

#[tokio::test]
async fn explicit_variant_segment_reads_that_key() {
    let tree = Tree::from_json(greetings()).unwrap();
    assert_eq!(tree.get("greet:es").await.unwrap(), Some(json!("Hola")));
}

#[tokio::test]
async fn expression_variants_compete_with_static_ones() {
    let tree = Tree::from_json(json!({
        "name": "Ana",
        ".greet": "Hello, ${name}",
        ".greet:es": "Hola, ${name}"
    }))
    .unwrap();
    assert_eq!(tree.get("greet").await.unwrap(), Some(json!("Hello, Ana")));

    tree.set_context(context! { "lang" => "es" });
    assert_eq!(tree.get("greet").await.unwrap(), Some(json!("Hola, Ana")));
}

#[tokio::test]
async fn regional_request_matches_language_variant() {
    let tree = Tree::from_json(json!({ "color": "color", "color:en-GB": "colour" })).unwrap();
    let options = GetOptions::builder()
        .context(Context::new().with("lang", "en-gb"))
        .build();
    assert_eq!(tree.get_with("color", options).await.unwrap(), Some(json!("colour")));
}

#[test]
fn variant_groups_report_winner() {
    let tree = Tree::from_json(greetings()).unwrap();
    let groups = tree.variant_groups(&context! { "lang" => "es" });
    let top = groups
        .iter()
        .find(|g| g.path.to_string() == "greet")
        .unwrap();
    assert_eq!(top.winner.as_deref(), Some("greet:es"));
    assert_eq!(top.candidates.len(), 3);
}
