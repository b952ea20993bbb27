//! Integration tests for nodes, fields, loading and round trips.

use std::io::Write;

use lazyschema::{EvalError, Field, LoadError, Path, Tree, TreeOptions, context};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::NamedTempFile;

fn profile() -> Tree {
    Tree::from_json(json!({
        "site": "Docs",
        "user": {
            "name": "Ada",
            "role": "admin",
            "role:es": "administradora",
            ".greet": "Hi ${name} from ${^.site}",
            "prefs": { "theme": "dark" }
        }
    }))
    .unwrap()
}

// =========================================================================
// Nodes
// =========================================================================

#[tokio::test]
async fn node_reads_relative_paths() {
    let tree = profile();
    let user = tree.node("user").unwrap();
    assert_eq!(user.path().to_string(), "user");
    assert_eq!(user.get("name").await.unwrap(), Some(json!("Ada")));
    assert_eq!(user.get("^.site").await.unwrap(), Some(json!("Docs")));
    assert_eq!(user.get("greet").await.unwrap(), Some(json!("Hi Ada from Docs")));
    assert!(user.has("prefs.theme").await.unwrap());
    assert!(matches!(
        user.get("^.^.x").await,
        Err(EvalError::AncestorOutOfRange { .. })
    ));
}

#[tokio::test]
async fn node_writes_are_visible_through_tree() {
    let tree = profile();
    let user = tree.node("user").unwrap();
    assert_eq!(user.get("greet").await.unwrap(), Some(json!("Hi Ada from Docs")));

    user.set("name", "Grace").unwrap();
    assert_eq!(tree.get("user.greet").await.unwrap(), Some(json!("Hi Grace from Docs")));

    user.set("^.site", "Wiki").unwrap();
    assert_eq!(user.get("greet").await.unwrap(), Some(json!("Hi Grace from Wiki")));
}

#[tokio::test]
async fn node_value_materializes_its_mapping() {
    let tree = profile();
    let prefs = tree.node("user").unwrap().node("prefs").unwrap();
    assert_eq!(prefs.value().await.unwrap(), Some(json!({ "theme": "dark" })));
}

#[test]
fn node_keys_collapse_variants() {
    let tree = profile();
    let user = tree.node("user").unwrap();
    assert_eq!(user.keys(), vec!["name", "role", "greet", "prefs"]);
    assert_eq!(tree.keys("").unwrap(), vec!["site", "user"]);
}

#[test]
fn node_delete_and_clear() {
    let tree = profile();
    let user = tree.node("user").unwrap();
    assert!(user.delete("greet").unwrap());
    assert!(!user.keys().contains(&"greet".to_string()));

    let prefs = user.node("prefs").unwrap();
    prefs.clear().unwrap();
    assert_eq!(tree.to_json()["user"]["prefs"], json!({}));
}

#[test]
fn node_rejects_reserved_keys() {
    let tree = profile();
    let prefs = tree.node("user.prefs").unwrap();
    assert!(prefs.set("delete", true).is_err());
}

// =========================================================================
// Fields
// =========================================================================

#[tokio::test]
async fn fields_report_what_is_stored() {
    let tree = profile();
    let user = tree.node("user").unwrap();

    assert_eq!(user.field("name"), Field::Value(json!("Ada")));
    assert!(matches!(user.field("prefs"), Field::Node(node) if node.path().to_string() == "user.prefs"));
    assert_eq!(user.field("missing"), Field::Absent);
    assert_eq!(user.field("get"), Field::Absent);
    assert_eq!(user.field("greet"), Field::Unset);

    user.get("greet").await.unwrap();
    assert_eq!(user.field("greet"), Field::Value(json!("Hi Ada from Docs")));

    user.set("name", "Grace").unwrap();
    assert_eq!(user.field("greet"), Field::Unset);
}

#[test]
fn fields_follow_context() {
    let tree = profile();
    let user = tree.node("user").unwrap();
    assert_eq!(user.field("role"), Field::Value(json!("admin")));
    tree.set_context(context! { "lang" => "es" });
    assert_eq!(user.field("role"), Field::Value(json!("administradora")));
}

// =========================================================================
// Loading and Round Trips
// =========================================================================

#[tokio::test]
async fn from_path_loads_document() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{ "name": "Ada", ".greet": "Hello, ${{name}}!" }}"#).unwrap();

    let tree = Tree::from_path(file.path(), TreeOptions::default()).unwrap();
    assert_eq!(tree.get("greet").await.unwrap(), Some(json!("Hello, Ada!")));
}

#[test]
fn from_path_reports_missing_file() {
    let result = Tree::from_path("/nonexistent/doc.json", TreeOptions::default());
    let Err(LoadError::Io { path, .. }) = result else {
        panic!("expected io error");
    };
    assert_eq!(path.to_str(), Some("/nonexistent/doc.json"));
}

#[tokio::test]
async fn serialized_tree_evaluates_identically() {
    let tree = profile();
    let before = tree.get("").await.unwrap();

    let text = serde_json::to_string(&tree.to_json()).unwrap();
    let rebuilt: Tree = text.parse().unwrap();
    assert_eq!(rebuilt.get("").await.unwrap(), before);
    assert_eq!(rebuilt.to_json(), tree.to_json());
}

#[tokio::test]
async fn to_json_keeps_expressions_unevaluated() {
    let tree = profile();
    tree.get("user.greet").await.unwrap();
    assert_eq!(
        tree.to_json()["user"][".greet"],
        json!("Hi ${name} from ${^.site}")
    );
}

#[test]
fn expression_paths_lists_every_expression() {
    let tree = profile();
    assert_eq!(tree.expression_paths(), vec![Path::parse("user..greet").unwrap()]);
}
