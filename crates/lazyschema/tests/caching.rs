//! Integration tests for laziness, memoization and invalidation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::channel::oneshot;
use lazyschema::{Context, GetOptions, ResolverRegistry, Tree, TreeOptions, context};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::task::yield_now;

/// A tree whose `count()` resolver records how often it runs.
fn counting_tree(document: Value) -> (Tree, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut registry = ResolverRegistry::new();
    registry.register_fn("count", move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(json!(n))
    });
    let options = TreeOptions::builder().resolvers(registry).build();
    (Tree::new(document, options).unwrap(), calls)
}

/// A tree whose `wait()` resolver blocks its first call until the returned
/// sender fires. Later calls return at once.
fn gated_tree(document: Value, global: Context) -> (Tree, oneshot::Sender<()>) {
    let (release, gate) = oneshot::channel::<()>();
    let gate = Arc::new(Mutex::new(Some(gate)));
    let mut registry = ResolverRegistry::new();
    registry.register_async("wait", move |_| {
        let gate = gate.lock().unwrap().take();
        async move {
            if let Some(gate) = gate {
                gate.await.ok();
            }
            Ok(json!(""))
        }
    });
    let options = TreeOptions::builder()
        .resolvers(registry)
        .context(global)
        .build();
    (Tree::new(document, options).unwrap(), release)
}

// =========================================================================
// Laziness
// =========================================================================

#[tokio::test]
async fn unread_expressions_never_run() {
    let (tree, calls) = counting_tree(json!({
        ".expensive": "${count()}",
        "cheap": 1,
        "section": { "title": "t" }
    }));
    assert_eq!(tree.get("cheap").await.unwrap(), Some(json!(1)));
    assert_eq!(tree.get("section").await.unwrap(), Some(json!({ "title": "t" })));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn has_does_not_evaluate_expression_it_names() {
    let (tree, calls) = counting_tree(json!({ ".v": "${count()}" }));
    assert!(tree.has("v").await.unwrap());
    assert!(!tree.has("w").await.unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn has_evaluates_when_path_runs_through_result() {
    let (tree, calls) = counting_tree(json!({ ".v": "${{ n: count() }}" }));
    assert!(tree.has("v.n").await.unwrap());
    assert!(!tree.has("v.m").await.unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// =========================================================================
// Memoization
// =========================================================================

#[tokio::test]
async fn repeated_reads_run_resolver_once() {
    let (tree, calls) = counting_tree(json!({ ".v": "${count()}" }));
    assert_eq!(tree.get("v").await.unwrap(), Some(json!(1)));
    assert_eq!(tree.get("v").await.unwrap(), Some(json!(1)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(tree.cache_len(), 1);
}

#[tokio::test]
async fn dependent_reads_share_cached_result() {
    let (tree, calls) = counting_tree(json!({
        ".v": "${count()}",
        ".a": "a${v}",
        ".b": "b${v}"
    }));
    assert_eq!(tree.get("a").await.unwrap(), Some(json!("a1")));
    assert_eq!(tree.get("b").await.unwrap(), Some(json!("b1")));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn contexts_are_cached_separately() {
    let (tree, calls) = counting_tree(json!({ ".v": "${count()}" }));
    let es = || GetOptions::builder().context(context! { "lang" => "es" }).build();
    assert_eq!(tree.get("v").await.unwrap(), Some(json!(1)));
    assert_eq!(tree.get_with("v", es()).await.unwrap(), Some(json!(2)));
    assert_eq!(tree.get_with("v", es()).await.unwrap(), Some(json!(2)));
    assert_eq!(tree.get("v").await.unwrap(), Some(json!(1)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// =========================================================================
// Invalidation
// =========================================================================

#[tokio::test]
async fn set_invalidates_dependent_expression() {
    let tree = Tree::from_json(json!({ "name": "A", ".greet": "Hello, ${name}!" })).unwrap();
    assert_eq!(tree.get("greet").await.unwrap(), Some(json!("Hello, A!")));
    tree.set("name", "B").unwrap();
    assert_eq!(tree.get("greet").await.unwrap(), Some(json!("Hello, B!")));
}

#[tokio::test]
async fn invalidation_is_transitive() {
    let tree = Tree::from_json(json!({
        "name": "a",
        ".greet": "hi ${name}",
        ".shout": "${upper(greet)}"
    }))
    .unwrap();
    assert_eq!(tree.get("shout").await.unwrap(), Some(json!("HI A")));
    tree.set("name", "b").unwrap();
    assert_eq!(tree.get("shout").await.unwrap(), Some(json!("HI B")));
}

#[tokio::test]
async fn unrelated_write_keeps_cache() {
    let (tree, calls) = counting_tree(json!({ ".v": "${count()}", "other": 1 }));
    tree.get("v").await.unwrap();
    tree.set("other", 2).unwrap();
    assert_eq!(tree.get("v").await.unwrap(), Some(json!(1)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn ancestor_and_descendant_writes_invalidate() {
    let tree = Tree::from_json(json!({
        "user": { "name": { "first": "Ada" } },
        ".who": "${user.name.first}",
        ".all": "${user}"
    }))
    .unwrap();
    assert_eq!(tree.get("who").await.unwrap(), Some(json!("Ada")));
    assert_eq!(tree.get("all").await.unwrap(), Some(json!({ "name": { "first": "Ada" } })));

    tree.set("user", json!({ "name": { "first": "Grace" } })).unwrap();
    assert_eq!(tree.get("who").await.unwrap(), Some(json!("Grace")));

    tree.set("user.name.first", "Edsger").unwrap();
    assert_eq!(tree.get("all").await.unwrap(), Some(json!({ "name": { "first": "Edsger" } })));
}

#[tokio::test]
async fn replacing_an_expression_with_a_value() {
    let tree = Tree::from_json(json!({ "n": 1, ".double": "${n * 2}", ".view": "${double}" })).unwrap();
    assert_eq!(tree.get("view").await.unwrap(), Some(json!(2)));

    tree.set("double", 10).unwrap();
    assert_eq!(tree.to_json(), json!({ "n": 1, ".view": "${double}", "double": 10 }));
    assert_eq!(tree.get("view").await.unwrap(), Some(json!(10)));

    tree.set(".double", "${n * 3}").unwrap();
    assert_eq!(tree.get("view").await.unwrap(), Some(json!(3)));
}

#[tokio::test]
async fn adding_a_variant_invalidates_reads_of_the_slot() {
    let options = TreeOptions::builder().context(context! { "lang" => "es" }).build();
    let tree = Tree::new(json!({ "greet": "Hello", ".msg": "${greet}!" }), options).unwrap();
    assert_eq!(tree.get("msg").await.unwrap(), Some(json!("Hello!")));
    tree.set("greet:es", "Hola").unwrap();
    assert_eq!(tree.get("msg").await.unwrap(), Some(json!("Hola!")));
}

#[tokio::test]
async fn context_entry_change_invalidates_subtree() {
    let tree = Tree::from_json(json!({
        "box": { "greet": "Hello", "greet:es": "Hola", ".msg": "${greet}" }
    }))
    .unwrap();
    assert_eq!(tree.get("box.msg").await.unwrap(), Some(json!("Hello")));
    tree.set("box.$context", json!({ "lang": "es" })).unwrap();
    assert_eq!(tree.get("box.msg").await.unwrap(), Some(json!("Hola")));
}

#[tokio::test]
async fn delete_invalidates() {
    let tree = Tree::from_json(json!({ "nick": "ada", ".name": "${nick ?? 'anon'}" })).unwrap();
    assert_eq!(tree.get("name").await.unwrap(), Some(json!("ada")));
    assert!(tree.delete("nick").unwrap());
    assert_eq!(tree.get("name").await.unwrap(), Some(json!("anon")));
    assert!(!tree.delete("nick").unwrap());
}

#[tokio::test]
async fn clear_cache_forces_reevaluation() {
    let (tree, calls) = counting_tree(json!({ ".v": "${count()}" }));
    tree.get("v").await.unwrap();
    tree.clear_cache();
    assert_eq!(tree.cache_len(), 0);
    assert_eq!(tree.get("v").await.unwrap(), Some(json!(2)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// =========================================================================
// Fresh Evaluation
// =========================================================================

#[tokio::test]
async fn fresh_option_bypasses_and_refreshes_cache() {
    let (tree, calls) = counting_tree(json!({ ".v": "${count()}" }));
    assert_eq!(tree.get("v").await.unwrap(), Some(json!(1)));

    let fresh = GetOptions::builder().fresh(true).build();
    assert_eq!(tree.get_with("v", fresh).await.unwrap(), Some(json!(2)));
    assert_eq!(tree.get("v").await.unwrap(), Some(json!(2)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn inline_fresh_reevaluates_its_target() {
    let (tree, calls) = counting_tree(json!({
        ".v": "${count()}",
        ".snapshot": "${v}",
        ".live": "${fresh(v)}"
    }));
    assert_eq!(tree.get("snapshot").await.unwrap(), Some(json!(1)));
    assert_eq!(tree.get("live").await.unwrap(), Some(json!(2)));
    assert_eq!(tree.get("v").await.unwrap(), Some(json!(2)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// =========================================================================
// Concurrent Reads
// =========================================================================

#[tokio::test]
async fn concurrent_reads_share_one_evaluation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut registry = ResolverRegistry::new();
    registry.register_async("slow", move |_| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            yield_now().await;
            yield_now().await;
            Ok(json!("done"))
        }
    });
    let options = TreeOptions::builder().resolvers(registry).build();
    let tree = Tree::new(json!({ ".v": "${slow()}" }), options).unwrap();

    let (a, b, c) = tokio::join!(tree.get("v"), tree.get("v"), tree.get("v"));
    assert_eq!(a.unwrap(), Some(json!("done")));
    assert_eq!(b.unwrap(), Some(json!("done")));
    assert_eq!(c.unwrap(), Some(json!("done")));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_fresh_reads_do_not_coalesce() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut registry = ResolverRegistry::new();
    registry.register_async("slow", move |_| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            yield_now().await;
            Ok(json!("done"))
        }
    });
    let options = TreeOptions::builder().resolvers(registry).build();
    let tree = Tree::new(json!({ ".v": "${slow()}" }), options).unwrap();

    let fresh = || GetOptions::builder().fresh(true).build();
    let (a, b) = tokio::join!(tree.get_with("v", fresh()), tree.get_with("v", fresh()));
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn read_after_set_does_not_join_older_evaluation() {
    let doc = json!({ "name": "A", ".greet": "Hello, ${name}!${wait()}" });
    let (tree, release) = gated_tree(doc, Context::new());

    let first = tree.get("greet");
    let second = async {
        yield_now().await;
        tree.set("name", "B").unwrap();
        let after_set = tree.get("greet");
        release.send(()).unwrap();
        after_set.await
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.unwrap(), Some(json!("Hello, A!")));
    assert_eq!(second.unwrap(), Some(json!("Hello, B!")));
    assert_eq!(tree.get("greet").await.unwrap(), Some(json!("Hello, B!")));
}

#[tokio::test]
async fn read_after_context_change_does_not_join_older_evaluation() {
    let doc = json!({
        "greet": "Hello",
        "greet:es": "Hola",
        ".msg": "${greet}${wait()}"
    });
    let (tree, release) = gated_tree(doc, Context::new());

    let first = tree.get("msg");
    let second = async {
        yield_now().await;
        tree.set_context(context! { "lang" => "es" });
        let after_change = tree.get("msg");
        release.send(()).unwrap();
        after_change.await
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.unwrap(), Some(json!("Hello")));
    assert_eq!(second.unwrap(), Some(json!("Hola")));
    assert_eq!(tree.get("msg").await.unwrap(), Some(json!("Hola")));
}
