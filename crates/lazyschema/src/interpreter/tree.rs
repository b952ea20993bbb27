//! The [`Tree`] handle and the shared state behind it.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::fs;
use std::path::Path as FsPath;
use std::str::FromStr;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::interpreter::cache::{Cache, CacheKey};
use crate::interpreter::document::{self, Located, base_names, locate};
use crate::interpreter::evaluator::{exists, run};
use crate::interpreter::node::{Field, Node};
use crate::interpreter::{
    EvalError, GetOptions, LoadError, SetError, TreeOptions, VariantGroup,
};
use crate::parser::Template;
use crate::types::{Context, Path, ValueExt};

// =========================================================================
// Shared state
// =========================================================================

type GetResult = Result<Option<Value>, EvalError>;

/// Identifies top-level reads that can share one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct InflightKey {
    path: Path,
    scope: String,
    fallback: String,
    generation: u64,
}

pub(crate) struct State {
    pub document: Value,
    /// Global context, replaceable through [`Tree::set_context`].
    pub context: Context,
    pub cache: Cache,
    /// Parsed expressions by source text.
    pub templates: HashMap<String, Arc<Template>>,
    pub inflight: HashMap<InflightKey, Shared<BoxFuture<'static, GetResult>>>,
    /// Bumped by every write and context change. Reads never join an
    /// evaluation started under an older generation.
    pub generation: u64,
}

impl State {
    fn bump(&mut self) {
        self.generation += 1;
    }
}

pub(crate) struct Inner {
    pub options: TreeOptions,
    pub state: Mutex<State>,
}

// =========================================================================
// Tree
// =========================================================================

/// A JSON document whose expression keys evaluate on demand.
///
/// Keys starting with `.` hold `${...}` templates. Reading a path evaluates
/// the expressions it runs through, memoizes their results, and tracks what
/// each result read so later writes invalidate exactly the entries that
/// depend on them.
///
/// `Tree` is a cheap handle; clones share the document and cache.
///
/// # Example
///
/// ```
/// use lazyschema::Tree;
/// use serde_json::json;
///
/// # futures::executor::block_on(async {
/// let tree = Tree::from_json(json!({
///     "name": "Ada",
///     ".greet": "Hello, ${name}!",
/// }))
/// .unwrap();
/// assert_eq!(tree.get("greet").await.unwrap(), Some(json!("Hello, Ada!")));
///
/// tree.set("name", "Grace").unwrap();
/// assert_eq!(tree.get("greet").await.unwrap(), Some(json!("Hello, Grace!")));
/// # });
/// ```
#[derive(Clone)]
pub struct Tree {
    inner: Arc<Inner>,
}

impl Tree {
    /// Build a tree over `document`, whose root must be an object.
    pub fn new(document: Value, options: TreeOptions) -> Result<Self, LoadError> {
        if !document.is_object() {
            return Err(LoadError::NotAnObject {
                found: document.kind(),
            });
        }
        let state = State {
            document,
            context: options.context.clone(),
            cache: Cache::default(),
            templates: HashMap::new(),
            inflight: HashMap::new(),
            generation: 0,
        };
        Ok(Self {
            inner: Arc::new(Inner {
                options,
                state: Mutex::new(state),
            }),
        })
    }

    /// Build a tree with default options.
    pub fn from_json(document: Value) -> Result<Self, LoadError> {
        Self::new(document, TreeOptions::default())
    }

    /// Read and parse a JSON document from disk.
    pub fn from_path(path: impl AsRef<FsPath>, options: TreeOptions) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let document: Value = serde_json::from_str(&content)?;
        let tree = Self::new(document, options)?;
        info!(path = %path.display(), "loaded document");
        Ok(tree)
    }

    pub fn options(&self) -> &TreeOptions {
        &self.inner.options
    }

    /// Facade over the document root.
    pub fn root(&self) -> Node {
        Node::new(self.clone(), Path::root())
    }

    /// Facade over the mapping at `path`.
    pub fn node(&self, path: &str) -> Result<Node, EvalError> {
        Ok(Node::new(self.clone(), absolute(&Path::root(), path)?))
    }

    // =====================================================================
    // Reads
    // =====================================================================

    /// Evaluate `path`. Returns `None` if nothing lives there.
    pub async fn get(&self, path: &str) -> GetResult {
        self.get_with(path, GetOptions::default()).await
    }

    pub async fn get_with(&self, path: &str, options: GetOptions) -> GetResult {
        let path = absolute(&Path::root(), path)?;
        self.get_at(path, options).await
    }

    /// Concurrent non-fresh reads of the same path under the same call
    /// options share one evaluation.
    pub(crate) async fn get_at(&self, path: Path, options: GetOptions) -> GetResult {
        if options.fresh {
            return run(Arc::clone(&self.inner), path, options).await;
        }
        let mut key = InflightKey {
            path: path.clone(),
            scope: options
                .context
                .as_ref()
                .map(Context::fingerprint)
                .unwrap_or_default(),
            fallback: options
                .fallback
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_default(),
            generation: 0,
        };
        let shared = {
            let mut state = self.inner.state.lock();
            key.generation = state.generation;
            match state.inflight.get(&key).cloned() {
                Some(shared) => {
                    debug!(path = %path, "joining in-flight evaluation");
                    shared
                }
                None => {
                    let inner = Arc::clone(&self.inner);
                    let done = key.clone();
                    let future = async move {
                        let result = run(Arc::clone(&inner), path, options).await;
                        inner.state.lock().inflight.remove(&done);
                        result
                    }
                    .boxed()
                    .shared();
                    state.inflight.insert(key, future.clone());
                    future
                }
            }
        };
        shared.await
    }

    /// True if `path` names something, evaluating only expressions the
    /// path runs through.
    pub async fn has(&self, path: &str) -> Result<bool, EvalError> {
        let path = absolute(&Path::root(), path)?;
        self.has_at(path).await
    }

    pub(crate) async fn has_at(&self, path: Path) -> Result<bool, EvalError> {
        exists(Arc::clone(&self.inner), path).await
    }

    /// Base names of the mapping at `path`, with variants collapsed and
    /// `$context` left out. Array paths list their indices. Expressions are
    /// not evaluated.
    pub fn keys(&self, path: &str) -> Result<Vec<String>, EvalError> {
        let path = absolute(&Path::root(), path)?;
        Ok(self.keys_at(&path))
    }

    pub(crate) fn keys_at(&self, path: &Path) -> Vec<String> {
        let state = self.inner.state.lock();
        match locate(&state.document, path, &state.context) {
            Located::Static {
                value: Value::Object(map),
                ..
            } => base_names(map),
            Located::Static {
                value: Value::Array(items),
                ..
            } => (0..items.len()).map(|i| format!("{i}")).collect(),
            _ => Vec::new(),
        }
    }

    /// What currently sits at `path`, without evaluating anything.
    pub(crate) fn field_at(&self, path: &Path) -> Field {
        let state = self.inner.state.lock();
        match locate(&state.document, path, &state.context) {
            Located::Missing => Field::Absent,
            Located::Static { value, .. } if value.is_object() => {
                Field::Node(Node::new(self.clone(), path.clone()))
            }
            Located::Static { value, .. } => Field::Value(value.clone()),
            Located::Expression(site) => {
                let key = CacheKey {
                    path: site.path.clone(),
                    scope: site.context.fingerprint(),
                };
                match state.cache.lookup(&key) {
                    Some(entry) if site.rest.is_empty() => Field::Value(entry.value.clone()),
                    _ => Field::Unset,
                }
            }
        }
    }

    // =====================================================================
    // Writes
    // =====================================================================

    /// Write `value` at `path`, creating intermediate objects.
    ///
    /// Writing `a.b` replaces an expression stored at `a..b` and the other
    /// way round. Cached results that read `path`, an ancestor of it, or a
    /// descendant of it are invalidated.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<(), SetError> {
        let path = absolute_for_write(&Path::root(), path)?;
        self.set_at(&path, value.into())
    }

    pub(crate) fn set_at(&self, path: &Path, value: Value) -> Result<(), SetError> {
        let mut state = self.inner.state.lock();
        let state = &mut *state;
        document::write(&mut state.document, path, value, &state.context)?;
        state.cache.invalidate(path);
        state.bump();
        debug!(path = %path, "set");
        Ok(())
    }

    /// Remove the slot at `path`. Returns whether anything was removed.
    pub fn delete(&self, path: &str) -> Result<bool, SetError> {
        let path = absolute_for_write(&Path::root(), path)?;
        self.delete_at(&path)
    }

    pub(crate) fn delete_at(&self, path: &Path) -> Result<bool, SetError> {
        let mut state = self.inner.state.lock();
        let removed = document::remove(&mut state.document, path)?;
        if removed {
            state.cache.invalidate(path);
            state.bump();
            debug!(path = %path, "deleted");
        }
        Ok(removed)
    }

    /// Replace the mapping at `path` with an empty one.
    pub fn clear(&self, path: &str) -> Result<(), SetError> {
        let path = absolute_for_write(&Path::root(), path)?;
        self.clear_at(&path)
    }

    pub(crate) fn clear_at(&self, path: &Path) -> Result<(), SetError> {
        if path.is_root() {
            let mut state = self.inner.state.lock();
            state.document = Value::Object(Map::new());
            state.cache.invalidate(path);
            state.bump();
            debug!("cleared document");
            return Ok(());
        }
        self.set_at(path, Value::Object(Map::new()))
    }

    // =====================================================================
    // Cache and context
    // =====================================================================

    /// Drop every memoized result.
    pub fn clear_cache(&self) {
        let mut state = self.inner.state.lock();
        state.cache.clear();
        state.bump();
    }

    /// Number of memoized results currently stored.
    pub fn cache_len(&self) -> usize {
        self.inner.state.lock().cache.len()
    }

    pub fn context(&self) -> Context {
        self.inner.state.lock().context.clone()
    }

    /// Replace the global context. Memoized results are dropped.
    pub fn set_context(&self, context: Context) {
        let mut state = self.inner.state.lock();
        debug!(context = %context.fingerprint(), "context replaced");
        state.context = context;
        state.cache.clear();
        state.bump();
    }

    // =====================================================================
    // Inspection
    // =====================================================================

    /// The raw document, expressions unevaluated.
    pub fn to_json(&self) -> Value {
        self.inner.state.lock().document.clone()
    }

    /// Concrete paths of every expression key.
    pub fn expression_paths(&self) -> Vec<Path> {
        document::expression_paths(&self.inner.state.lock().document)
    }

    /// Variant groups of the document ranked for `context` layered over
    /// the global context.
    pub fn variant_groups(&self, context: &Context) -> Vec<VariantGroup> {
        let state = self.inner.state.lock();
        document::variant_groups(&state.document, &state.context.merge(context))
    }
}

impl FromStr for Tree {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json(serde_json::from_str(s)?)
    }
}

impl Debug for Tree {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Tree")
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

/// Resolve a possibly relative path string against `base`.
pub(crate) fn absolute(base: &Path, text: &str) -> Result<Path, EvalError> {
    Ok(base.join(&Path::parse(text)?)?)
}

pub(crate) fn absolute_for_write(base: &Path, text: &str) -> Result<Path, SetError> {
    Ok(base.join(&Path::parse(text)?)?)
}
