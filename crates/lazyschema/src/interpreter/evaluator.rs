//! Expression evaluation engine.
//!
//! One [`Evaluation`] serves one top-level `get`. It walks the document,
//! evaluates expression keys on demand, memoizes their results and
//! materializes mappings. Nested references re-enter [`Evaluation::resolve`]
//! on the same evaluation, so the cycle and depth checks of its stack cover
//! the whole reference chain.
//!
//! The state lock is only ever taken inside synchronous helpers, never
//! across an `.await`.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::interpreter::builtins::{builtin, builtin_names};
use crate::interpreter::cache::{CacheEntry, CacheKey};
use crate::interpreter::context::EvalStack;
use crate::interpreter::document::{ExpressionSite, Located, base_names, locate};
use crate::interpreter::operators;
use crate::interpreter::tree::Inner;
use crate::interpreter::variant::resolve_variant;
use crate::interpreter::{ErrorAction, EvalError, GetOptions, compute_suggestions};
use crate::parser::{Expr, LogicalOp, RefSegment, Reference, Segment, Template, parse_template};
use crate::types::{CONTEXT_KEY, Context, Path, ValueExt, child_value, descend};

/// An evaluation failure on its way up the reference chain.
#[derive(Debug)]
pub(crate) struct Fault {
    pub error: EvalError,
    /// Set once the error hook has seen this failure.
    pub reported: bool,
}

impl From<EvalError> for Fault {
    fn from(error: EvalError) -> Self {
        Self {
            error,
            reported: false,
        }
    }
}

/// What a path names in the raw document, detached from the lock.
enum Found {
    Missing,
    Scalar(Value),
    /// Base name and concrete child path of every slot, variants collapsed.
    Mapping(Vec<(String, Path)>),
    List(Vec<Path>),
    Expression(ExpressionSite),
}

/// Run one top-level `get`.
pub(crate) async fn run(
    inner: Arc<Inner>,
    path: Path,
    options: GetOptions,
) -> Result<Option<Value>, EvalError> {
    let mut evaluation = Evaluation::new(
        inner,
        options.context.unwrap_or_default(),
        options.fallback.clone(),
    );
    match evaluation.resolve(&path, options.fresh).await {
        Ok(Some(value)) => Ok(Some(value)),
        Ok(None) => Ok(options.fallback),
        Err(fault) => Err(fault.error),
    }
}

/// Structural existence check, evaluating only when the path runs through
/// an expression's result.
pub(crate) async fn exists(inner: Arc<Inner>, path: Path) -> Result<bool, EvalError> {
    let mut evaluation = Evaluation::new(inner, Context::new(), None);
    match evaluation.find(&path) {
        Found::Missing => Ok(false),
        Found::Expression(site) if !site.rest.is_empty() => {
            let value = evaluation
                .evaluate_site(&site, false)
                .await
                .map_err(|fault| fault.error)?;
            Ok(descend(&value, &site.rest).is_some())
        }
        _ => Ok(true),
    }
}

pub(crate) struct Evaluation {
    inner: Arc<Inner>,
    stack: EvalStack,
    call_context: Context,
    fallback: Option<Value>,
}

impl Evaluation {
    pub fn new(inner: Arc<Inner>, call_context: Context, fallback: Option<Value>) -> Self {
        let stack = EvalStack::new(inner.options.max_depth);
        Self {
            inner,
            stack,
            call_context,
            fallback,
        }
    }

    /// Read `path`, evaluating and materializing as needed.
    pub async fn resolve(&mut self, path: &Path, fresh: bool) -> Result<Option<Value>, Fault> {
        match self.find(path) {
            Found::Missing => Ok(None),
            Found::Scalar(value) => Ok(Some(value)),
            Found::Mapping(children) => self.materialize(children, fresh).await.map(Some),
            Found::List(items) => self.materialize_list(items, fresh).await.map(Some),
            Found::Expression(site) => {
                let value = self.evaluate_site(&site, fresh).await?;
                if site.rest.is_empty() {
                    Ok(Some(value))
                } else {
                    Ok(descend(&value, &site.rest).cloned())
                }
            }
        }
    }

    /// Locate `path` under the lock and record what the walk depended on.
    fn find(&mut self, path: &Path) -> Found {
        let logical = path.logical();
        for prefix in logical.prefixes().take(logical.len()) {
            self.stack.record(prefix.child(CONTEXT_KEY));
        }
        self.stack.record(logical);

        let state = self.inner.state.lock();
        let base = state.context.merge(&self.call_context);
        match locate(&state.document, path, &base) {
            Located::Missing => Found::Missing,
            Located::Expression(site) => Found::Expression(site),
            Located::Static {
                path,
                value,
                context,
            } => match value {
                Value::Object(map) => Found::Mapping(
                    base_names(map)
                        .into_iter()
                        .filter_map(|name| {
                            let key =
                                resolve_variant(&name, &context, map.keys().map(String::as_str))?;
                            let child = path.child(key);
                            Some((name, child))
                        })
                        .collect(),
                ),
                Value::Array(items) => {
                    Found::List((0..items.len()).map(|i| path.child(i.to_string())).collect())
                }
                scalar => Found::Scalar(scalar.clone()),
            },
        }
    }

    fn materialize(
        &mut self,
        children: Vec<(String, Path)>,
        fresh: bool,
    ) -> BoxFuture<'_, Result<Value, Fault>> {
        async move {
            let mut map = Map::new();
            for (name, path) in children {
                let value = self.resolve(&path, fresh).await?.unwrap_or(Value::Null);
                map.insert(name, value);
            }
            Ok(Value::Object(map))
        }
        .boxed()
    }

    fn materialize_list(
        &mut self,
        items: Vec<Path>,
        fresh: bool,
    ) -> BoxFuture<'_, Result<Value, Fault>> {
        async move {
            let mut values = Vec::with_capacity(items.len());
            for path in items {
                values.push(self.resolve(&path, fresh).await?.unwrap_or(Value::Null));
            }
            Ok(Value::Array(values))
        }
        .boxed()
    }

    /// Evaluate one expression key, consulting and feeding the cache.
    pub async fn evaluate_site(
        &mut self,
        site: &ExpressionSite,
        fresh: bool,
    ) -> Result<Value, Fault> {
        let key = CacheKey {
            path: site.path.clone(),
            scope: site.context.fingerprint(),
        };
        if !fresh {
            if let Some(value) = self.cached(&key) {
                return Ok(value);
            }
        }

        debug!(path = %site.path, fresh, depth = self.stack.depth(), "evaluating expression");
        if let Err(error) = self.stack.push(&site.path) {
            return self.recover(error, &site.path);
        }
        let epoch = self.inner.state.lock().cache.begin();
        let result = match self.template(site) {
            Ok(template) => self.render(&template, site).await,
            Err(error) => Err(Fault::from(error)),
        };
        let frame = self.stack.pop();

        {
            // Finishing and storing under one lock keeps the stamps that can
            // still make this entry stale.
            let mut state = self.inner.state.lock();
            state.cache.finish(epoch);
            if let (Ok(value), Some(frame)) = (&result, frame.filter(|frame| frame.cacheable)) {
                let entry = CacheEntry {
                    value: value.clone(),
                    epoch,
                    deps: frame.deps,
                };
                state.cache.insert(key, entry);
            }
        }

        match result {
            Ok(value) => Ok(value),
            Err(fault) if fault.reported => Err(fault),
            Err(fault) => self.recover(fault.error, &site.path),
        }
    }

    fn cached(&mut self, key: &CacheKey) -> Option<Value> {
        let state = self.inner.state.lock();
        let Some(entry) = state.cache.lookup(key) else {
            debug!(path = %key.path, "cache miss");
            return None;
        };
        debug!(path = %key.path, "cache hit");
        self.stack.absorb(&entry.deps);
        Some(entry.value.clone())
    }

    /// Parsed template for the site's text, memoized by source.
    fn template(&self, site: &ExpressionSite) -> Result<Arc<Template>, EvalError> {
        let mut state = self.inner.state.lock();
        if let Some(template) = state.templates.get(&site.text) {
            return Ok(Arc::clone(template));
        }
        let template = parse_template(&site.text).map_err(|source| EvalError::Syntax {
            path: site.path.to_string(),
            source,
        })?;
        let template = Arc::new(template);
        state
            .templates
            .insert(site.text.clone(), Arc::clone(&template));
        Ok(template)
    }

    /// Hand a failure at `path` to the error hook.
    fn recover(&mut self, error: EvalError, path: &Path) -> Result<Value, Fault> {
        let Some(hook) = self.inner.options.on_error.clone() else {
            return Err(Fault {
                error,
                reported: true,
            });
        };
        let value = match hook(&error, &path.to_string()) {
            ErrorAction::Throw => {
                return Err(Fault {
                    error,
                    reported: true,
                });
            }
            ErrorAction::Fallback => self
                .fallback
                .clone()
                .or_else(|| self.inner.options.fallback.clone())
                .unwrap_or(Value::Null),
            ErrorAction::Value(value) => value,
        };
        warn!(path = %path, %error, "error hook substituted a value");
        self.stack.taint();
        Ok(value)
    }

    /// A single-span template keeps the span's type; anything else renders
    /// to text.
    async fn render(&mut self, template: &Template, site: &ExpressionSite) -> Result<Value, Fault> {
        if let Some(expr) = template.single_expression() {
            return self.eval(expr, site).await;
        }
        let mut text = String::new();
        for segment in &template.segments {
            match segment {
                Segment::Literal(literal) => text.push_str(literal),
                Segment::Interpolation(expr) => {
                    text.push_str(&self.eval(expr, site).await?.render());
                }
            }
        }
        Ok(Value::String(text))
    }

    fn eval<'a>(
        &'a mut self,
        expr: &'a Expr,
        site: &'a ExpressionSite,
    ) -> BoxFuture<'a, Result<Value, Fault>> {
        async move {
            match expr {
                Expr::Literal(value) => Ok(value.clone()),
                Expr::Template(template) => {
                    let value = self.render(template, site).await?;
                    Ok(match value {
                        Value::String(_) => value,
                        other => Value::String(other.render()),
                    })
                }
                Expr::Array(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(self.eval(item, site).await?);
                    }
                    Ok(Value::Array(values))
                }
                Expr::Object(entries) => {
                    let mut map = Map::new();
                    for (key, item) in entries {
                        let value = self.eval(item, site).await?;
                        map.insert(key.clone(), value);
                    }
                    Ok(Value::Object(map))
                }
                Expr::Reference(reference) => self.reference(reference, site, false).await,
                Expr::Fresh(reference) => self.reference(reference, site, true).await,
                Expr::Call { name, args } => {
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(self.eval(arg, site).await?);
                    }
                    self.call(name, values, site).await
                }
                Expr::Unary { op, operand } => {
                    let value = self.eval(operand, site).await?;
                    Ok(operators::unary(*op, &value)?)
                }
                Expr::Binary { op, left, right } => {
                    let left = self.eval(left, site).await?;
                    let right = self.eval(right, site).await?;
                    Ok(operators::binary(*op, &left, &right)?)
                }
                Expr::Logical { op, left, right } => self.logical(*op, left, right, site).await,
                Expr::Conditional {
                    condition,
                    then,
                    otherwise,
                } => {
                    if self.eval(condition, site).await?.truthy() {
                        self.eval(then, site).await
                    } else {
                        self.eval(otherwise, site).await
                    }
                }
                Expr::Member { object, key } => {
                    let value = self.eval(object, site).await?;
                    Ok(child_value(&value, key).cloned().unwrap_or(Value::Null))
                }
                Expr::Index { object, index } => {
                    let value = self.eval(object, site).await?;
                    let index = self.eval(index, site).await?;
                    let key = index_key(&index)?;
                    Ok(child_value(&value, &key).cloned().unwrap_or(Value::Null))
                }
            }
        }
        .boxed()
    }

    /// Short-circuiting operators return one of their operands.
    async fn logical(
        &mut self,
        op: LogicalOp,
        left: &Expr,
        right: &Expr,
        site: &ExpressionSite,
    ) -> Result<Value, Fault> {
        let left = match (op, self.eval(left, site).await) {
            // A missing direct reference is simply absent for `??`.
            (
                LogicalOp::Coalesce,
                Err(Fault {
                    error: EvalError::ReferenceNotFound { .. },
                    reported: false,
                }),
            ) => Value::Null,
            (_, result) => result?,
        };
        let take_left = match op {
            LogicalOp::And => !left.truthy(),
            LogicalOp::Or => left.truthy(),
            LogicalOp::Coalesce => !left.is_null(),
        };
        if take_left {
            Ok(left)
        } else {
            self.eval(right, site).await
        }
    }

    /// Resolve a document reference relative to the node owning `site`.
    async fn reference(
        &mut self,
        reference: &Reference,
        site: &ExpressionSite,
        fresh: bool,
    ) -> Result<Value, Fault> {
        let owner = site.owner();
        let Some(depth) = owner.len().checked_sub(reference.parents) else {
            return Err(EvalError::AncestorOutOfRange {
                path: format!("{}{}", "^.".repeat(reference.parents), owner),
            }
            .into());
        };

        let mut segments = Vec::with_capacity(reference.segments.len());
        // Positions in the full path of segments that may index an array.
        let mut indices = Vec::new();
        for segment in &reference.segments {
            let key = match segment {
                RefSegment::Key(key) => key.clone(),
                RefSegment::Index(expr) => {
                    let index = self.eval(expr, site).await?;
                    index_key(&index)?
                }
            };
            if key.parse::<usize>().is_ok() {
                indices.push(depth + segments.len());
            }
            segments.push(key);
        }

        if reference.parents == 0 && segments.first().is_some_and(|s| s == CONTEXT_KEY) {
            let context: Value = site
                .context
                .iter()
                .map(|(k, v)| (k.to_string(), Value::from(v)))
                .collect::<Map<String, Value>>()
                .into();
            return Ok(descend(&context, &segments[1..]).cloned().unwrap_or(Value::Null));
        }

        let path: Path = owner
            .prefix(depth)
            .segments()
            .iter()
            .cloned()
            .chain(segments)
            .collect();
        if let Some(value) = self.resolve(&path, fresh).await? {
            return Ok(value);
        }
        if self.past_array_end(&path, &indices).await? {
            return Ok(Value::Null);
        }
        Err(EvalError::ReferenceNotFound {
            path: path.to_string(),
        }
        .into())
    }

    /// True if the segment at one of `indices` addresses past the end of an
    /// array, which makes the whole reference absent rather than missing.
    async fn past_array_end(&mut self, path: &Path, indices: &[usize]) -> Result<bool, Fault> {
        for &at in indices {
            let Ok(index) = path.segments()[at].parse::<usize>() else {
                continue;
            };
            let len = match self.find(&path.prefix(at)) {
                Found::List(items) => items.len(),
                Found::Expression(site) => {
                    let value = self.evaluate_site(&site, false).await?;
                    match descend(&value, &site.rest) {
                        Some(Value::Array(items)) => items.len(),
                        _ => continue,
                    }
                }
                _ => continue,
            };
            if index >= len {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Call a built-in or a registered resolver.
    async fn call(
        &mut self,
        name: &str,
        args: Vec<Value>,
        site: &ExpressionSite,
    ) -> Result<Value, Fault> {
        if let Some(builtin) = builtin(name) {
            return Ok(builtin.call(&args, &site.context)?);
        }
        let resolvers = &self.inner.options.resolvers;
        let Some(resolver) = resolvers.get(name) else {
            let mut available = resolvers.names();
            available.extend(builtin_names().into_iter().map(str::to_string));
            return Err(EvalError::UnknownResolver {
                name: name.to_string(),
                suggestions: compute_suggestions(name, &available),
            }
            .into());
        };
        debug!(resolver = name, args = args.len(), "calling resolver");
        resolver.call(args).await.map_err(|error| {
            Fault::from(EvalError::Resolver {
                name: name.to_string(),
                message: error.message,
            })
        })
    }
}

/// Key or index named by a computed `[...]` value.
fn index_key(index: &Value) -> Result<String, EvalError> {
    match index {
        Value::String(key) => Ok(key.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        other => Err(EvalError::Type {
            message: format!("cannot index with {}", other.kind()),
        }),
    }
}
