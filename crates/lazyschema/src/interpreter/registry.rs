//! Resolver registry for functions callable from expressions.

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::interpreter::ResolverError;

/// A function that expressions can call by name.
///
/// Arguments arrive already evaluated, left to right.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn call(&self, args: Vec<Value>) -> Result<Value, ResolverError>;
}

struct FnResolver<F>(F);

#[async_trait]
impl<F> Resolver for FnResolver<F>
where
    F: Fn(Vec<Value>) -> Result<Value, ResolverError> + Send + Sync,
{
    async fn call(&self, args: Vec<Value>) -> Result<Value, ResolverError> {
        (self.0)(args)
    }
}

struct AsyncFnResolver<F, Fut>(F, PhantomData<fn() -> Fut>);

#[async_trait]
impl<F, Fut> Resolver for AsyncFnResolver<F, Fut>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ResolverError>> + Send + 'static,
{
    async fn call(&self, args: Vec<Value>) -> Result<Value, ResolverError> {
        (self.0)(args).await
    }
}

/// A registry of resolvers keyed by dotted name.
///
/// Namespaces are plain name prefixes: a resolver registered as `fmt.date`
/// is called as `${fmt.date(when)}`, and [`nest`](Self::nest) mounts a
/// whole registry under such a prefix.
///
/// # Example
///
/// ```
/// use lazyschema::ResolverRegistry;
/// use serde_json::{Value, json};
///
/// let mut text = ResolverRegistry::new();
/// text.register_fn("shout", |args| {
///     Ok(json!(args[0].as_str().unwrap_or_default().to_uppercase()))
/// });
///
/// let mut registry = ResolverRegistry::new();
/// registry.nest("text", text);
/// assert!(registry.contains("text.shout"));
/// ```
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    resolvers: BTreeMap<String, Arc<dyn Resolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolver object.
    pub fn register(&mut self, name: impl Into<String>, resolver: impl Resolver + 'static) -> &mut Self {
        self.resolvers.insert(name.into(), Arc::new(resolver));
        self
    }

    /// Register a synchronous function.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(Vec<Value>) -> Result<Value, ResolverError> + Send + Sync + 'static,
    {
        self.register(name, FnResolver(f))
    }

    /// Register a function returning a future.
    pub fn register_async<F, Fut>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ResolverError>> + Send + 'static,
    {
        self.register(name, AsyncFnResolver(f, PhantomData))
    }

    /// Mount every resolver of `registry` under `prefix.`.
    pub fn nest(&mut self, prefix: &str, registry: ResolverRegistry) -> &mut Self {
        self.resolvers.extend(
            registry
                .resolvers
                .into_iter()
                .map(|(name, resolver)| (format!("{prefix}.{name}"), resolver)),
        );
        self
    }

    /// Get a resolver by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Resolver>> {
        self.resolvers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolvers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.resolvers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl Debug for ResolverRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ResolverRegistry")
            .field("names", &self.resolvers.keys().collect::<Vec<_>>())
            .finish()
    }
}
