//! Dependency model.
//!
//! Every dependency a handler declares is either *registered* at bus
//! construction (`name -> constructor`, instantiated fresh per `handle()`
//! call unless wrapped in [`Singleton`]) or *transient* (passed as a named
//! override to a single `handle()` call). Every resolved dependency exposes
//! `on_after_commit`/`on_after_rollback` hooks that fire, in attachment
//! order, after the unit-of-work's own commit/rollback but before scope
//! exit releases the transaction.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BusError;

/// A per-transaction service with commit/rollback lifecycle hooks.
///
/// Both methods default to no-ops so simple dependencies (e.g. a read-only
/// client) need not implement either.
#[async_trait]
pub trait Dependency: Send + Sync {
    async fn on_after_commit(&self) {}
    async fn on_after_rollback(&self) {}
}

/// A resolved dependency instance, paired for both typed lookup (`any`) and
/// lifecycle hook dispatch (`hook`) without requiring an unsafe downcast
/// through a combined trait object.
#[derive(Clone)]
pub struct ResolvedDependency {
    any: Arc<dyn Any + Send + Sync>,
    hook: Arc<dyn Dependency>,
}

impl ResolvedDependency {
    pub fn new<T: Dependency + Send + Sync + 'static>(value: T) -> Self {
        let arc = Arc::new(value);
        Self {
            any: arc.clone(),
            hook: arc,
        }
    }

    pub fn hook(&self) -> Arc<dyn Dependency> {
        self.hook.clone()
    }
}

/// Builds a fresh [`ResolvedDependency`] for every `handle()` call, unless
/// wrapped in [`Singleton`].
#[async_trait]
pub trait DependencyConstructor: Send + Sync {
    async fn construct(&self) -> ResolvedDependency;
}

/// Wraps a closure-like constructor producing a new dependency per call.
pub struct Transient<F>(pub F);

#[async_trait]
impl<T, F> DependencyConstructor for Transient<F>
where
    T: Dependency + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync,
{
    async fn construct(&self) -> ResolvedDependency {
        ResolvedDependency::new((self.0)())
    }
}

/// Wraps a single shared instance, handed out unchanged to every `handle()`
/// call — the "singleton object" case from §4.7.
pub struct Singleton(ResolvedDependency);

impl Singleton {
    pub fn new<T: Dependency + Send + Sync + 'static>(value: T) -> Self {
        Self(ResolvedDependency::new(value))
    }
}

#[async_trait]
impl DependencyConstructor for Singleton {
    async fn construct(&self) -> ResolvedDependency {
        self.0.clone()
    }
}

/// Transient, per-call dependency overrides, supplied as named arguments to
/// `MessageBus::handle`. These override or supplement the bus's registered
/// dependency map for that one call.
#[derive(Default)]
pub struct Overrides {
    values: HashMap<&'static str, ResolvedDependency>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Dependency + Send + Sync + 'static>(
        mut self,
        name: &'static str,
        value: T,
    ) -> Self {
        self.values.insert(name, ResolvedDependency::new(value));
        self
    }
}

/// The resolved dependency map handed to a handler invocation.
pub struct DependencyBag {
    values: HashMap<&'static str, ResolvedDependency>,
}

impl DependencyBag {
    pub(crate) fn new(values: HashMap<&'static str, ResolvedDependency>) -> Self {
        Self { values }
    }

    pub(crate) fn hooks(&self) -> Vec<Arc<dyn Dependency>> {
        self.values.values().map(ResolvedDependency::hook).collect()
    }

    /// Resolves a required dependency by name, downcast to `T`.
    pub fn require<T: Send + Sync + 'static>(&self, name: &'static str) -> Result<Arc<T>, BusError> {
        self.values
            .get(name)
            .ok_or_else(|| BusError::MissingDependency(name.to_string()))?
            .any
            .clone()
            .downcast::<T>()
            .map_err(|_| BusError::MissingDependency(name.to_string()))
    }

    /// Resolves an optional dependency by name. Returns `None` if absent —
    /// never raises `MissingDependency`.
    pub fn optional<T: Send + Sync + 'static>(&self, name: &'static str) -> Option<Arc<T>> {
        self.values.get(name)?.any.clone().downcast::<T>().ok()
    }
}

pub(crate) async fn build_bag(
    registered: &HashMap<&'static str, Arc<dyn DependencyConstructor>>,
    overrides: Overrides,
) -> DependencyBag {
    let mut values = HashMap::new();
    for (name, ctor) in registered {
        values.insert(*name, ctor.construct().await);
    }
    for (name, resolved) in overrides.values {
        values.insert(name, resolved);
    }
    DependencyBag::new(values)
}
