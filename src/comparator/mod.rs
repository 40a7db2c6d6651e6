//! Comparator Bridge: resolves comparator identifiers into callables that
//! order two raw value spans.
//!
//! Resolution runs once per identifier; results are cached by the bridge for
//! its lifetime and never invalidated.

use core::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::types::{BridgeError, EdgeKind, Result};

pub mod builtin;
#[cfg(unix)]
mod native;

pub use builtin::LessFn;
#[cfg(unix)]
pub use native::{NativeComparator, NativeLibrary, RawLessFn};

/// Orders two serialized values.
pub trait ValueComparator: Send + Sync {
    /// Returns whether `a` sorts before `b`.
    fn less(&self, a: &[u8], b: &[u8]) -> Result<bool>;

    /// Derives a total order from [`less`](Self::less).
    fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering> {
        if self.less(a, b)? {
            Ok(Ordering::Less)
        } else if self.less(b, a)? {
            Ok(Ordering::Greater)
        } else {
            Ok(Ordering::Equal)
        }
    }
}

impl ValueComparator for LessFn {
    fn less(&self, a: &[u8], b: &[u8]) -> Result<bool> {
        self(a, b)
    }
}

/// A place comparator identifiers can be looked up.
pub trait SymbolResolver: Send + Sync {
    /// Returns the comparator named `name`, if this resolver provides it.
    fn resolve_symbol(&self, name: &str) -> Option<Arc<dyn ValueComparator>>;

    /// Short label used in log events.
    fn describe(&self) -> String;
}

/// In-process comparators registered by name.
#[derive(Default)]
pub struct ComparatorRegistry {
    entries: HashMap<String, Arc<dyn ValueComparator>>,
}

impl ComparatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in comparators.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for &(name, func) in builtin::BUILTINS {
            registry.register_fn(name, func);
        }
        registry
    }

    /// Registers `comparator` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, comparator: Arc<dyn ValueComparator>) {
        self.entries.insert(name.into(), comparator);
    }

    /// Registers a plain function under `name`.
    pub fn register_fn(&mut self, name: impl Into<String>, func: LessFn) {
        self.register(name, Arc::new(func));
    }

    /// Number of registered comparators.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SymbolResolver for ComparatorRegistry {
    fn resolve_symbol(&self, name: &str) -> Option<Arc<dyn ValueComparator>> {
        self.entries.get(name).cloned()
    }

    fn describe(&self) -> String {
        "registry".to_owned()
    }
}

/// Maps comparator identifiers to cached comparators.
///
/// Resolvers are consulted in the order they were added.
pub struct ComparatorBridge {
    resolvers: Vec<Box<dyn SymbolResolver>>,
    cache: Mutex<HashMap<String, Arc<dyn ValueComparator>>>,
}

impl Default for ComparatorBridge {
    fn default() -> Self {
        Self::new().with_resolver(ComparatorRegistry::with_builtins())
    }
}

impl ComparatorBridge {
    /// Creates a bridge with no resolvers.
    pub fn new() -> Self {
        Self {
            resolvers: Vec::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Adds a resolver consulted after the existing ones.
    pub fn with_resolver(mut self, resolver: impl SymbolResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Resolves `id`, consulting the resolvers only on first use.
    pub fn resolve(&self, id: &str) -> Result<Arc<dyn ValueComparator>> {
        let mut cache = self.cache.lock();
        if let Some(found) = cache.get(id) {
            return Ok(Arc::clone(found));
        }
        for resolver in &self.resolvers {
            if let Some(found) = resolver.resolve_symbol(id) {
                debug!(id, source = %resolver.describe(), "comparator.resolve");
                cache.insert(id.to_owned(), Arc::clone(&found));
                return Ok(found);
            }
        }
        warn!(id, resolvers = self.resolvers.len(), "comparator.resolve.not_found");
        Err(BridgeError::ComparatorNotFound(id.to_owned()))
    }

    /// Resolves the value comparator of an edge.
    ///
    /// Only scatter-gather edges use comparators; other kinds, and
    /// scatter-gather edges without a value ordering, yield `None`.
    pub fn resolve_for_edge(
        &self,
        kind: EdgeKind,
        id: Option<&str>,
    ) -> Result<Option<Arc<dyn ValueComparator>>> {
        match (kind.is_keyed(), id) {
            (true, Some(id)) => self.resolve(id).map(Some),
            _ => Ok(None),
        }
    }

    /// Number of identifiers resolved so far.
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }
}
