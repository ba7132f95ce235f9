//! LRU cache of compiled expressions
//!
//! Keyed by expression text and the sorted bindings. The lock is held across
//! compilation, so concurrent callers compile a given key once.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;

use super::bindings::NamespaceBindings;
use super::compiler::CompiledExpression;
use crate::error::CompileError;

type CacheKey = (String, Vec<(String, String)>);

/// Shared cache of compiled XPath expressions
pub struct ExpressionCache {
    entries: Mutex<LruCache<CacheKey, Arc<CompiledExpression>>>,
}

impl ExpressionCache {
    /// Create a cache holding up to `capacity` expressions; `None` for 0
    pub fn new(capacity: usize) -> Option<Self> {
        NonZeroUsize::new(capacity).map(|capacity| ExpressionCache {
            entries: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Return the cached expression, compiling and inserting it on a miss
    ///
    /// Compile errors are not cached.
    pub fn get_or_compile(
        &self,
        expression: &str,
        bindings: &NamespaceBindings,
    ) -> Result<Arc<CompiledExpression>, CompileError> {
        let key = (expression.to_string(), bindings.sorted());
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(compiled) = entries.get(&key) {
            tracing::trace!(expression, "expression cache hit");
            return Ok(Arc::clone(compiled));
        }
        let compiled = Arc::new(CompiledExpression::compile(expression, bindings)?);
        entries.put(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl std::fmt::Debug for ExpressionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionCache").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_disables_cache() {
        assert!(ExpressionCache::new(0).is_none());
    }

    #[test]
    fn hit_returns_same_instance() {
        let cache = ExpressionCache::new(4).unwrap();
        let bindings = NamespaceBindings::new();
        let a = cache.get_or_compile("//a", &bindings).unwrap();
        let b = cache.get_or_compile("//a", &bindings).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn bindings_are_part_of_the_key() {
        let cache = ExpressionCache::new(4).unwrap();
        let one = NamespaceBindings::new().with("p", "urn:one").unwrap();
        let two = NamespaceBindings::new().with("p", "urn:two").unwrap();
        let a = cache.get_or_compile("//p:a", &one).unwrap();
        let b = cache.get_or_compile("//p:a", &two).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let cache = ExpressionCache::new(2).unwrap();
        let bindings = NamespaceBindings::new();
        let a = cache.get_or_compile("a", &bindings).unwrap();
        cache.get_or_compile("b", &bindings).unwrap();
        cache.get_or_compile("a", &bindings).unwrap();
        cache.get_or_compile("c", &bindings).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(Arc::ptr_eq(&a, &cache.get_or_compile("a", &bindings).unwrap()));
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = ExpressionCache::new(2).unwrap();
        assert!(cache.get_or_compile("//q:a", &NamespaceBindings::new()).is_err());
        assert!(cache.is_empty());
    }
}
