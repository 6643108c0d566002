//! Memoized fetch cache.
//!
//! Every fetch entry point runs through [`FetchCache::get_or_fetch`]: the
//! first call for a key invokes the producer and stores the full table; every
//! later call with the same key returns the stored table without touching the
//! source again. Entries live for the whole process — no TTL, no
//! invalidation, no write-through.
//!
//! The storage backend is a trait so tests can inject a store that counts
//! producer invocations. The cache is written once per key by a single caller
//! and read-only afterwards; there is no locking.

use std::collections::HashMap;

use crate::error::AppError;

/// Deterministic cache key: dataset identity plus every argument that
/// affects the fetched table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    parts: Vec<String>,
}

impl CacheKey {
    pub fn new(dataset: &str) -> Self {
        CacheKey {
            parts: vec![dataset.to_string()],
        }
    }

    pub fn arg(mut self, part: impl std::fmt::Display) -> Self {
        self.parts.push(part.to_string());
        self
    }

    pub fn render(&self) -> String {
        self.parts.join("/")
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Storage backend for memoized tables.
pub trait CacheStore<V> {
    fn get(&self, key: &str) -> Option<V>;
    fn insert(&mut self, key: String, value: V);
}

/// Default process-local backend.
#[derive(Debug, Default)]
pub struct MemoryStore<V> {
    entries: HashMap<String, V>,
}

impl<V: Clone> CacheStore<V> for MemoryStore<V> {
    fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: String, value: V) {
        self.entries.insert(key, value);
    }
}

pub struct FetchCache<V> {
    store: Box<dyn CacheStore<V>>,
}

impl<V: Clone + 'static> FetchCache<V> {
    pub fn in_memory() -> Self {
        FetchCache {
            store: Box::new(MemoryStore {
                entries: HashMap::new(),
            }),
        }
    }

    pub fn with_store(store: Box<dyn CacheStore<V>>) -> Self {
        FetchCache { store }
    }

    /// Return the cached table for `key`, invoking `producer` only on the
    /// first call. Producer errors propagate and are not cached, so a later
    /// call may retry.
    pub fn get_or_fetch(
        &mut self,
        key: &CacheKey,
        producer: impl FnOnce() -> Result<V, AppError>,
    ) -> Result<V, AppError> {
        let rendered = key.render();
        if let Some(hit) = self.store.get(&rendered) {
            tracing::debug!(key = %rendered, "fetch cache hit");
            return Ok(hit);
        }

        let value = producer()?;
        self.store.insert(rendered, value.clone());
        Ok(value)
    }
}
