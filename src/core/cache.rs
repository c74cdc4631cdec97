// Query-result cache keyed by the literal query text.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::error::Error;
use crate::core::row::Rows;

/// Where a result came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FetchSource {
    Database,
    Cache,
}

impl FetchSource {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchSource::Database => "database",
            FetchSource::Cache => "cache",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Unbounded map from query text to its fetched rows.
///
/// Keys are compared byte-for-byte: no whitespace or case normalization.
/// Entries are never evicted; the cache lives as long as its owner.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<String, Arc<Rows>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, query: &str) -> Option<Arc<Rows>> {
        self.lock().get(query).cloned()
    }

    /// Returns the cached rows for `query`, or runs `fetch` and stores its result.
    ///
    /// `fetch` is not called on a hit. A failed fetch stores nothing. When two
    /// callers miss on the same key at once, the first stored value wins.
    pub fn get_or_fetch<F>(&self, query: &str, fetch: F) -> Result<(Arc<Rows>, FetchSource), Error>
    where
        F: FnOnce() -> Result<Rows, Error>,
    {
        if let Some(rows) = self.get(query) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(query, "Using cached result");
            return Ok((rows, FetchSource::Cache));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(query, "cache miss");
        let fetched = Arc::new(fetch()?);
        let stored = Arc::clone(
            self.lock()
                .entry(query.to_string())
                .or_insert(fetched),
        );
        Ok((stored, FetchSource::Database))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Rows>>> {
        // Entries are whole Arc swaps, so a poisoned map is still consistent.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
