// src/cache.rs
// Bounded recency cache for format catalogs, keyed by normalized URL.
// Explicit ordered key list + map; no implicit map ordering is relied on.

use crate::formats::FormatCatalog;
use std::collections::HashMap;

/// Default capacity of the format cache.
pub const FORMAT_CACHE_MAX_ENTRIES: usize = 100;

/// A cached fetch result: the catalog snapshot plus the playlist flag the
/// fetch detected.
#[derive(Debug, Clone)]
pub struct CachedFormats {
    pub catalog: FormatCatalog,
    pub is_playlist: bool,
}

/// LRU map from URL to catalog snapshot. Insertion and lookup both promote
/// the entry to the most-recently-used end; overflow evicts from the
/// least-recently-used end. Entries are cloned in and out so cached state
/// cannot be mutated by callers.
#[derive(Debug)]
pub struct FormatCache {
    capacity: usize,
    /// LRU order: front is the oldest, back is the most recently used
    order: Vec<String>,
    entries: HashMap<String, CachedFormats>,
}

impl Default for FormatCache {
    fn default() -> Self {
        Self::new(FORMAT_CACHE_MAX_ENTRIES)
    }
}

impl FormatCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Look up a snapshot, promoting the entry on hit.
    pub fn get(&mut self, url: &str) -> Option<CachedFormats> {
        if !self.entries.contains_key(url) {
            return None;
        }
        self.touch(url);
        self.entries.get(url).cloned()
    }

    /// Insert (or replace) a snapshot at the most-recently-used position,
    /// evicting the least-recently-used entry when over capacity.
    pub fn insert(&mut self, url: &str, entry: CachedFormats) {
        if self.entries.insert(url.to_string(), entry).is_some() {
            self.touch(url);
        } else {
            self.order.push(url.to_string());
        }
        while self.entries.len() > self.capacity {
            let oldest = self.order.remove(0);
            self.entries.remove(&oldest);
        }
    }

    /// Move an existing key to the most-recently-used end.
    pub fn touch(&mut self, url: &str) {
        if let Some(pos) = self.order.iter().position(|key| key == url) {
            let key = self.order.remove(pos);
            self.order.push(key);
        }
    }

    /// Keys in LRU order (oldest first); test and diagnostics hook.
    pub fn keys(&self) -> &[String] {
        &self.order
    }
}
