//! Soft-capped, insertion-order caches (§3 "CacheKey and Cache")

use indexmap::IndexMap;

/// A single cache: keyed by a canonical string, soft-capped, evicting the
/// oldest half (by insertion order) when the cap is exceeded.
#[derive(Debug, Clone)]
pub struct Cache<V> {
    entries: IndexMap<String, V>,
    soft_cap: usize,
}

impl<V> Cache<V> {
    pub fn new(soft_cap: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            soft_cap,
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, value: V) {
        self.entries.insert(key, value);
        if self.entries.len() > self.soft_cap {
            self.evict_oldest_half();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate keys in insertion order, oldest first — used by callers that
    /// need to find a prefix match among existing entries (§4.3 "partial-
    /// prefix reuse").
    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.entries.iter()
    }

    fn evict_oldest_half(&mut self) {
        let to_remove = self.entries.len() / 2;
        for _ in 0..to_remove {
            self.entries.shift_remove_index(0);
        }
        tracing::debug!(removed = to_remove, cap = self.soft_cap, "cache evicted oldest half");
    }
}

/// Canonical cache-key builders (§3). `element_key` backs
/// `HierarchicalResolver`'s own cache; `attrs_key`/`children_key` back the
/// two caches `Engine` keeps per loaded schema for attribute lists and
/// possible-children results.
pub mod keys {
    /// `element::ancestor1|ancestor2|…`
    pub fn element_key(element: &str, hierarchy: &[String]) -> String {
        format!("{element}::{}", hierarchy.join("|"))
    }

    /// `attrs:element:ancestor1>…`
    pub fn attrs_key(element: &str, hierarchy: &[String]) -> String {
        format!("attrs:{element}:{}", hierarchy.join(">"))
    }

    /// `children:element:ancestors:prev`
    pub fn children_key(element: &str, hierarchy: &[String], previous_sibling: Option<&str>) -> String {
        format!(
            "children:{element}:{}:{}",
            hierarchy.join(">"),
            previous_sibling.unwrap_or("")
        )
    }
}
