//! Collection Cache
//!
//! Holds the last fetched full snapshot (unfiltered, unsorted, unpaged) of
//! each collection type. Entries are replaced whole or dropped, never
//! patched.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct CollectionCache {
    entries: HashMap<String, Arc<Vec<Value>>>,
}

impl CollectionCache {
    pub fn get(&self, key: &str) -> Option<Arc<Vec<Value>>> {
        self.entries.get(key).cloned()
    }

    /// Store a freshly fetched snapshot; a concurrent fetch that finishes later wins
    pub fn store(&mut self, key: &str, records: Vec<Value>) -> Arc<Vec<Value>> {
        tracing::info!("cached {} records for {}", records.len(), key);
        let records = Arc::new(records);
        self.entries.insert(key.to_string(), Arc::clone(&records));
        records
    }

    pub fn invalidate(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            tracing::debug!("cache for {} invalidated", key);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_store_replaces_whole_entry() {
        let mut cache = CollectionCache::default();
        assert!(cache.get("categories").is_none());

        cache.store("categories", vec![json!({"id": "1"}), json!({"id": "2"})]);
        assert_eq!(cache.get("categories").unwrap().len(), 2);

        cache.store("categories", vec![json!({"id": "3"})]);
        let entry = cache.get("categories").unwrap();
        assert_eq!(entry.len(), 1);
        assert_eq!(entry[0]["id"], "3");
    }

    #[test]
    fn test_snapshot_survives_invalidate() {
        let mut cache = CollectionCache::default();
        let held = cache.store("sites", vec![json!({"id": "1"})]);
        cache.invalidate("sites");
        assert!(cache.get("sites").is_none());
        assert_eq!(held.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut cache = CollectionCache::default();
        cache.store("a", vec![]);
        cache.store("b", vec![]);
        cache.clear();
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_none());
    }
}
