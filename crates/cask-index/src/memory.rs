//! In-memory index backend for testing, embedding, and write-through.
//!
//! [`InMemoryContentIndexMap`] keeps all entries in a `HashMap` behind a
//! `RwLock`. It is the usual target configured as an aggregator's writable
//! backend, and the reference implementation of [`ContentIndexMap`].

use std::collections::HashMap;
use std::sync::RwLock;

use cask_types::ObjectId;

use crate::traits::ContentIndexMap;

/// A plain `HashMap`-backed implementation of [`ContentIndexMap`].
///
/// Entries live in memory behind a `RwLock` for safe concurrent access and
/// are lost when the map is dropped.
pub struct InMemoryContentIndexMap {
    entries: RwLock<HashMap<String, ObjectId>>,
}

impl InMemoryContentIndexMap {
    /// Create a new empty index map.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries currently indexed.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no entries are indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Remove the entry for `name`. Returns `true` if it existed.
    pub fn remove(&self, name: &str) -> bool {
        self.entries
            .write()
            .expect("lock poisoned")
            .remove(name)
            .is_some()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.entries.write().expect("lock poisoned").clear();
    }
}

impl Default for InMemoryContentIndexMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentIndexMap for InMemoryContentIndexMap {
    fn try_get(&self, name: &str) -> Option<ObjectId> {
        self.entries.read().expect("lock poisoned").get(name).copied()
    }

    fn insert(&self, name: &str, id: ObjectId) {
        self.entries
            .write()
            .expect("lock poisoned")
            .insert(name.to_string(), id);
    }

    fn merged_view(&self) -> Vec<(String, ObjectId)> {
        let entries = self.entries.read().expect("lock poisoned");
        let mut view: Vec<(String, ObjectId)> =
            entries.iter().map(|(k, v)| (k.clone(), *v)).collect();
        view.sort_by(|(a, _), (b, _)| a.cmp(b));
        view
    }
}

impl std::fmt::Debug for InMemoryContentIndexMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentIndexMap")
            .field("entry_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(data: &[u8]) -> ObjectId {
        ObjectId::from_bytes(data)
    }

    #[test]
    fn insert_and_try_get() {
        let map = InMemoryContentIndexMap::new();
        map.insert("textures/grass", id(b"grass"));

        assert_eq!(map.try_get("textures/grass"), Some(id(b"grass")));
        assert!(map.contains("textures/grass"));
    }

    #[test]
    fn try_get_missing_returns_none() {
        let map = InMemoryContentIndexMap::new();
        assert_eq!(map.try_get("nope"), None);
        assert!(!map.contains("nope"));
    }

    #[test]
    fn insert_overwrites() {
        let map = InMemoryContentIndexMap::new();
        map.insert("a", id(b"one"));
        map.insert("a", id(b"two"));
        assert_eq!(map.try_get("a"), Some(id(b"two")));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn remove_present_and_missing() {
        let map = InMemoryContentIndexMap::new();
        map.insert("a", id(b"a"));
        assert!(map.remove("a"));
        assert!(!map.remove("a"));
        assert!(map.is_empty());
    }

    #[test]
    fn merged_view_is_sorted() {
        let map = InMemoryContentIndexMap::new();
        map.insert("b", id(b"b"));
        map.insert("a", id(b"a"));
        map.insert("c", id(b"c"));

        let view = map.merged_view();
        let names: Vec<&str> = view.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn search_filters_by_predicate() {
        let map = InMemoryContentIndexMap::new();
        map.insert("textures/grass", id(b"grass"));
        map.insert("textures/stone", id(b"stone"));
        map.insert("models/tree", id(b"tree"));

        let textures = map.search(&|name, _| name.starts_with("textures/"));
        assert_eq!(textures.len(), 2);
        assert!(textures.iter().all(|(n, _)| n.starts_with("textures/")));
    }

    #[test]
    fn clear_removes_all() {
        let map = InMemoryContentIndexMap::new();
        map.insert("a", id(b"a"));
        map.insert("b", id(b"b"));
        map.clear();
        assert!(map.is_empty());
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let map = Arc::new(InMemoryContentIndexMap::new());
        map.insert("shared", id(b"shared"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let map = Arc::clone(&map);
                thread::spawn(move || {
                    assert_eq!(map.try_get("shared"), Some(ObjectId::from_bytes(b"shared")));
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
    }
}
