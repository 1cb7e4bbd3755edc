//! The layering aggregator: many index sources merged into one mapping.
//!
//! [`ObjectDatabaseContentIndexMap`] is the map an object database exposes
//! to consumers. Several sources (the local build output, shipped asset
//! bundles) are merged into one effective table at runtime, and individual
//! sources can be unmerged again when a bundle is unmounted. Point writes
//! optionally flow through to one designated writable backend so that new
//! content lands somewhere durable while staying visible in the merged
//! view.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cask_types::ObjectId;

use crate::traits::ContentIndexMap;

/// Aggregates multiple index sources into one effective name→id mapping.
///
/// Merge semantics are last-merge-wins: merging a batch unconditionally
/// overwrites the table entry for each name, with no ordering or version
/// comparison. Unmerging removes entries by name only; the supplied id is
/// deliberately not compared against the stored one, matching the
/// last-writer-wins model (a name re-merged by a different source in
/// between is still removed).
///
/// Every operation, mutating or reading, runs inside one critical section
/// per instance: readers never observe a partially-applied batch. The
/// access pattern this serves is infrequent merges and frequent point
/// reads, where a coarse lock is the simplest correct choice.
pub struct ObjectDatabaseContentIndexMap {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, ObjectId>,
    writable: Option<Arc<dyn ContentIndexMap>>,
}

impl ObjectDatabaseContentIndexMap {
    /// Create an empty aggregator with no writable backend.
    ///
    /// Without a backend the aggregator behaves as an ephemeral overlay:
    /// point writes update only its own table.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Create an empty aggregator that forwards point writes to `writable`.
    pub fn with_writable(writable: Arc<dyn ContentIndexMap>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                writable: Some(writable),
            }),
        }
    }

    /// Set or clear the writable backend.
    ///
    /// Affects subsequent [`insert`](ContentIndexMap::insert) calls only;
    /// entries already in the table are not replayed to the new backend.
    pub fn set_writable(&self, writable: Option<Arc<dyn ContentIndexMap>>) {
        self.inner.lock().expect("lock poisoned").writable = writable;
    }

    /// Returns `true` if a writable backend is configured.
    pub fn has_writable(&self) -> bool {
        self.inner.lock().expect("lock poisoned").writable.is_some()
    }

    /// Merge a batch of entries into the table (last merge wins).
    pub fn merge<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, ObjectId)>,
    {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let mut count = 0usize;
        for (name, id) in entries {
            inner.entries.insert(name, id);
            count += 1;
        }
        tracing::debug!("merged {count} entries");
    }

    /// Merge the full contents of another index map.
    ///
    /// The other map's snapshot is taken before this instance's lock is
    /// acquired, so two aggregators may merge from each other without a
    /// lock-order hazard.
    pub fn merge_map(&self, other: &dyn ContentIndexMap) {
        let view = other.merged_view();
        self.merge(view);
    }

    /// Remove a batch of entries from the table.
    ///
    /// Removal is keyed by name alone; the id in each pair is ignored.
    pub fn unmerge<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, ObjectId)>,
    {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let mut count = 0usize;
        for (name, _id) in entries {
            inner.entries.remove(&name);
            count += 1;
        }
        tracing::debug!("unmerged {count} entries");
    }

    /// Number of entries in the effective mapping.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("lock poisoned").entries.len()
    }

    /// Returns `true` if the effective mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().expect("lock poisoned").entries.is_empty()
    }
}

impl Default for ObjectDatabaseContentIndexMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentIndexMap for ObjectDatabaseContentIndexMap {
    fn try_get(&self, name: &str) -> Option<ObjectId> {
        self.inner
            .lock()
            .expect("lock poisoned")
            .entries
            .get(name)
            .copied()
    }

    /// Point write: forwarded to the writable backend when one is
    /// configured, then applied to the internal table. Both happen inside
    /// this instance's critical section; the backend must not route back
    /// into this aggregator.
    fn insert(&self, name: &str, id: ObjectId) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        if let Some(writable) = &inner.writable {
            writable.insert(name, id);
        }
        inner.entries.insert(name.to_string(), id);
    }

    fn merged_view(&self) -> Vec<(String, ObjectId)> {
        let inner = self.inner.lock().expect("lock poisoned");
        let mut view: Vec<(String, ObjectId)> =
            inner.entries.iter().map(|(k, v)| (k.clone(), *v)).collect();
        view.sort_by(|(a, _), (b, _)| a.cmp(b));
        view
    }

    fn search(&self, predicate: &dyn Fn(&str, &ObjectId) -> bool) -> Vec<(String, ObjectId)> {
        let inner = self.inner.lock().expect("lock poisoned");
        let mut matches: Vec<(String, ObjectId)> = inner
            .entries
            .iter()
            .filter(|(name, id)| predicate(name, id))
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        matches.sort_by(|(a, _), (b, _)| a.cmp(b));
        matches
    }
}

impl std::fmt::Debug for ObjectDatabaseContentIndexMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().expect("lock poisoned");
        f.debug_struct("ObjectDatabaseContentIndexMap")
            .field("entry_count", &inner.entries.len())
            .field("has_writable", &inner.writable.is_some())
            .finish()
    }
}
