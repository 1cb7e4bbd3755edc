//! The [`ContentIndexMap`] trait defining the name-to-id lookup interface.
//!
//! Any source of name→id mappings (an in-memory table, a parsed bundle
//! manifest, an aggregation of several of these) implements this trait so
//! the layers above can treat them uniformly.

use cask_types::ObjectId;

/// A mapping from logical names to content identifiers.
///
/// Implementations must be thread-safe (`Send + Sync`). Lookups are
/// infallible: an absent name is simply `None`. Snapshot methods
/// (`search`, `merged_view`) materialize their result; callers must not
/// assume later mutations are reflected in a snapshot already taken.
pub trait ContentIndexMap: Send + Sync {
    /// Look up the content identifier for `name`.
    ///
    /// Returns `None` if the name is not indexed. Absence is not an error.
    fn try_get(&self, name: &str) -> Option<ObjectId>;

    /// Write (create or update) the entry for `name`.
    ///
    /// Write semantics are implementation-defined: a plain backend updates
    /// its own table; an aggregator may additionally forward the write to
    /// a configured writable backend.
    fn insert(&self, name: &str, id: ObjectId);

    /// A materialized snapshot of every entry, sorted by name.
    fn merged_view(&self) -> Vec<(String, ObjectId)>;

    /// Returns `true` if `name` is indexed.
    fn contains(&self, name: &str) -> bool {
        self.try_get(name).is_some()
    }

    /// A materialized snapshot of the entries matching `predicate`,
    /// sorted by name.
    fn search(&self, predicate: &dyn Fn(&str, &ObjectId) -> bool) -> Vec<(String, ObjectId)> {
        self.merged_view()
            .into_iter()
            .filter(|(name, id)| predicate(name, id))
            .collect()
    }
}
