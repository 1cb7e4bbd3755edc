//! URL-keyed registry of open storages.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use crate::provider::FileProvider;
use crate::storage::ContentStorage;

/// Manages the set of open [`ContentStorage`] instances, one per URL,
/// sharing a single file provider.
///
/// Storages are held weakly: once every chunk handle and external storage
/// handle is dropped, the storage itself drops and a later `open` of the
/// same URL starts fresh. Dead entries are pruned opportunistically.
pub struct StorageManager {
    provider: Option<Arc<dyn FileProvider>>,
    storages: Mutex<HashMap<String, Weak<ContentStorage>>>,
}

impl StorageManager {
    /// Create a manager whose storages load through `provider`.
    pub fn new(provider: Arc<dyn FileProvider>) -> Self {
        Self {
            provider: Some(provider),
            storages: Mutex::new(HashMap::new()),
        }
    }

    /// Create a manager with no provider (for testing).
    ///
    /// Storages opened here hand out chunk handles whose loads fail with
    /// [`MissingProvider`](crate::error::StoreError::MissingProvider).
    pub fn without_provider() -> Self {
        Self {
            provider: None,
            storages: Mutex::new(HashMap::new()),
        }
    }

    /// The storage for `url`, opened on first request.
    pub fn open(&self, url: &str) -> Arc<ContentStorage> {
        let mut storages = self.storages.lock().expect("lock poisoned");
        if let Some(existing) = storages.get(url).and_then(Weak::upgrade) {
            return existing;
        }
        storages.retain(|_, slot| slot.strong_count() > 0);
        let storage = ContentStorage::new(url, self.provider.clone());
        storages.insert(url.to_string(), Arc::downgrade(&storage));
        storage
    }

    /// Returns `true` if a storage for `url` is currently open.
    pub fn contains(&self, url: &str) -> bool {
        self.storages
            .lock()
            .expect("lock poisoned")
            .get(url)
            .map(|slot| slot.strong_count() > 0)
            .unwrap_or(false)
    }

    /// Number of live storages.
    pub fn storage_count(&self) -> usize {
        self.storages
            .lock()
            .expect("lock poisoned")
            .values()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }

    /// Snapshot of every live storage, for an external cache manager.
    pub fn live_storages(&self) -> Vec<Arc<ContentStorage>> {
        self.storages
            .lock()
            .expect("lock poisoned")
            .values()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Bytes held resident across every live storage.
    pub fn loaded_bytes(&self) -> u64 {
        self.live_storages().iter().map(|s| s.loaded_bytes()).sum()
    }
}

impl std::fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageManager")
            .field("storage_count", &self.storage_count())
            .field("has_provider", &self.provider.is_some())
            .finish()
    }
}
