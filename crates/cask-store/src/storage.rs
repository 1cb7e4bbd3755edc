//! One packed container and the chunk handles covering it.
//!
//! A [`ContentStorage`] describes a container identified by a URL and
//! hands out [`ContentChunk`] handles for `(location, size)` regions.
//! Repeated requests for the same region share one chunk (and so one
//! resident buffer) instead of each caller loading an independent copy.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use crate::chunk::ContentChunk;
use crate::provider::FileProvider;

/// A packed binary container identified by a URL.
///
/// The storage performs no I/O itself; chunks do, routing through the
/// provider fixed here at construction. The chunk table holds weak
/// references keyed by `(location, size)`: while any external handle to a
/// chunk is alive, every request for that region returns the same chunk,
/// so two chunk objects are never concurrently responsible for one region.
/// Chunks keep a strong back-reference to their storage, so a storage is
/// dropped only once no chunk handle remains.
pub struct ContentStorage {
    url: String,
    provider: Option<Arc<dyn FileProvider>>,
    chunks: Mutex<HashMap<(u64, u64), Weak<ContentChunk>>>,
    // Handle to the owning Arc, for chunk back-references.
    self_ref: Weak<ContentStorage>,
}

impl ContentStorage {
    /// Open a storage for `url`.
    ///
    /// A storage without a provider can still hand out chunk handles, but
    /// loading any non-empty chunk fails with
    /// [`MissingProvider`](crate::error::StoreError::MissingProvider).
    pub fn new(url: impl Into<String>, provider: Option<Arc<dyn FileProvider>>) -> Arc<Self> {
        let url = url.into();
        tracing::debug!("opened storage '{url}'");
        Arc::new_cyclic(|self_ref| Self {
            url,
            provider,
            chunks: Mutex::new(HashMap::new()),
            self_ref: self_ref.clone(),
        })
    }

    /// The URL identifying this container.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns `true` if a file provider is available for loads.
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub(crate) fn provider(&self) -> Option<&Arc<dyn FileProvider>> {
        self.provider.as_ref()
    }

    /// The chunk handle covering `(location, size)`, created lazily.
    ///
    /// Returns the existing chunk while one for this exact region is still
    /// referenced anywhere; otherwise creates a fresh unloaded one. Dead
    /// table slots are pruned on the way through.
    pub fn chunk(&self, location: u64, size: u64) -> Arc<ContentChunk> {
        let mut chunks = self.chunks.lock().expect("lock poisoned");
        if let Some(existing) = chunks.get(&(location, size)).and_then(Weak::upgrade) {
            return existing;
        }
        chunks.retain(|_, slot| slot.strong_count() > 0);
        let storage = self.self_ref.upgrade().expect("storage always lives in an Arc");
        let chunk = ContentChunk::new(storage, location, size);
        chunks.insert((location, size), Arc::downgrade(&chunk));
        chunk
    }

    /// Snapshot of every chunk currently referenced from outside.
    ///
    /// The data an external cache manager walks to pick eviction victims
    /// by last-access time.
    pub fn live_chunks(&self) -> Vec<Arc<ContentChunk>> {
        self.chunks
            .lock()
            .expect("lock poisoned")
            .values()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Number of live chunk handles.
    pub fn chunk_count(&self) -> usize {
        self.chunks
            .lock()
            .expect("lock poisoned")
            .values()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }

    /// Total extent of the container implied by its live chunks: the
    /// largest `location + size`, or 0 with no live chunks.
    pub fn extent(&self) -> u64 {
        self.live_chunks()
            .iter()
            .map(|c| c.location() + c.size())
            .max()
            .unwrap_or(0)
    }

    /// Bytes currently held resident across this storage's chunks.
    pub fn loaded_bytes(&self) -> u64 {
        self.live_chunks().iter().map(|c| c.resident_bytes()).sum()
    }
}

impl std::fmt::Debug for ContentStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStorage")
            .field("url", &self.url)
            .field("chunk_count", &self.chunk_count())
            .field("has_provider", &self.has_provider())
            .finish()
    }
}
