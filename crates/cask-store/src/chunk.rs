//! Lazily-loaded byte ranges of a packed container.
//!
//! A [`ContentChunk`] covers a fixed `(location, size)` region of its
//! owning [`ContentStorage`](crate::storage::ContentStorage). The bytes
//! are read on first access through the storage's file provider, stay
//! resident until [`unload`](ContentChunk::unload), and carry a last-access
//! stamp an external cache manager uses to pick eviction victims.

use std::io::{Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use cask_types::AccessStamp;

use crate::error::{StoreError, StoreResult};
use crate::storage::ContentStorage;

/// Upper bound on a single stream read while filling a chunk buffer.
///
/// The copy loop reads in increments of at most this size so a transport
/// that returns partial reads still fills the buffer, and end-of-data is
/// detected without an unbounded single read.
const READ_INCREMENT: usize = 64 * 1024;

/// The buffer a loaded chunk holds, plus how much of it the source
/// actually produced. `bytes_read < data.len()` means the stream ended
/// early and the tail is zeroed.
struct Resident {
    data: Bytes,
    bytes_read: u64,
}

/// One lazily-loaded byte range of a storage container.
///
/// Constructed only by [`ContentStorage::chunk`]; `location` and `size`
/// are fixed for the chunk's lifetime. The chunk keeps a strong reference
/// to its storage for I/O routing, which also guarantees the storage
/// outlives every chunk handle.
///
/// Loading is serialized per chunk: concurrent `get_data` calls on one
/// unloaded chunk perform a single read and share a single buffer.
pub struct ContentChunk {
    storage: Arc<ContentStorage>,
    location: u64,
    size: u64,
    last_access_millis: AtomicU64,
    resident: Mutex<Option<Resident>>,
}

impl ContentChunk {
    pub(crate) fn new(storage: Arc<ContentStorage>, location: u64, size: u64) -> Arc<Self> {
        Arc::new(Self {
            storage,
            location,
            size,
            last_access_millis: AtomicU64::new(0),
            resident: Mutex::new(None),
        })
    }

    /// The chunk's data, loading it on first access.
    ///
    /// If the chunk is already resident this returns the existing buffer
    /// with no I/O. Otherwise the storage's provider opens a stream for
    /// the storage URL, the stream is positioned at `location`, and up to
    /// `size` bytes are copied in bounded increments. The stream is
    /// dropped on every exit path.
    ///
    /// A source that ends before `size` bytes leaves the buffer partially
    /// filled and the call still succeeds; callers that care compare
    /// [`bytes_read`](Self::bytes_read) against [`size`](Self::size). A
    /// zero-size chunk never loads and returns an empty buffer.
    pub fn get_data(&self) -> StoreResult<Bytes> {
        if !self.exists_in_file() {
            return Ok(Bytes::new());
        }

        let mut slot = self.resident.lock().expect("lock poisoned");
        if let Some(resident) = slot.as_ref() {
            self.register_usage();
            return Ok(resident.data.clone());
        }

        let provider = self
            .storage
            .provider()
            .ok_or_else(|| StoreError::MissingProvider {
                url: self.storage.url().to_string(),
            })?;
        let mut stream = provider.open_read(self.storage.url())?;
        stream.seek(SeekFrom::Start(self.location))?;

        let size = self.size as usize;
        let mut buf = vec![0u8; size];
        let mut filled = 0usize;
        while filled < size {
            let step = READ_INCREMENT.min(size - filled);
            let n = stream.read(&mut buf[filled..filled + step])?;
            if n == 0 {
                // End of data before the declared size: accepted, the
                // caller detects truncation through bytes_read.
                break;
            }
            filled += n;
        }

        if filled < size {
            tracing::warn!(
                "short read for '{}' at {}: {filled} of {} bytes",
                self.storage.url(),
                self.location,
                self.size
            );
        } else {
            tracing::debug!(
                "loaded chunk at {} (+{}) of '{}'",
                self.location,
                self.size,
                self.storage.url()
            );
        }

        let data = Bytes::from(buf);
        *slot = Some(Resident {
            data: data.clone(),
            bytes_read: filled as u64,
        });
        self.register_usage();
        Ok(data)
    }

    /// Advance the last-access stamp to now.
    ///
    /// Callable in any load state; an external eviction policy uses this
    /// to record a hit without forcing a reload. The stamp never moves
    /// backwards.
    pub fn register_usage(&self) {
        let now = AccessStamp::now().as_millis();
        self.last_access_millis.fetch_max(now, Ordering::Relaxed);
    }

    /// Release the resident buffer, if any.
    ///
    /// Idempotent and safe on a never-loaded chunk. A later `get_data`
    /// performs a fresh read. Data clones still held by callers remain
    /// valid; the chunk merely drops its own reference.
    pub fn unload(&self) {
        let mut slot = self.resident.lock().expect("lock poisoned");
        if slot.take().is_some() {
            tracing::debug!(
                "unloaded chunk at {} (+{}) of '{}'",
                self.location,
                self.size,
                self.storage.url()
            );
        }
    }

    /// Returns `true` while a buffer is resident.
    pub fn is_loaded(&self) -> bool {
        self.resident.lock().expect("lock poisoned").is_some()
    }

    /// Returns `true` while no buffer is resident.
    pub fn is_missing(&self) -> bool {
        !self.is_loaded()
    }

    /// Returns `true` if the chunk covers actual container bytes.
    ///
    /// A zero-size chunk exists as a handle but has nothing to load.
    pub fn exists_in_file(&self) -> bool {
        self.size > 0
    }

    /// Byte offset of this chunk within the container.
    pub fn location(&self) -> u64 {
        self.location
    }

    /// Declared byte size of this chunk.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// When this chunk was last loaded or marked used.
    pub fn last_access_time(&self) -> AccessStamp {
        AccessStamp::from_millis(self.last_access_millis.load(Ordering::Relaxed))
    }

    /// The owning storage.
    pub fn storage(&self) -> &Arc<ContentStorage> {
        &self.storage
    }

    /// Bytes actually produced by the source on the last load, or `None`
    /// while unloaded. Less than [`size`](Self::size) after a short read.
    pub fn bytes_read(&self) -> Option<u64> {
        self.resident
            .lock()
            .expect("lock poisoned")
            .as_ref()
            .map(|r| r.bytes_read)
    }

    /// Returns `true` if the chunk is loaded but the source ended before
    /// the declared size.
    pub fn is_truncated(&self) -> bool {
        self.bytes_read().is_some_and(|read| read < self.size)
    }

    /// Bytes currently held resident by this chunk (0 while unloaded).
    pub fn resident_bytes(&self) -> u64 {
        self.resident
            .lock()
            .expect("lock poisoned")
            .as_ref()
            .map(|r| r.data.len() as u64)
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for ContentChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentChunk")
            .field("url", &self.storage.url())
            .field("location", &self.location)
            .field("size", &self.size)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ContentStream, FileProvider, MemoryFileProvider};
    use std::io;
    use std::sync::atomic::AtomicUsize;

    /// Wraps the memory provider and counts stream opens, so tests can
    /// assert how many reads a sequence of calls performed.
    struct CountingProvider {
        inner: MemoryFileProvider,
        opens: AtomicUsize,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                inner: MemoryFileProvider::new(),
                opens: AtomicUsize::new(0),
            }
        }

        fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }
    }

    impl FileProvider for CountingProvider {
        fn open_read(&self, url: &str) -> io::Result<Box<dyn ContentStream>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            self.inner.open_read(url)
        }
    }

    const URL: &str = "bundles/base.bundle";

    fn storage_over(data: &[u8]) -> (Arc<ContentStorage>, Arc<CountingProvider>) {
        let provider = Arc::new(CountingProvider::new());
        provider.inner.register(URL, data.to_vec());
        let storage = ContentStorage::new(URL, Some(provider.clone()));
        (storage, provider)
    }

    #[test]
    fn load_reads_declared_range() {
        let (storage, _) = storage_over(b"0123456789ABCDEF");
        let chunk = storage.chunk(4, 8);

        let data = chunk.get_data().unwrap();
        assert_eq!(&data[..], b"456789AB");
        assert!(chunk.is_loaded());
        assert!(!chunk.is_missing());
        assert_eq!(chunk.bytes_read(), Some(8));
        assert!(!chunk.is_truncated());
    }

    #[test]
    fn second_get_data_performs_no_io() {
        let (storage, provider) = storage_over(b"0123456789");
        let chunk = storage.chunk(0, 4);

        let first = chunk.get_data().unwrap();
        let second = chunk.get_data().unwrap();

        assert_eq!(provider.opens(), 1);
        assert_eq!(first, second);
        // Same allocation, not merely equal bytes.
        assert_eq!(first.as_ptr(), second.as_ptr());
    }

    #[test]
    fn unload_then_reload_is_a_fresh_read() {
        let (storage, provider) = storage_over(b"fresh read contents");
        let chunk = storage.chunk(6, 4);

        let before = chunk.get_data().unwrap();
        chunk.unload();
        assert!(chunk.is_missing());
        assert_eq!(chunk.bytes_read(), None);

        let after = chunk.get_data().unwrap();
        assert_eq!(provider.opens(), 2);
        assert_eq!(before, after);
        assert_eq!(&after[..], b"read");
    }

    #[test]
    fn zero_size_chunk_never_loads() {
        let (storage, provider) = storage_over(b"irrelevant");
        let chunk = storage.chunk(3, 0);

        assert!(!chunk.exists_in_file());
        let data = chunk.get_data().unwrap();
        assert!(data.is_empty());
        assert!(!chunk.is_loaded());
        assert_eq!(provider.opens(), 0);
    }

    #[test]
    fn zero_size_chunk_needs_no_provider() {
        let storage = ContentStorage::new(URL, None);
        let chunk = storage.chunk(0, 0);
        assert!(chunk.get_data().unwrap().is_empty());
    }

    #[test]
    fn missing_provider_is_an_error() {
        let storage = ContentStorage::new("orphan.bundle", None);
        let chunk = storage.chunk(0, 4);

        let err = chunk.get_data().unwrap_err();
        match err {
            StoreError::MissingProvider { url } => assert_eq!(url, "orphan.bundle"),
            other => panic!("expected MissingProvider, got: {other}"),
        }
        assert!(chunk.is_missing());
    }

    #[test]
    fn io_failure_propagates_and_leaves_chunk_unloaded() {
        let provider = Arc::new(CountingProvider::new());
        let storage = ContentStorage::new("not-registered", Some(provider.clone()));
        let chunk = storage.chunk(0, 4);

        let err = chunk.get_data().unwrap_err();
        assert!(matches!(err, StoreError::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
        assert!(chunk.is_missing());

        // The failure is not sticky: once the source exists, loading works.
        provider.inner.register("not-registered", b"abcd".to_vec());
        assert_eq!(&chunk.get_data().unwrap()[..], b"abcd");
    }

    #[test]
    fn truncated_source_still_loads() {
        // Container holds 10 bytes; the chunk claims 16 starting at 4.
        let (storage, _) = storage_over(b"0123456789");
        let chunk = storage.chunk(4, 16);

        let data = chunk.get_data().unwrap();
        assert!(chunk.is_loaded());
        assert_eq!(data.len(), 16);
        assert_eq!(&data[..6], b"456789");
        assert!(data[6..].iter().all(|&b| b == 0));
        assert_eq!(chunk.bytes_read(), Some(6));
        assert!(chunk.is_truncated());
    }

    #[test]
    fn access_stamp_starts_at_zero_and_never_decreases() {
        let (storage, _) = storage_over(b"stamped");
        let chunk = storage.chunk(0, 4);
        assert!(chunk.last_access_time().is_zero());

        chunk.get_data().unwrap();
        let after_load = chunk.last_access_time();
        assert!(!after_load.is_zero());

        chunk.register_usage();
        assert!(chunk.last_access_time() >= after_load);

        chunk.register_usage();
        assert!(chunk.last_access_time() >= after_load);
    }

    #[test]
    fn register_usage_works_while_unloaded() {
        let (storage, provider) = storage_over(b"unloaded");
        let chunk = storage.chunk(0, 4);

        chunk.register_usage();
        assert!(!chunk.last_access_time().is_zero());
        assert!(chunk.is_missing());
        assert_eq!(provider.opens(), 0);
    }

    #[test]
    fn unload_is_idempotent_and_safe_when_never_loaded() {
        let (storage, _) = storage_over(b"noop");
        let chunk = storage.chunk(0, 4);

        chunk.unload();
        chunk.get_data().unwrap();
        chunk.unload();
        chunk.unload();
        assert!(chunk.is_missing());
    }

    #[test]
    fn outstanding_clone_survives_unload() {
        let (storage, _) = storage_over(b"long lived bytes");
        let chunk = storage.chunk(0, 9);

        let held = chunk.get_data().unwrap();
        chunk.unload();
        assert_eq!(&held[..], b"long live");
    }

    #[test]
    fn concurrent_get_data_performs_one_read() {
        use std::thread;

        let (storage, provider) = storage_over(b"shared between threads");
        let chunk = storage.chunk(0, 6);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let chunk = Arc::clone(&chunk);
                thread::spawn(move || chunk.get_data().unwrap())
            })
            .collect();

        let buffers: Vec<Bytes> = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .collect();

        assert_eq!(provider.opens(), 1);
        for buf in &buffers {
            assert_eq!(&buf[..], b"shared");
            assert_eq!(buf.as_ptr(), buffers[0].as_ptr());
        }
    }

    #[test]
    fn storage_back_reference() {
        let (storage, _) = storage_over(b"parent");
        let chunk = storage.chunk(1, 2);
        assert_eq!(chunk.storage().url(), URL);
        assert!(Arc::ptr_eq(chunk.storage(), &storage));
    }

    #[test]
    fn resident_bytes_tracks_load_state() {
        let (storage, _) = storage_over(b"0123456789");
        let chunk = storage.chunk(0, 8);

        assert_eq!(chunk.resident_bytes(), 0);
        chunk.get_data().unwrap();
        assert_eq!(chunk.resident_bytes(), 8);
        chunk.unload();
        assert_eq!(chunk.resident_bytes(), 0);
    }
}
