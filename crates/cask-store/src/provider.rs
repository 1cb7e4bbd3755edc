//! The [`FileProvider`] trait and its reference implementations.
//!
//! A provider turns a storage URL into a readable, seekable byte stream.
//! Providers are supplied by the embedding application; this crate ships a
//! filesystem-rooted provider and an in-memory provider for tests and
//! embedding.

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Seek};
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use bytes::Bytes;

/// A readable, seekable stream over one storage container.
///
/// Streams support absolute seeking and sequential reads of known length.
/// The chunk that opened a stream drops it after every load attempt,
/// successful or not; dropping closes the underlying resource.
pub trait ContentStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> ContentStream for T {}

impl std::fmt::Debug for dyn ContentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<content stream>")
    }
}

/// Supplies read streams for storage URLs.
///
/// Timeout and retry policy belong to the provider, not the storage layer:
/// a hang in the returned stream hangs the caller.
pub trait FileProvider: Send + Sync {
    /// Open a read-only stream for the container at `url`.
    ///
    /// I/O failures propagate to the chunk load unchanged.
    fn open_read(&self, url: &str) -> io::Result<Box<dyn ContentStream>>;
}

/// A provider that resolves URLs beneath a root directory.
///
/// URLs are relative paths. Absolute URLs and URLs with parent-directory
/// components are rejected with [`io::ErrorKind::InvalidInput`] so a
/// storage can never read outside the root.
#[derive(Debug)]
pub struct DiskFileProvider {
    root: PathBuf,
}

impl DiskFileProvider {
    /// Create a provider rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory URLs resolve beneath.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, url: &str) -> io::Result<PathBuf> {
        let rel = Path::new(url);
        let escapes = rel.is_absolute()
            || rel
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
        if escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("url escapes provider root: {url}"),
            ));
        }
        Ok(self.root.join(rel))
    }
}

impl FileProvider for DiskFileProvider {
    fn open_read(&self, url: &str) -> io::Result<Box<dyn ContentStream>> {
        let path = self.resolve(url)?;
        let file = std::fs::File::open(path)?;
        Ok(Box::new(file))
    }
}

/// A provider serving named in-memory blobs.
///
/// Blobs are registered up front and served through cursors. Intended for
/// tests and short-lived embedding; contents are lost on drop.
pub struct MemoryFileProvider {
    files: RwLock<HashMap<String, Bytes>>,
}

impl MemoryFileProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) the blob served for `url`.
    pub fn register(&self, url: &str, data: impl Into<Bytes>) {
        self.files
            .write()
            .expect("lock poisoned")
            .insert(url.to_string(), data.into());
    }

    /// Remove the blob for `url`. Returns `true` if it existed.
    pub fn remove(&self, url: &str) -> bool {
        self.files
            .write()
            .expect("lock poisoned")
            .remove(url)
            .is_some()
    }

    /// Returns `true` if a blob is registered for `url`.
    pub fn contains(&self, url: &str) -> bool {
        self.files.read().expect("lock poisoned").contains_key(url)
    }
}

impl Default for MemoryFileProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FileProvider for MemoryFileProvider {
    fn open_read(&self, url: &str) -> io::Result<Box<dyn ContentStream>> {
        let files = self.files.read().expect("lock poisoned");
        match files.get(url) {
            Some(data) => Ok(Box::new(Cursor::new(data.clone()))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no blob registered for url: {url}"),
            )),
        }
    }
}

impl std::fmt::Debug for MemoryFileProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.files.read().expect("lock poisoned").len();
        f.debug_struct("MemoryFileProvider")
            .field("blob_count", &count)
            .finish()
    }
}
