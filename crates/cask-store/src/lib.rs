//! Chunked container storage for cask.
//!
//! A packed container (an asset bundle, a build output file) is exposed as
//! a [`ContentStorage`] identified by its URL. Consumers ask the storage
//! for [`ContentChunk`] handles covering fixed `(location, size)` byte
//! ranges and load them lazily on first access; the bytes travel from a
//! caller-supplied [`FileProvider`] stream into a shared buffer that stays
//! resident until the chunk is explicitly unloaded.
//!
//! # Components
//!
//! - [`FileProvider`] -- turns a storage URL into a readable, seekable stream
//! - [`DiskFileProvider`] / [`MemoryFileProvider`] -- reference providers
//! - [`ContentStorage`] -- one packed container; hands out chunk handles
//! - [`ContentChunk`] -- one lazily-loaded byte range with usage tracking
//! - [`StorageManager`] -- URL-keyed registry of open storages
//!
//! # Design Rules
//!
//! 1. The storage layer performs no I/O itself; chunks route every read
//!    through the provider and close the stream after each attempt.
//! 2. Two chunk handles never cover the same `(location, size)` region of
//!    one storage concurrently.
//! 3. A chunk's buffer has one release path: [`ContentChunk::unload`].
//!    Outstanding data clones stay valid until their holders drop them.
//! 4. I/O errors are propagated unchanged; nothing here retries, recovers,
//!    or degrades on its own.
//! 5. A short read is not an error: the chunk reports loaded and surfaces
//!    the byte count so a higher layer can verify integrity.

pub mod chunk;
pub mod error;
pub mod manager;
pub mod provider;
pub mod storage;

pub use chunk::ContentChunk;
pub use error::{StoreError, StoreResult};
pub use manager::StorageManager;
pub use provider::{ContentStream, DiskFileProvider, FileProvider, MemoryFileProvider};
pub use storage::ContentStorage;
