//! Name-to-content-id indexing for cask.
//!
//! A logical name (a URL) identifies *where* content is addressed from; an
//! [`ObjectId`](cask_types::ObjectId) identifies *what* the content is. This
//! crate maps the former to the latter, possibly through several overlaid
//! sources: a local build output, one or more shipped asset bundles, and an
//! optional writable backend that receives write-through updates.
//!
//! # Key Types
//!
//! - [`ContentIndexMap`] — the lookup/insert/snapshot contract
//! - [`InMemoryContentIndexMap`] — plain `HashMap` backend for tests and
//!   embedding, and the usual write-through target
//! - [`ObjectDatabaseContentIndexMap`] — the aggregator that layers many
//!   sources into one effective mapping (last merge wins)
//!
//! # Design Rules
//!
//! 1. Lookups never fail: an absent name is `None`, not an error.
//! 2. A merged batch is applied atomically with respect to readers: no
//!    operation observes a partially-applied merge.
//! 3. `search` and `merged_view` return materialized snapshots, never live
//!    views.
//! 4. Unmerge removes by name only; the supplied id is not compared against
//!    the stored one.

pub mod database;
pub mod memory;
pub mod traits;

pub use database::ObjectDatabaseContentIndexMap;
pub use memory::InMemoryContentIndexMap;
pub use traits::ContentIndexMap;
