//! Foundation types for cask.
//!
//! This crate provides the value types shared by every other cask crate.
//!
//! # Key Types
//!
//! - [`ObjectId`] — Content-addressed identifier (BLAKE3 hash)
//! - [`AccessStamp`] — Wall-clock stamp used for usage tracking
//! - [`TypeError`] — Parse failures for the textual identifier form

pub mod error;
pub mod object;
pub mod time;

pub use error::TypeError;
pub use object::ObjectId;
pub use time::AccessStamp;
