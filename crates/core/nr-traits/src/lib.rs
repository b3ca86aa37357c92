//! Core traits for the release notification reconciler.
//!
//! This crate defines the storage seam the reconciler is written against:
//! - [`ObjectStore`] - List, size and stream objects in a bucket
//! - [`MemoryStore`] - In-memory implementation for tests and dry runs

pub mod memory;
pub mod store;

pub use memory::*;
pub use store::*;
