//! Core types for the release notification reconciler.
//!
//! This crate provides the foundational types used throughout the system:
//! - [`KeyClass`] - Classification of an object key against the release layout
//! - [`Notification`] - Canonical summary of one release's bucket contents
//! - [`ReleaseMapping`] - Durable release date to bucket directory mapping
//! - [`KeyCounts`] / [`OpCount`] - Per-file counts and their per-table rollups

pub mod counts;
pub mod mapping;
pub mod notification;
pub mod release_key;

pub use counts::*;
pub use mapping::*;
pub use notification::*;
pub use release_key::*;
