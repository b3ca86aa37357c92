//! Common utilities for integration tests.
//!
//! Release fixtures shared by the folder-store and LocalStack tests, plus
//! the LocalStack client context.

pub mod fixtures;
pub mod localstack;

pub use fixtures::{BUCKET, ReleaseFixture, mappings, releases, write_to_dir};
pub use localstack::LocalStackTestContext;
