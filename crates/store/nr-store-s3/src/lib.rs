//! nr-store-s3 - S3 object store backend.
//!
//! This crate implements [`nr_traits::ObjectStore`] on top of the AWS SDK:
//!
//! - Client configuration with LocalStack / S3-compatible endpoint support
//! - Paginated listing exposed as a stream and flattened for the store trait
//! - Exponential backoff with jitter around every request
//!
//! # Example
//!
//! ```ignore
//! use nr_store_s3::{S3Config, S3Store};
//! use nr_traits::ObjectStore;
//!
//! let config = S3Config::new()
//!     .with_region("us-east-1")
//!     .with_endpoint("http://localhost:4566");
//!
//! let store = S3Store::from_config(&config).await?;
//! let keys = store.list_keys("ingest-results", "backdiff_20190701/").await?;
//! ```

mod client;
mod error;
mod list;
mod retry;
mod store;

pub use client::{S3Config, StaticCredentials, create_s3_client};
pub use list::list_objects;
pub use retry::{ErrorClassification, RetryConfig, classify_error, classify_message, with_retry};
pub use store::S3Store;
