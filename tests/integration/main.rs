//! Integration tests for the release notification reconciler.
//!
//! Folder-store tests run everywhere. S3 tests require LocalStack and are
//! marked as `#[ignore]` so they do not run without it.
//!
//! ## Running the S3 Tests
//!
//! 1. Start LocalStack:
//!    ```bash
//!    docker run --rm -p 4566:4566 localstack/localstack
//!    ```
//!
//! 2. Run the ignored tests:
//!    ```bash
//!    LOCALSTACK_ENDPOINT=http://localhost:4566 cargo test -p integration-tests -- --ignored
//!    ```

mod common;
mod local_reconcile_test;
mod s3_store_test;
