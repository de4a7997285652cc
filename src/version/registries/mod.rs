//! Release sources

pub mod github;

pub use github::{GitHubFetcher, ReleaseCursor, RetryPolicy};
