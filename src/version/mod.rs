//! Upstream release resolution
//!
//! This module turns a homepage URL into a decision about whether a newer
//! stable upstream release exists: it resolves the GitHub repository, pages
//! through its releases under the API rate limit, skips prereleases,
//! normalizes the tag and compares it with the packaged version.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  repo_url   │────▶│  registries │────▶│    http     │
//! │ (resolve)   │     │  (fetcher)  │     │ (+ cache)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │  ▲
//!                            ▼  │ timer, stats
//!                     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//!                     │  selector   │────▶│     tag     │────▶│   checker   │
//!                     │ (stable)    │     │ (normalize) │     │  (vercmp)   │
//!                     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`repo_url`]: GitHub owner/repo extraction from homepage URLs
//! - [`registries`]: GitHub Releases fetcher with retry and rate-limit handling
//! - [`registry`]: `ReleaseStream` trait consumed by the selector
//! - [`http`]: HTTP client trait and the reqwest implementation
//! - [`cache`]: SQLite HTTP response cache
//! - [`timer`]: Clock and sleep capability, backoff policy
//! - [`stats`]: Cache statistics and rate-limit state threaded through fetches
//! - [`selector`]: Prerelease filtering
//! - [`tag`]: Tag prefix normalization
//! - [`vercmp`]: Loose version ordering
//! - [`checker`]: Snapshot rule and update status
//! - [`error`]: Error types for cache and registry operations
//! - [`types`]: Common types like `RepoRef` and `RawRelease`

pub mod cache;
pub mod checker;
pub mod error;
pub mod http;
pub mod registries;
pub mod registry;
pub mod repo_url;
pub mod selector;
pub mod stats;
pub mod tag;
pub mod timer;
pub mod types;
pub mod vercmp;
