//! Catalog layer
//! - types.rs: `PackageRecord` and its construction from raw catalog entries
//! - loader.rs: Reading the catalog JSON from a file, stdin or a command

pub mod loader;
pub mod types;

pub use loader::{CatalogError, CatalogSource, parse_catalog};
pub use types::PackageRecord;
