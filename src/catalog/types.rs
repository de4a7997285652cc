//! Common types for the package catalog

use serde_json::Value;
use tracing::warn;

/// One package to check: its packaged version and candidate homepages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    /// Homepage URLs in catalog order
    pub homepages: Vec<String>,
}

impl PackageRecord {
    /// Build a record from a raw catalog entry.
    ///
    /// `homepage` may be a string or a list and `pages` a list or a string;
    /// both contribute, `homepage` first. Non-string values are ignored.
    /// Returns `None` when the entry has no string `version`.
    pub fn from_entry(name: &str, entry: &Value) -> Option<Self> {
        let Some(version) = entry.get("version").and_then(Value::as_str) else {
            warn!("Skipping {}: no version in catalog entry", name);
            return None;
        };

        let homepages = ["homepage", "pages"]
            .iter()
            .filter_map(|key| entry.get(*key))
            .flat_map(string_values)
            .collect();

        Some(Self {
            name: name.to_string(),
            version: version.to_string(),
            homepages,
        })
    }
}

fn string_values(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
