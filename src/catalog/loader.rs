//! Catalog loading

use std::path::PathBuf;
use std::process::ExitStatus;

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::catalog::types::PackageRecord;

/// Error type for catalog loading
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Could not read catalog from {source_name}: {source}")]
    Io {
        source_name: String,
        source: std::io::Error,
    },

    #[error("Catalog is not a JSON object of package entries: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Catalog command `{command}` failed with {status}: {stderr}")]
    Command {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Where the catalog JSON comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    File(PathBuf),
    Stdin,
    /// Shell command whose stdout is the catalog
    Command(String),
}

impl CatalogSource {
    /// `-` means stdin, anything else is a file path
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            CatalogSource::Stdin
        } else {
            CatalogSource::File(PathBuf::from(arg))
        }
    }

    fn name(&self) -> String {
        match self {
            CatalogSource::File(path) => path.display().to_string(),
            CatalogSource::Stdin => "stdin".to_string(),
            CatalogSource::Command(command) => format!("`{}`", command),
        }
    }

    async fn read(&self) -> Result<String, CatalogError> {
        let io_error = |source: std::io::Error| CatalogError::Io {
            source_name: self.name(),
            source,
        };

        match self {
            CatalogSource::File(path) => tokio::fs::read_to_string(path).await.map_err(io_error),
            CatalogSource::Stdin => {
                let mut content = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut content)
                    .await
                    .map_err(io_error)?;
                Ok(content)
            }
            CatalogSource::Command(command) => {
                debug!("Running catalog command: {}", command);
                let output = Command::new("sh")
                    .arg("-c")
                    .arg(command)
                    .output()
                    .await
                    .map_err(io_error)?;

                if !output.status.success() {
                    return Err(CatalogError::Command {
                        command: command.clone(),
                        status: output.status,
                        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    });
                }
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
        }
    }

    /// Read and parse the catalog
    pub async fn load(&self) -> Result<Vec<PackageRecord>, CatalogError> {
        let content = self.read().await?;
        let records = parse_catalog(&content)?;
        info!("Loaded {} packages from {}", records.len(), self.name());
        Ok(records)
    }
}

/// Parse a JSON object mapping package names to entries, keeping document order
pub fn parse_catalog(content: &str) -> Result<Vec<PackageRecord>, CatalogError> {
    let entries: IndexMap<String, Value> = serde_json::from_str(content)?;

    Ok(entries
        .iter()
        .filter_map(|(name, entry)| PackageRecord::from_entry(name, entry))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CATALOG: &str = r#"{
        "zlib": {"version": "1.3", "homepage": "https://zlib.net"},
        "foo": {"version": "1.0", "homepage": "https://github.com/acme/foo"},
        "broken": {"homepage": "https://github.com/acme/broken"},
        "bar": {"version": "2.0", "pages": ["https://github.com/acme/bar"]}
    }"#;

    #[test]
    fn parse_catalog_keeps_document_order_and_skips_bad_entries() {
        let records = parse_catalog(CATALOG).unwrap();

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["zlib", "foo", "bar"]);
        assert_eq!(records[2].homepages, vec!["https://github.com/acme/bar"]);
    }

    #[test]
    fn parse_catalog_rejects_non_object() {
        assert!(matches!(
            parse_catalog("[1, 2, 3]"),
            Err(CatalogError::Json(_))
        ));
    }

    #[test]
    fn from_arg_maps_dash_to_stdin() {
        assert_eq!(CatalogSource::from_arg("-"), CatalogSource::Stdin);
        assert_eq!(
            CatalogSource::from_arg("catalog.json"),
            CatalogSource::File(PathBuf::from("catalog.json"))
        );
    }

    #[tokio::test]
    async fn load_reads_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.json");
        std::fs::write(&path, CATALOG).unwrap();

        let records = CatalogSource::File(path).load().await.unwrap();

        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn load_reports_missing_file() {
        let temp_dir = TempDir::new().unwrap();

        let result = CatalogSource::File(temp_dir.path().join("missing.json"))
            .load()
            .await;

        assert!(matches!(result, Err(CatalogError::Io { .. })));
    }

    #[tokio::test]
    async fn load_runs_command_and_parses_stdout() {
        let source = CatalogSource::Command(
            r#"echo '{"foo": {"version": "1.0", "homepage": "https://github.com/acme/foo"}}'"#
                .to_string(),
        );

        let records = source.load().await.unwrap();

        assert_eq!(
            records,
            vec![PackageRecord {
                name: "foo".to_string(),
                version: "1.0".to_string(),
                homepages: vec!["https://github.com/acme/foo".to_string()],
            }]
        );
    }

    #[tokio::test]
    async fn load_reports_failing_command() {
        let source = CatalogSource::Command("echo oops >&2; exit 3".to_string());

        let result = source.load().await;

        assert!(matches!(
            result,
            Err(CatalogError::Command { ref stderr, .. }) if stderr == "oops"
        ));
    }
}
