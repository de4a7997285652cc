use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::version::http::Credentials;
use crate::version::registries::github::RetryPolicy;

const APP_NAME: &str = "upstream-check";

// =============================================================================
// GitHub API constants
// =============================================================================

/// Default base URL for GitHub API
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Releases per page returned by the API when no `per_page` is given.
/// A shorter page is the last one.
pub const RELEASES_PER_PAGE: usize = 30;

/// Attempts per request before a transient failure becomes fatal
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Cool-down after an abuse / secondary rate limit response (10 seconds)
pub const ABUSE_COOLDOWN_SECS: u64 = 10;

/// Delay before retrying a response without rate-limit headers (1 second)
pub const MISSING_HEADER_DELAY_SECS: u64 = 1;

/// Re-checks of an exhausted quota whose reset time is already past or absent
pub const MAX_STALE_RESET_POLLS: u32 = 600;

/// Environment variable holding `username:token`
pub const TOKEN_ENV_VAR: &str = "API_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Token file {0} does not contain `username:token`")]
    InvalidTokenFile(PathBuf),
}

/// Which releases endpoint to consult
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseSource {
    /// Page through `/releases`, newest first
    #[default]
    List,
    /// Ask `/releases/latest` only
    Latest,
}

/// Checker configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckerConfig {
    pub api_base_url: String,
    pub release_source: ReleaseSource,
    /// Keep going when one repository cannot be fetched
    pub isolate_failures: bool,
    pub token_file: Option<PathBuf>,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            release_source: ReleaseSource::default(),
            isolate_failures: false,
            token_file: None,
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub abuse_cooldown_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            abuse_cooldown_secs: ABUSE_COOLDOWN_SECS,
        }
    }
}

impl CheckerConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the default config file is
    /// read when present and defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (config_path(), false),
        };

        if !required && !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Json { path, source })
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache.dir.clone().unwrap_or_else(cache_dir)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts.max(1),
            abuse_cooldown: Duration::from_secs(self.retry.abuse_cooldown_secs),
            missing_header_delay: Duration::from_secs(MISSING_HEADER_DELAY_SECS),
            max_stale_reset_polls: MAX_STALE_RESET_POLLS,
        }
    }

    /// Credentials from `API_TOKEN`, falling back to the configured token file
    pub fn credentials(&self) -> Result<Option<Credentials>, ConfigError> {
        credentials_from(
            std::env::var(TOKEN_ENV_VAR).ok(),
            self.token_file.as_deref(),
        )
    }
}

fn credentials_from(
    env_value: Option<String>,
    token_file: Option<&Path>,
) -> Result<Option<Credentials>, ConfigError> {
    if let Some(raw) = env_value {
        match Credentials::parse(&raw) {
            Some(credentials) => return Ok(Some(credentials)),
            None => warn!(
                "{} is set but is not `<username>:<personal access token>`, ignoring it",
                TOKEN_ENV_VAR
            ),
        }
    }

    let Some(path) = token_file else {
        return Ok(None);
    };

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Credentials::parse(&content)
        .map(Some)
        .ok_or_else(|| ConfigError::InvalidTokenFile(path.to_path_buf()))
}

/// Returns the cache directory for upstream-check.
/// Uses $XDG_CACHE_HOME/upstream-check if XDG_CACHE_HOME is set,
/// otherwise falls back to ~/.cache/upstream-check,
/// or ./upstream-check if neither is available.
pub fn cache_dir() -> PathBuf {
    dir_with_env(std::env::var("XDG_CACHE_HOME").ok(), dirs::home_dir(), ".cache")
}

/// Returns the path to the response cache database.
pub fn db_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("responses.db")
}

/// Returns the default config file path.
pub fn config_path() -> PathBuf {
    dir_with_env(std::env::var("XDG_CONFIG_HOME").ok(), dirs::home_dir(), ".config")
        .join("config.json")
}

fn dir_with_env(xdg_dir: Option<String>, home_dir: Option<PathBuf>, home_relative: &str) -> PathBuf {
    let base = xdg_dir
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(home_relative)))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join(APP_NAME)
}
