use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cache connection lock poisoned")]
    LockPoisoned,

    #[error("Invalid cached entry: {0}")]
    InvalidEntry(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Forbidden by GitHub for {url}: {message}")]
    Forbidden { url: String, message: String },

    #[error("Unexpected status {status} for {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Gave up on {url} after {attempts} attempts")]
    RetriesExhausted { url: String, attempts: u32 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Response cache error: {0}")]
    Cache(#[from] CacheError),
}

impl RegistryError {
    /// Whether the request that produced this error may succeed if retried
    pub fn is_transient(&self) -> bool {
        matches!(self, RegistryError::Network(_))
    }
}
