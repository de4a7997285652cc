//! HTTP transport for the GitHub API, with an optional response cache

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CACHE_CONTROL, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use tracing::debug;

use crate::version::cache::{CachedResponse, ResponseCache};
use crate::version::error::RegistryError;

const USER_AGENT: &str = concat!("upstream-check/", env!("CARGO_PKG_VERSION"));

/// A fully read HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lowercase
    pub headers: HashMap<String, String>,
    pub body: String,
    pub from_cache: bool,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Transport used by the release fetcher
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a GET request and read the whole body
    async fn get(&self, url: &str) -> Result<HttpResponse, RegistryError>;
}

/// Basic auth credentials, written as `username:token`
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl Credentials {
    pub fn parse(raw: &str) -> Option<Self> {
        let (username, token) = raw.trim().split_once(':')?;
        if username.is_empty() || token.is_empty() {
            return None;
        }
        Some(Self {
            username: username.to_string(),
            token: token.to_string(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// reqwest-backed client that serves and revalidates cached responses
pub struct GitHubHttpClient {
    client: reqwest::Client,
    credentials: Option<Credentials>,
    cache: Option<Arc<ResponseCache>>,
}

impl GitHubHttpClient {
    pub fn new(
        credentials: Option<Credentials>,
        cache: Option<Arc<ResponseCache>>,
    ) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            credentials,
            cache,
        })
    }

    fn store_if_cacheable(
        &self,
        cache: &ResponseCache,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: &str,
        now: i64,
        max_age_ms: Option<i64>,
    ) -> Result<(), RegistryError> {
        let no_store = headers
            .get(CACHE_CONTROL.as_str())
            .is_some_and(|value| value.contains("no-store"));
        let entry = CachedResponse {
            status: StatusCode::OK.as_u16(),
            headers: headers.clone(),
            body: body.to_string(),
            etag: headers.get(ETAG.as_str()).cloned(),
            last_modified: headers.get(LAST_MODIFIED.as_str()).cloned(),
            stored_at_ms: now,
            max_age_ms,
        };
        if !no_store && (entry.can_revalidate() || max_age_ms.is_some()) {
            cache.store(url, &entry)?;
        }
        Ok(())
    }

    fn lookup(&self, url: &str) -> Result<Option<CachedResponse>, RegistryError> {
        match &self.cache {
            Some(cache) => Ok(cache.get(url)?),
            None => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl HttpClient for GitHubHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, RegistryError> {
        let now = current_timestamp_ms();
        let cached = self.lookup(url)?;

        if let Some(entry) = cached.as_ref().filter(|entry| entry.is_fresh(now)) {
            debug!("Serving fresh cached response for {}", url);
            return Ok(response_from_cache(entry, entry.headers.clone()));
        }

        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json");

        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.token));
        }

        if let Some(entry) = &cached {
            if let Some(etag) = &entry.etag {
                request = request.header(IF_NONE_MATCH, etag);
            }
            if let Some(last_modified) = &entry.last_modified {
                request = request.header(IF_MODIFIED_SINCE, last_modified);
            }
        }

        debug!("GET {}", url);
        let response = request.send().await?;
        let status = response.status();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_ascii_lowercase(), value.to_string()))
            })
            .collect();
        let max_age_ms = headers
            .get(CACHE_CONTROL.as_str())
            .and_then(|value| parse_max_age(value))
            .map(|secs| secs * 1000);

        if status == StatusCode::NOT_MODIFIED {
            if let (Some(cache), Some(entry)) = (&self.cache, &cached) {
                debug!("{} not modified, serving cached body", url);
                let mut merged = entry.headers.clone();
                merged.extend(headers);
                cache.refresh(url, &merged, now, max_age_ms)?;
                return Ok(response_from_cache(entry, merged));
            }
        }

        let body = response.text().await?;

        if status == StatusCode::OK {
            if let Some(cache) = &self.cache {
                self.store_if_cacheable(cache, url, &headers, &body, now, max_age_ms)?;
            }
        }

        Ok(HttpResponse {
            status: status.as_u16(),
            headers: headers.into_iter().collect(),
            body,
            from_cache: false,
        })
    }
}

fn response_from_cache(entry: &CachedResponse, headers: BTreeMap<String, String>) -> HttpResponse {
    HttpResponse {
        status: entry.status,
        headers: headers.into_iter().collect(),
        body: entry.body.clone(),
        from_cache: true,
    }
}

/// Extract `max-age` (in seconds) from a Cache-Control header value
fn parse_max_age(cache_control: &str) -> Option<i64> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim_matches('"').parse::<i64>().ok())
}

/// Get current timestamp in milliseconds since UNIX epoch
fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
