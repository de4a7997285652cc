//! GitHub Releases API client
//!
//! Every request goes through [`GitHubFetcher::request`], a bounded retry
//! loop over the classification of each response:
//!
//! - `404`: nothing there, no more pages
//! - `403` abuse / secondary limit: fixed cool-down, retry
//! - `403` rate limit exceeded: handled like an exhausted quota below
//! - `403` anything else: fatal
//! - `5xx`: exponential backoff, retry
//! - missing `X-RateLimit-Remaining`: short delay, retry
//! - `X-RateLimit-Remaining: 0`: sleep until `X-RateLimit-Reset`, retry
//! - `200`: page body
//!
//! Waiting for a quota reset does not use up retry budget. When the reset
//! time is already past or missing the quota is re-checked every
//! `missing_header_delay`, up to `max_stale_reset_polls` times.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::config::{
    ABUSE_COOLDOWN_SECS, DEFAULT_MAX_ATTEMPTS, MAX_STALE_RESET_POLLS, MISSING_HEADER_DELAY_SECS,
    RELEASES_PER_PAGE, ReleaseSource,
};
use crate::version::error::RegistryError;
use crate::version::http::{HttpClient, HttpResponse};
use crate::version::registry::ReleaseStream;
use crate::version::stats::FetchContext;
use crate::version::timer::{Timer, backoff_delay, wait_until};
use crate::version::types::{RawRelease, RepoRef};

const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Limits applied to each request's retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub abuse_cooldown: Duration,
    pub missing_header_delay: Duration,
    pub max_stale_reset_polls: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            abuse_cooldown: Duration::from_secs(ABUSE_COOLDOWN_SECS),
            missing_header_delay: Duration::from_secs(MISSING_HEADER_DELAY_SECS),
            max_stale_reset_polls: MAX_STALE_RESET_POLLS,
        }
    }
}

/// What to do with one response
#[derive(Debug)]
enum Attempt {
    /// Usable body
    Page(String),
    /// The resource does not exist
    NoMorePages,
    /// Transient failure, try again after the delay
    Retry(Duration),
    /// Quota exhausted, until the given instant when the header is usable
    WaitForReset(Option<DateTime<Utc>>),
    Fatal(RegistryError),
}

/// Error body returned by the API
#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

/// Fetches releases for GitHub repositories
pub struct GitHubFetcher {
    client: Arc<dyn HttpClient>,
    timer: Arc<dyn Timer>,
    base_url: String,
    policy: RetryPolicy,
    source: ReleaseSource,
}

impl GitHubFetcher {
    /// Creates a new GitHubFetcher with a custom base URL
    pub fn new(client: Arc<dyn HttpClient>, timer: Arc<dyn Timer>, base_url: &str) -> Self {
        Self {
            client,
            timer,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy: RetryPolicy::default(),
            source: ReleaseSource::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_source(mut self, source: ReleaseSource) -> Self {
        self.source = source;
        self
    }

    /// Start a fresh, lazy walk over the repository's releases.
    ///
    /// No request is made until the cursor is advanced. Calling this again
    /// starts over from the first page.
    pub fn releases(&self, repo: &RepoRef) -> ReleaseCursor<'_> {
        ReleaseCursor {
            fetcher: self,
            repo: repo.clone(),
            next_page: 1,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn page_url(&self, repo: &RepoRef, page: u32) -> String {
        format!(
            "{}/repos/{}/{}/releases?page={}",
            self.base_url, repo.owner, repo.repo, page
        )
    }

    fn latest_url(&self, repo: &RepoRef) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.base_url, repo.owner, repo.repo
        )
    }

    /// Fetch one page of releases; `None` when the repository has none
    pub async fn fetch_page(
        &self,
        repo: &RepoRef,
        page: u32,
        ctx: &mut FetchContext,
    ) -> Result<Option<Vec<RawRelease>>, RegistryError> {
        let url = self.page_url(repo, page);
        let Some(body) = self.request(&url, ctx).await? else {
            return Ok(None);
        };

        let releases: Vec<RawRelease> = serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to parse GitHub releases response from {}: {}", url, e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        debug!("Page {} of {} has {} releases", page, repo, releases.len());
        Ok(Some(releases))
    }

    /// Fetch the release GitHub considers the latest
    pub async fn fetch_latest(
        &self,
        repo: &RepoRef,
        ctx: &mut FetchContext,
    ) -> Result<Option<RawRelease>, RegistryError> {
        let url = self.latest_url(repo);
        let Some(body) = self.request(&url, ctx).await? else {
            return Ok(None);
        };

        serde_json::from_str(&body).map(Some).map_err(|e| {
            warn!("Failed to parse GitHub latest release from {}: {}", url, e);
            RegistryError::InvalidResponse(e.to_string())
        })
    }

    /// GET `url` until it yields a body, turns out absent, or fails for good
    async fn request(
        &self,
        url: &str,
        ctx: &mut FetchContext,
    ) -> Result<Option<String>, RegistryError> {
        let mut failures = 0;
        let mut stale_polls = 0;

        loop {
            let attempt = match self.client.get(url).await {
                Ok(response) => {
                    ctx.stats.record_response(response.from_cache);
                    if !response.from_cache {
                        if let Some(remaining) = rate_limit_remaining(&response) {
                            ctx.rate_limit.observe(remaining);
                        }
                    }
                    self.classify(url, &response, failures)
                }
                Err(e) if e.is_transient() => {
                    warn!("Request to {} failed: {}", url, e);
                    Attempt::Retry(backoff_delay(failures))
                }
                Err(e) => return Err(e),
            };

            match attempt {
                Attempt::Page(body) => return Ok(Some(body)),
                Attempt::NoMorePages => {
                    debug!("{} not found", url);
                    return Ok(None);
                }
                Attempt::Fatal(e) => {
                    error!("Giving up on {}: {}", url, e);
                    return Err(e);
                }
                Attempt::WaitForReset(Some(reset)) if reset > self.timer.now() => {
                    ctx.stats.rate_limit_waits += 1;
                    warn!(
                        "No more rate remaining. More rate will be available at {} ({}s from now)",
                        reset,
                        (reset - self.timer.now()).num_seconds()
                    );
                    wait_until(self.timer.as_ref(), reset).await;
                    info!("Rate limit reset, retrying {}", url);
                }
                Attempt::WaitForReset(_) => {
                    stale_polls += 1;
                    if stale_polls > self.policy.max_stale_reset_polls {
                        error!("Rate limit for {} never reset", url);
                        return Err(RegistryError::RetriesExhausted {
                            url: url.to_string(),
                            attempts: failures + stale_polls,
                        });
                    }
                    ctx.stats.rate_limit_waits += 1;
                    warn!(
                        "No more rate remaining and reset time is past or unknown, checking again in {:?}",
                        self.policy.missing_header_delay
                    );
                    self.timer.sleep(self.policy.missing_header_delay).await;
                }
                Attempt::Retry(delay) => {
                    self.retry_after(url, &mut failures, delay, ctx).await?;
                }
            }
        }
    }

    /// Count a transient failure and sleep, or give up once the budget is spent
    async fn retry_after(
        &self,
        url: &str,
        failures: &mut u32,
        delay: Duration,
        ctx: &mut FetchContext,
    ) -> Result<(), RegistryError> {
        *failures += 1;
        if *failures >= self.policy.max_attempts {
            error!("Retry budget exhausted for {}", url);
            return Err(RegistryError::RetriesExhausted {
                url: url.to_string(),
                attempts: *failures,
            });
        }

        ctx.stats.retries += 1;
        debug!(
            "Retrying {} in {:?} (attempt {}/{})",
            url,
            delay,
            *failures + 1,
            self.policy.max_attempts
        );
        self.timer.sleep(delay).await;
        Ok(())
    }

    fn classify(&self, url: &str, response: &HttpResponse, failures: u32) -> Attempt {
        match response.status {
            404 => return Attempt::NoMorePages,
            200 if response.from_cache => return Attempt::Page(response.body.clone()),
            200 => {}
            403 => {
                let message = api_message(&response.body);
                let lowered = message.to_lowercase();
                if lowered.contains("abuse") || lowered.contains("secondary rate limit") {
                    warn!("Hit GitHub abuse detection, cooling down: {}", message);
                    return Attempt::Retry(self.policy.abuse_cooldown);
                }
                if !lowered.contains("rate limit exceeded") {
                    return Attempt::Fatal(RegistryError::Forbidden {
                        url: url.to_string(),
                        message,
                    });
                }
            }
            status if (500..600).contains(&status) => {
                warn!("GitHub returned {} for {}", status, url);
                return Attempt::Retry(backoff_delay(failures));
            }
            status => {
                return Attempt::Fatal(RegistryError::UnexpectedStatus {
                    url: url.to_string(),
                    status,
                });
            }
        }

        let Some(remaining) = rate_limit_remaining(response) else {
            warn!(
                "Host did not send X-RateLimit-Remaining header (status {})",
                response.status
            );
            return Attempt::Retry(self.policy.missing_header_delay);
        };

        if remaining > 0 {
            if response.status == 200 {
                return Attempt::Page(response.body.clone());
            }
            // Rate limited although quota is left: treat as transient
            return Attempt::Retry(backoff_delay(failures));
        }

        let reset = rate_limit_reset(response);
        if reset.is_none() {
            warn!("Rate limit exhausted but no usable X-RateLimit-Reset header");
        }
        Attempt::WaitForReset(reset)
    }
}

fn rate_limit_remaining(response: &HttpResponse) -> Option<u64> {
    response
        .header(RATE_LIMIT_REMAINING)
        .and_then(|v| v.trim().parse().ok())
}

fn rate_limit_reset(response: &HttpResponse) -> Option<DateTime<Utc>> {
    response
        .header(RATE_LIMIT_RESET)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn api_message(body: &str) -> String {
    serde_json::from_str::<ApiMessage>(body)
        .map(|m| m.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Lazy walk over one repository's releases, one request per page
pub struct ReleaseCursor<'a> {
    fetcher: &'a GitHubFetcher,
    repo: RepoRef,
    next_page: u32,
    buffer: VecDeque<RawRelease>,
    exhausted: bool,
}

impl ReleaseCursor<'_> {
    async fn fill(&mut self, ctx: &mut FetchContext) -> Result<(), RegistryError> {
        match self.fetcher.source {
            ReleaseSource::Latest => {
                self.exhausted = true;
                if let Some(release) = self.fetcher.fetch_latest(&self.repo, ctx).await? {
                    self.buffer.push_back(release);
                }
            }
            ReleaseSource::List => {
                let page = self.next_page;
                match self.fetcher.fetch_page(&self.repo, page, ctx).await? {
                    Some(releases) => {
                        self.next_page += 1;
                        if releases.len() < RELEASES_PER_PAGE {
                            self.exhausted = true;
                        }
                        self.buffer.extend(releases);
                    }
                    None => self.exhausted = true,
                }
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<'a> ReleaseStream for ReleaseCursor<'a> {
    async fn next_release(
        &mut self,
        ctx: &mut FetchContext,
    ) -> Result<Option<RawRelease>, RegistryError> {
        loop {
            if let Some(release) = self.buffer.pop_front() {
                return Ok(Some(release));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fill(ctx).await?;
        }
    }
}
