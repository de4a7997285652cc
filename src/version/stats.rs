//! Per-run fetch statistics and rate-limit bookkeeping

use std::fmt;

use tracing::warn;

/// Counters accumulated over a whole run and reported once at shutdown
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub rate_limit_waits: u64,
    pub retries: u64,
    pub failed_packages: u64,
}

impl FetchStats {
    pub fn record_response(&mut self, from_cache: bool) {
        if from_cache {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
        }
    }
}

impl fmt::Display for FetchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cache hits: {}, cache misses: {}, rate limit waits: {}, retries: {}, failed packages: {}",
            self.cache_hits,
            self.cache_misses,
            self.rate_limit_waits,
            self.retries,
            self.failed_packages
        )
    }
}

/// Last observed `X-RateLimit-Remaining` value
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    last_remaining: Option<u64>,
}

impl RateLimitState {
    /// Record a fresh remaining-requests reading.
    ///
    /// Logs a warning whenever the reading lands on or drops past a multiple
    /// of 100. Returns whether a warning was logged.
    pub fn observe(&mut self, remaining: u64) -> bool {
        let crossed = match self.last_remaining {
            Some(previous) if remaining < previous => {
                remaining % 100 == 0 || previous / 100 > remaining / 100
            }
            Some(_) => false,
            None => remaining % 100 == 0,
        };
        self.last_remaining = Some(remaining);

        if crossed {
            warn!("{} requests remaining this hour!", remaining);
        }
        crossed
    }

    pub fn last_remaining(&self) -> Option<u64> {
        self.last_remaining
    }
}

/// Mutable state threaded through every fetch call of a run
#[derive(Debug, Default, Clone)]
pub struct FetchContext {
    pub stats: FetchStats,
    pub rate_limit: RateLimitState,
}

impl FetchContext {
    pub fn new() -> Self {
        Self::default()
    }
}
