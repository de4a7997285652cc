//! Clock and sleep capability used by every wait in the release fetcher

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

/// Longest single backoff step, reached after ten doublings
const MAX_BACKOFF_EXPONENT: u32 = 10;

/// Source of the current time and of suspensions.
///
/// The fetcher never calls `tokio::time` directly so tests can drive the
/// retry state machine with a fake clock.
#[async_trait]
pub trait Timer: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `tokio::time::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Exponential backoff for transient failures: 1s, 2s, 4s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(MAX_BACKOFF_EXPONENT))
}

/// Sleep until `reset`, halving the remaining wait on every step.
///
/// Each step sleeps half of what is left plus one second, then looks at the
/// clock again. Progress is logged on every step.
pub async fn wait_until(timer: &dyn Timer, reset: DateTime<Utc>) {
    loop {
        let now = timer.now();
        let Ok(remaining) = (reset - now).to_std() else {
            return;
        };
        if remaining.is_zero() {
            return;
        }

        let step = remaining / 2 + Duration::from_secs(1);
        info!(
            "Rate limit resets at {} ({}s from now), sleeping {}s",
            reset,
            remaining.as_secs(),
            step.as_secs()
        );
        timer.sleep(step).await;
    }
}
