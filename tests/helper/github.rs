//! GitHub API test utilities

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tempfile::TempDir;

use upstream_check::catalog::PackageRecord;
use upstream_check::config::db_path;
use upstream_check::pipeline::Checker;
use upstream_check::version::cache::ResponseCache;
use upstream_check::version::http::GitHubHttpClient;
use upstream_check::version::registries::GitHubFetcher;
use upstream_check::version::timer::Timer;

pub fn start_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// Clock that jumps forward instead of sleeping
pub struct InstantTimer {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl InstantTimer {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(start_time()),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Timer for InstantTimer {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        *self.now.lock().unwrap() += chrono::Duration::from_std(duration).unwrap();
    }
}

/// A release object as returned by the API
pub fn release(tag: &str, prerelease: bool, created_at: &str) -> Value {
    json!({
        "tag_name": tag,
        "name": tag,
        "draft": false,
        "prerelease": prerelease,
        "created_at": created_at,
        "published_at": created_at,
    })
}

pub fn releases_body(releases: Vec<Value>) -> String {
    Value::Array(releases).to_string()
}

pub fn record(name: &str, version: &str, homepage: &str) -> PackageRecord {
    PackageRecord {
        name: name.to_string(),
        version: version.to_string(),
        homepages: vec![homepage.to_string()],
    }
}

/// Create a response cache in a temporary directory
pub fn create_test_cache() -> (TempDir, Arc<ResponseCache>) {
    let temp_dir = TempDir::new().unwrap();
    let cache = ResponseCache::new(&db_path(temp_dir.path())).unwrap();
    (temp_dir, Arc::new(cache))
}

/// Checker talking to `base_url` through the real HTTP client
pub fn create_checker(
    base_url: &str,
    timer: Arc<InstantTimer>,
    cache: Option<Arc<ResponseCache>>,
) -> Checker {
    let client = GitHubHttpClient::new(None, cache).unwrap();
    Checker::new(GitHubFetcher::new(Arc::new(client), timer, base_url))
}
