//! Common types shared by the fetcher, selector and checker

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A GitHub repository identified by owner and name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// One release as delivered by the GitHub Releases API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawRelease {
    #[serde(rename = "tag_name")]
    pub tag: String,
    #[serde(default)]
    pub prerelease: bool,
    pub created_at: DateTime<Utc>,
}

/// The release chosen by the selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCandidate {
    pub tag: String,
    pub created_at: DateTime<Utc>,
}

impl From<RawRelease> for ReleaseCandidate {
    fn from(release: RawRelease) -> Self {
        Self {
            tag: release.tag,
            created_at: release.created_at,
        }
    }
}
