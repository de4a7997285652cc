//! Decide whether an upstream release is an update for a packaged version

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use crate::version::vercmp::compare_versions;

/// Prefix of date-stamped snapshot versions such as `unstable-2022-01-01`
const UNSTABLE_PREFIX: &str = "unstable-";

/// Status of the packaged version relative to an upstream candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionStatus {
    /// The candidate is strictly newer
    Outdated,
    /// Both versions compare equal
    Latest,
    /// The packaged version is ahead of the candidate
    Newer,
    /// The packaged version is a snapshot taken on or after the candidate's release
    PredatesSnapshot,
}

impl VersionStatus {
    pub fn is_outdated(self) -> bool {
        self == VersionStatus::Outdated
    }
}

/// Snapshot date of an `unstable-YYYY-MM-DD` version.
///
/// Versions without the prefix yield `None` silently. A prefixed version with
/// a malformed date is logged, since it points at bad catalog data.
pub fn parse_unstable_date(version: &str) -> Option<NaiveDate> {
    let date = version.strip_prefix(UNSTABLE_PREFIX)?;

    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .inspect_err(|e| {
            warn!(
                "Could not parse unstable date {}: {}. The catalog entry should be fixed.",
                version, e
            )
        })
        .ok()
}

/// Compare the packaged `current` version with an upstream candidate
/// released at `created_at`
pub fn check_candidate(
    current: &str,
    candidate_version: &str,
    created_at: DateTime<Utc>,
) -> VersionStatus {
    if let Some(snapshot) = parse_unstable_date(current) {
        if created_at.date_naive() <= snapshot {
            info!(
                "Discarding {} ({}), it is older than the current version {}",
                candidate_version, created_at, current
            );
            return VersionStatus::PredatesSnapshot;
        }
    }

    match compare_versions(current, candidate_version) {
        Ordering::Less => VersionStatus::Outdated,
        Ordering::Equal => VersionStatus::Latest,
        Ordering::Greater => VersionStatus::Newer,
    }
}
