//! Pick the newest stable release from a release stream

use tracing::{debug, info};

use crate::version::error::RegistryError;
use crate::version::registry::ReleaseStream;
use crate::version::stats::FetchContext;
use crate::version::types::ReleaseCandidate;

/// Substrings that mark a tag as a prerelease even when GitHub does not
const PRERELEASE_MARKERS: &[&str] = &[
    "nightly", "develop", "rc", "alpha", "beta", "snapshot", "testing",
];

/// Whether `tag` looks like a prerelease (case-insensitive substring match)
pub fn is_heuristic_prerelease(tag: &str) -> bool {
    let tag = tag.to_lowercase();
    PRERELEASE_MARKERS.iter().any(|marker| tag.contains(marker))
}

/// Return the first release that is neither flagged as a prerelease by the
/// API nor looks like one.
///
/// Releases are pulled one at a time, so no page after the one holding the
/// match is requested.
pub async fn select_release<S>(
    stream: &mut S,
    ctx: &mut FetchContext,
) -> Result<Option<ReleaseCandidate>, RegistryError>
where
    S: ReleaseStream + ?Sized,
{
    let mut skipped_heuristic = false;

    while let Some(release) = stream.next_release(ctx).await? {
        if release.prerelease {
            debug!("Skipping prerelease {}", release.tag);
            continue;
        }
        if is_heuristic_prerelease(&release.tag) {
            info!("Skipping {}, it looks like a prerelease", release.tag);
            skipped_heuristic = true;
            continue;
        }
        if skipped_heuristic {
            info!("Found stable release {} after skipping prereleases", release.tag);
        }
        return Ok(Some(release.into()));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::testing::capture;
    use crate::version::types::RawRelease;
    use chrono::{DateTime, Utc};
    use rstest::rstest;

    fn release(tag: &str, prerelease: bool) -> RawRelease {
        RawRelease {
            tag: tag.to_string(),
            prerelease,
            created_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    async fn select(releases: Vec<RawRelease>) -> Option<String> {
        let mut ctx = FetchContext::new();
        select_release(&mut releases.into_iter(), &mut ctx)
            .await
            .unwrap()
            .map(|candidate| candidate.tag)
    }

    #[rstest]
    #[case("v1.0-nightly", true)]
    #[case("Develop-2024", true)]
    #[case("1.0RC1", true)]
    #[case("2.0-Alpha", true)]
    #[case("BETA3", true)]
    #[case("1.0-SNAPSHOT", true)]
    #[case("testing-5", true)]
    #[case("stable-1.0", false)]
    #[case("v1.2.3", false)]
    fn is_heuristic_prerelease_matches_markers(#[case] tag: &str, #[case] expected: bool) {
        assert_eq!(is_heuristic_prerelease(tag), expected);
    }

    #[tokio::test]
    async fn select_release_returns_first_stable_release() {
        let selected = select(vec![release("v2.0", false), release("v1.9", false)]).await;

        assert_eq!(selected.as_deref(), Some("v2.0"));
    }

    #[tokio::test]
    async fn select_release_skips_api_and_heuristic_prereleases() {
        let selected = select(vec![
            release("v3.0", true),
            release("v2.1-rc1", false),
            release("v2.0-beta", false),
            release("v1.9", false),
        ])
        .await;

        assert_eq!(selected.as_deref(), Some("v1.9"));
    }

    #[tokio::test]
    async fn select_release_returns_none_when_only_candidate_is_excluded() {
        assert_eq!(select(vec![release("v1.0-rc1", false)]).await, None);
        assert_eq!(select(vec![release("v1.0", true)]).await, None);
        assert_eq!(select(vec![]).await, None);
    }

    #[tokio::test]
    async fn select_release_logs_heuristic_skips_and_rescue() {
        let (_guard, logs) = capture();

        let selected = select(vec![
            release("v3.0", true),
            release("v2.1-rc1", false),
            release("v1.9", false),
        ])
        .await;

        let logs = logs.contents();
        assert_eq!(selected.as_deref(), Some("v1.9"));
        assert!(logs.contains("Skipping prerelease v3.0"));
        assert!(logs.contains("Skipping v2.1-rc1, it looks like a prerelease"));
        assert!(logs.contains("Found stable release v1.9 after skipping prereleases"));
    }

    #[tokio::test]
    async fn select_release_does_not_announce_rescue_after_api_prereleases() {
        let (_guard, logs) = capture();

        select(vec![release("v3.0", true), release("v2.0", false)]).await;

        assert!(!logs.contents().contains("Found stable release"));
    }

    #[tokio::test]
    async fn select_release_stops_pulling_after_match() {
        let mut releases = vec![release("v2.0", false), release("v1.0", false)].into_iter();
        let mut ctx = FetchContext::new();

        select_release(&mut releases, &mut ctx).await.unwrap();

        assert_eq!(releases.len(), 1);
    }
}
