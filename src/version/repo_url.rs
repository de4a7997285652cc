//! Homepage URL to GitHub repository resolution
//!
//! Homepages in a package catalog point at all sorts of places inside a
//! repository: the repository root, its wiki, a release asset, a tarball.
//! The path shapes we understand are listed in [`PATH_PATTERNS`] and tried
//! in order; the first one that matches wins.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use tracing::{debug, warn};

use crate::version::types::RepoRef;

const GITHUB_HOST: &str = "github.com";

/// Recognized repository path shapes, most specific first.
///
/// Every pattern captures `owner` and `repo`; anything after the repository
/// name (archives, release assets, tarballs) is matched and dropped.
static PATH_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // /downloads/owner/repo/...
        r"^/downloads/(?P<owner>[\w.-]+)/(?P<repo>[\w.-]+)(?:/.*)?$",
        // /owner/repo/archive/..., /owner/repo/releases/..., /owner/repo/tarball/...
        r"^/(?P<owner>[\w.-]+)/(?P<repo>[\w.-]+)/(?:archive|releases|tarball|zipball)(?:/.*)?$",
        // /owner/repo/name.tar.gz
        r"^/(?P<owner>[\w.-]+)/(?P<repo>[\w.-]+)/[^/]+\.tar\.gz$",
        // /owner/repo, /owner/repo/, /owner/repo/wiki
        r"^/(?P<owner>[\w.-]+)/(?P<repo>[\w.-]+?)(?:\.git)?(?:/|/wiki/?)?$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("repository path pattern must compile"))
    .collect()
});

/// Resolve a homepage URL into a GitHub repository.
///
/// Returns `None` for anything that is not a URL on `github.com`. A
/// `github.com` URL whose path does not look like a repository is logged and
/// also yields `None`.
pub fn resolve(url: &str) -> Option<RepoRef> {
    let parsed = Url::parse(url.trim()).ok()?;

    if parsed.host_str() != Some(GITHUB_HOST) {
        return None;
    }

    let path = parsed.path();
    let repo_ref = PATH_PATTERNS.iter().find_map(|pattern| {
        let captures = pattern.captures(path)?;
        let owner = captures.name("owner")?.as_str();
        let repo = captures.name("repo")?.as_str();
        if is_dot_segment(owner) || is_dot_segment(repo) {
            return None;
        }
        Some(RepoRef::new(owner, repo))
    });

    match repo_ref {
        Some(repo_ref) => {
            debug!("Resolved {} to {}", url, repo_ref);
            Some(repo_ref)
        }
        None => {
            warn!("Could not parse github url: {}", url);
            None
        }
    }
}

/// Resolve the first homepage that points at a GitHub repository.
pub fn resolve_first<'a, I>(urls: I) -> Option<RepoRef>
where
    I: IntoIterator<Item = &'a str>,
{
    urls.into_iter().find_map(resolve)
}

fn is_dot_segment(segment: &str) -> bool {
    segment == "." || segment == ".."
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::testing::captured;
    use rstest::rstest;

    #[rstest]
    #[case("https://github.com/foo/bar")]
    #[case("https://github.com/foo/bar/")]
    #[case("https://github.com/foo/bar/wiki")]
    #[case("https://github.com/downloads/foo/bar/v1/file.tar.gz")]
    #[case("https://github.com/foo/bar/archive/v1.0.tar.gz")]
    #[case("https://github.com/foo/bar/releases/download/v1.0/bar-1.0.tar.gz")]
    #[case("https://github.com/foo/bar/tarball/master")]
    #[case("https://github.com/foo/bar/bar-1.0.tar.gz")]
    #[case("https://github.com/foo/bar.git")]
    #[case("http://github.com/foo/bar?tab=readme#intro")]
    fn resolve_accepts_repository_shapes(#[case] url: &str) {
        assert_eq!(resolve(url), Some(RepoRef::new("foo", "bar")));
    }

    #[rstest]
    #[case("https://gitlab.com/foo/bar")]
    #[case("https://www.github.com/foo/bar")]
    #[case("https://foo.github.io/bar")]
    #[case("https://example.org/github.com/foo/bar")]
    fn resolve_rejects_other_hosts(#[case] url: &str) {
        assert_eq!(resolve(url), None);
    }

    #[rstest]
    #[case("")]
    #[case("not a url")]
    #[case("github.com/foo/bar")]
    #[case("https://github.com")]
    #[case("https://github.com/foo")]
    #[case("https://github.com/foo/bar/issues/12")]
    fn resolve_returns_none_for_unusable_input(#[case] url: &str) {
        assert_eq!(resolve(url), None);
    }

    #[test]
    fn resolve_warns_about_unusable_github_url() {
        let (resolved, logs) = captured(|| resolve("https://github.com/foo"));

        assert_eq!(resolved, None);
        assert!(logs.contains("WARN"));
        assert!(logs.contains("Could not parse github url: https://github.com/foo"));
    }

    #[test]
    fn resolve_ignores_other_hosts_quietly() {
        let (resolved, logs) = captured(|| resolve("https://gitlab.com/foo/bar"));

        assert_eq!(resolved, None);
        assert!(!logs.contains("WARN"), "logs: {logs}");
    }

    #[test]
    fn resolve_keeps_dots_and_dashes_in_names() {
        assert_eq!(
            resolve("https://github.com/some-org/lib.rs"),
            Some(RepoRef::new("some-org", "lib.rs"))
        );
    }

    #[test]
    fn resolve_first_uses_first_github_homepage() {
        let urls = [
            "https://example.org/foo",
            "https://github.com/acme/foo",
            "https://github.com/other/foo",
        ];

        assert_eq!(resolve_first(urls), Some(RepoRef::new("acme", "foo")));
    }

    #[test]
    fn resolve_first_returns_none_when_nothing_resolves() {
        assert_eq!(resolve_first(["https://example.org", "nope"]), None);
        assert_eq!(resolve_first(std::iter::empty()), None);
    }
}
