//! Drive the resolution pipeline over a catalog

use std::future::Future;
use std::io::{self, Write};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::catalog::PackageRecord;
use crate::pipeline::output::DecisionWriter;
use crate::version::checker::check_candidate;
use crate::version::error::RegistryError;
use crate::version::registries::GitHubFetcher;
use crate::version::repo_url::resolve_first;
use crate::version::selector::select_release;
use crate::version::stats::{FetchContext, FetchStats};
use crate::version::tag::normalize_tag;

/// A package whose upstream has a newer stable release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub name: String,
    pub old_version: String,
    pub new_version: String,
}

/// How a driven run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every package was checked
    Completed,
    /// Shutdown fired; the package in flight was abandoned
    Interrupted,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Release check aborted: {0}")]
    Registry(#[from] RegistryError),

    #[error("Failed to write result: {0}")]
    Output(#[from] io::Error),
}

/// Checks packages against their GitHub releases
pub struct Checker {
    fetcher: GitHubFetcher,
    isolate_failures: bool,
}

impl Checker {
    pub fn new(fetcher: GitHubFetcher) -> Self {
        Self {
            fetcher,
            isolate_failures: false,
        }
    }

    /// Log and count fetch failures instead of aborting the run
    pub fn with_isolated_failures(mut self, isolate_failures: bool) -> Self {
        self.isolate_failures = isolate_failures;
        self
    }

    /// Check a single package.
    ///
    /// Packages without a GitHub homepage, or whose repository has no stable
    /// release, yield `None`.
    pub async fn check_package(
        &self,
        record: &PackageRecord,
        ctx: &mut FetchContext,
    ) -> Result<Option<Decision>, RegistryError> {
        let Some(repo) = resolve_first(record.homepages.iter().map(String::as_str)) else {
            debug!("Skipping {}: no GitHub homepage", record.name);
            return Ok(None);
        };

        let mut releases = self.fetcher.releases(&repo);
        let Some(candidate) = select_release(&mut releases, ctx).await? else {
            debug!("No stable release for {} ({})", record.name, repo);
            return Ok(None);
        };

        let new_version = normalize_tag(&repo.repo, &candidate.tag);
        let status = check_candidate(&record.version, &new_version, candidate.created_at);
        debug!(
            "{}: packaged {}, upstream {} ({:?})",
            record.name, record.version, new_version, status
        );

        if !status.is_outdated() {
            return Ok(None);
        }

        Ok(Some(Decision {
            name: record.name.clone(),
            old_version: record.version.clone(),
            new_version,
        }))
    }

    /// Start a lazy run over `records`, in order
    pub fn run(&self, records: Vec<PackageRecord>) -> UpdateRun<'_> {
        UpdateRun {
            checker: self,
            records: records.into_iter(),
            ctx: FetchContext::new(),
        }
    }
}

/// A pull-based walk over the catalog.
///
/// Each call to [`UpdateRun::next_decision`] checks packages until one is
/// outdated, so dropping the pending future abandons only the current package.
pub struct UpdateRun<'a> {
    checker: &'a Checker,
    records: std::vec::IntoIter<PackageRecord>,
    ctx: FetchContext,
}

impl UpdateRun<'_> {
    pub async fn next_decision(&mut self) -> Result<Option<Decision>, RegistryError> {
        while let Some(record) = self.records.next() {
            match self.checker.check_package(&record, &mut self.ctx).await {
                Ok(Some(decision)) => {
                    info!(
                        "{} can be updated from {} to {}",
                        decision.name, decision.old_version, decision.new_version
                    );
                    return Ok(Some(decision));
                }
                Ok(None) => {}
                Err(e) if self.checker.isolate_failures => {
                    error!("Failed to check {}: {}", record.name, e);
                    self.ctx.stats.failed_packages += 1;
                }
                Err(e) => {
                    error!("Failed to check {}, aborting: {}", record.name, e);
                    return Err(e);
                }
            }
        }

        Ok(None)
    }

    /// Drain the run, collecting every decision
    pub async fn collect(&mut self) -> Result<Vec<Decision>, RegistryError> {
        let mut decisions = Vec::new();
        while let Some(decision) = self.next_decision().await? {
            decisions.push(decision);
        }
        Ok(decisions)
    }

    /// Write every decision to `writer` until the catalog is done or
    /// `shutdown` resolves.
    ///
    /// A decision is written only once it is complete, so an interrupt never
    /// leaves a partial line. Stats stay readable afterwards either way.
    pub async fn drive<W, F>(
        &mut self,
        writer: &mut DecisionWriter<W>,
        shutdown: F,
    ) -> Result<RunOutcome, RunError>
    where
        W: Write,
        F: Future,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    warn!("Interrupted, abandoning the current package");
                    return Ok(RunOutcome::Interrupted);
                }
                decision = self.next_decision() => match decision? {
                    Some(decision) => writer.write(&decision)?,
                    None => return Ok(RunOutcome::Completed),
                },
            }
        }
    }

    pub fn stats(&self) -> &FetchStats {
        &self.ctx.stats
    }
}
