//! Release stream trait consumed by the selector

use crate::version::error::RegistryError;
use crate::version::stats::FetchContext;
use crate::version::types::RawRelease;

/// A lazily produced, newest-first sequence of releases.
///
/// Implementations may issue network requests while advancing, so every call
/// receives the run's [`FetchContext`].
#[async_trait::async_trait]
pub trait ReleaseStream: Send {
    /// Returns the next release, or `None` once the sequence is exhausted
    async fn next_release(
        &mut self,
        ctx: &mut FetchContext,
    ) -> Result<Option<RawRelease>, RegistryError>;
}

/// In-memory releases, already ordered newest first
#[async_trait::async_trait]
impl ReleaseStream for std::vec::IntoIter<RawRelease> {
    async fn next_release(
        &mut self,
        _ctx: &mut FetchContext,
    ) -> Result<Option<RawRelease>, RegistryError> {
        Ok(self.next())
    }
}
