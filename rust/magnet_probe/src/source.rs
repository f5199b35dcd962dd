//! The metadata source seam
//!
//! A [`MetadataSource`] turns an [`Identifier`] into a [`PendingMetadata`] handle.
//! Registering interest needs exclusive access to the source, waiting on the
//! returned handles does not: many handles may be awaited concurrently.

use crate::magnet::{Identifier, MagnetError};
use crate::metadata::Metadata;
use futures::future::{self, BoxFuture, FutureExt as _};
use std::fmt;
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    /// Rejected at initiation: the identifier cannot be resolved at all
    #[error("invalid identifier `{identifier}`: {reason}")]
    InvalidIdentifier {
        identifier: String,
        #[source]
        reason: MagnetError,
    },
    #[error("metadata source is closed")]
    Closed,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Handle to one in-flight metadata lookup.
///
/// Awaiting [`PendingMetadata::ready`] waits for the metadata. Dropping the handle
/// abandons the lookup; a result produced afterwards has nowhere to go.
#[must_use = "a pending lookup does nothing unless awaited"]
pub struct PendingMetadata(BoxFuture<'static, Result<Metadata, SourceError>>);

impl PendingMetadata {
    #[inline]
    pub fn new<F>(lookup: F) -> Self
    where
        F: Future<Output = Result<Metadata, SourceError>> + Send + 'static,
    {
        Self(lookup.boxed())
    }

    /// Already resolved.
    #[inline]
    pub fn ready_with(metadata: Metadata) -> Self {
        Self::new(future::ready(Ok(metadata)))
    }

    /// A lookup that never signals ready.
    #[inline]
    pub fn never() -> Self {
        Self::new(future::pending())
    }

    #[inline]
    pub async fn ready(self) -> Result<Metadata, SourceError> {
        self.0.await
    }
}

impl fmt::Debug for PendingMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingMetadata").finish_non_exhaustive()
    }
}

/// Something that can resolve identifiers to torrent metadata.
pub trait MetadataSource: Send + 'static {
    /// Register interest in `identifier` and return a handle to wait on.
    ///
    /// # Errors
    /// Fails when the identifier is rejected up front or the source is closed.
    fn begin_resolve(&mut self, identifier: &Identifier) -> Result<PendingMetadata, SourceError>;

    /// Release the underlying client. Calling it more than once is a no-op.
    fn close(&mut self) -> BoxFuture<'_, ()> {
        future::ready(()).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_ready_with_resolves_immediately() {
        let meta = Metadata::from_files([("a", 1)]);
        let got = PendingMetadata::ready_with(meta.clone()).ready().await.unwrap();
        assert_eq!(got, meta);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_stays_pending() {
        let waited = tokio::time::timeout(Duration::from_secs(5), PendingMetadata::never().ready()).await;
        assert!(waited.is_err());
    }

    #[test]
    fn test_invalid_identifier_message() {
        let err = SourceError::InvalidIdentifier {
            identifier: "nope".to_owned(),
            reason: MagnetError::MissingScheme,
        };
        assert!(err.to_string().starts_with("invalid identifier `nope`"));
    }
}
