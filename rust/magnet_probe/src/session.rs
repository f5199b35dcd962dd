//! librqbit-backed metadata source
//!
//! Wraps an rqbit [`Session`] with the DHT enabled and resolves magnets in
//! list-only mode: peers are asked for the info dictionary, no payload is
//! downloaded and nothing is added to the session permanently.

use crate::magnet::{Identifier, MagnetLink};
use crate::metadata::Metadata;
use crate::source::{MetadataSource, PendingMetadata, SourceError};
use anyhow::{Context, Result, bail};
use futures::future::{BoxFuture, FutureExt as _};
use librqbit::{AddTorrent, AddTorrentOptions, AddTorrentResponse, Session, SessionOptions};
use std::path::PathBuf;
use std::sync::Arc;

/// Metadata source backed by a shared rqbit session
pub struct RqbitSource {
    session: Option<Arc<Session>>,
}

impl RqbitSource {
    /// Create a new session rooted at `session_dir`
    ///
    /// # Arguments
    /// * `session_dir` - Scratch directory for the session (nothing is downloaded into it)
    pub async fn new(session_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&session_dir).context("Failed to create session directory")?;

        let opts = SessionOptions {
            disable_dht: false,
            disable_dht_persistence: true,
            dht_config: None,
            ..Default::default()
        };

        let session = Session::new_with_opts(session_dir, opts)
            .await
            .context("Failed to create rqbit session")?;

        Ok(Self {
            session: Some(session),
        })
    }
}

impl MetadataSource for RqbitSource {
    fn begin_resolve(&mut self, identifier: &Identifier) -> Result<PendingMetadata, SourceError> {
        let session = self.session.as_ref().ok_or(SourceError::Closed)?;

        let magnet = MagnetLink::parse(identifier.as_str()).map_err(|reason| {
            SourceError::InvalidIdentifier {
                identifier: identifier.to_string(),
                reason,
            }
        })?;
        log::debug!(
            "Registered magnet {} ({} trackers)",
            magnet.info_hash,
            magnet.trackers.len()
        );

        let session = Arc::clone(session);
        let uri = identifier.as_str().to_owned();
        Ok(PendingMetadata::new(async move {
            fetch_metadata(&session, uri).await.map_err(SourceError::from)
        }))
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        async move {
            if let Some(session) = self.session.take() {
                session.stop().await;
                log::info!("rqbit session stopped");
            }
        }
        .boxed()
    }
}

/// Ask the swarm for the info dictionary of `uri` without downloading anything
async fn fetch_metadata(session: &Arc<Session>, uri: String) -> Result<Metadata> {
    let opts = AddTorrentOptions {
        list_only: true,
        overwrite: false,
        ..Default::default()
    };

    let response = session
        .add_torrent(AddTorrent::from_url(uri), Some(opts))
        .await
        .context("Failed to resolve magnet")?;

    match response {
        AddTorrentResponse::ListOnly(list) => Metadata::from_torrent_bytes(&list.torrent_bytes),
        _ => bail!("session returned a managed torrent for a list-only request"),
    }
}
