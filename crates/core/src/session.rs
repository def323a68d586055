//! Established WHIP/WHEP session.
//!
//! A [`Session`] is returned once the handshake completes. It owns the
//! transport engine and the server-side resource until [`Session::close`].
//!
//! ## Session lifecycle
//!
//! ```text
//! publish/read ─► Session ─► start_reading (read) ─► wait ─► close
//!                                                      │
//!                               engine failed ─► ConnectionClosed
//!                               caller cancel ─► Terminated
//! ```

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::Resource;
use crate::engine::{Engine, Signal};
use crate::error::{Result, WhipError};

/// A negotiated session: the engine plus the resource to delete on close.
pub struct Session<E: Engine> {
    engine: E,
    resource: Resource,
    failed: Signal,
}

impl<E: Engine> Session<E> {
    pub(crate) fn new(engine: E, resource: Resource, failed: Signal) -> Self {
        Self {
            engine,
            resource,
            failed,
        }
    }

    /// The underlying peer connection.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Session resource URL (from the `Location` header).
    pub fn url(&self) -> &Url {
        self.resource.url()
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Start delivering media on all incoming tracks.
    pub fn start_reading(&mut self) {
        self.engine.start_reading();
    }

    /// Block until the session ends, returning why it ended.
    ///
    /// [`WhipError::ConnectionClosed`] if the engine failed,
    /// [`WhipError::Terminated`] if `cancel` fired first.
    pub async fn wait(&mut self, cancel: &CancellationToken) -> WhipError {
        tokio::select! {
            _ = self.failed.fired() => WhipError::ConnectionClosed,
            _ = cancel.cancelled() => WhipError::Terminated,
        }
    }

    /// Delete the session resource, then close the engine.
    ///
    /// The engine is closed even if the DELETE fails; only the DELETE
    /// outcome is returned.
    pub async fn close(mut self) -> Result<()> {
        let result = self.resource.delete().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, url = %self.resource.url(), "failed to delete session");
        }

        self.engine.close().await;
        tracing::info!(url = %self.resource.url(), "session closed");

        result
    }
}
