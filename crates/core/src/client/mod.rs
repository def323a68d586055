//! Handshake orchestration for publishing (WHIP) and reading (WHEP).
//!
//! Both flows share the same skeleton:
//!
//! ```text
//! OPTIONS ─► engine.start ─► partial offer ─► POST ─► resolve Location
//!     ─► [read: validate answer] ─► set_answer
//!     ─► loop { candidate → PATCH | gathering done | ready → done | deadline → fail }
//!     ─► [read: gather incoming tracks]
//! ```
//!
//! Once the POST succeeded, every failure deletes the session resource
//! (best effort) and closes the engine before the original error is
//! returned.

pub mod signaling;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::engine::{Engine, EngineConfig, EngineEvents, Role, SessionDescription};
use crate::error::{Result, WhipError};
use crate::protocol::sdp::{self, Sdp};
use crate::session::Session;
pub use signaling::{Endpoint, Resource};

/// WHIP/WHEP client for a single handshake.
///
/// [`publish`](Self::publish) and [`read`](Self::read) consume the client;
/// the resulting [`Session`] owns the engine and the server-side resource.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    config: ClientConfig,
}

/// State shared by both flows once the session exists.
struct Opened {
    resource: Resource,
    events: EngineEvents,
    offer: SessionDescription,
    answer: SessionDescription,
}

impl Client {
    pub fn new(http: reqwest::Client, config: ClientConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Publish `tracks` to the endpoint.
    ///
    /// Returns once the engine reports the connection as ready.
    pub async fn publish<E: Engine>(
        self,
        mut engine: E,
        tracks: Vec<E::OutgoingTrack>,
        cancel: &CancellationToken,
    ) -> Result<Session<E>> {
        let mut opened = self.open(&mut engine, Role::Publish, tracks, cancel).await?;

        let result = async {
            engine
                .set_answer(&opened.answer)
                .await
                .map_err(WhipError::Engine)?;
            negotiate(
                &opened.resource,
                &mut opened.events,
                &opened.offer,
                self.config.handshake_timeout,
                cancel,
            )
            .await
        }
        .await;

        if let Err(err) = result {
            return Err(abort(&mut engine, &opened.resource, err).await);
        }

        tracing::info!(url = %opened.resource.url(), "publish handshake complete");
        Ok(Session::new(engine, opened.resource, opened.events.failed))
    }

    /// Read the tracks offered by the endpoint.
    ///
    /// The answer is validated before it reaches the engine; once the
    /// connection is ready, the negotiated incoming tracks are gathered.
    pub async fn read<E: Engine>(
        self,
        mut engine: E,
        cancel: &CancellationToken,
    ) -> Result<(Session<E>, Vec<E::IncomingTrack>)> {
        let mut opened = self.open(&mut engine, Role::Read, Vec::new(), cancel).await?;

        let result = async {
            let answer = Sdp::parse(&opened.answer.sdp)?;
            sdp::validate_tracks(&answer.media)?;

            engine
                .set_answer(&opened.answer)
                .await
                .map_err(WhipError::Engine)?;
            negotiate(
                &opened.resource,
                &mut opened.events,
                &opened.offer,
                self.config.handshake_timeout,
                cancel,
            )
            .await?;

            gather_tracks(&mut engine, cancel).await
        }
        .await;

        match result {
            Ok(tracks) => {
                tracing::info!(
                    url = %opened.resource.url(),
                    tracks = tracks.len(),
                    "read handshake complete"
                );
                Ok((
                    Session::new(engine, opened.resource, opened.events.failed),
                    tracks,
                ))
            }
            Err(err) => Err(abort(&mut engine, &opened.resource, err).await),
        }
    }

    /// Discover ICE servers, start the engine and create the session.
    async fn open<E: Engine>(
        &self,
        engine: &mut E,
        role: Role,
        tracks: Vec<E::OutgoingTrack>,
        cancel: &CancellationToken,
    ) -> Result<Opened> {
        let endpoint = Endpoint::new(self.http.clone(), self.config.url.clone());

        let ice_servers = endpoint.ice_servers(cancel).await?;
        tracing::debug!(count = ice_servers.len(), ?role, "ICE servers resolved");

        let events = engine
            .start(EngineConfig {
                ice_servers,
                handshake_timeout: self.config.handshake_timeout,
                track_gather_timeout: self.config.track_gather_timeout,
                local_random_udp: self.config.local_random_udp,
                ips_from_interfaces: self.config.ips_from_interfaces,
                role,
                outgoing_tracks: tracks,
            })
            .await
            .map_err(WhipError::Engine)?;

        let offer = engine.create_partial_offer().await.map_err(WhipError::Engine);
        let offer = close_on_err(engine, offer).await?;

        let created = endpoint.post_offer(&offer, cancel).await;
        let created = close_on_err(engine, created).await?;

        let resource = endpoint.resource(&created);
        let resource = close_on_err(engine, resource).await?;

        Ok(Opened {
            resource,
            events,
            offer,
            answer: created.answer,
        })
    }
}

/// Wait for readiness, trickling local candidates as they are discovered.
///
/// One event per iteration, in priority order: pending candidates are
/// patched before readiness is honoured. The deadline covers the whole
/// loop, including time spent in PATCH requests.
async fn negotiate(
    resource: &Resource,
    events: &mut EngineEvents,
    offer: &SessionDescription,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<()> {
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let mut discovering = true;
    let mut gathering = true;

    loop {
        tokio::select! {
            biased;

            candidate = events.local_candidates.recv(), if discovering => match candidate {
                Some(candidate) => {
                    tracing::debug!(candidate = %candidate.candidate, "local candidate");
                    resource.patch_candidate(offer, &candidate, cancel).await?;
                }
                None => discovering = false,
            },
            _ = events.gathering_done.fired(), if gathering => {
                tracing::debug!("candidate gathering complete");
                gathering = false;
            }
            _ = events.ready.fired() => return Ok(()),
            _ = &mut deadline => return Err(WhipError::DeadlineExceeded),
        }
    }
}

async fn gather_tracks<E: Engine>(
    engine: &mut E,
    cancel: &CancellationToken,
) -> Result<Vec<E::IncomingTrack>> {
    tokio::select! {
        tracks = engine.gather_incoming_tracks(cancel) => tracks.map_err(WhipError::Engine),
        _ = cancel.cancelled() => Err(WhipError::Cancelled),
    }
}

async fn close_on_err<E: Engine, T>(engine: &mut E, result: Result<T>) -> Result<T> {
    if result.is_err() {
        engine.close().await;
    }
    result
}

/// Best-effort cleanup after the session exists. Returns `err` unchanged.
async fn abort<E: Engine>(engine: &mut E, resource: &Resource, err: WhipError) -> WhipError {
    tracing::debug!(error = %err, url = %resource.url(), "handshake failed, deleting session");

    if let Err(cleanup) = resource.delete().await {
        tracing::warn!(error = %cleanup, url = %resource.url(), "failed to delete session");
    }
    engine.close().await;

    err
}
