//! Transport engine capability surface.
//!
//! The client never runs ICE, DTLS or SRTP itself. It drives an injected
//! [`Engine`] through a fixed lifecycle and reacts to the events the engine
//! raises from its own tasks:
//!
//! ```text
//! start ─► create_partial_offer ─► set_answer ─► (candidates… gathering done… ready)
//!                                                  │
//!                                 read only: gather_incoming_tracks
//! ```
//!
//! Events are delivered through [`EngineEvents`]: an unbounded stream of
//! locally discovered candidates plus three one-shot [`Signal`]s.

pub mod signal;

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use signal::{Signal, Trigger, signal};

/// Opaque failure reported by an engine implementation.
pub type EngineError = Box<dyn std::error::Error + Send + Sync>;

/// A STUN/TURN server the engine may use to gather candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceServer {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// A locally discovered ICE candidate (RTCIceCandidateInit).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IceCandidate {
    /// Candidate attribute value, including the `candidate:` prefix.
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_mline_index: Option<u16>,
    pub username_fragment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpType {
    Offer,
    Answer,
}

/// Session description text tagged with its role in the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Which side of the media flow the engine is negotiating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// WHIP: send the outgoing tracks.
    Publish,
    /// WHEP: receive whatever the server offers.
    Read,
}

/// Parameters handed to [`Engine::start`].
#[derive(Debug, Clone)]
pub struct EngineConfig<T> {
    pub ice_servers: Vec<IceServer>,
    pub handshake_timeout: Duration,
    pub track_gather_timeout: Duration,
    /// Listen on a random local UDP port for host candidates.
    pub local_random_udp: bool,
    /// Derive host candidates from local network interfaces.
    pub ips_from_interfaces: bool,
    pub role: Role,
    /// Empty when reading.
    pub outgoing_tracks: Vec<T>,
}

/// Event sources returned by [`Engine::start`].
#[derive(Debug)]
pub struct EngineEvents {
    /// Candidates in discovery order. Closing the sender ends discovery.
    pub local_candidates: mpsc::UnboundedReceiver<IceCandidate>,
    pub gathering_done: Signal,
    /// The session is fully connected.
    pub ready: Signal,
    /// The session failed unrecoverably.
    pub failed: Signal,
}

/// A WebRTC peer connection as seen by the signaling client.
#[async_trait]
pub trait Engine: Send {
    type OutgoingTrack: Send + 'static;
    type IncomingTrack: Send + 'static;

    async fn start(
        &mut self,
        config: EngineConfig<Self::OutgoingTrack>,
    ) -> Result<EngineEvents, EngineError>;

    /// Create the local offer without waiting for candidate gathering.
    async fn create_partial_offer(&mut self) -> Result<SessionDescription, EngineError>;

    async fn set_answer(&mut self, answer: &SessionDescription) -> Result<(), EngineError>;

    /// Wait for the negotiated incoming tracks (read role only).
    async fn gather_incoming_tracks(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Self::IncomingTrack>, EngineError>;

    /// Begin delivering media on all incoming tracks.
    fn start_reading(&mut self);

    async fn close(&mut self);
}
