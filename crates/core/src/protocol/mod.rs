//! WHIP/WHEP wire protocol (RFC 9725 and its playback counterpart).
//!
//! Signaling is a handful of discrete HTTP exchanges against the endpoint
//! and, once created, the session resource:
//!
//! | Step | Method | Request headers | Success | Response headers used |
//! |------|--------|-----------------|---------|-----------------------|
//! | capability discovery | OPTIONS | | 200 / 204 | `Link` (ICE servers) |
//! | create session | POST | `Content-Type: application/sdp` | 201 | `Accept-Patch`, `Location`, `ETag` |
//! | trickle candidate | PATCH | `Content-Type: application/trickle-ice-sdpfrag`, `If-Match` | 204 | |
//! | delete session | DELETE | | 200 | |
//!
//! Bodies are SDP text ([`sdp`]) or trickle ICE fragments ([`fragment`]);
//! ICE servers travel in `Link` headers ([`link`]).

pub mod fragment;
pub mod link;
pub mod sdp;

/// Content type of offer/answer bodies (RFC 8866).
pub const SDP_CONTENT_TYPE: &str = "application/sdp";

/// Content type of trickle ICE PATCH bodies (RFC 8840).
pub const TRICKLE_ICE_CONTENT_TYPE: &str = "application/trickle-ice-sdpfrag";

/// Strip parameters from a `Content-Type` value.
///
/// `application/sdp; charset=utf-8` → `application/sdp`
pub fn parse_content_type(value: &str) -> &str {
    value.split(';').next().unwrap_or(value).trim()
}
