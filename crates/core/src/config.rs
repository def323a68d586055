use std::time::Duration;

use url::Url;

/// Deadline for the engine to report readiness once the answer is applied.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long the engine may wait for incoming tracks after readiness.
pub const DEFAULT_TRACK_GATHER_TIMEOUT: Duration = Duration::from_secs(2);

/// Client-level configuration for a single WHIP/WHEP handshake.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WHIP (publish) or WHEP (read) endpoint.
    pub url: Url,
    /// Bounds the candidate/ready wait; also handed to the engine.
    pub handshake_timeout: Duration,
    pub track_gather_timeout: Duration,
    /// Let the engine listen on a random local UDP port.
    pub local_random_udp: bool,
    /// Let the engine advertise addresses of local network interfaces.
    pub ips_from_interfaces: bool,
}

impl ClientConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            track_gather_timeout: DEFAULT_TRACK_GATHER_TIMEOUT,
            local_random_udp: true,
            ips_from_interfaces: true,
        }
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_track_gather_timeout(mut self, timeout: Duration) -> Self {
        self.track_gather_timeout = timeout;
        self
    }
}
