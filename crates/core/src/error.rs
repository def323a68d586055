//! Error types for the WHIP/WHEP client library.

use std::fmt;

use crate::engine::EngineError;

/// Errors that can occur while negotiating or running a WHIP/WHEP session.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Transport**: [`Http`](Self::Http), [`Url`](Self::Url),
///   [`Cancelled`](Self::Cancelled): the HTTP exchange itself failed.
/// - **Protocol**: [`BadStatus`](Self::BadStatus),
///   [`ContentType`](Self::ContentType), [`MissingETag`](Self::MissingETag),
///   [`LinkHeader`](Self::LinkHeader): the server answered, but not as
///   RFC 9725 requires.
/// - **Validation**: [`Parse`](Self::Parse),
///   [`InvalidTracks`](Self::InvalidTracks): a session description or
///   trickle fragment could not be accepted.
/// - **Engine**: [`Engine`](Self::Engine): the injected transport engine failed.
/// - **Lifecycle**: [`DeadlineExceeded`](Self::DeadlineExceeded),
///   [`ConnectionClosed`](Self::ConnectionClosed),
///   [`Terminated`](Self::Terminated).
#[derive(Debug, thiserror::Error)]
pub enum WhipError {
    /// Network or HTTP-level failure reported by the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A resource locator could not be parsed or resolved.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The caller's cancellation token fired during an HTTP exchange.
    #[error("request cancelled")]
    Cancelled,

    /// The server replied with a status code outside the accepted set.
    #[error("bad status code: expected {expected:?}, got {got}")]
    BadStatus {
        expected: &'static [u16],
        got: u16,
    },

    /// The session-creation response did not carry an SDP body.
    #[error("bad Content-Type: expected '{expected}', got '{got}'")]
    ContentType {
        expected: &'static str,
        got: String,
    },

    /// The session-creation response had no `ETag` header.
    #[error("ETag is missing")]
    MissingETag,

    /// A `Link` header could not be parsed into an ICE server.
    #[error("invalid link header: '{0}'")]
    LinkHeader(String),

    /// Malformed SDP or trickle ICE fragment.
    #[error("SDP parse error: {kind}")]
    Parse { kind: ParseErrorKind },

    /// The remote description offers tracks the client cannot consume.
    #[error("invalid tracks: {0}")]
    InvalidTracks(String),

    /// Error surfaced by the transport engine.
    #[error("engine error: {0}")]
    Engine(#[source] EngineError),

    /// The engine did not report readiness before the handshake deadline.
    #[error("deadline exceeded while waiting connection")]
    DeadlineExceeded,

    /// The engine reported an unrecoverable failure after the handshake.
    #[error("peer connection closed")]
    ConnectionClosed,

    /// The caller stopped waiting on an established session.
    #[error("terminated")]
    Terminated,
}

/// Specific kind of SDP / fragment parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input did not start with a `v=` line.
    MissingVersion,
    /// A line was not of the form `<type>=<value>`.
    InvalidLine(String),
    /// An `m=` line had fewer than four fields.
    InvalidMediaLine(String),
    /// The description has no media sections.
    NoMedia,
    /// A fragment media section carried no `a=mid` attribute.
    MissingMid,
    /// A candidate names an m-line the offer does not have.
    UnknownMediaIndex(u16),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVersion => write!(f, "missing version line"),
            Self::InvalidLine(line) => write!(f, "invalid line '{line}'"),
            Self::InvalidMediaLine(line) => write!(f, "invalid media line '{line}'"),
            Self::NoMedia => write!(f, "no media sections"),
            Self::MissingMid => write!(f, "mid attribute is missing"),
            Self::UnknownMediaIndex(index) => write!(f, "no media section at index {index}"),
        }
    }
}

impl From<ParseErrorKind> for WhipError {
    fn from(kind: ParseErrorKind) -> Self {
        WhipError::Parse { kind }
    }
}

/// Convenience alias for `Result<T, WhipError>`.
pub type Result<T> = std::result::Result<T, WhipError>;
