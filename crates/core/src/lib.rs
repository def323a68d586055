pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod session;

pub use client::Client;
pub use config::ClientConfig;
pub use engine::{Engine, EngineConfig, EngineEvents, IceCandidate, IceServer, SessionDescription};
pub use error::{Result, WhipError};
pub use session::Session;
