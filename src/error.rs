//! Error types shared across the crate.
//!
//! Out-of-surface pixel or mask queries are never errors: they resolve to
//! "no collision" at the call site. Only conditions that end a session or
//! must be reported back to a peer are modelled here.

use thiserror::Error;

use crate::components::{LevelId, RoomId};

/// Recoverable login refusal. The `Display` text is sent verbatim as the
/// `LOGIN_DENY` reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginDenied {
    #[error("Room {0} is full")]
    RoomFull(RoomId),

    #[error("Player already registered")]
    AlreadyRegistered,
}

/// Errors raised while capturing, persisting or replaying control intents.
#[derive(Debug, Error)]
pub enum RecordingError {
    /// Playback ran past the last captured tick. Fatal for the session.
    #[error("end of recording after {frames} frames")]
    EndOfStream { frames: usize },

    #[error("recording io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("recording encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("recording decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Errors surfaced by [`crate::simulation::GameSimulation::step`].
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Recording(#[from] RecordingError),

    #[error("unknown level {0}")]
    UnknownLevel(LevelId),

    #[error("{0} players do not fit in 4 ship slots")]
    TooManyPlayers(u8),
}

/// Malformed protocol frames.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MAYHEM_SERVER_PORT must be a valid port number, got {0:?}")]
    InvalidPort(String),

    #[error("MAYHEM_TICK_RATE must be a positive integer, got {0:?}")]
    InvalidTickRate(String),

    #[error("MAYHEM_CLIENT_ORIGIN is not a valid header value: {0:?}")]
    InvalidOrigin(String),

    #[error("invalid physics config: {0}")]
    Physics(#[from] serde_json::Error),
}

/// Errors that stop the relay server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the websocket client link.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("login denied: {0}")]
    Denied(String),

    #[error("connection closed before login completed")]
    ClosedDuringLogin,
}
