use std::time::Duration;

use thiserror::Error;

/// Errors raised while decoding Engine.IO / Socket.IO frames
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty frame")]
    EmptyFrame,

    #[error("unknown engine.io packet type '{0}'")]
    UnknownEngineType(char),

    #[error("unknown socket.io packet type '{0}'")]
    UnknownSocketType(char),

    #[error("binary socket.io packets are not supported")]
    BinaryUnsupported,

    #[error("invalid open handshake: {0}")]
    InvalidHandshake(String),

    #[error("invalid packet payload: {0}")]
    InvalidPayload(String),
}

/// Errors that end a transport connection
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid server url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported transport '{0}', only 'websocket' is available")]
    UnsupportedTransport(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("server did not complete the handshake within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("server rejected the connection: {0}")]
    ConnectRejected(String),

    #[error("no traffic from server within {0:?}")]
    HeartbeatTimeout(Duration),

    #[error("connection closed by server")]
    Closed,
}
