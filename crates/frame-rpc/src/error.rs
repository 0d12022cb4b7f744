//! Error types for the frame RPC layer.
//!
//! Trust- and transport-layer failures are fail-silent (dropped and logged).
//! Only failures that belong to a specific call reach a caller, through that
//! call's completion handle.

use crate::domain::config::ConfigError;
use crate::domain::correlation::MessageId;
use crate::domain::types::WindowId;
use thiserror::Error;

/// Session-level errors surfaced to callers
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The session was shut down before a final reply arrived.
    #[error("session closed before a final reply arrived")]
    SessionClosed,

    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// Id allocation handed out an id that is still pending. Programmer error.
    #[error("correlation id {0} is already pending")]
    DuplicateId(MessageId),

    /// A locally registered handler failed; not rescued by this layer.
    #[error("handler `{func}` failed: {source}")]
    Handler {
        func: String,
        #[source]
        source: HandlerError,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The target child window has closed; the message was not sent.
    #[error("window {0} is closed")]
    WindowClosed(WindowId),

    #[error("window {0} is not a known child")]
    UnknownWindow(WindowId),

    #[error("`{func}` is not available in frame context `{current}`")]
    WrongFrameContext { func: String, current: String },

    /// The host answered, but with an explicit failure payload.
    #[error("host rejected `{func}`: {reason}")]
    Host { func: String, reason: String },

    #[error("outbound queue is full ({capacity} messages)")]
    QueueFull { capacity: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised by registered handlers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

/// Wire encoding/decoding errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed envelope: {0}")]
    Malformed(String),

    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors from the transport adapter
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport detached")]
    Detached,

    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Convenience alias used across the crate
pub type BridgeResult<T> = Result<T, BridgeError>;
