//! Error type shared by every layer of the client.

use kvc_common::OptionsError;
use thiserror::Error;

/// Result type for the cache client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the cache client.
///
/// Absent data is never an error: missing keys come back as empty values or
/// sentinels inside `Ok`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Call arguments were rejected before any network round trip.
    #[error("invalid arguments: {0}")]
    Validation(String),
    /// Options handed to the constructor are unusable.
    #[error(transparent)]
    InvalidConfig(#[from] OptionsError),
    /// Network or IO failure while dialing, reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// RESP2 framing or parse error.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The store rejected the configured password.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The store answered with an error reply.
    #[error("server error: {0}")]
    Server(String),
    /// The reply shape does not match what the command returns.
    #[error("unexpected reply: expected {expected}, got {found}")]
    UnexpectedReply {
        expected: &'static str,
        found: &'static str,
    },
    /// The pool was closed before or while waiting for a connection.
    #[error("connection pool closed")]
    PoolClosed,
}

impl ClientError {
    pub(crate) fn protocol(reason: impl Into<String>) -> Self {
        ClientError::Protocol(reason.into())
    }

    /// True when the connection that produced this error can no longer be
    /// trusted to be in sync with the store.
    pub fn breaks_connection(&self) -> bool {
        matches!(self, ClientError::Io(_) | ClientError::Protocol(_))
    }
}
