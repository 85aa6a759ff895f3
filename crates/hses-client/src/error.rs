//! Client-facing error type.
//!
//! One enum composes the machine-readable kind with its cause: transport
//! failures keep the underlying `io::Error` as a source, protocol failures
//! carry the codec error, and remote failures carry the controller's
//! status words. Timeouts, cancellation and transport errors are distinct
//! kinds so callers can tell a slow controller from a torn-down client.

use std::io;

use hses_proto::ProtocolError;
use thiserror::Error;

/// Errors surfaced by the clients.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying socket failed.
    #[error("transport error while {context}")]
    Transport {
        /// What the client was doing when the socket failed.
        context: &'static str,
        /// The socket error.
        #[source]
        source: io::Error,
    },

    /// The deadline passed before the operation completed.
    #[error("request timed out")]
    Timeout,

    /// The session was torn down before a reply arrived.
    #[error("request cancelled")]
    Cancelled,

    /// The client is closed.
    #[error("client is not connected")]
    NotConnected,

    /// The peer sent something the codec rejects.
    #[error("malformed response")]
    Protocol(#[source] ProtocolError),

    /// The controller reported a failure for a datagram command.
    #[error("command failed with status {status:#04x} and extra status {extra_status:#06x}")]
    CommandFailed {
        /// Status byte of the reply.
        status: u8,
        /// Extra status word qualifying the failure.
        extra_status: u16,
    },

    /// The controller rejected an ASCII command (`NG:` or `ERROR:`).
    #[error("command failed: {0}")]
    CommandRejected(String),

    /// A reply arrived for a request id with no pending session.
    #[error("unsolicited reply for request id {0}")]
    UnsolicitedReply(u8),

    /// All 256 request ids have pending sessions.
    #[error("all 256 request ids are in use")]
    RequestIdsExhausted,

    /// The request cannot be encoded from the given arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Wrap a socket error with what the client was doing.
    pub(crate) fn transport(context: &'static str, source: io::Error) -> Self {
        Self::Transport { context, source }
    }
}

impl From<ProtocolError> for Error {
    fn from(error: ProtocolError) -> Self {
        match error {
            ProtocolError::InvalidArgument(message) => Self::InvalidArgument(message),
            other => Self::Protocol(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_side_invalid_arguments_keep_their_kind() {
        let error = Error::from(ProtocolError::InvalidArgument("bad frame".into()));
        assert!(matches!(error, Error::InvalidArgument(_)));

        let error = Error::from(ProtocolError::MissingMagic);
        assert!(matches!(error, Error::Protocol(ProtocolError::MissingMagic)));
    }
}
