//! Protocol-level error type.
//!
//! Everything that can go wrong while encoding a request or decoding a
//! response, with the offending values attached. Transport failures,
//! timeouts and remote status codes are client concerns and live in
//! `hses-client`.

use thiserror::Error;

/// Errors produced by the wire codecs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    /// Response does not start with the `YERC` magic bytes.
    #[error("response does not start with magic bytes `YERC'")]
    MissingMagic,

    /// Header size field differs from the fixed 32-byte header.
    #[error("unexpected header size: expected {expected}, got {actual}")]
    WrongHeaderSize {
        /// The only valid header size (32).
        expected: u16,
        /// Header size reported by the peer.
        actual: u16,
    },

    /// Payload size field exceeds the protocol maximum.
    #[error("payload size {actual} exceeds maximum {max}")]
    PayloadTooLarge {
        /// Payload size reported by the peer.
        actual: usize,
        /// Maximum payload size (1145).
        max: usize,
    },

    /// The ack flag of a reply must be 1.
    #[error("unexpected ACK value: expected 1, got {actual}")]
    WrongAck {
        /// Ack byte received.
        actual: u8,
    },

    /// Division byte is neither robot (1) nor file (2).
    #[error("unknown division: {actual}")]
    BadDivision {
        /// Division byte received.
        actual: u8,
    },

    /// Fewer bytes received than the message requires.
    #[error("truncated data: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes needed to decode the message.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// More bytes received than the message allows.
    #[error("trailing bytes: expected {expected} bytes, got {actual}")]
    TrailingBytes {
        /// Bytes the message should occupy.
        expected: usize,
        /// Bytes actually received.
        actual: usize,
    },

    /// Element count of a multi-variable reply differs from the request.
    #[error("unexpected element count: expected {expected}, got {actual}")]
    WrongElementCount {
        /// Count requested.
        expected: usize,
        /// Count reported by the peer.
        actual: usize,
    },

    /// Position type word is not pulse (0) or a known frame type (16..=19).
    #[error("unknown position type {actual}, expected 0, 16, 17, 18 or 19")]
    BadPositionType {
        /// Position type word received.
        actual: u32,
    },

    /// Block number of a file-transfer frame is out of sequence.
    #[error("unexpected block number: expected {expected}, got {actual}")]
    UnexpectedBlockNumber {
        /// Block number the transfer expected next.
        expected: u32,
        /// Block number received.
        actual: u32,
    },

    /// Data body contains a different number of parameters than expected.
    #[error("received {actual} data components, expected {expected}")]
    WrongParameterCount {
        /// Parameter count the decoder expected.
        expected: usize,
        /// Parameter count received.
        actual: usize,
    },

    /// Numeric parameter contains an invalid character or is empty.
    #[error("invalid numeric value: {0}")]
    InvalidNumber(String),

    /// Numeric parameter parsed but falls outside the allowed range.
    #[error("value out of range: {0}")]
    ValueOutOfRange(String),

    /// Response line starts with none of `OK:`, `NG:`, `ERROR:` or `0000`.
    #[error("response does not start with `OK:', `NG:', `ERROR:' or `0000'")]
    BadResponsePrefix,

    /// Textual payload is not valid for its message type.
    #[error("invalid text payload: {0}")]
    InvalidText(String),

    /// A request cannot be encoded from the given arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ProtocolError {
    /// Truncated/trailing check for a buffer that must be exactly `expected`
    /// bytes long.
    pub(crate) fn check_len(data: &[u8], expected: usize) -> Result<(), Self> {
        if data.len() < expected {
            return Err(Self::Truncated { expected, actual: data.len() });
        }
        if data.len() > expected {
            return Err(Self::TrailingBytes { expected, actual: data.len() });
        }
        Ok(())
    }
}
