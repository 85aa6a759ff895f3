//! Wire codecs for the Yaskawa High Speed Ethernet Server protocol.
//!
//! Two codecs for the same controller family:
//!
//! - [`udp`]: the binary, block-oriented request/response protocol spoken
//!   over UDP (default port 10040). Fixed 32-byte `YERC` header plus a
//!   payload of at most 1145 bytes, little-endian throughout, with an 8-bit
//!   request id correlating replies to requests.
//! - [`tcp`]: the line-oriented ASCII protocol spoken over TCP (default
//!   port 80). `CONNECT`/`HOSTCTRL_REQUEST` request lines, CRLF-framed
//!   `OK:`/`NG:`/`ERROR:` responses and CR-framed data bodies.
//!
//! This crate is sans-IO: it encodes requests into byte buffers and decodes
//! response bytes into typed values. Socket handling, timeouts and session
//! bookkeeping live in `hses-client`.

pub mod error;
pub mod tcp;
pub mod types;
pub mod udp;

pub use error::ProtocolError;
pub use types::{
    CartesianPosition, CoordinateSystem, CoordinateSystemType, PoseConfiguration, Position,
    PulsePosition, Speed, SpeedType, Status, VariableType,
};

/// Default UDP port of the high speed ethernet server.
pub const DEFAULT_UDP_PORT: u16 = 10040;

/// Default TCP port of the ASCII remote-control server.
pub const DEFAULT_TCP_PORT: u16 = 80;
