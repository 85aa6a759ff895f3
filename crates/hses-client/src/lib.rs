//! Async clients for Yaskawa High Speed Ethernet Server controllers.
//!
//! Two transports to the same controller family:
//!
//! - [`udp::Client`]: the binary datagram protocol. A single socket carries
//!   many concurrent requests correlated by an 8-bit request id; the client
//!   multiplexes command sessions, multi-command fan-out and multi-block
//!   file transfers over it.
//! - [`tcp::Client`]: the line-oriented ASCII protocol. One command is in
//!   flight at a time.
//!
//! [`rpc::RpcServer`] sits on top of the datagram client and turns a run of
//! controller byte variables into a remote-procedure-call mailbox: jobs on
//! the controller request a named service by writing `1` into their status
//! variable, the server executes it and writes back the outcome.

pub mod error;
pub mod rpc;
pub mod tcp;
pub mod udp;

pub use error::Error;
