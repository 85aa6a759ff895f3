//! Line-oriented ASCII codec for the remote-control server.
//!
//! Requests are `HOSTCTRL_REQUEST <name> <size>` lines followed by a
//! CR-terminated, comma-separated data body. Responses are either
//! CRLF-framed command responses (`OK:`, `NG:`, `ERROR:`, `0000`) or
//! CR-framed data bodies; [`ResponseMatcher`] tells the two framings apart
//! incrementally.

pub mod command;
pub mod matcher;
pub mod wire;

pub use command::{
    ReadCartesianPosition, ReadPulsePosition, ReadVar, StreamCommand, StreamValue, WriteVar,
};
pub use matcher::ResponseMatcher;
pub use wire::{CommandResponse, decode_command_response, encode_request_line, encode_start};
