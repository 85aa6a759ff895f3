//! Stream client for the ASCII remote-control server.

mod client;

pub use client::Client;
