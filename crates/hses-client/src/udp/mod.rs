//! Datagram client: request multiplexing, sessions and file transfers.

mod client;
mod file;
mod multi;

pub use client::{Client, ErrorSink};
pub use file::{DownloadProgress, UploadProgress};
pub use multi::CommandSet;
