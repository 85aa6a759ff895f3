//! The datagram client and its request multiplexer.
//!
//! One UDP socket carries every concurrent request. Each in-flight request
//! owns an entry in the pending table keyed by its 8-bit request id; the
//! receive loop decodes inbound datagrams and routes payloads to the
//! matching entry. Sessions remove their entry on every exit path through
//! a drop guard, so dropping a session future is cancellation.

use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use hses_proto::udp::header::ResponseHeader;
use hses_proto::udp::{Command, HEADER_SIZE, MAX_PAYLOAD_SIZE};
use tokio::net::{UdpSocket, lookup_host};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::error::Error;
use crate::udp::multi::CommandSet;

/// Callback receiving failures that have no owning session: receive-loop
/// errors and unsolicited replies.
pub type ErrorSink = Box<dyn Fn(Error) + Send + Sync>;

/// One routed reply: header plus payload view.
pub(crate) type Reply = (ResponseHeader, Bytes);

/// A reply datagram is at most one header plus the maximum payload.
const RECEIVE_BUFFER_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE;

/// Client for the binary datagram protocol.
///
/// Cheap operations take `&self`; any number of command sessions and file
/// transfers may be in flight concurrently on one client.
pub struct Client {
    shared: Arc<Shared>,
    receive_loop: AbortHandle,
}

pub(crate) struct Shared {
    socket: UdpSocket,
    pending: Mutex<PendingTable>,
    on_error: Option<ErrorSink>,
    closed: AtomicBool,
}

#[derive(Default)]
struct PendingTable {
    sinks: HashMap<u8, mpsc::UnboundedSender<Reply>>,
    next_id: u8,
}

impl PendingTable {
    /// Allocate the first free request id at or after the cursor.
    ///
    /// The cursor wraps at 256; ids still bound to a session are skipped so
    /// a long-lived file transfer can never be aliased by a later request.
    fn allocate(&mut self) -> Result<u8, Error> {
        for offset in 0..=u8::MAX {
            let id = self.next_id.wrapping_add(offset);
            if !self.sinks.contains_key(&id) {
                self.next_id = id.wrapping_add(1);
                return Ok(id);
            }
        }
        Err(Error::RequestIdsExhausted)
    }
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, PendingTable> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report(&self, error: Error) {
        if let Some(sink) = &self.on_error {
            sink(error);
        }
    }

    /// Route one decoded reply to its pending session.
    fn route(&self, header: ResponseHeader, payload: Bytes) {
        let sink = self.pending().sinks.get(&header.request_id).cloned();
        match sink {
            // A closed receiver means the session resolved while the reply
            // was in flight; the stale reply is dropped silently.
            Some(sink) => {
                let _ = sink.send((header, payload));
            }
            None => {
                tracing::debug!(request_id = header.request_id, "unsolicited reply");
                self.report(Error::UnsolicitedReply(header.request_id));
            }
        }
    }

    pub(crate) async fn send_frame(&self, frame: &[u8]) -> Result<(), Error> {
        self.socket
            .send(frame)
            .await
            .map(|_| ())
            .map_err(|error| Error::transport("sending request", error))
    }
}

/// Removes the pending-table entry of a session on every exit path.
pub(crate) struct HandlerGuard {
    shared: Arc<Shared>,
    id: u8,
}

impl Drop for HandlerGuard {
    fn drop(&mut self) {
        self.shared.pending().sinks.remove(&self.id);
    }
}

impl Client {
    /// Connect to a controller.
    ///
    /// Resolves `host`, binds and connects the datagram socket and starts
    /// the receive loop. The timeout covers resolution and connecting.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, Error> {
        Self::connect_with(host, port, timeout, None).await
    }

    /// Connect with an error sink for failures that have no owning
    /// session.
    pub async fn connect_with(
        host: &str,
        port: u16,
        timeout: Duration,
        on_error: Option<ErrorSink>,
    ) -> Result<Self, Error> {
        let socket = tokio::time::timeout(timeout, open_socket(host, port))
            .await
            .map_err(|_| Error::Timeout)??;

        let shared = Arc::new(Shared {
            socket,
            pending: Mutex::new(PendingTable::default()),
            on_error,
            closed: AtomicBool::new(false),
        });
        let receive_loop = tokio::spawn(receive_loop(shared.clone())).abort_handle();
        tracing::debug!(host, port, "datagram client connected");

        Ok(Self { shared, receive_loop })
    }

    /// Close the client.
    ///
    /// Stops the receive loop and resolves every outstanding session with
    /// [`Error::Cancelled`]. Subsequent operations fail with
    /// [`Error::NotConnected`]. Dropping the client closes it.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.receive_loop.abort();
        self.shared.pending().sinks.clear();
        tracing::debug!("datagram client closed");
    }

    /// Send one command and await its decoded reply.
    pub async fn send_command<C: Command>(
        &self,
        command: C,
        timeout: Duration,
    ) -> Result<C::Response, Error> {
        self.send_command_at(command, Instant::now() + timeout).await
    }

    /// Send one command with an absolute deadline.
    pub async fn send_command_at<C: Command>(
        &self,
        command: C,
        deadline: Instant,
    ) -> Result<C::Response, Error> {
        tokio::time::timeout_at(deadline, self.request(command))
            .await
            .map_err(|_| Error::Timeout)?
    }

    /// Dispatch several heterogeneous commands concurrently under one
    /// deadline.
    ///
    /// Resolves with the tuple of responses in input order, or with the
    /// first error; on error the remaining sub-sessions are cancelled.
    pub async fn send_commands<S: CommandSet>(
        &self,
        commands: S,
        timeout: Duration,
    ) -> Result<S::Response, Error> {
        self.send_commands_at(commands, Instant::now() + timeout).await
    }

    /// [`Client::send_commands`] with an absolute deadline.
    pub async fn send_commands_at<S: CommandSet>(
        &self,
        commands: S,
        deadline: Instant,
    ) -> Result<S::Response, Error> {
        commands.send_all(self, deadline).await
    }

    /// One request/reply exchange without a deadline.
    async fn request<C: Command>(&self, command: C) -> Result<C::Response, Error> {
        let (id, mut replies, _guard) = self.register()?;

        let mut frame = Vec::with_capacity(HEADER_SIZE);
        command.encode_request(id, &mut frame)?;
        self.shared.send_frame(&frame).await?;

        let (header, payload) = replies.recv().await.ok_or(Error::Cancelled)?;
        if header.status != 0 {
            return Err(Error::CommandFailed {
                status: header.status,
                extra_status: header.extra_status,
            });
        }
        Ok(command.decode_response(&header, &payload)?)
    }

    /// Allocate a request id and bind a reply sink to it.
    ///
    /// The returned guard unbinds the sink when dropped.
    pub(crate) fn register(
        &self,
    ) -> Result<(u8, mpsc::UnboundedReceiver<Reply>, HandlerGuard), Error> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(Error::NotConnected);
        }
        let mut table = self.shared.pending();
        let id = table.allocate()?;
        let (sink, replies) = mpsc::unbounded_channel();
        table.sinks.insert(id, sink);
        drop(table);
        Ok((id, replies, HandlerGuard { shared: self.shared.clone(), id }))
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}

async fn open_socket(host: &str, port: u16) -> Result<UdpSocket, Error> {
    let addresses = lookup_host((host, port))
        .await
        .map_err(|error| Error::transport("resolving the controller address", error))?;

    let mut last_error = None;
    for address in addresses {
        let bind_address: SocketAddr = match address {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = match UdpSocket::bind(bind_address).await {
            Ok(socket) => socket,
            Err(error) => {
                last_error = Some(error);
                continue;
            }
        };
        match socket.connect(address).await {
            Ok(()) => return Ok(socket),
            Err(error) => last_error = Some(error),
        }
    }

    Err(Error::transport(
        "connecting the datagram socket",
        last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
        }),
    ))
}

/// Receive datagrams and route them until the socket fails or the client
/// closes.
async fn receive_loop(shared: Arc<Shared>) {
    let mut buffer = vec![0u8; RECEIVE_BUFFER_SIZE];
    loop {
        match shared.socket.recv(&mut buffer).await {
            Ok(size) => match ResponseHeader::decode(&buffer[..size]) {
                Ok((header, payload)) => shared.route(header, Bytes::copy_from_slice(payload)),
                Err(error) => {
                    tracing::warn!(%error, "dropping malformed datagram");
                    shared.report(error.into());
                }
            },
            Err(error) => {
                if shared.closed.load(Ordering::Acquire) {
                    return;
                }
                tracing::error!(%error, "datagram receive loop failed");
                shared.report(Error::transport("receiving datagram", error));
                return;
            }
        }
    }
}
