//! The stream client.
//!
//! One command is in flight at a time; `send_command` takes `&mut self` so
//! callers serialize naturally. Inbound bytes are framed by the
//! [`ResponseMatcher`] from the codec crate: command responses end with
//! CRLF, data bodies with a bare CR.

use std::time::Duration;

use bytes::BytesMut;
use hses_proto::tcp::wire;
use hses_proto::tcp::{CommandResponse, ResponseMatcher, StreamCommand};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::Error;

/// Client for the line-oriented ASCII protocol.
pub struct Client {
    stream: TcpStream,
    read_buffer: BytesMut,
}

impl Client {
    /// Connect to a controller and perform the start handshake.
    ///
    /// A keep-alive value asks the server to check peer liveness at the
    /// given interval. The timeout covers connecting and the handshake.
    pub async fn connect(
        host: &str,
        port: u16,
        keep_alive: Option<u32>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        tokio::time::timeout(timeout, Self::connect_inner(host, port, keep_alive))
            .await
            .map_err(|_| Error::Timeout)?
    }

    async fn connect_inner(
        host: &str,
        port: u16,
        keep_alive: Option<u32>,
    ) -> Result<Self, Error> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|error| Error::transport("connecting the stream socket", error))?;
        let mut client = Self { stream, read_buffer: BytesMut::with_capacity(1024) };

        client.write_all(wire::encode_start(keep_alive).as_bytes()).await?;
        let response = client.read_message().await?;
        match wire::decode_command_response(&response)? {
            CommandResponse::Ok(_) => {
                tracing::debug!(host, port, "stream client connected");
                Ok(client)
            }
            CommandResponse::Failed(message) => Err(Error::CommandRejected(message)),
        }
    }

    /// Send one command and await its decoded response.
    pub async fn send_command<C: StreamCommand>(
        &mut self,
        command: C,
        timeout: Duration,
    ) -> Result<C::Response, Error> {
        tokio::time::timeout(timeout, self.request(command))
            .await
            .map_err(|_| Error::Timeout)?
    }

    async fn request<C: StreamCommand>(&mut self, command: C) -> Result<C::Response, Error> {
        let body = command.data_body()?;
        let line = wire::encode_request_line(command.request_name(), body.len());

        self.write_all(line.as_bytes()).await?;
        if !body.is_empty() {
            self.write_all(body.as_bytes()).await?;
        }

        let response = self.read_message().await?;
        match wire::decode_command_response(&response)? {
            CommandResponse::Ok(_) => {}
            CommandResponse::Failed(message) => return Err(Error::CommandRejected(message)),
        }

        let data = self.read_message().await?;
        Ok(command.decode_data(&data)?)
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.stream
            .write_all(bytes)
            .await
            .map_err(|error| Error::transport("sending request", error))
    }

    /// Read one framed message from the stream.
    ///
    /// Bytes past the message end stay buffered for the next call.
    async fn read_message(&mut self) -> Result<String, Error> {
        loop {
            let mut matcher = ResponseMatcher::new();
            if let Some(end) = matcher.find_end(&self.read_buffer) {
                let message = self.read_buffer.split_to(end);
                return String::from_utf8(message.to_vec()).map_err(|error| {
                    hses_proto::ProtocolError::InvalidText(format!(
                        "response is not valid UTF-8: {error}"
                    ))
                    .into()
                });
            }

            let received = self
                .stream
                .read_buf(&mut self.read_buffer)
                .await
                .map_err(|error| Error::transport("receiving response", error))?;
            if received == 0 {
                return Err(Error::transport(
                    "receiving response",
                    std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "connection closed mid-message",
                    ),
                ));
            }
        }
    }
}
