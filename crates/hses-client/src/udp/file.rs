//! Multi-block file transfers.
//!
//! The file protocol uses the block number for flow control: the sender
//! numbers frames from 1, sets bit 31 on the final frame and waits for the
//! peer to acknowledge each block by echoing its number in an empty frame
//! with the ack flag set. The single timeout bounds the whole transfer.

use std::time::Duration;

use hses_proto::udp::header::RequestHeader;
use hses_proto::udp::{self, DeleteFile, MAX_PAYLOAD_SIZE, file_command};

use crate::error::Error;
use crate::udp::client::Client;

/// Progress callback of a download: total bytes received so far.
pub type DownloadProgress<'a> = &'a mut (dyn FnMut(usize) + Send);

/// Progress callback of an upload: bytes acknowledged and total bytes.
pub type UploadProgress<'a> = &'a mut (dyn FnMut(usize, usize) + Send);

impl Client {
    /// List files on the controller matching a type pattern such as
    /// `*.JBI`.
    pub async fn read_file_list(
        &self,
        pattern: &str,
        timeout: Duration,
        on_progress: Option<DownloadProgress<'_>>,
    ) -> Result<Vec<String>, Error> {
        let data = tokio::time::timeout(
            timeout,
            self.download(file_command::READ_FILE_LIST, pattern.as_bytes(), on_progress),
        )
        .await
        .map_err(|_| Error::Timeout)??;
        Ok(udp::decode_file_list(&data)?)
    }

    /// Read a file from the controller.
    pub async fn read_file(
        &self,
        name: &str,
        timeout: Duration,
        on_progress: Option<DownloadProgress<'_>>,
    ) -> Result<Vec<u8>, Error> {
        tokio::time::timeout(
            timeout,
            self.download(file_command::READ_FILE, name.as_bytes(), on_progress),
        )
        .await
        .map_err(|_| Error::Timeout)?
    }

    /// Write a file to the controller.
    pub async fn write_file(
        &self,
        name: &str,
        data: &[u8],
        timeout: Duration,
        on_progress: Option<UploadProgress<'_>>,
    ) -> Result<(), Error> {
        tokio::time::timeout(timeout, self.upload(name, data, on_progress))
            .await
            .map_err(|_| Error::Timeout)?
    }

    /// Delete a file on the controller.
    pub async fn delete_file(&self, name: &str, timeout: Duration) -> Result<(), Error> {
        self.send_command(DeleteFile { name: name.to_owned() }, timeout).await
    }

    /// Drive a download: send the request, acknowledge and accumulate
    /// blocks until the final-block bit.
    async fn download(
        &self,
        operation: u8,
        request_payload: &[u8],
        mut on_progress: Option<DownloadProgress<'_>>,
    ) -> Result<Vec<u8>, Error> {
        if request_payload.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::InvalidArgument(format!(
                "file request payload of {} bytes exceeds the maximum of {}",
                request_payload.len(),
                MAX_PAYLOAD_SIZE,
            )));
        }

        let (id, mut replies, _guard) = self.register()?;

        let mut frame = Vec::new();
        RequestHeader::file(request_payload.len() as u16, operation, id, 1, false)
            .encode(&mut frame);
        frame.extend_from_slice(request_payload);
        self.shared().send_frame(&frame).await?;

        let mut data = Vec::new();
        let mut blocks_received: u32 = 0;
        loop {
            let (header, payload) = replies.recv().await.ok_or(Error::Cancelled)?;
            if header.status != 0 {
                return Err(Error::CommandFailed {
                    status: header.status,
                    extra_status: header.extra_status,
                });
            }

            let block = header.block();
            if block != blocks_received + 1 {
                return Err(hses_proto::ProtocolError::UnexpectedBlockNumber {
                    expected: blocks_received + 1,
                    actual: block,
                }
                .into());
            }
            blocks_received = block;

            // Every data block is acknowledged with its (masked) number.
            let mut ack = Vec::new();
            RequestHeader::file(0, operation, id, block, true).encode(&mut ack);
            self.shared().send_frame(&ack).await?;

            data.extend_from_slice(&payload);
            if let Some(on_progress) = on_progress.as_deref_mut() {
                on_progress(data.len());
            }

            if header.is_last_block() {
                return Ok(data);
            }
        }
    }

    /// Drive an upload: send the file name as block 1, then one data chunk
    /// per acknowledgement.
    async fn upload(
        &self,
        name: &str,
        data: &[u8],
        mut on_progress: Option<UploadProgress<'_>>,
    ) -> Result<(), Error> {
        if name.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::InvalidArgument(format!(
                "file name of {} bytes exceeds the maximum payload of {}",
                name.len(),
                MAX_PAYLOAD_SIZE,
            )));
        }

        let (id, mut replies, _guard) = self.register()?;

        let mut frame = Vec::new();
        RequestHeader::file(name.len() as u16, file_command::WRITE_FILE, id, 1, false)
            .encode(&mut frame);
        frame.extend_from_slice(name.as_bytes());
        self.shared().send_frame(&frame).await?;

        // Frames sent so far, the file-name frame included.
        let mut blocks_sent: u32 = 1;
        loop {
            let (header, payload) = replies.recv().await.ok_or(Error::Cancelled)?;
            if header.status != 0 {
                return Err(Error::CommandFailed {
                    status: header.status,
                    extra_status: header.extra_status,
                });
            }
            if !payload.is_empty() {
                return Err(hses_proto::ProtocolError::TrailingBytes {
                    expected: 0,
                    actual: payload.len(),
                }
                .into());
            }
            if header.block() != blocks_sent {
                return Err(hses_proto::ProtocolError::UnexpectedBlockNumber {
                    expected: blocks_sent,
                    actual: header.block(),
                }
                .into());
            }

            let acknowledged = ((blocks_sent - 1) as usize * MAX_PAYLOAD_SIZE).min(data.len());
            if let Some(on_progress) = on_progress.as_deref_mut() {
                on_progress(acknowledged, data.len());
            }
            if acknowledged >= data.len() {
                return Ok(());
            }

            let offset = (blocks_sent - 1) as usize * MAX_PAYLOAD_SIZE;
            let chunk = &data[offset..(offset + MAX_PAYLOAD_SIZE).min(data.len())];
            let mut block_number = blocks_sent + 1;
            if offset + chunk.len() == data.len() {
                block_number |= udp::LAST_BLOCK;
            }

            let mut frame = Vec::new();
            RequestHeader::file(
                chunk.len() as u16,
                file_command::WRITE_FILE,
                id,
                block_number,
                false,
            )
            .encode(&mut frame);
            frame.extend_from_slice(chunk);
            self.shared().send_frame(&frame).await?;
            blocks_sent += 1;
        }
    }
}
