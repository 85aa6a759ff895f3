//! Scripted mock controller speaking just enough of the wire protocol to
//! exercise the clients over localhost sockets.
#![allow(dead_code)]

use std::net::SocketAddr;

use tokio::net::UdpSocket;

/// Header size of the binary protocol.
pub const HEADER_SIZE: usize = 32;

/// Maximum payload size of the binary protocol.
pub const MAX_PAYLOAD_SIZE: usize = 1145;

/// Final-block bit of the block number field.
pub const LAST_BLOCK: u32 = 0x8000_0000;

/// A parsed request frame as seen by the controller.
#[derive(Debug, Clone)]
pub struct Request {
    pub division: u8,
    pub ack: u8,
    pub request_id: u8,
    pub block_number: u32,
    pub command: u16,
    pub instance: u16,
    pub attribute: u8,
    pub service: u8,
    pub payload: Vec<u8>,
}

/// Parse a request frame, checking the fixed fields every request shares.
pub fn parse_request(frame: &[u8]) -> Request {
    assert!(frame.len() >= HEADER_SIZE, "request shorter than a header");
    assert_eq!(&frame[0..4], b"YERC", "request magic");
    assert_eq!(u16::from_le_bytes([frame[4], frame[5]]), 32, "request header size");

    let payload_size = u16::from_le_bytes([frame[6], frame[7]]) as usize;
    assert_eq!(frame.len(), HEADER_SIZE + payload_size, "request length");

    Request {
        division: frame[9],
        ack: frame[10],
        request_id: frame[11],
        block_number: u32::from_le_bytes([frame[12], frame[13], frame[14], frame[15]]),
        command: u16::from_le_bytes([frame[24], frame[25]]),
        instance: u16::from_le_bytes([frame[26], frame[27]]),
        attribute: frame[28],
        service: frame[29],
        payload: frame[HEADER_SIZE..].to_vec(),
    }
}

/// Encode a robot-division reply.
pub fn response(request_id: u8, status: u8, extra_status: u16, payload: &[u8]) -> Vec<u8> {
    encode_response(1, request_id, 0, 0x81, status, extra_status, payload)
}

/// Encode a file-division reply carrying one data block.
pub fn file_block(request_id: u8, operation: u8, block_number: u32, payload: &[u8]) -> Vec<u8> {
    encode_response(2, request_id, block_number, operation, 0, 0, payload)
}

/// Encode a file-division acknowledgement for an uploaded block.
pub fn file_ack(request_id: u8, operation: u8, block_number: u32) -> Vec<u8> {
    encode_response(2, request_id, block_number, operation, 0, 0, &[])
}

/// Encode a reply with a failure status.
pub fn failure(request_id: u8, status: u8, extra_status: u16) -> Vec<u8> {
    encode_response(1, request_id, 0, 0x81, status, extra_status, &[])
}

fn encode_response(
    division: u8,
    request_id: u8,
    block_number: u32,
    service: u8,
    status: u8,
    extra_status: u16,
    payload: &[u8],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(b"YERC");
    out.extend_from_slice(&32u16.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    out.push(0);
    out.push(division);
    out.push(1);
    out.push(request_id);
    out.extend_from_slice(&block_number.to_le_bytes());
    out.extend_from_slice(&[0; 8]);
    out.push(service);
    out.push(status);
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&extra_status.to_le_bytes());
    out.extend_from_slice(&[0; 2]);
    out.extend_from_slice(payload);
    out
}

/// A mock controller on a localhost UDP socket.
pub struct MockController {
    socket: UdpSocket,
}

impl MockController {
    /// Bind a mock controller to an ephemeral localhost port.
    pub async fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        Self { socket }
    }

    /// The port clients should connect to.
    pub fn port(&self) -> u16 {
        self.socket.local_addr().unwrap().port()
    }

    /// Receive and parse one request frame.
    pub async fn recv(&self) -> (Request, SocketAddr) {
        let mut buffer = vec![0u8; HEADER_SIZE + MAX_PAYLOAD_SIZE];
        let (size, peer) = self.socket.recv_from(&mut buffer).await.unwrap();
        (parse_request(&buffer[..size]), peer)
    }

    /// Send one raw reply frame.
    pub async fn send(&self, peer: SocketAddr, frame: &[u8]) {
        self.socket.send_to(frame, peer).await.unwrap();
    }

    /// Serve one download: chunk `data` into blocks, awaiting the ack for
    /// each. Returns the request that started the transfer.
    pub async fn serve_download(&self, operation: u8, data: &[u8]) -> Request {
        let (request, peer) = self.recv().await;
        assert_eq!(request.division, 2);
        assert_eq!(request.service, operation);
        assert_eq!(request.ack, 0);

        let chunk_count = data.len().div_ceil(MAX_PAYLOAD_SIZE).max(1);
        for (index, chunk) in chunks_or_one_empty(data).into_iter().enumerate() {
            let mut block_number = index as u32 + 1;
            if index + 1 == chunk_count {
                block_number |= LAST_BLOCK;
            }
            self.send(peer, &file_block(request.request_id, operation, block_number, chunk))
                .await;

            let (ack, _) = self.recv().await;
            assert_eq!(ack.division, 2);
            assert_eq!(ack.ack, 1, "data blocks must be acknowledged");
            assert_eq!(ack.request_id, request.request_id);
            assert_eq!(ack.block_number, index as u32 + 1);
            assert!(ack.payload.is_empty(), "acks carry no payload");
        }
        request
    }

    /// Serve one upload: acknowledge the file-name frame and every data
    /// block. Returns the uploaded bytes.
    pub async fn serve_upload(&self, expected_name: &str, expected_size: usize) -> Vec<u8> {
        let (request, peer) = self.recv().await;
        assert_eq!(request.division, 2);
        assert_eq!(request.service, 0x15);
        assert_eq!(request.block_number, 1, "the file-name frame is block 1");
        assert_eq!(request.payload, expected_name.as_bytes());
        self.send(peer, &file_ack(request.request_id, 0x15, 1)).await;

        let mut data = Vec::new();
        let mut expected_block = 2u32;
        while data.len() < expected_size {
            let (block, peer) = self.recv().await;
            assert_eq!(block.division, 2);
            assert_eq!(block.request_id, request.request_id);
            assert_eq!(block.block_number & !LAST_BLOCK, expected_block);

            data.extend_from_slice(&block.payload);
            let done = block.block_number & LAST_BLOCK != 0;
            assert_eq!(done, data.len() >= expected_size, "final-block bit placement");

            self.send(peer, &file_ack(block.request_id, 0x15, block.block_number)).await;
            expected_block += 1;
        }
        data
    }
}

/// Split data into maximum-payload chunks; an empty file is one empty
/// block.
fn chunks_or_one_empty(data: &[u8]) -> Vec<&[u8]> {
    if data.is_empty() {
        return vec![&[]];
    }
    data.chunks(MAX_PAYLOAD_SIZE).collect()
}

/// Deterministic test data of a given size.
pub fn pattern(size: usize) -> Vec<u8> {
    (0..size).map(|index| (index * 31 + index / 251) as u8).collect()
}
