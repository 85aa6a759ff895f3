//! The fixed 32-byte request/response header.
//!
//! Layout (all integers little-endian):
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 4 | magic `"YERC"` |
//! | 4 | 2 | header size, always 32 |
//! | 6 | 2 | payload size, at most 1145 |
//! | 8 | 1 | reserved, 3 on transmit |
//! | 9 | 1 | division |
//! | 10 | 1 | ack, 0 on requests, 1 on replies |
//! | 11 | 1 | request id |
//! | 12 | 4 | block number, bit 31 marks the final block |
//! | 16 | 8 | reserved |
//! | 24 | 4 | request: command, instance — reply: service, status, added status size |
//! | 28 | 4 | request: attribute, service, padding — reply: extra status, padding |

use crate::error::ProtocolError;
use crate::udp::wire::{read_u8, read_u16_le, read_u32_le};
use crate::udp::{Division, HEADER_SIZE, LAST_BLOCK, MAX_PAYLOAD_SIZE};

const MAGIC: &[u8; 4] = b"YERC";

/// Value of the reserved byte at offset 8 on transmit.
const RESERVED_MAGIC: u8 = 3;

/// Header of an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    /// Size of the payload following the header.
    pub payload_size: u16,
    /// Top-level request category.
    pub division: Division,
    /// Ack flag; only file-transfer block acknowledgements set this.
    pub ack: bool,
    /// Request id correlating the reply.
    pub request_id: u8,
    /// Block number for multi-block file transfers, otherwise 0.
    pub block_number: u32,
    /// Command number.
    pub command: u16,
    /// Command instance.
    pub instance: u16,
    /// Command attribute.
    pub attribute: u8,
    /// Service code.
    pub service: u8,
}

impl RequestHeader {
    /// Header for a robot-division command.
    pub fn robot(
        payload_size: u16,
        command: u16,
        instance: u16,
        attribute: u8,
        service: u8,
        request_id: u8,
    ) -> Self {
        Self {
            payload_size,
            division: Division::Robot,
            ack: false,
            request_id,
            block_number: 0,
            command,
            instance,
            attribute,
            service,
        }
    }

    /// Header for a file-division frame.
    ///
    /// File operations carry their operation code in the service byte;
    /// command, instance and attribute are zero.
    pub fn file(
        payload_size: u16,
        operation: u8,
        request_id: u8,
        block_number: u32,
        ack: bool,
    ) -> Self {
        Self {
            payload_size,
            division: Division::File,
            ack,
            request_id,
            block_number,
            command: 0,
            instance: 0,
            attribute: 0,
            service: operation,
        }
    }

    /// Append the encoded header to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.reserve(HEADER_SIZE + self.payload_size as usize);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&(HEADER_SIZE as u16).to_le_bytes());
        out.extend_from_slice(&self.payload_size.to_le_bytes());
        out.push(RESERVED_MAGIC);
        out.push(self.division as u8);
        out.push(u8::from(self.ack));
        out.push(self.request_id);
        out.extend_from_slice(&self.block_number.to_le_bytes());
        out.extend_from_slice(&[b'9'; 8]);
        out.extend_from_slice(&self.command.to_le_bytes());
        out.extend_from_slice(&self.instance.to_le_bytes());
        out.push(self.attribute);
        out.push(self.service);
        out.extend_from_slice(&[0; 2]);
    }
}

/// Header of an inbound reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    /// Size of the payload following the header.
    pub payload_size: u16,
    /// Top-level category echoed by the peer.
    pub division: Division,
    /// Request id this reply answers.
    pub request_id: u8,
    /// Block number for multi-block file transfers.
    pub block_number: u32,
    /// Service code echoed by the peer.
    pub service: u8,
    /// Status of the command; 0 means success.
    pub status: u8,
    /// Additional status qualifying a failure.
    pub extra_status: u16,
}

impl ResponseHeader {
    /// Decode a reply datagram into its header and payload view.
    ///
    /// Validates the magic, header size, payload bound, ack flag and that
    /// the datagram length matches the declared payload size exactly.
    pub fn decode(datagram: &[u8]) -> Result<(Self, &[u8]), ProtocolError> {
        if datagram.len() < HEADER_SIZE {
            return Err(ProtocolError::Truncated {
                expected: HEADER_SIZE,
                actual: datagram.len(),
            });
        }

        let mut data = datagram;
        let magic = crate::udp::wire::take(&mut data, 4)?;
        if magic != MAGIC {
            return Err(ProtocolError::MissingMagic);
        }

        let header_size = read_u16_le(&mut data)?;
        if header_size as usize != HEADER_SIZE {
            return Err(ProtocolError::WrongHeaderSize {
                expected: HEADER_SIZE as u16,
                actual: header_size,
            });
        }

        let payload_size = read_u16_le(&mut data)?;
        if payload_size as usize > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                actual: payload_size as usize,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let _reserved = read_u8(&mut data)?;
        let division = Division::from_u8(read_u8(&mut data)?)?;

        let ack = read_u8(&mut data)?;
        if ack != 1 {
            return Err(ProtocolError::WrongAck { actual: ack });
        }

        let request_id = read_u8(&mut data)?;
        let block_number = read_u32_le(&mut data)?;

        // Reserved.
        crate::udp::wire::take(&mut data, 8)?;

        let service = read_u8(&mut data)?;
        let status = read_u8(&mut data)?;

        // Added status size; the extra status is always read as one word.
        crate::udp::wire::take(&mut data, 2)?;
        let extra_status = read_u16_le(&mut data)?;

        // Padding.
        crate::udp::wire::take(&mut data, 2)?;

        let expected = HEADER_SIZE + payload_size as usize;
        if datagram.len() < expected {
            return Err(ProtocolError::Truncated { expected, actual: datagram.len() });
        }
        if datagram.len() > expected {
            return Err(ProtocolError::TrailingBytes { expected, actual: datagram.len() });
        }

        let header = Self {
            payload_size,
            division,
            request_id,
            block_number,
            service,
            status,
            extra_status,
        };
        Ok((header, data))
    }

    /// Block number with the final-block bit cleared.
    pub fn block(&self) -> u32 {
        self.block_number & !LAST_BLOCK
    }

    /// True if this is the final block of a file transfer.
    pub fn is_last_block(&self) -> bool {
        self.block_number & LAST_BLOCK != 0
    }
}
