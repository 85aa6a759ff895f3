//! Little-endian value and position serialization for datagram payloads.

use crate::error::ProtocolError;
use crate::types::{
    CartesianPosition, CoordinateSystem, PoseConfiguration, Position, PulsePosition, Status,
};
use crate::udp::robot_command;

/// Encoded size of a position payload: thirteen 32-bit words.
pub const POSITION_SIZE: usize = 13 * 4;

/// Split `n` bytes off the front of the cursor.
pub(crate) fn take<'a>(data: &mut &'a [u8], n: usize) -> Result<&'a [u8], ProtocolError> {
    if data.len() < n {
        return Err(ProtocolError::Truncated { expected: n, actual: data.len() });
    }
    let (head, tail) = data.split_at(n);
    *data = tail;
    Ok(head)
}

pub(crate) fn read_u8(data: &mut &[u8]) -> Result<u8, ProtocolError> {
    take(data, 1).map(|bytes| bytes[0])
}

pub(crate) fn read_u16_le(data: &mut &[u8]) -> Result<u16, ProtocolError> {
    take(data, 2).map(|bytes| u16::from_le_bytes([bytes[0], bytes[1]]))
}

pub(crate) fn read_u32_le(data: &mut &[u8]) -> Result<u32, ProtocolError> {
    take(data, 4).map(|bytes| u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub(crate) fn read_i32_le(data: &mut &[u8]) -> Result<i32, ProtocolError> {
    read_u32_le(data).map(|value| value as i32)
}

/// A value that can live in a controller variable.
///
/// Each kind pairs its wire size with a single-variable and a
/// multi-variable command number.
pub trait VarValue: Sized + Clone + Send + Sync + 'static {
    /// Encoded size of one value in bytes.
    const ENCODED_SIZE: usize;
    /// Command number for single-variable access.
    const SINGLE_COMMAND: u16;
    /// Command number for multi-variable access.
    const MULTI_COMMAND: u16;

    /// Append the encoded value to `out`.
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError>;

    /// Decode one value from the front of the cursor.
    fn decode(data: &mut &[u8]) -> Result<Self, ProtocolError>;

    /// Decode the payload of a single-variable read.
    ///
    /// The default requires exactly [`Self::ENCODED_SIZE`] bytes.
    fn decode_single(payload: &[u8]) -> Result<Self, ProtocolError> {
        ProtocolError::check_len(payload, Self::ENCODED_SIZE)?;
        let mut data = payload;
        Self::decode(&mut data)
    }
}

impl VarValue for u8 {
    const ENCODED_SIZE: usize = 1;
    const SINGLE_COMMAND: u16 = robot_command::READWRITE_INT8_VARIABLE;
    const MULTI_COMMAND: u16 = robot_command::READWRITE_MULTIPLE_INT8;

    fn encode(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        out.push(*self);
        Ok(())
    }

    fn decode(data: &mut &[u8]) -> Result<Self, ProtocolError> {
        read_u8(data)
    }
}

impl VarValue for i16 {
    const ENCODED_SIZE: usize = 2;
    const SINGLE_COMMAND: u16 = robot_command::READWRITE_INT16_VARIABLE;
    const MULTI_COMMAND: u16 = robot_command::READWRITE_MULTIPLE_INT16;

    fn encode(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        out.extend_from_slice(&self.to_le_bytes());
        Ok(())
    }

    fn decode(data: &mut &[u8]) -> Result<Self, ProtocolError> {
        read_u16_le(data).map(|value| value as i16)
    }
}

impl VarValue for i32 {
    const ENCODED_SIZE: usize = 4;
    const SINGLE_COMMAND: u16 = robot_command::READWRITE_INT32_VARIABLE;
    const MULTI_COMMAND: u16 = robot_command::READWRITE_MULTIPLE_INT32;

    fn encode(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        out.extend_from_slice(&self.to_le_bytes());
        Ok(())
    }

    fn decode(data: &mut &[u8]) -> Result<Self, ProtocolError> {
        read_i32_le(data)
    }
}

impl VarValue for f32 {
    const ENCODED_SIZE: usize = 4;
    const SINGLE_COMMAND: u16 = robot_command::READWRITE_FLOAT_VARIABLE;
    const MULTI_COMMAND: u16 = robot_command::READWRITE_MULTIPLE_FLOAT;

    fn encode(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        out.extend_from_slice(&self.to_le_bytes());
        Ok(())
    }

    fn decode(data: &mut &[u8]) -> Result<Self, ProtocolError> {
        read_u32_le(data).map(Self::from_bits)
    }
}

impl VarValue for Position {
    const ENCODED_SIZE: usize = POSITION_SIZE;
    const SINGLE_COMMAND: u16 = robot_command::READWRITE_ROBOT_POSITION_VARIABLE;
    const MULTI_COMMAND: u16 = robot_command::READWRITE_MULTIPLE_ROBOT_POSITION;

    fn encode(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        encode_position(self, out)
    }

    fn decode(data: &mut &[u8]) -> Result<Self, ProtocolError> {
        decode_position(data)
    }

    /// The controller may return a position payload shorter than the full
    /// 52 bytes; missing trailing words read as zero.
    fn decode_single(payload: &[u8]) -> Result<Self, ProtocolError> {
        decode_padded_position(payload)
    }
}

/// Encode a position as the thirteen-word wire layout.
///
/// Word order: position type, configuration, tool, user frame, extended
/// configuration, then eight value slots (joints for pulse positions, the
/// six axis components plus two padding words for cartesian ones).
pub fn encode_position(position: &Position, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
    match position {
        Position::Pulse(pulse) => {
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&pulse.tool().to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            for joint in pulse.joints_padded() {
                out.extend_from_slice(&joint.to_le_bytes());
            }
            Ok(())
        }
        Position::Cartesian(cartesian) => encode_cartesian_position(cartesian, out),
    }
}

fn encode_cartesian_position(
    position: &CartesianPosition,
    out: &mut Vec<u8>,
) -> Result<(), ProtocolError> {
    // Validate the frame before any byte is written.
    let (frame_type, user_frame) = position.frame.frame_code()?;
    out.extend_from_slice(&frame_type.to_le_bytes());
    out.extend_from_slice(&u32::from(position.configuration.bits()).to_le_bytes());
    out.extend_from_slice(&position.tool.to_le_bytes());
    out.extend_from_slice(&user_frame.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    // Translation components in micrometres.
    out.extend_from_slice(&((position.x * 1000.0).round() as i32).to_le_bytes());
    out.extend_from_slice(&((position.y * 1000.0).round() as i32).to_le_bytes());
    out.extend_from_slice(&((position.z * 1000.0).round() as i32).to_le_bytes());
    // Rotation components in 1e-4 degrees.
    out.extend_from_slice(&((position.rx * 10000.0).round() as i32).to_le_bytes());
    out.extend_from_slice(&((position.ry * 10000.0).round() as i32).to_le_bytes());
    out.extend_from_slice(&((position.rz * 10000.0).round() as i32).to_le_bytes());
    // Padding to eight value slots.
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    Ok(())
}

/// Decode a thirteen-word position payload from the front of the cursor.
pub fn decode_position(data: &mut &[u8]) -> Result<Position, ProtocolError> {
    let position_type = read_u32_le(data)?;

    if position_type == 0 {
        // Pulse position: configuration, user frame and extended
        // configuration carry no information.
        let _configuration = read_u32_le(data)?;
        let tool = read_i32_le(data)?;
        let _user_frame = read_u32_le(data)?;
        let _extended = read_u32_le(data)?;

        let mut joints = [0i32; 8];
        for joint in &mut joints {
            *joint = read_i32_le(data)?;
        }
        let position = PulsePosition::new(&joints, tool)?;
        return Ok(Position::Pulse(position));
    }

    let configuration = read_u32_le(data)?;
    let tool = read_i32_le(data)?;
    let user_frame = read_u32_le(data)?;
    let _extended = read_u32_le(data)?;
    let frame = CoordinateSystem::from_frame_code(position_type, user_frame)?;

    let x = f64::from(read_i32_le(data)?) / 1000.0;
    let y = f64::from(read_i32_le(data)?) / 1000.0;
    let z = f64::from(read_i32_le(data)?) / 1000.0;
    let rx = f64::from(read_i32_le(data)?) / 10000.0;
    let ry = f64::from(read_i32_le(data)?) / 10000.0;
    let rz = f64::from(read_i32_le(data)?) / 10000.0;

    // Padding words.
    take(data, 8)?;

    Ok(Position::Cartesian(CartesianPosition {
        x,
        y,
        z,
        rx,
        ry,
        rz,
        frame,
        configuration: PoseConfiguration::from_bits(configuration as u8),
        tool,
    }))
}

/// Decode a position payload of at most 52 bytes, padding missing trailing
/// bytes with zeros.
pub fn decode_padded_position(payload: &[u8]) -> Result<Position, ProtocolError> {
    if payload.len() > POSITION_SIZE {
        return Err(ProtocolError::TrailingBytes {
            expected: POSITION_SIZE,
            actual: payload.len(),
        });
    }
    let mut padded = [0u8; POSITION_SIZE];
    padded[..payload.len()].copy_from_slice(payload);
    let mut data = &padded[..];
    decode_position(&mut data)
}

/// Decode the 8-byte status payload.
///
/// Byte 0 carries the execution mode bits, byte 4 the hold and alarm bits.
pub fn decode_status(payload: &[u8]) -> Result<Status, ProtocolError> {
    ProtocolError::check_len(payload, 8)?;
    Ok(Status {
        step: payload[0] & 0x01 != 0,
        one_cycle: payload[0] & 0x02 != 0,
        continuous: payload[0] & 0x04 != 0,
        running: payload[0] & 0x08 != 0,
        speed_limited: payload[0] & 0x10 != 0,
        teach: payload[0] & 0x20 != 0,
        play: payload[0] & 0x40 != 0,
        remote: payload[0] & 0x80 != 0,
        teach_pendant_hold: payload[4] & 0x02 != 0,
        external_hold: payload[4] & 0x04 != 0,
        command_hold: payload[4] & 0x08 != 0,
        alarm: payload[4] & 0x10 != 0,
        error: payload[4] & 0x20 != 0,
        servo_on: payload[4] & 0x40 != 0,
    })
}

/// Decode a file list payload: file names separated by CRLF.
pub fn decode_file_list(data: &[u8]) -> Result<Vec<String>, ProtocolError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    if data.len() == 1 {
        return Err(ProtocolError::InvalidText(
            "file list consists of exactly one byte".into(),
        ));
    }

    let text = std::str::from_utf8(data)
        .map_err(|error| ProtocolError::InvalidText(format!("file list is not UTF-8: {error}")))?;

    Ok(text
        .split("\r\n")
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect())
}
