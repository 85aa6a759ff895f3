//! Datagram commands with typed responses.
//!
//! A [`Command`] knows how to encode its request frame (header plus
//! payload) and how to decode the payload of a successful reply. The
//! client never inspects payloads itself; it routes them to the command
//! that produced the request.

use crate::error::ProtocolError;
use crate::types::{CartesianPosition, CoordinateSystemType, Position, Speed, Status};
use crate::udp::header::{RequestHeader, ResponseHeader};
use crate::udp::wire::{self, VarValue};
use crate::udp::{MAX_PAYLOAD_SIZE, file_command, robot_command, service};

/// A request with a typed response.
pub trait Command: Send + Sync {
    /// The decoded payload of a successful reply.
    type Response: Send + 'static;

    /// Encode the request frame (header and payload) into `out`.
    fn encode_request(&self, request_id: u8, out: &mut Vec<u8>) -> Result<(), ProtocolError>;

    /// Decode the payload of a successful reply.
    ///
    /// Only called for replies with status 0; remote failures never reach
    /// the decoder.
    fn decode_response(
        &self,
        header: &ResponseHeader,
        payload: &[u8],
    ) -> Result<Self::Response, ProtocolError>;
}

/// Read the controller status bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadStatus;

impl Command for ReadStatus {
    type Response = Status;

    fn encode_request(&self, request_id: u8, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        RequestHeader::robot(
            0,
            robot_command::READ_STATUS_INFORMATION,
            1,
            0,
            service::GET_ALL,
            request_id,
        )
        .encode(out);
        Ok(())
    }

    fn decode_response(
        &self,
        _header: &ResponseHeader,
        payload: &[u8],
    ) -> Result<Status, ProtocolError> {
        wire::decode_status(payload)
    }
}

/// Read the current position of a control group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadCurrentPosition {
    /// Control group to read, 0-based.
    pub control_group: u8,
    /// Coordinate system to express the position in.
    pub coordinate_system: CoordinateSystemType,
}

impl Command for ReadCurrentPosition {
    type Response = Position;

    fn encode_request(&self, request_id: u8, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        let instance = u16::from(self.control_group)
            + match self.coordinate_system {
                CoordinateSystemType::RobotPulse => 1,
                CoordinateSystemType::BasePulse => 11,
                CoordinateSystemType::StationPulse => 21,
                CoordinateSystemType::RobotCartesian => 101,
            };
        RequestHeader::robot(
            0,
            robot_command::READ_ROBOT_POSITION,
            instance,
            0,
            service::GET_ALL,
            request_id,
        )
        .encode(out);
        Ok(())
    }

    fn decode_response(
        &self,
        _header: &ResponseHeader,
        payload: &[u8],
    ) -> Result<Position, ProtocolError> {
        wire::decode_padded_position(payload)
    }
}

/// Absolute cartesian interpolated move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveL {
    /// Control group to move, 0-based.
    pub control_group: u8,
    /// Target position.
    pub target: CartesianPosition,
    /// Motion speed.
    pub speed: Speed,
}

impl Command for MoveL {
    type Response = ();

    fn encode_request(&self, request_id: u8, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        const PAYLOAD_SIZE: u16 = 26 * 4;

        // Absolute cartesian interpolated move.
        const INSTANCE: u16 = 2;

        let (frame_type, user_frame) = self.target.frame.frame_code()?;

        RequestHeader::robot(
            PAYLOAD_SIZE,
            robot_command::MOVE_CARTESIAN,
            INSTANCE,
            1,
            service::GET_ALL,
            request_id,
        )
        .encode(out);

        let mut put = |word: u32| out.extend_from_slice(&word.to_le_bytes());
        put(u32::from(self.control_group) + 1);
        // Station control group.
        put(0);
        put(self.speed.kind.code());
        put(self.speed.value);
        put(frame_type);
        // Translation components in micrometres.
        put((self.target.x * 1000.0).round() as i32 as u32);
        put((self.target.y * 1000.0).round() as i32 as u32);
        put((self.target.z * 1000.0).round() as i32 as u32);
        // Rotation components in 1e-4 degrees.
        put((self.target.rx * 10000.0).round() as i32 as u32);
        put((self.target.ry * 10000.0).round() as i32 as u32);
        put((self.target.rz * 10000.0).round() as i32 as u32);
        // Reserved.
        put(0);
        put(0);
        put(u32::from(self.target.configuration.bits()));
        // Extended joint configuration, not supported.
        put(0);
        put(self.target.tool as u32);
        put(user_frame);
        // Unsupported base and station axes.
        for _ in 0..9 {
            put(0);
        }
        Ok(())
    }

    fn decode_response(
        &self,
        _header: &ResponseHeader,
        payload: &[u8],
    ) -> Result<(), ProtocolError> {
        ProtocolError::check_len(payload, 0)
    }
}

/// Read one variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadVar<T> {
    /// Variable index.
    pub index: u8,
    marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> ReadVar<T> {
    /// Read the variable at `index`.
    pub fn new(index: u8) -> Self {
        Self { index, marker: std::marker::PhantomData }
    }
}

impl<T: VarValue> Command for ReadVar<T> {
    type Response = T;

    fn encode_request(&self, request_id: u8, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        RequestHeader::robot(
            0,
            T::SINGLE_COMMAND,
            u16::from(self.index),
            0,
            service::GET_ALL,
            request_id,
        )
        .encode(out);
        Ok(())
    }

    fn decode_response(
        &self,
        _header: &ResponseHeader,
        payload: &[u8],
    ) -> Result<T, ProtocolError> {
        T::decode_single(payload)
    }
}

/// Read a run of consecutive variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadVars<T> {
    /// Index of the first variable.
    pub index: u8,
    /// Number of variables to read.
    pub count: u8,
    marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> ReadVars<T> {
    /// Read `count` variables starting at `index`.
    pub fn new(index: u8, count: u8) -> Self {
        Self { index, count, marker: std::marker::PhantomData }
    }
}

impl<T: VarValue> Command for ReadVars<T> {
    type Response = Vec<T>;

    fn encode_request(&self, request_id: u8, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        if self.count == 0 {
            return Err(ProtocolError::InvalidArgument(
                "cannot read zero variables".into(),
            ));
        }
        if self.count == 1 {
            RequestHeader::robot(
                0,
                T::SINGLE_COMMAND,
                u16::from(self.index),
                0,
                service::GET_ALL,
                request_id,
            )
            .encode(out);
        } else {
            RequestHeader::robot(
                4,
                T::MULTI_COMMAND,
                u16::from(self.index),
                0,
                service::READ_MULTIPLE,
                request_id,
            )
            .encode(out);
            out.extend_from_slice(&u32::from(self.count).to_le_bytes());
        }
        Ok(())
    }

    fn decode_response(
        &self,
        _header: &ResponseHeader,
        payload: &[u8],
    ) -> Result<Vec<T>, ProtocolError> {
        if self.count == 1 {
            return Ok(vec![T::decode_single(payload)?]);
        }

        ProtocolError::check_len(payload, 4 + usize::from(self.count) * T::ENCODED_SIZE)?;

        let mut data = payload;
        let count = wire::read_u32_le(&mut data)?;
        if count != u32::from(self.count) {
            return Err(ProtocolError::WrongElementCount {
                expected: usize::from(self.count),
                actual: count as usize,
            });
        }

        let mut values = Vec::with_capacity(usize::from(self.count));
        for _ in 0..self.count {
            values.push(T::decode(&mut data)?);
        }
        Ok(values)
    }
}

/// Write one variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriteVar<T> {
    /// Variable index.
    pub index: u8,
    /// Value to write.
    pub value: T,
}

impl<T> WriteVar<T> {
    /// Write `value` to the variable at `index`.
    pub fn new(index: u8, value: T) -> Self {
        Self { index, value }
    }
}

impl<T: VarValue> Command for WriteVar<T> {
    type Response = ();

    fn encode_request(&self, request_id: u8, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        let mut payload = Vec::with_capacity(T::ENCODED_SIZE);
        self.value.encode(&mut payload)?;
        RequestHeader::robot(
            payload.len() as u16,
            T::SINGLE_COMMAND,
            u16::from(self.index),
            0,
            service::SET_ALL,
            request_id,
        )
        .encode(out);
        out.extend_from_slice(&payload);
        Ok(())
    }

    fn decode_response(
        &self,
        _header: &ResponseHeader,
        payload: &[u8],
    ) -> Result<(), ProtocolError> {
        ProtocolError::check_len(payload, 0)
    }
}

/// Write a run of consecutive variables.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteVars<T> {
    /// Index of the first variable.
    pub index: u8,
    /// Values to write.
    pub values: Vec<T>,
}

impl<T> WriteVars<T> {
    /// Write `values` to consecutive variables starting at `index`.
    pub fn new(index: u8, values: Vec<T>) -> Self {
        Self { index, values }
    }
}

impl<T: VarValue> Command for WriteVars<T> {
    type Response = ();

    fn encode_request(&self, request_id: u8, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        if self.values.is_empty() {
            return Err(ProtocolError::InvalidArgument(
                "cannot write zero variables".into(),
            ));
        }

        if self.values.len() == 1 {
            let mut payload = Vec::with_capacity(T::ENCODED_SIZE);
            self.values[0].encode(&mut payload)?;
            RequestHeader::robot(
                payload.len() as u16,
                T::SINGLE_COMMAND,
                u16::from(self.index),
                0,
                service::SET_ALL,
                request_id,
            )
            .encode(out);
            out.extend_from_slice(&payload);
            return Ok(());
        }

        let mut payload = Vec::with_capacity(4 + self.values.len() * T::ENCODED_SIZE);
        payload.extend_from_slice(&(self.values.len() as u32).to_le_bytes());
        for value in &self.values {
            value.encode(&mut payload)?;
        }
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::InvalidArgument(format!(
                "writing {} variables needs a {} byte payload, the maximum is {}",
                self.values.len(),
                payload.len(),
                MAX_PAYLOAD_SIZE,
            )));
        }

        RequestHeader::robot(
            payload.len() as u16,
            T::MULTI_COMMAND,
            u16::from(self.index),
            0,
            service::WRITE_MULTIPLE,
            request_id,
        )
        .encode(out);
        out.extend_from_slice(&payload);
        Ok(())
    }

    fn decode_response(
        &self,
        _header: &ResponseHeader,
        payload: &[u8],
    ) -> Result<(), ProtocolError> {
        ProtocolError::check_len(payload, 0)
    }
}

/// Delete a file on the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFile {
    /// Name of the file to delete.
    pub name: String,
}

impl Command for DeleteFile {
    type Response = ();

    fn encode_request(&self, request_id: u8, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        if self.name.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::InvalidArgument(format!(
                "file name of {} bytes exceeds the maximum payload of {}",
                self.name.len(),
                MAX_PAYLOAD_SIZE,
            )));
        }
        RequestHeader::file(
            self.name.len() as u16,
            file_command::DELETE_FILE,
            request_id,
            0,
            false,
        )
        .encode(out);
        out.extend_from_slice(self.name.as_bytes());
        Ok(())
    }

    fn decode_response(
        &self,
        _header: &ResponseHeader,
        payload: &[u8],
    ) -> Result<(), ProtocolError> {
        ProtocolError::check_len(payload, 0)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::types::{CoordinateSystem, PoseConfiguration, SpeedType};
    use crate::udp::HEADER_SIZE;

    fn request_word(frame: &[u8], index: usize) -> u32 {
        let at = HEADER_SIZE + index * 4;
        u32::from_le_bytes([frame[at], frame[at + 1], frame[at + 2], frame[at + 3]])
    }

    #[test]
    fn read_status_request() {
        let mut frame = Vec::new();
        ReadStatus.encode_request(3, &mut frame).unwrap();

        assert_eq!(frame.len(), HEADER_SIZE);
        assert_eq!(u16::from_le_bytes([frame[24], frame[25]]), 0x72);
        assert_eq!(u16::from_le_bytes([frame[26], frame[27]]), 1);
        assert_eq!(frame[28], 0);
        assert_eq!(frame[29], service::GET_ALL);
        assert_eq!(frame[11], 3);
    }

    #[test]
    fn read_current_position_instances() {
        let cases = [
            (CoordinateSystemType::RobotPulse, 1),
            (CoordinateSystemType::BasePulse, 11),
            (CoordinateSystemType::StationPulse, 21),
            (CoordinateSystemType::RobotCartesian, 101),
        ];
        for (coordinate_system, base) in cases {
            let mut frame = Vec::new();
            ReadCurrentPosition { control_group: 2, coordinate_system }
                .encode_request(1, &mut frame)
                .unwrap();
            assert_eq!(u16::from_le_bytes([frame[24], frame[25]]), 0x75);
            assert_eq!(u16::from_le_bytes([frame[26], frame[27]]), 2 + base);
        }
    }

    #[test]
    fn single_read_uses_single_command_and_empty_payload() {
        let mut frame = Vec::new();
        ReadVars::<i16>::new(6, 1).encode_request(1, &mut frame).unwrap();

        assert_eq!(frame.len(), HEADER_SIZE);
        assert_eq!(u16::from_le_bytes([frame[24], frame[25]]), 0x7b);
        assert_eq!(u16::from_le_bytes([frame[26], frame[27]]), 6);
        assert_eq!(frame[29], service::GET_ALL);
    }

    #[test]
    fn single_read_decodes_raw_value() {
        let command = ReadVars::<i16>::new(6, 1);
        let header = dummy_header(2);
        assert_eq!(command.decode_response(&header, &[0xfb, 0xff]).unwrap(), vec![-5]);
    }

    #[test]
    fn multi_write_layout() {
        let mut frame = Vec::new();
        WriteVars::<f32>::new(8, vec![-5.0, 0.0]).encode_request(1, &mut frame).unwrap();

        assert_eq!(frame.len(), HEADER_SIZE + 12);
        assert_eq!(u16::from_le_bytes([frame[6], frame[7]]), 12);
        assert_eq!(u16::from_le_bytes([frame[24], frame[25]]), 0x305);
        assert_eq!(u16::from_le_bytes([frame[26], frame[27]]), 8);
        assert_eq!(frame[29], service::WRITE_MULTIPLE);
        assert_eq!(request_word(&frame, 0), 2);
        assert_eq!(request_word(&frame, 1), (-5.0f32).to_bits());
        assert_eq!(request_word(&frame, 2), 0.0f32.to_bits());
    }

    #[test]
    fn multi_read_validates_reported_count() {
        let command = ReadVars::<u8>::new(0, 2);
        let header = dummy_header(2);

        let mut payload = Vec::new();
        payload.extend_from_slice(&3u32.to_le_bytes());
        payload.extend_from_slice(&[7, 8]);
        assert_eq!(
            command.decode_response(&header, &payload),
            Err(ProtocolError::WrongElementCount { expected: 2, actual: 3 })
        );

        payload[0] = 2;
        assert_eq!(command.decode_response(&header, &payload).unwrap(), vec![7, 8]);
    }

    #[test]
    fn move_l_payload() {
        let target = CartesianPosition::new(
            100.0,
            200.0,
            300.0,
            0.0,
            0.0,
            45.0,
            CoordinateSystem::User(2),
            PoseConfiguration::default(),
            1,
        );
        let command = MoveL {
            control_group: 0,
            target,
            speed: Speed { kind: SpeedType::Translation, value: 100 },
        };

        let mut frame = Vec::new();
        command.encode_request(1, &mut frame).unwrap();

        assert_eq!(frame.len(), HEADER_SIZE + 104);
        assert_eq!(u16::from_le_bytes([frame[24], frame[25]]), 0x8a);
        assert_eq!(u16::from_le_bytes([frame[26], frame[27]]), 2);
        assert_eq!(frame[28], 1);

        assert_eq!(request_word(&frame, 0), 1);
        assert_eq!(request_word(&frame, 1), 0);
        assert_eq!(request_word(&frame, 2), 1);
        assert_eq!(request_word(&frame, 3), 100);
        assert_eq!(request_word(&frame, 4), 19);
        assert_eq!(request_word(&frame, 5), 100_000);
        assert_eq!(request_word(&frame, 6), 200_000);
        assert_eq!(request_word(&frame, 7), 300_000);
        assert_eq!(request_word(&frame, 8), 0);
        assert_eq!(request_word(&frame, 9), 0);
        assert_eq!(request_word(&frame, 10), 450_000);
        assert_eq!(request_word(&frame, 11), 0);
        assert_eq!(request_word(&frame, 12), 0);
        assert_eq!(request_word(&frame, 13), 0);
        assert_eq!(request_word(&frame, 14), 0);
        assert_eq!(request_word(&frame, 15), 1);
        assert_eq!(request_word(&frame, 16), 2);
        for index in 17..26 {
            assert_eq!(request_word(&frame, index), 0);
        }
    }

    #[test]
    fn move_l_rejects_master_frame() {
        let target = CartesianPosition::new(
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            CoordinateSystem::Master,
            PoseConfiguration::default(),
            0,
        );
        let command = MoveL {
            control_group: 0,
            target,
            speed: Speed { kind: SpeedType::Joint, value: 100 },
        };

        let mut frame = Vec::new();
        assert!(matches!(
            command.encode_request(1, &mut frame),
            Err(ProtocolError::InvalidArgument(_))
        ));
    }

    #[test]
    fn oversized_multi_write_is_rejected() {
        // 23 positions exceed the 1145 byte payload bound.
        let positions = vec![
            Position::Pulse(crate::types::PulsePosition::new(&[0; 8], 0).unwrap());
            23
        ];
        let command = WriteVars::<Position>::new(0, positions);
        let mut frame = Vec::new();
        assert!(matches!(
            command.encode_request(1, &mut frame),
            Err(ProtocolError::InvalidArgument(_))
        ));
    }

    fn dummy_header(payload_size: u16) -> ResponseHeader {
        ResponseHeader {
            payload_size,
            division: crate::udp::Division::Robot,
            request_id: 1,
            block_number: 0,
            service: 0x81,
            status: 0,
            extra_status: 0,
        }
    }

    proptest! {
        /// Every request frame starts with the magic and declares its
        /// exact length.
        #[test]
        fn request_framing_invariant(
            index in any::<u8>(),
            values in prop::collection::vec(any::<i32>(), 1..=128),
            request_id in any::<u8>(),
        ) {
            let command = WriteVars::<i32>::new(index, values);
            let mut frame = Vec::new();
            command.encode_request(request_id, &mut frame).unwrap();

            prop_assert_eq!(&frame[0..4], b"YERC");
            let payload_size = u16::from_le_bytes([frame[6], frame[7]]) as usize;
            prop_assert!(payload_size <= MAX_PAYLOAD_SIZE);
            prop_assert_eq!(frame.len(), HEADER_SIZE + payload_size);
        }
    }
}
