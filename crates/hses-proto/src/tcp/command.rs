//! Stream-transport commands with typed responses.
//!
//! A [`StreamCommand`] produces one `HOSTCTRL_REQUEST` line plus an
//! optional data body and decodes the CR-framed data message that follows
//! the controller's `OK:` response.

use std::fmt::Write as _;

use crate::error::ProtocolError;
use crate::types::{CartesianPosition, CoordinateSystem, Position, PulsePosition, VariableType};
use crate::tcp::wire;

/// A request on the ASCII transport.
pub trait StreamCommand: Send {
    /// The decoded data response.
    type Response: Send + 'static;

    /// Command name placed in the request line.
    fn request_name(&self) -> &'static str;

    /// CR-terminated data body, or an empty string for commands without
    /// parameters.
    fn data_body(&self) -> Result<String, ProtocolError>;

    /// Decode the data message following the `OK:` response.
    fn decode_data(&self, message: &str) -> Result<Self::Response, ProtocolError>;
}

/// A value that can live in a controller variable, as seen by the ASCII
/// transport.
pub trait StreamValue: Sized + Clone + Send + Sync + 'static {
    /// Variable type code used in SAVEV/LOADV parameter lists.
    const TYPE: VariableType;

    /// Append the textual form of the value to a parameter list.
    fn write_param(&self, out: &mut String);

    /// Decode a data message carrying one value.
    fn decode_message(message: &str) -> Result<Self, ProtocolError>;
}

fn decode_single_int<T>(message: &str) -> Result<T, ProtocolError>
where
    T: TryFrom<i64>,
{
    let data = wire::strip_data_frame(message)?;
    let params = wire::split_data(data);
    if params.len() != 1 {
        return Err(ProtocolError::WrongParameterCount { expected: 1, actual: params.len() });
    }
    wire::parse_int(params[0])
}

impl StreamValue for u8 {
    const TYPE: VariableType = VariableType::Byte;

    fn write_param(&self, out: &mut String) {
        let _ = write!(out, "{self}");
    }

    fn decode_message(message: &str) -> Result<Self, ProtocolError> {
        decode_single_int(message)
    }
}

impl StreamValue for i16 {
    const TYPE: VariableType = VariableType::Integer;

    fn write_param(&self, out: &mut String) {
        let _ = write!(out, "{self}");
    }

    fn decode_message(message: &str) -> Result<Self, ProtocolError> {
        decode_single_int(message)
    }
}

impl StreamValue for i32 {
    const TYPE: VariableType = VariableType::Double;

    fn write_param(&self, out: &mut String) {
        let _ = write!(out, "{self}");
    }

    fn decode_message(message: &str) -> Result<Self, ProtocolError> {
        decode_single_int(message)
    }
}

impl StreamValue for f32 {
    const TYPE: VariableType = VariableType::Real;

    fn write_param(&self, out: &mut String) {
        let _ = write!(out, "{self}");
    }

    fn decode_message(message: &str) -> Result<Self, ProtocolError> {
        let data = wire::strip_data_frame(message)?;
        let params = wire::split_data(data);
        if params.len() != 1 {
            return Err(ProtocolError::WrongParameterCount { expected: 1, actual: params.len() });
        }
        wire::parse_float(params[0]).map(|value| value as f32)
    }
}

impl StreamValue for Position {
    const TYPE: VariableType = VariableType::RobotPosition;

    fn write_param(&self, out: &mut String) {
        wire::write_position_params(self, out);
    }

    fn decode_message(message: &str) -> Result<Self, ProtocolError> {
        let data = wire::strip_data_frame(message)?;
        wire::decode_position(&wire::split_data(data))
    }
}

/// Read one variable over the ASCII transport (`SAVEV`).
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

impl<T: StreamValue> StreamCommand for ReadVar<T> {
    type Response = T;

    fn request_name(&self) -> &'static str {
        "SAVEV"
    }

    fn data_body(&self) -> Result<String, ProtocolError> {
        Ok(format!("{},{}\r", T::TYPE.code(), self.index))
    }

    fn decode_data(&self, message: &str) -> Result<T, ProtocolError> {
        T::decode_message(message)
    }
}

/// Write one variable over the ASCII transport (`LOADV`).
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

impl<T: StreamValue> StreamCommand for WriteVar<T> {
    type Response = ();

    fn request_name(&self) -> &'static str {
        "LOADV"
    }

    fn data_body(&self) -> Result<String, ProtocolError> {
        let mut body = format!("{},{},", T::TYPE.code(), self.index);
        self.value.write_param(&mut body);
        body.push('\r');
        Ok(body)
    }

    fn decode_data(&self, message: &str) -> Result<(), ProtocolError> {
        wire::decode_empty_data(message)
    }
}

/// Read the current joint-space position (`RPOSJ`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadPulsePosition;

impl StreamCommand for ReadPulsePosition {
    type Response = PulsePosition;

    fn request_name(&self) -> &'static str {
        "RPOSJ"
    }

    fn data_body(&self) -> Result<String, ProtocolError> {
        Ok(String::new())
    }

    fn decode_data(&self, message: &str) -> Result<PulsePosition, ProtocolError> {
        let data = wire::strip_data_frame(message)?;
        wire::decode_pulse_position(&wire::split_data(data))
    }
}

/// Read the current task-space position (`RPOSC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadCartesianPosition {
    /// Coordinate system to express the position in.
    pub system: CoordinateSystem,
}

impl StreamCommand for ReadCartesianPosition {
    type Response = CartesianPosition;

    fn request_name(&self) -> &'static str {
        "RPOSC"
    }

    fn data_body(&self) -> Result<String, ProtocolError> {
        Ok(format!("{},0\r", self.system.code()))
    }

    fn decode_data(&self, message: &str) -> Result<CartesianPosition, ProtocolError> {
        let data = wire::strip_data_frame(message)?;
        wire::decode_cartesian_position(&wire::split_data(data))
    }
}
