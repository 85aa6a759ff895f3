//! ASCII request encoding and response parsing.

use std::fmt::Write as _;

use crate::error::ProtocolError;
use crate::types::{
    CartesianPosition, CoordinateSystem, PoseConfiguration, Position, PulsePosition,
};

/// Encode the connection start line.
///
/// A keep-alive value asks the server to check peer liveness at the given
/// interval.
pub fn encode_start(keep_alive: Option<u32>) -> String {
    match keep_alive {
        None => "CONNECT Robot_access\r\n".to_owned(),
        Some(interval) => format!("CONNECT Robot_access Keep-Alive:{interval}\r\n"),
    }
}

/// Encode a command request line announcing `data_size` bytes of data body.
pub fn encode_request_line(name: &str, data_size: usize) -> String {
    format!("HOSTCTRL_REQUEST {name} {data_size}\r\n")
}

/// First response to a command: the controller accepted or rejected it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResponse {
    /// `OK:` response with the trailing message.
    Ok(String),
    /// `NG:` or `ERROR:` response with the failure message.
    Failed(String),
}

/// Decode a CRLF-framed command response.
pub fn decode_command_response(message: &str) -> Result<CommandResponse, ProtocolError> {
    let body = strip_crlf(message)?;

    if let Some(rest) = body.strip_prefix("OK:") {
        return Ok(CommandResponse::Ok(rest.trim_start_matches(' ').to_owned()));
    }
    if let Some(rest) = body.strip_prefix("NG:") {
        return Ok(CommandResponse::Failed(rest.trim_start_matches(' ').to_owned()));
    }
    if let Some(rest) = body.strip_prefix("ERROR:") {
        return Ok(CommandResponse::Failed(rest.trim_start_matches(' ').to_owned()));
    }
    Err(ProtocolError::BadResponsePrefix)
}

/// Decode the data response of a command that returns no data.
pub fn decode_empty_data(message: &str) -> Result<(), ProtocolError> {
    if message != "0000\r\n" {
        return Err(ProtocolError::InvalidText(
            "expected an empty `0000' response, received something else".into(),
        ));
    }
    Ok(())
}

fn strip_crlf(message: &str) -> Result<&str, ProtocolError> {
    message.strip_suffix("\r\n").ok_or_else(|| {
        ProtocolError::InvalidText("command response does not end with CRLF".into())
    })
}

/// Strip the trailing CR of a data body.
pub fn strip_data_frame(message: &str) -> Result<&str, ProtocolError> {
    message
        .strip_suffix('\r')
        .ok_or_else(|| ProtocolError::InvalidText("data body does not end with CR".into()))
}

/// Split a data body into comma-separated parameters, trimming spaces.
pub fn split_data(data: &str) -> Vec<&str> {
    data.split(',').map(|component| component.trim_matches(' ')).collect()
}

/// Parse an integer: optional sign followed by decimal digits only.
pub fn parse_int<T>(text: &str) -> Result<T, ProtocolError>
where
    T: TryFrom<i64>,
{
    let value = parse_i64(text)?;
    T::try_from(value).map_err(|_| {
        ProtocolError::ValueOutOfRange(format!(
            "received value ({value}) does not fit the expected integer type"
        ))
    })
}

fn parse_i64(text: &str) -> Result<i64, ProtocolError> {
    if text.is_empty() {
        return Err(ProtocolError::InvalidNumber("empty integer value received".into()));
    }

    let (sign, digits) = split_sign(text);
    if digits.is_empty() {
        return Err(ProtocolError::InvalidNumber(format!(
            "integer value `{text}' has no digits"
        )));
    }

    let mut value: i64 = 0;
    for character in digits.chars() {
        let digit = character.to_digit(10).ok_or_else(|| {
            ProtocolError::InvalidNumber(format!(
                "invalid character encountered in integer value: `{character}'"
            ))
        })?;
        value = value
            .checked_mul(10)
            .and_then(|value| value.checked_add(i64::from(digit)))
            .ok_or_else(|| {
                ProtocolError::ValueOutOfRange(format!("integer value `{text}' overflows"))
            })?;
    }
    Ok(sign * value)
}

/// Parse a floating point value: optional sign, decimal digits, optional
/// fractional part and optional exponent.
pub fn parse_float(text: &str) -> Result<f64, ProtocolError> {
    if text.is_empty() {
        return Err(ProtocolError::InvalidNumber(
            "empty floating point value received".into(),
        ));
    }

    let (sign, rest) = split_sign(text);

    let (mantissa, exponent_text) = match rest.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (rest, None),
    };

    let (integral, fraction) = match mantissa.split_once('.') {
        Some((integral, fraction)) => (integral, fraction),
        None => (mantissa, ""),
    };

    if integral.is_empty() && fraction.is_empty() {
        return Err(ProtocolError::InvalidNumber(format!(
            "floating point value `{text}' has no digits"
        )));
    }

    let mut value = 0.0f64;
    for character in integral.chars() {
        let digit = float_digit(character, text)?;
        value = value * 10.0 + digit;
    }
    let mut scale = 0.1f64;
    for character in fraction.chars() {
        let digit = float_digit(character, text)?;
        value += digit * scale;
        scale /= 10.0;
    }

    if let Some(exponent_text) = exponent_text {
        let exponent: i32 = parse_int(exponent_text)?;
        value *= 10.0f64.powi(exponent);
    }

    Ok(sign as f64 * value)
}

fn float_digit(character: char, text: &str) -> Result<f64, ProtocolError> {
    character.to_digit(10).map(f64::from).ok_or_else(|| {
        ProtocolError::InvalidNumber(format!(
            "invalid character encountered in floating point value: `{character}' (in `{text}')"
        ))
    })
}

fn split_sign(text: &str) -> (i64, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        (-1, rest)
    } else if let Some(rest) = text.strip_prefix('+') {
        (1, rest)
    } else {
        (1, text)
    }
}

/// Parse an integer and check it against an inclusive range.
pub fn parse_int_in_range(text: &str, min: i64, max: i64) -> Result<i64, ProtocolError> {
    let value: i64 = parse_int(text)?;
    if value < min || value > max {
        return Err(ProtocolError::ValueOutOfRange(format!(
            "received value ({value}) outside the allowed range [{min}, {max}]"
        )));
    }
    Ok(value)
}

/// Append a position as a data-body parameter list.
///
/// Pulse: `0,<joints…>,<tool>`. Cartesian: `1,<system>,<x>,<y>,<z>,<rx>,
/// <ry>,<rz>,<configuration>,<tool>` with three decimals for translation
/// and four for rotation.
pub fn write_position_params(position: &Position, out: &mut String) {
    match position {
        Position::Pulse(pulse) => {
            out.push('0');
            for joint in pulse.joints() {
                let _ = write!(out, ",{joint}");
            }
            let _ = write!(out, ",{}", pulse.tool());
        }
        Position::Cartesian(cartesian) => {
            let _ = write!(out, "1,{}", cartesian.frame.code());
            let _ = write!(out, ",{:.3},{:.3},{:.3}", cartesian.x, cartesian.y, cartesian.z);
            let _ = write!(out, ",{:.4},{:.4},{:.4}", cartesian.rx, cartesian.ry, cartesian.rz);
            let _ = write!(out, ",{},{}", cartesian.configuration.bits(), cartesian.tool);
        }
    }
}

/// Decode a type-prefixed position parameter list.
pub fn decode_position(params: &[&str]) -> Result<Position, ProtocolError> {
    if params.len() < 8 || params.len() > 10 {
        return Err(ProtocolError::WrongParameterCount { expected: 8, actual: params.len() });
    }
    let position_type: i64 = parse_int(params[0])?;
    match position_type {
        0 => decode_pulse_position(&params[1..]).map(Position::Pulse),
        1 => decode_cartesian_position(&params[1..]).map(Position::Cartesian),
        other => Err(ProtocolError::BadPositionType { actual: other as u32 }),
    }
}

/// Decode a pulse position parameter list: joints followed by the tool.
pub fn decode_pulse_position(params: &[&str]) -> Result<PulsePosition, ProtocolError> {
    if params.len() < 7 || params.len() > 9 {
        return Err(ProtocolError::WrongParameterCount { expected: 7, actual: params.len() });
    }

    let mut joints = [0i32; 8];
    let joint_count = params.len() - 1;
    for (slot, param) in joints.iter_mut().zip(&params[..joint_count]) {
        *slot = parse_int(param)?;
    }
    let tool: i32 = parse_int(params[joint_count])?;
    PulsePosition::new(&joints[..joint_count], tool)
}

/// Decode a cartesian position parameter list: coordinate system, six axis
/// components, pose configuration and tool.
pub fn decode_cartesian_position(params: &[&str]) -> Result<CartesianPosition, ProtocolError> {
    if params.len() != 9 {
        return Err(ProtocolError::WrongParameterCount { expected: 9, actual: params.len() });
    }

    let system = parse_int_in_range(params[0], 0, 19)?;
    let frame = CoordinateSystem::from_code(system as u8)?;

    let mut axes = [0.0f64; 6];
    for (axis, param) in axes.iter_mut().zip(&params[1..7]) {
        *axis = parse_float(param)?;
    }

    let configuration = parse_int_in_range(params[7], 0, 0x3f)?;
    let tool = parse_int_in_range(params[8], 0, 15)?;

    Ok(CartesianPosition {
        x: axes[0],
        y: axes[1],
        z: axes[2],
        rx: axes[3],
        ry: axes[4],
        rz: axes[5],
        frame,
        configuration: PoseConfiguration::from_bits(configuration as u8),
        tool: tool as i32,
    })
}
