//! Robot-facing data types shared by both transports.
//!
//! Positions come in two flavours: joint-space [`PulsePosition`] (encoder
//! pulses) and task-space [`CartesianPosition`] (millimetres and degrees in
//! a named frame). [`Position`] is the tagged union of the two, matching the
//! position-type word on the wire.

use crate::error::ProtocolError;

/// Controller status, unpacked from the two status bytes of a
/// `ReadStatus` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Status {
    /// Step execution mode.
    pub step: bool,
    /// One-cycle execution mode.
    pub one_cycle: bool,
    /// Continuous execution mode.
    pub continuous: bool,
    /// A job is running.
    pub running: bool,
    /// Operating under the in-guard speed limit.
    pub speed_limited: bool,
    /// Teach mode.
    pub teach: bool,
    /// Play mode.
    pub play: bool,
    /// Remote mode.
    pub remote: bool,
    /// Hold asserted from the teach pendant.
    pub teach_pendant_hold: bool,
    /// Hold asserted from an external input.
    pub external_hold: bool,
    /// Hold asserted by command.
    pub command_hold: bool,
    /// An alarm is active.
    pub alarm: bool,
    /// An error is active.
    pub error: bool,
    /// Servo power is on.
    pub servo_on: bool,
}

/// Variable type codes used by the ASCII transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VariableType {
    /// B variable (byte).
    Byte = 0,
    /// I variable (16-bit integer).
    Integer = 1,
    /// D variable (32-bit integer).
    Double = 2,
    /// R variable (32-bit float).
    Real = 3,
    /// P variable (robot position).
    RobotPosition = 4,
    /// BP variable (base position).
    BasePosition = 5,
    /// EX variable (station position).
    StationPosition = 6,
    /// S variable (string).
    String = 7,
}

impl VariableType {
    /// Numeric code used in SAVEV/LOADV parameter lists.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Coordinate system selector for reading the current robot position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSystemType {
    /// Joint pulses relative to the robot.
    RobotPulse,
    /// Joint pulses relative to the base axis.
    BasePulse,
    /// Joint pulses relative to a station axis.
    StationPulse,
    /// Cartesian coordinates in the robot frame.
    RobotCartesian,
}

/// A named coordinate system: base, robot, one of sixteen user frames,
/// tool or master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSystem {
    /// Base coordinate system.
    Base,
    /// Robot coordinate system.
    Robot,
    /// User coordinate system, 1-based index in 1..=16.
    User(u8),
    /// Tool coordinate system.
    Tool,
    /// Master coordinate system.
    Master,
}

/// Frame type codes used by cartesian payloads on the binary transport.
mod frame_type {
    pub const BASE: u32 = 16;
    pub const ROBOT: u32 = 17;
    pub const TOOL: u32 = 18;
    pub const USER: u32 = 19;
}

impl CoordinateSystem {
    /// Numeric code used by the ASCII transport (0..=19).
    pub fn code(self) -> u8 {
        match self {
            Self::Base => 0,
            Self::Robot => 1,
            Self::User(n) => n + 1,
            Self::Tool => 18,
            Self::Master => 19,
        }
    }

    /// Inverse of [`CoordinateSystem::code`].
    pub fn from_code(code: u8) -> Result<Self, ProtocolError> {
        match code {
            0 => Ok(Self::Base),
            1 => Ok(Self::Robot),
            2..=17 => Ok(Self::User(code - 1)),
            18 => Ok(Self::Tool),
            19 => Ok(Self::Master),
            other => Err(ProtocolError::ValueOutOfRange(format!(
                "coordinate system code {other} exceeds maximum 19"
            ))),
        }
    }

    /// True for `user1`..`user16`.
    pub fn is_user(self) -> bool {
        matches!(self, Self::User(_))
    }

    /// One-based user frame number, or 0 for non-user systems.
    pub fn user_number(self) -> u8 {
        match self {
            Self::User(n) => n,
            _ => 0,
        }
    }

    /// Frame type and user frame number for cartesian wire payloads.
    ///
    /// The master system has no frame type code and cannot be encoded.
    pub fn frame_code(self) -> Result<(u32, u32), ProtocolError> {
        match self {
            Self::Base => Ok((frame_type::BASE, 0)),
            Self::Robot => Ok((frame_type::ROBOT, 0)),
            Self::Tool => Ok((frame_type::TOOL, 0)),
            Self::User(n) => Ok((frame_type::USER, u32::from(n))),
            Self::Master => Err(ProtocolError::InvalidArgument(
                "the master coordinate system cannot be encoded in a cartesian payload".into(),
            )),
        }
    }

    /// Inverse of [`CoordinateSystem::frame_code`].
    pub fn from_frame_code(frame_type: u32, user_frame: u32) -> Result<Self, ProtocolError> {
        match frame_type {
            frame_type::BASE => Ok(Self::Base),
            frame_type::ROBOT => Ok(Self::Robot),
            frame_type::TOOL => Ok(Self::Tool),
            frame_type::USER => {
                if !(1..=16).contains(&user_frame) {
                    return Err(ProtocolError::ValueOutOfRange(format!(
                        "user frame {user_frame} outside the valid range 1..=16"
                    )));
                }
                Ok(Self::User(user_frame as u8))
            }
            other => Err(ProtocolError::BadPositionType { actual: other }),
        }
    }
}

/// Pose configuration of a cartesian position, a 6-bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoseConfiguration(u8);

impl PoseConfiguration {
    /// Build a configuration from its six flags.
    pub fn new(
        no_flip: bool,
        lower_arm: bool,
        back: bool,
        high_r: bool,
        high_t: bool,
        high_s: bool,
    ) -> Self {
        Self(
            u8::from(no_flip)
                | u8::from(lower_arm) << 1
                | u8::from(back) << 2
                | u8::from(high_r) << 3
                | u8::from(high_t) << 4
                | u8::from(high_s) << 5,
        )
    }

    /// Build a configuration from its wire representation. Bits above the
    /// six defined flags are discarded.
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & 0x3f)
    }

    /// Wire representation of the configuration.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// No-flip flag.
    pub fn no_flip(self) -> bool {
        self.0 & 0x01 != 0
    }

    /// Lower-arm flag.
    pub fn lower_arm(self) -> bool {
        self.0 & 0x02 != 0
    }

    /// Back flag.
    pub fn back(self) -> bool {
        self.0 & 0x04 != 0
    }

    /// High-R flag.
    pub fn high_r(self) -> bool {
        self.0 & 0x08 != 0
    }

    /// High-T flag.
    pub fn high_t(self) -> bool {
        self.0 & 0x10 != 0
    }

    /// High-S flag.
    pub fn high_s(self) -> bool {
        self.0 & 0x20 != 0
    }
}

/// Joint-space position in encoder pulses.
///
/// The wire format always carries eight joint slots; robots with six or
/// seven axes leave the trailing slots zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulsePosition {
    joints: [i32; 8],
    len: usize,
    tool: i32,
}

impl PulsePosition {
    /// Build a pulse position from 6, 7 or 8 joint values.
    pub fn new(joints: &[i32], tool: i32) -> Result<Self, ProtocolError> {
        if !(6..=8).contains(&joints.len()) {
            return Err(ProtocolError::InvalidArgument(format!(
                "a pulse position has 6, 7 or 8 joints, got {}",
                joints.len()
            )));
        }
        let mut slots = [0; 8];
        slots[..joints.len()].copy_from_slice(joints);
        Ok(Self { joints: slots, len: joints.len(), tool })
    }

    /// The joint values.
    pub fn joints(&self) -> &[i32] {
        &self.joints[..self.len]
    }

    /// The joint values padded to the eight wire slots.
    pub fn joints_padded(&self) -> [i32; 8] {
        self.joints
    }

    /// Tool number.
    pub fn tool(&self) -> i32 {
        self.tool
    }
}

/// Task-space position: translation in millimetres, rotation in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartesianPosition {
    /// X translation in millimetres.
    pub x: f64,
    /// Y translation in millimetres.
    pub y: f64,
    /// Z translation in millimetres.
    pub z: f64,
    /// Rotation around X in degrees.
    pub rx: f64,
    /// Rotation around Y in degrees.
    pub ry: f64,
    /// Rotation around Z in degrees.
    pub rz: f64,
    /// Coordinate system the position is expressed in.
    pub frame: CoordinateSystem,
    /// Pose configuration of the arm.
    pub configuration: PoseConfiguration,
    /// Tool number.
    pub tool: i32,
}

impl CartesianPosition {
    /// Build a cartesian position from its components.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        x: f64,
        y: f64,
        z: f64,
        rx: f64,
        ry: f64,
        rz: f64,
        frame: CoordinateSystem,
        configuration: PoseConfiguration,
        tool: i32,
    ) -> Self {
        Self { x, y, z, rx, ry, rz, frame, configuration, tool }
    }

    /// The six axis components in x, y, z, rx, ry, rz order.
    pub fn axes(&self) -> [f64; 6] {
        [self.x, self.y, self.z, self.rx, self.ry, self.rz]
    }
}

/// A robot position, either joint-space or task-space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    /// Joint-space position in pulses.
    Pulse(PulsePosition),
    /// Task-space position.
    Cartesian(CartesianPosition),
}

impl Position {
    /// True if this is a pulse position.
    pub fn is_pulse(&self) -> bool {
        matches!(self, Self::Pulse(_))
    }

    /// True if this is a cartesian position.
    pub fn is_cartesian(&self) -> bool {
        matches!(self, Self::Cartesian(_))
    }

    /// The pulse position, if any.
    pub fn pulse(&self) -> Option<&PulsePosition> {
        match self {
            Self::Pulse(position) => Some(position),
            Self::Cartesian(_) => None,
        }
    }

    /// The cartesian position, if any.
    pub fn cartesian(&self) -> Option<&CartesianPosition> {
        match self {
            Self::Pulse(_) => None,
            Self::Cartesian(position) => Some(position),
        }
    }
}

impl From<PulsePosition> for Position {
    fn from(position: PulsePosition) -> Self {
        Self::Pulse(position)
    }
}

impl From<CartesianPosition> for Position {
    fn from(position: CartesianPosition) -> Self {
        Self::Cartesian(position)
    }
}

/// Speed specification of a motion command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedType {
    /// 0.01% of the maximum joint speed.
    Joint,
    /// 0.1 mm/s.
    Translation,
    /// 0.1 degrees/s.
    Rotation,
}

impl SpeedType {
    /// Numeric code of the speed type.
    pub fn code(self) -> u32 {
        match self {
            Self::Joint => 0,
            Self::Translation => 1,
            Self::Rotation => 2,
        }
    }
}

/// A speed value paired with its interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Speed {
    /// How to interpret `value`.
    pub kind: SpeedType,
    /// Speed value in the unit selected by `kind`.
    pub value: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_system_codes_round_trip() {
        for code in 0..=19 {
            let system = CoordinateSystem::from_code(code).unwrap();
            assert_eq!(system.code(), code);
        }
        assert!(CoordinateSystem::from_code(20).is_err());
    }

    #[test]
    fn user_frames_are_one_based() {
        assert_eq!(CoordinateSystem::from_code(2).unwrap(), CoordinateSystem::User(1));
        assert_eq!(CoordinateSystem::from_code(17).unwrap(), CoordinateSystem::User(16));
        assert_eq!(CoordinateSystem::User(3).user_number(), 3);
        assert_eq!(CoordinateSystem::Base.user_number(), 0);
    }

    #[test]
    fn frame_codes_round_trip() {
        let systems = [
            CoordinateSystem::Base,
            CoordinateSystem::Robot,
            CoordinateSystem::Tool,
            CoordinateSystem::User(1),
            CoordinateSystem::User(16),
        ];
        for system in systems {
            let (frame_type, user_frame) = system.frame_code().unwrap();
            assert_eq!(CoordinateSystem::from_frame_code(frame_type, user_frame).unwrap(), system);
        }
    }

    #[test]
    fn master_frame_is_not_encodable() {
        assert!(matches!(
            CoordinateSystem::Master.frame_code(),
            Err(ProtocolError::InvalidArgument(_))
        ));
    }

    #[test]
    fn out_of_range_user_frame_is_rejected() {
        assert!(CoordinateSystem::from_frame_code(19, 0).is_err());
        assert!(CoordinateSystem::from_frame_code(19, 17).is_err());
        assert!(CoordinateSystem::from_frame_code(20, 0).is_err());
    }

    #[test]
    fn pose_configuration_bits() {
        let configuration = PoseConfiguration::new(true, false, true, false, false, true);
        assert_eq!(configuration.bits(), 0b10_0101);
        assert!(configuration.no_flip());
        assert!(!configuration.lower_arm());
        assert!(configuration.back());
        assert!(!configuration.high_r());
        assert!(!configuration.high_t());
        assert!(configuration.high_s());
        assert_eq!(PoseConfiguration::from_bits(0xff).bits(), 0x3f);
    }

    #[test]
    fn pulse_position_pads_to_eight_slots() {
        let position = PulsePosition::new(&[1, 2, 3, 4, 5, 6], 2).unwrap();
        assert_eq!(position.joints(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(position.joints_padded(), [1, 2, 3, 4, 5, 6, 0, 0]);
        assert_eq!(position.tool(), 2);
    }

    #[test]
    fn pulse_position_rejects_bad_joint_counts() {
        assert!(PulsePosition::new(&[0; 5], 0).is_err());
        assert!(PulsePosition::new(&[0; 9], 0).is_err());
    }
}
