//! Binary datagram codec.
//!
//! Requests and replies share a fixed 32-byte header starting with the
//! `YERC` magic; see [`header`] for the layout. Payload encodings are
//! command specific and implemented by the types in [`command`].

pub mod command;
pub mod header;
pub mod wire;

pub use command::{
    Command, DeleteFile, MoveL, ReadCurrentPosition, ReadStatus, ReadVar, ReadVars, WriteVar,
    WriteVars,
};
pub use header::{RequestHeader, ResponseHeader};
pub use wire::{VarValue, decode_file_list};

/// Size of the fixed request/response header.
pub const HEADER_SIZE: usize = 32;

/// Maximum payload size of a single datagram.
pub const MAX_PAYLOAD_SIZE: usize = 0x479;

/// High bit of the block number field, set on the final block of a
/// multi-block file transfer in both directions.
pub const LAST_BLOCK: u32 = 0x8000_0000;

/// Top-level category of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Division {
    /// Robot commands: status, positions, variables, motion.
    Robot = 1,
    /// File commands: list, read, write, delete.
    File = 2,
}

impl Division {
    /// Decode the division byte of a response header.
    pub fn from_u8(value: u8) -> Result<Self, crate::ProtocolError> {
        match value {
            1 => Ok(Self::Robot),
            2 => Ok(Self::File),
            other => Err(crate::ProtocolError::BadDivision { actual: other }),
        }
    }
}

/// Robot-division command numbers.
pub mod robot_command {
    /// Read the active alarms.
    pub const READ_ALARM: u16 = 0x70;
    /// Read the alarm history.
    pub const READ_ALARM_HISTORY: u16 = 0x71;
    /// Read the controller status bits.
    pub const READ_STATUS_INFORMATION: u16 = 0x72;
    /// Read the executing job information.
    pub const EXECUTE_JOB_INFORMATION: u16 = 0x73;
    /// Read the axis configuration.
    pub const READ_AXIS_CONFIGURATION: u16 = 0x74;
    /// Read the current robot position.
    pub const READ_ROBOT_POSITION: u16 = 0x75;
    /// Read the position error.
    pub const READ_POSITION_ERROR: u16 = 0x76;
    /// Read the joint torques.
    pub const READ_TORQUE: u16 = 0x77;
    /// Read or write an IO point.
    pub const READWRITE_IO: u16 = 0x78;
    /// Read or write a register.
    pub const READWRITE_REGISTER: u16 = 0x79;
    /// Read or write a B (byte) variable.
    pub const READWRITE_INT8_VARIABLE: u16 = 0x7a;
    /// Read or write an I (16-bit integer) variable.
    pub const READWRITE_INT16_VARIABLE: u16 = 0x7b;
    /// Read or write a D (32-bit integer) variable.
    pub const READWRITE_INT32_VARIABLE: u16 = 0x7c;
    /// Read or write an R (32-bit float) variable.
    pub const READWRITE_FLOAT_VARIABLE: u16 = 0x7d;
    /// Read or write an S (string) variable.
    pub const READWRITE_STRING_VARIABLE: u16 = 0x7e;
    /// Read or write a P (robot position) variable.
    pub const READWRITE_ROBOT_POSITION_VARIABLE: u16 = 0x7f;
    /// Read or write a BP (base position) variable.
    pub const READWRITE_BASE_POSITION_VARIABLE: u16 = 0x80;
    /// Read or write an EX (station position) variable.
    pub const READWRITE_EXTERNAL_AXIS_VARIABLE: u16 = 0x81;
    /// Reset the active alarm.
    pub const RESET_ALARM: u16 = 0x82;
    /// Enable or disable servo power.
    pub const SET_SERVO_ENABLED: u16 = 0x83;
    /// Set the execution mode.
    pub const SET_EXECUTION_MODE: u16 = 0x84;
    /// Show a message on the pendant.
    pub const SHOW_MESSAGE: u16 = 0x85;
    /// Start a job.
    pub const START_JOB: u16 = 0x86;
    /// Select a job.
    pub const SELECT_JOB: u16 = 0x87;
    /// Read the management time.
    pub const READ_MANAGEMENT_TIME: u16 = 0x88;
    /// Read the system information.
    pub const READ_SYSTEM_INFORMATION: u16 = 0x89;
    /// Cartesian interpolated move.
    pub const MOVE_CARTESIAN: u16 = 0x8a;
    /// Pulse move.
    pub const MOVE_PULSE: u16 = 0x8b;
    /// Read or write multiple IO points.
    pub const READWRITE_MULTIPLE_IO: u16 = 0x300;
    /// Read or write multiple registers.
    pub const READWRITE_MULTIPLE_REGISTER: u16 = 0x301;
    /// Read or write multiple B variables.
    pub const READWRITE_MULTIPLE_INT8: u16 = 0x302;
    /// Read or write multiple I variables.
    pub const READWRITE_MULTIPLE_INT16: u16 = 0x303;
    /// Read or write multiple D variables.
    pub const READWRITE_MULTIPLE_INT32: u16 = 0x304;
    /// Read or write multiple R variables.
    pub const READWRITE_MULTIPLE_FLOAT: u16 = 0x305;
    /// Read or write multiple S variables.
    pub const READWRITE_MULTIPLE_STRING: u16 = 0x306;
    /// Read or write multiple P variables.
    pub const READWRITE_MULTIPLE_ROBOT_POSITION: u16 = 0x307;
    /// Read or write multiple BP variables.
    pub const READWRITE_MULTIPLE_BASE_POSITION: u16 = 0x308;
    /// Read or write multiple EX variables.
    pub const READWRITE_MULTIPLE_EXTERNAL_AXIS: u16 = 0x309;
    /// Read alarm data.
    pub const READ_ALARM_DATA: u16 = 0x30a;
}

/// File-division operation codes, carried in the service byte.
pub mod file_command {
    /// Delete a file.
    pub const DELETE_FILE: u8 = 0x09;
    /// Write a file to the controller.
    pub const WRITE_FILE: u8 = 0x15;
    /// Read a file from the controller.
    pub const READ_FILE: u8 = 0x16;
    /// List files matching a type pattern.
    pub const READ_FILE_LIST: u8 = 0x32;
}

/// Service codes of robot-division requests.
pub mod service {
    /// Read a single attribute.
    pub const GET_SINGLE: u8 = 0x0e;
    /// Write a single attribute.
    pub const SET_SINGLE: u8 = 0x10;
    /// Read all attributes of an instance.
    pub const GET_ALL: u8 = 0x01;
    /// Write all attributes of an instance.
    pub const SET_ALL: u8 = 0x02;
    /// Read a run of consecutive instances.
    pub const READ_MULTIPLE: u8 = 0x33;
    /// Write a run of consecutive instances.
    pub const WRITE_MULTIPLE: u8 = 0x34;
}
