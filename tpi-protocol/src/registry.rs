//! Protocol registry
//!
//! Closed tables for packet types, module types and status codes. Each
//! entry has a wire code and the display name the controller documentation
//! uses; lookups in both directions are total over the defined codes and
//! report a [`LookupError`] for anything else, since undefined codes can
//! legitimately arrive over a noisy link.

use core::fmt;

use crate::error::{LookupError, UnknownName};
use crate::frame::MAX_PAYLOAD_SIZE;

/// Widest gyro turn-speed reading that fits the interpreter's integer
pub const MAX_GYRO_BYTES: usize = 8;

/// Payload layout carried by a packet type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadShape {
    /// No payload bytes
    Empty,
    /// Exactly this many bytes
    Fixed(usize),
    /// Any length up to `max`
    Variable { max: usize },
}

impl PayloadShape {
    /// Whether a payload of `len` bytes fits this shape
    pub fn accepts(&self, len: usize) -> bool {
        match *self {
            PayloadShape::Empty => len == 0,
            PayloadShape::Fixed(n) => len == n,
            PayloadShape::Variable { max } => len <= max,
        }
    }
}

impl fmt::Display for PayloadShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadShape::Empty => f.write_str("0 bytes"),
            PayloadShape::Fixed(n) => write!(f, "{} bytes", n),
            PayloadShape::Variable { max } => write!(f, "up to {} bytes", max),
        }
    }
}

/// Packet type identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PacketType {
    None = 0x00,
    ResponseStatus = 0x01,

    RequestConnectedModules = 0x70,
    ResponseConnectedModules = 0x71,

    RequestModifyDemand = 0x88,

    RequestEnableUserInput = 0x90,
    ResponseUserInput = 0x91,
    RequestEnableMotorSpeed = 0x92,
    ResponseMotorSpeed = 0x93,
    RequestEnableButtonPresses = 0x94,
    ResponseButtonPresses = 0x95,
    RequestEnableGyroTurnSpeed = 0x96,
    ResponseGyroTurnSpeed = 0x97,
    RequestEnableActiveUserFunction = 0x98,
    ResponseActiveUserFunction = 0x99,
    RequestEnableSpeedScaling = 0x9A,
    ResponseSpeedScaling = 0x9B,
}

impl PacketType {
    /// Every defined packet type, in wire-code order
    pub const ALL: [PacketType; 17] = [
        PacketType::None,
        PacketType::ResponseStatus,
        PacketType::RequestConnectedModules,
        PacketType::ResponseConnectedModules,
        PacketType::RequestModifyDemand,
        PacketType::RequestEnableUserInput,
        PacketType::ResponseUserInput,
        PacketType::RequestEnableMotorSpeed,
        PacketType::ResponseMotorSpeed,
        PacketType::RequestEnableButtonPresses,
        PacketType::ResponseButtonPresses,
        PacketType::RequestEnableGyroTurnSpeed,
        PacketType::ResponseGyroTurnSpeed,
        PacketType::RequestEnableActiveUserFunction,
        PacketType::ResponseActiveUserFunction,
        PacketType::RequestEnableSpeedScaling,
        PacketType::ResponseSpeedScaling,
    ];

    /// The six data-stream enable requests
    pub const STREAM_ENABLES: [PacketType; 6] = [
        PacketType::RequestEnableUserInput,
        PacketType::RequestEnableMotorSpeed,
        PacketType::RequestEnableButtonPresses,
        PacketType::RequestEnableGyroTurnSpeed,
        PacketType::RequestEnableActiveUserFunction,
        PacketType::RequestEnableSpeedScaling,
    ];

    /// Wire code
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Parse a packet type from its wire code
    pub fn from_id(id: u8) -> Result<Self, LookupError> {
        match id {
            0x00 => Ok(PacketType::None),
            0x01 => Ok(PacketType::ResponseStatus),
            0x70 => Ok(PacketType::RequestConnectedModules),
            0x71 => Ok(PacketType::ResponseConnectedModules),
            0x88 => Ok(PacketType::RequestModifyDemand),
            0x90 => Ok(PacketType::RequestEnableUserInput),
            0x91 => Ok(PacketType::ResponseUserInput),
            0x92 => Ok(PacketType::RequestEnableMotorSpeed),
            0x93 => Ok(PacketType::ResponseMotorSpeed),
            0x94 => Ok(PacketType::RequestEnableButtonPresses),
            0x95 => Ok(PacketType::ResponseButtonPresses),
            0x96 => Ok(PacketType::RequestEnableGyroTurnSpeed),
            0x97 => Ok(PacketType::ResponseGyroTurnSpeed),
            0x98 => Ok(PacketType::RequestEnableActiveUserFunction),
            0x99 => Ok(PacketType::ResponseActiveUserFunction),
            0x9A => Ok(PacketType::RequestEnableSpeedScaling),
            0x9B => Ok(PacketType::ResponseSpeedScaling),
            _ => Err(LookupError::UnknownTypeId(id)),
        }
    }

    /// Display name, as used by the controller documentation
    pub const fn name(self) -> &'static str {
        match self {
            PacketType::None => "NONE",
            PacketType::ResponseStatus => "RESPONSE_STATUS",
            PacketType::RequestConnectedModules => "REQUEST_CONNECTED_MODULES",
            PacketType::ResponseConnectedModules => "RESPONSE_CONNECTED_MODULES",
            PacketType::RequestModifyDemand => "REQUEST_MODIFY_DEMAND",
            PacketType::RequestEnableUserInput => "REQUEST_ENABLE_USER_INPUT",
            PacketType::ResponseUserInput => "RESPONSE_USER_INPUT",
            PacketType::RequestEnableMotorSpeed => "REQUEST_ENABLE_MOTOR_SPEED",
            PacketType::ResponseMotorSpeed => "RESPONSE_MOTOR_SPEED",
            PacketType::RequestEnableButtonPresses => "REQUEST_ENABLE_BUTTON_PRESSES",
            PacketType::ResponseButtonPresses => "RESPONSE_BUTTON_PRESSES",
            PacketType::RequestEnableGyroTurnSpeed => "REQUEST_ENABLE_GYRO_TURN_SPEED",
            PacketType::ResponseGyroTurnSpeed => "RESPONSE_GYRO_TURN_SPEED",
            PacketType::RequestEnableActiveUserFunction => "REQUEST_ENABLE_ACTIVE_USER_FUNCTION",
            PacketType::ResponseActiveUserFunction => "RESPONSE_ACTIVE_USER_FUNCTION",
            PacketType::RequestEnableSpeedScaling => "REQUEST_ENABLE_SPEED_SCALING",
            PacketType::ResponseSpeedScaling => "RESPONSE_SPEED_SCALING",
        }
    }

    /// Parse a packet type from its display name
    pub fn from_name(name: &str) -> Result<Self, LookupError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == name)
            .ok_or_else(|| LookupError::UnknownTypeName(UnknownName::new(name)))
    }

    /// Payload layout this type carries
    pub fn payload_shape(self) -> PayloadShape {
        match self {
            PacketType::None | PacketType::RequestConnectedModules => PayloadShape::Empty,
            PacketType::ResponseStatus => PayloadShape::Fixed(2),
            PacketType::ResponseConnectedModules => PayloadShape::Variable {
                max: MAX_PAYLOAD_SIZE,
            },
            PacketType::RequestModifyDemand => PayloadShape::Fixed(2),
            PacketType::RequestEnableUserInput
            | PacketType::RequestEnableMotorSpeed
            | PacketType::RequestEnableButtonPresses
            | PacketType::RequestEnableGyroTurnSpeed
            | PacketType::RequestEnableActiveUserFunction
            | PacketType::RequestEnableSpeedScaling => PayloadShape::Fixed(1),
            PacketType::ResponseUserInput => PayloadShape::Fixed(3),
            PacketType::ResponseMotorSpeed => PayloadShape::Fixed(4),
            PacketType::ResponseButtonPresses => PayloadShape::Fixed(2),
            PacketType::ResponseGyroTurnSpeed => PayloadShape::Variable {
                max: MAX_GYRO_BYTES,
            },
            PacketType::ResponseActiveUserFunction => PayloadShape::Fixed(1),
            PacketType::ResponseSpeedScaling => PayloadShape::Fixed(3),
        }
    }

    /// Returns true if this is one of the data-stream enable requests
    pub fn is_stream_enable(self) -> bool {
        Self::STREAM_ENABLES.contains(&self)
    }

    /// The streamed response a stream-enable request switches on
    pub fn stream_response(self) -> Option<PacketType> {
        match self {
            PacketType::RequestEnableUserInput => Some(PacketType::ResponseUserInput),
            PacketType::RequestEnableMotorSpeed => Some(PacketType::ResponseMotorSpeed),
            PacketType::RequestEnableButtonPresses => Some(PacketType::ResponseButtonPresses),
            PacketType::RequestEnableGyroTurnSpeed => Some(PacketType::ResponseGyroTurnSpeed),
            PacketType::RequestEnableActiveUserFunction => {
                Some(PacketType::ResponseActiveUserFunction)
            }
            PacketType::RequestEnableSpeedScaling => Some(PacketType::ResponseSpeedScaling),
            _ => None,
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hardware modules that can report to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ModuleType {
    /// Power module, drive output
    Pmdo = 0x00,
    /// Remote, drive output
    Remdo = 0x01,
    Lak = 0x02,
    /// Power module, lighting
    Pmle = 0x03,
    /// Remote, lighting
    Remle = 0x04,
    /// Power module, actuator
    Pmal = 0x05,
    /// Remote, actuator
    Remal = 0x06,
    Gyro = 0x07,
    Act = 0x08,
    Tpi = 0x09,
    Remre = 0x0A,
    Tilt = 0x0B,
    Disp = 0x0C,
    Acu = 0x0D,
    Input = 0x0E,
    Output = 0x0F,
    Cr = 0x10,
    TpiAcu = 0x11,
}

impl ModuleType {
    /// Every defined module type, in wire-code order
    pub const ALL: [ModuleType; 18] = [
        ModuleType::Pmdo,
        ModuleType::Remdo,
        ModuleType::Lak,
        ModuleType::Pmle,
        ModuleType::Remle,
        ModuleType::Pmal,
        ModuleType::Remal,
        ModuleType::Gyro,
        ModuleType::Act,
        ModuleType::Tpi,
        ModuleType::Remre,
        ModuleType::Tilt,
        ModuleType::Disp,
        ModuleType::Acu,
        ModuleType::Input,
        ModuleType::Output,
        ModuleType::Cr,
        ModuleType::TpiAcu,
    ];

    /// Wire code
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Parse a module type from its wire code
    pub fn from_id(id: u8) -> Result<Self, LookupError> {
        Self::ALL
            .get(usize::from(id))
            .copied()
            .ok_or(LookupError::UnknownModuleId(id))
    }

    /// Display name
    pub const fn name(self) -> &'static str {
        match self {
            ModuleType::Pmdo => "PMDO",
            ModuleType::Remdo => "REMDO",
            ModuleType::Lak => "LAK",
            ModuleType::Pmle => "PMLE",
            ModuleType::Remle => "REMLE",
            ModuleType::Pmal => "PMAL",
            ModuleType::Remal => "REMAL",
            ModuleType::Gyro => "GYRO",
            ModuleType::Act => "ACT",
            ModuleType::Tpi => "TPI",
            ModuleType::Remre => "REMRE",
            ModuleType::Tilt => "TILT",
            ModuleType::Disp => "DISP",
            ModuleType::Acu => "ACU",
            ModuleType::Input => "INPUT",
            ModuleType::Output => "OUTPUT",
            ModuleType::Cr => "CR",
            ModuleType::TpiAcu => "TPI_ACU",
        }
    }

    /// Parse a module type from its display name
    pub fn from_name(name: &str) -> Result<Self, LookupError> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name() == name)
            .ok_or_else(|| LookupError::UnknownModuleName(UnknownName::new(name)))
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Status codes carried by `RESPONSE_STATUS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StatusCode {
    Ok = 0x00,
    UnknownTypeIdentifier = 0x01,
    InvalidData = 0x02,
    InvalidCrc = 0x03,
    OtherError = 0x04,
}

impl StatusCode {
    /// Every defined status code, in wire-code order
    pub const ALL: [StatusCode; 5] = [
        StatusCode::Ok,
        StatusCode::UnknownTypeIdentifier,
        StatusCode::InvalidData,
        StatusCode::InvalidCrc,
        StatusCode::OtherError,
    ];

    /// Wire code
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Parse a status code from its wire code
    pub fn from_id(id: u8) -> Result<Self, LookupError> {
        Self::ALL
            .get(usize::from(id))
            .copied()
            .ok_or(LookupError::UnknownStatusCode(id))
    }

    /// Display name
    ///
    /// `UNKOWN_TYPE_IDENTIFIER` keeps the spelling the firmware tables use.
    pub const fn name(self) -> &'static str {
        match self {
            StatusCode::Ok => "STATUS_OK",
            StatusCode::UnknownTypeIdentifier => "UNKOWN_TYPE_IDENTIFIER",
            StatusCode::InvalidData => "INVALID_DATA",
            StatusCode::InvalidCrc => "INVALID_CRC",
            StatusCode::OtherError => "OTHER_ERROR",
        }
    }

    /// Parse a status code from its display name
    pub fn from_name(name: &str) -> Result<Self, LookupError> {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.name() == name)
            .ok_or_else(|| LookupError::UnknownStatusName(UnknownName::new(name)))
    }

    /// Returns true for `STATUS_OK`
    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wire code for a packet type name
pub fn type_id_for(name: &str) -> Result<u8, LookupError> {
    PacketType::from_name(name).map(PacketType::id)
}

/// Packet type name for a wire code
pub fn type_name_for(id: u8) -> Result<&'static str, LookupError> {
    PacketType::from_id(id).map(PacketType::name)
}

/// Wire code for a module type name
pub fn module_id_for(name: &str) -> Result<u8, LookupError> {
    ModuleType::from_name(name).map(ModuleType::id)
}

/// Module type name for a wire code
pub fn module_name_for(id: u8) -> Result<&'static str, LookupError> {
    ModuleType::from_id(id).map(ModuleType::name)
}

/// Wire code for a status name
pub fn status_code_for(name: &str) -> Result<u8, LookupError> {
    StatusCode::from_name(name).map(StatusCode::id)
}

/// Status name for a wire code
pub fn status_name_for(id: u8) -> Result<&'static str, LookupError> {
    StatusCode::from_id(id).map(StatusCode::name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_type_roundtrip() {
        for packet_type in PacketType::ALL {
            assert_eq!(PacketType::from_id(packet_type.id()), Ok(packet_type));
            assert_eq!(PacketType::from_name(packet_type.name()), Ok(packet_type));
        }
    }

    #[test]
    fn test_module_type_roundtrip() {
        for module in ModuleType::ALL {
            assert_eq!(ModuleType::from_id(module.id()), Ok(module));
            assert_eq!(ModuleType::from_name(module.name()), Ok(module));
        }
    }

    #[test]
    fn test_status_code_roundtrip() {
        for status in StatusCode::ALL {
            assert_eq!(StatusCode::from_id(status.id()), Ok(status));
            assert_eq!(StatusCode::from_name(status.name()), Ok(status));
        }
    }

    #[test]
    fn test_wire_codes() {
        assert_eq!(type_id_for("REQUEST_MODIFY_DEMAND"), Ok(0x88));
        assert_eq!(type_id_for("RESPONSE_SPEED_SCALING"), Ok(0x9B));
        assert_eq!(type_name_for(0x70), Ok("REQUEST_CONNECTED_MODULES"));
        assert_eq!(module_name_for(0x11), Ok("TPI_ACU"));
        assert_eq!(module_id_for("TILT"), Ok(0x0B));
        assert_eq!(status_name_for(0x03), Ok("INVALID_CRC"));
        assert_eq!(status_code_for("OTHER_ERROR"), Ok(0x04));
    }

    #[test]
    fn test_unknown_type_id() {
        assert_eq!(type_name_for(0xFF), Err(LookupError::UnknownTypeId(0xFF)));
        assert_eq!(type_name_for(0x02), Err(LookupError::UnknownTypeId(0x02)));
    }

    #[test]
    fn test_unknown_names() {
        assert!(matches!(
            type_id_for("REQUEST_TELEPORT"),
            Err(LookupError::UnknownTypeName(_))
        ));
        assert!(matches!(
            module_id_for("JETPACK"),
            Err(LookupError::UnknownModuleName(_))
        ));
        assert!(matches!(
            status_code_for("MAYBE"),
            Err(LookupError::UnknownStatusName(_))
        ));
    }

    #[test]
    fn test_unknown_module_and_status_codes() {
        assert_eq!(
            ModuleType::from_id(0x12),
            Err(LookupError::UnknownModuleId(0x12))
        );
        assert_eq!(
            StatusCode::from_id(0x05),
            Err(LookupError::UnknownStatusCode(0x05))
        );
    }

    #[test]
    fn test_no_type_collides_with_delimiter() {
        for packet_type in PacketType::ALL {
            assert_ne!(packet_type.id(), crate::frame::FRAME_DELIMITER);
        }
    }

    #[test]
    fn test_stream_enables() {
        for request in PacketType::STREAM_ENABLES {
            assert!(request.is_stream_enable());
            let response = request.stream_response().unwrap();
            assert_eq!(response.id(), request.id() + 1);
        }
        assert!(!PacketType::RequestModifyDemand.is_stream_enable());
        assert_eq!(PacketType::ResponseStatus.stream_response(), None);
    }

    #[test]
    fn test_payload_shape_accepts() {
        assert!(PayloadShape::Empty.accepts(0));
        assert!(!PayloadShape::Empty.accepts(1));
        assert!(PayloadShape::Fixed(4).accepts(4));
        assert!(!PayloadShape::Fixed(4).accepts(3));
        assert!(PayloadShape::Variable { max: 8 }.accepts(0));
        assert!(!PayloadShape::Variable { max: 8 }.accepts(9));
    }
}
