//! Decoded packets and the per-type payload interpreters
//!
//! Every validated frame becomes a [`DecodedPacket`]. The payload is turned
//! into a [`PacketValue`] by the interpreter registered for its packet
//! type; types without an interpreter (and ids that are not in the
//! registry at all) fall back to a hex dump.

use core::fmt;

use heapless::Vec;

use crate::error::DecodeError;
use crate::frame::{write_hex, MAX_PAYLOAD_SIZE};
use crate::registry::{ModuleType, PacketType, StatusCode};

/// Raw motor speed units per percent
pub const MOTOR_SPEED_SCALE: f32 = 320.0;

/// Raw gyro units per degree per second
pub const GYRO_TURN_SCALE: f32 = 128.0;

/// Payload rendered as space-separated hex
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HexDump(pub Vec<u8, MAX_PAYLOAD_SIZE>);

impl fmt::Display for HexDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

/// Which request a status response refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseTarget {
    /// Unsolicited status (`NONE`)
    Nothing,
    Packet(PacketType),
    /// Referenced type id is not in the registry
    Unknown(u8),
}

/// `RESPONSE_STATUS` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusReport {
    pub status: StatusCode,
    pub in_response_to: ResponseTarget,
}

impl StatusReport {
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status.name())?;
        match self.in_response_to {
            ResponseTarget::Nothing => Ok(()),
            ResponseTarget::Packet(packet_type) => {
                write!(f, ", in response to ({})", packet_type)
            }
            ResponseTarget::Unknown(id) => write!(f, ", in response to (0x{:02x})", id),
        }
    }
}

/// `RESPONSE_USER_INPUT` payload: joystick position and throttle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UserInput {
    pub x: i8,
    pub y: i8,
    pub throttle: u8,
}

impl fmt::Display for UserInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UI: x {}%, y {}%, sp {}%", self.x, self.y, self.throttle)
    }
}

/// `RESPONSE_MOTOR_SPEED` payload, in percent
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorSpeed {
    pub left: f32,
    pub right: f32,
}

impl fmt::Display for MotorSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l {:.2}%, r {:.2}%", self.left, self.right)
    }
}

/// `RESPONSE_BUTTON_PRESSES` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonPress {
    pub button: i8,
    pub state: i8,
}

impl ButtonPress {
    /// State 1 is pressed; anything else is released
    pub fn is_pressed(&self) -> bool {
        self.state == 1
    }
}

impl fmt::Display for ButtonPress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_pressed() { "Pressed" } else { "Released" };
        write!(f, "button {}, {}", self.button, state)
    }
}

/// `RESPONSE_SPEED_SCALING` payload, in percent
///
/// The controller reports one lateral value that applies to both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpeedScaling {
    pub forward: i8,
    pub reverse: i8,
    pub left: u8,
    pub right: u8,
}

impl fmt::Display for SpeedScaling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Speed Scaling: fwd {}%, rev {}%, l {}%, r {}%",
            self.forward, self.reverse, self.left, self.right
        )
    }
}

/// Interpreted payload of a decoded packet
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketValue {
    Status(StatusReport),
    UserInput(UserInput),
    MotorSpeed(MotorSpeed),
    ButtonPress(ButtonPress),
    ConnectedModules(Vec<ModuleType, MAX_PAYLOAD_SIZE>),
    /// Turn rate, raw reading divided by 128
    GyroTurnSpeed(f32),
    ActiveUserFunction(i8),
    SpeedScaling(SpeedScaling),
    /// A `REQUEST_MODIFY_DEMAND` as seen on the wire
    Demand { x: i8, y: i8 },
    /// A stream-enable request as seen on the wire
    StreamEnable(bool),
    /// Generic fallback
    Raw(HexDump),
}

impl fmt::Display for PacketValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketValue::Status(report) => fmt::Display::fmt(report, f),
            PacketValue::UserInput(input) => fmt::Display::fmt(input, f),
            PacketValue::MotorSpeed(speed) => fmt::Display::fmt(speed, f),
            PacketValue::ButtonPress(press) => fmt::Display::fmt(press, f),
            PacketValue::ConnectedModules(modules) => {
                f.write_str("connected modules: [")?;
                for (i, module) in modules.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(module.name())?;
                }
                f.write_str("]")
            }
            PacketValue::GyroTurnSpeed(turn) => write!(f, "turn speed: {}", turn),
            PacketValue::ActiveUserFunction(function) => {
                write!(f, "active user function: {}", function)
            }
            PacketValue::SpeedScaling(scaling) => fmt::Display::fmt(scaling, f),
            PacketValue::Demand { x, y } => write!(f, "demand: x {}%, y {}%", x, y),
            PacketValue::StreamEnable(on) => {
                f.write_str(if *on { "enable" } else { "disable" })
            }
            PacketValue::Raw(dump) => fmt::Display::fmt(dump, f),
        }
    }
}

/// A validated, interpreted frame
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecodedPacket {
    type_id: u8,
    packet_type: Option<PacketType>,
    payload: Vec<u8, MAX_PAYLOAD_SIZE>,
    value: PacketValue,
}

impl DecodedPacket {
    /// Wire type id
    pub fn type_id(&self) -> u8 {
        self.type_id
    }

    /// Registered packet type, if the id is known
    pub fn packet_type(&self) -> Option<PacketType> {
        self.packet_type
    }

    /// Raw payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn value(&self) -> &PacketValue {
        &self.value
    }

    pub fn into_value(self) -> PacketValue {
        self.value
    }

    /// Status report, if this is a `RESPONSE_STATUS`
    pub fn status(&self) -> Option<&StatusReport> {
        match &self.value {
            PacketValue::Status(report) => Some(report),
            _ => None,
        }
    }

    /// One-line form including id, length and raw payload
    pub fn verbose(&self) -> Verbose<'_> {
        Verbose(self)
    }

    fn write_name(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.packet_type {
            Some(packet_type) => f.write_str(packet_type.name()),
            None => write!(f, "UNKNOWN(0x{:02x})", self.type_id),
        }
    }
}

impl fmt::Display for DecodedPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_name(f)?;
        write!(f, ": {}", self.value)
    }
}

/// Verbose rendering of a [`DecodedPacket`]
pub struct Verbose<'a>(&'a DecodedPacket);

impl fmt::Display for Verbose<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let packet = self.0;
        packet.write_name(f)?;
        write!(
            f,
            " (0x{:02x}): data ({} bytes): [",
            packet.type_id,
            packet.payload.len()
        )?;
        write_hex(f, &packet.payload)?;
        write!(f, "]: {}", packet.value)
    }
}

type Interpreter = fn(&[u8]) -> Result<PacketValue, DecodeError>;

/// Interpreter registered for a packet type
fn interpreter_for(packet_type: PacketType) -> Option<Interpreter> {
    match packet_type {
        PacketType::ResponseStatus => Some(status),
        PacketType::ResponseUserInput => Some(user_input),
        PacketType::ResponseMotorSpeed => Some(motor_speed),
        PacketType::ResponseButtonPresses => Some(button_presses),
        PacketType::ResponseConnectedModules => Some(connected_modules),
        PacketType::ResponseGyroTurnSpeed => Some(gyro_turn_speed),
        PacketType::ResponseActiveUserFunction => Some(active_user_function),
        PacketType::ResponseSpeedScaling => Some(speed_scaling),
        PacketType::RequestModifyDemand => Some(demand),
        PacketType::RequestEnableUserInput
        | PacketType::RequestEnableMotorSpeed
        | PacketType::RequestEnableButtonPresses
        | PacketType::RequestEnableGyroTurnSpeed
        | PacketType::RequestEnableActiveUserFunction
        | PacketType::RequestEnableSpeedScaling => Some(stream_enable),
        PacketType::None | PacketType::RequestConnectedModules => None,
    }
}

/// Interpret the payload of a validated frame
pub fn interpret(type_id: u8, payload: &[u8]) -> Result<DecodedPacket, DecodeError> {
    let packet_type = PacketType::from_id(type_id).ok();

    let value = match packet_type.and_then(|t| interpreter_for(t).map(|i| (t, i))) {
        Some((packet_type, interpreter)) => {
            let shape = packet_type.payload_shape();
            if !shape.accepts(payload.len()) {
                return Err(DecodeError::PayloadShape {
                    packet_type,
                    expected: shape,
                    actual: payload.len(),
                });
            }
            interpreter(payload)?
        }
        None => PacketValue::Raw(HexDump(bytes_vec(payload))),
    };

    Ok(DecodedPacket {
        type_id,
        packet_type,
        payload: bytes_vec(payload),
        value,
    })
}

fn bytes_vec(payload: &[u8]) -> Vec<u8, MAX_PAYLOAD_SIZE> {
    let take = payload.len().min(MAX_PAYLOAD_SIZE);
    // Truncation above keeps this within capacity
    Vec::from_slice(&payload[..take]).unwrap_or_default()
}

// Interpreters run after the shape check, so fixed-width indexing is in
// bounds; `get` keeps them total regardless.

fn byte(payload: &[u8], index: usize) -> u8 {
    payload.get(index).copied().unwrap_or(0)
}

fn status(payload: &[u8]) -> Result<PacketValue, DecodeError> {
    let status = StatusCode::from_id(byte(payload, 0))?;
    let referenced = byte(payload, 1);
    let in_response_to = match PacketType::from_id(referenced) {
        Ok(PacketType::None) => ResponseTarget::Nothing,
        Ok(packet_type) => ResponseTarget::Packet(packet_type),
        Err(_) => ResponseTarget::Unknown(referenced),
    };
    Ok(PacketValue::Status(StatusReport {
        status,
        in_response_to,
    }))
}

fn user_input(payload: &[u8]) -> Result<PacketValue, DecodeError> {
    Ok(PacketValue::UserInput(UserInput {
        x: byte(payload, 0) as i8,
        y: byte(payload, 1) as i8,
        throttle: byte(payload, 2),
    }))
}

fn motor_speed(payload: &[u8]) -> Result<PacketValue, DecodeError> {
    let left = i16::from_be_bytes([byte(payload, 0), byte(payload, 1)]);
    let right = i16::from_be_bytes([byte(payload, 2), byte(payload, 3)]);
    Ok(PacketValue::MotorSpeed(MotorSpeed {
        left: f32::from(left) / MOTOR_SPEED_SCALE,
        right: f32::from(right) / MOTOR_SPEED_SCALE,
    }))
}

fn button_presses(payload: &[u8]) -> Result<PacketValue, DecodeError> {
    Ok(PacketValue::ButtonPress(ButtonPress {
        button: byte(payload, 0) as i8,
        state: byte(payload, 1) as i8,
    }))
}

fn connected_modules(payload: &[u8]) -> Result<PacketValue, DecodeError> {
    let mut modules = Vec::new();
    for &code in payload {
        // Payload length is bounded by the module list capacity
        let _ = modules.push(ModuleType::from_id(code)?);
    }
    Ok(PacketValue::ConnectedModules(modules))
}

fn gyro_turn_speed(payload: &[u8]) -> Result<PacketValue, DecodeError> {
    // Big-endian two's complement of whatever width was sent
    let negative = payload.first().is_some_and(|b| b & 0x80 != 0);
    let mut raw: i64 = if negative { -1 } else { 0 };
    for &b in payload {
        raw = (raw << 8) | i64::from(b);
    }
    Ok(PacketValue::GyroTurnSpeed(raw as f32 / GYRO_TURN_SCALE))
}

fn active_user_function(payload: &[u8]) -> Result<PacketValue, DecodeError> {
    Ok(PacketValue::ActiveUserFunction(byte(payload, 0) as i8))
}

fn speed_scaling(payload: &[u8]) -> Result<PacketValue, DecodeError> {
    let lateral = byte(payload, 2);
    Ok(PacketValue::SpeedScaling(SpeedScaling {
        forward: byte(payload, 0) as i8,
        reverse: byte(payload, 1) as i8,
        left: lateral,
        right: lateral,
    }))
}

fn demand(payload: &[u8]) -> Result<PacketValue, DecodeError> {
    Ok(PacketValue::Demand {
        x: byte(payload, 0) as i8,
        y: byte(payload, 1) as i8,
    })
}

fn stream_enable(payload: &[u8]) -> Result<PacketValue, DecodeError> {
    Ok(PacketValue::StreamEnable(byte(payload, 0) != 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::registry::PayloadShape;

    #[test]
    fn test_motor_speed_scaling() {
        let packet = interpret(0x93, &[0x01, 0x40, 0xFE, 0xC0]).unwrap();
        assert_eq!(
            packet.value(),
            &PacketValue::MotorSpeed(MotorSpeed {
                left: 1.0,
                right: -1.0
            })
        );
        assert_eq!(packet.to_string(), "RESPONSE_MOTOR_SPEED: l 1.00%, r -1.00%");
    }

    #[test]
    fn test_connected_modules_order() {
        let packet = interpret(0x71, &[0x00, 0x09]).unwrap();
        match packet.value() {
            PacketValue::ConnectedModules(modules) => {
                assert_eq!(&modules[..], &[ModuleType::Pmdo, ModuleType::Tpi]);
                let names: std::vec::Vec<&str> = modules.iter().map(|m| m.name()).collect();
                assert_eq!(names, ["PMDO", "TPI"]);
            }
            other => panic!("unexpected value {:?}", other),
        }
        assert_eq!(
            packet.value().to_string(),
            "connected modules: [PMDO, TPI]"
        );
    }

    #[test]
    fn test_connected_modules_unknown_code() {
        let result = interpret(0x71, &[0x00, 0x40]);
        assert_eq!(
            result,
            Err(DecodeError::Lookup(LookupError::UnknownModuleId(0x40)))
        );
    }

    #[test]
    fn test_status_without_reference() {
        let packet = interpret(0x01, &[0x00, 0x00]).unwrap();
        let report = packet.status().unwrap();
        assert!(report.is_ok());
        assert_eq!(report.in_response_to, ResponseTarget::Nothing);
        assert_eq!(packet.value().to_string(), "STATUS_OK");
    }

    #[test]
    fn test_status_in_response_to() {
        let packet = interpret(0x01, &[0x00, 0x88]).unwrap();
        assert_eq!(
            packet.value().to_string(),
            "STATUS_OK, in response to (REQUEST_MODIFY_DEMAND)"
        );
    }

    #[test]
    fn test_status_unknown_reference() {
        let packet = interpret(0x01, &[0x02, 0x42]).unwrap();
        let report = packet.status().unwrap();
        assert_eq!(report.status, StatusCode::InvalidData);
        assert_eq!(report.in_response_to, ResponseTarget::Unknown(0x42));
        assert_eq!(
            packet.value().to_string(),
            "INVALID_DATA, in response to (0x42)"
        );
    }

    #[test]
    fn test_status_unknown_code() {
        assert_eq!(
            interpret(0x01, &[0x09, 0x00]),
            Err(DecodeError::Lookup(LookupError::UnknownStatusCode(0x09)))
        );
    }

    #[test]
    fn test_user_input_signedness() {
        let packet = interpret(0x91, &[0xF6, 0x19, 0x50]).unwrap();
        assert_eq!(
            packet.value(),
            &PacketValue::UserInput(UserInput {
                x: -10,
                y: 25,
                throttle: 80
            })
        );
        assert_eq!(packet.value().to_string(), "UI: x -10%, y 25%, sp 80%");
    }

    #[test]
    fn test_button_press_states() {
        let pressed = interpret(0x95, &[0x03, 0x01]).unwrap();
        assert_eq!(pressed.value().to_string(), "button 3, Pressed");

        let released = interpret(0x95, &[0x03, 0x02]).unwrap();
        assert_eq!(released.value().to_string(), "button 3, Released");
    }

    #[test]
    fn test_gyro_turn_speed_widths() {
        let two = interpret(0x97, &[0xFF, 0x00]).unwrap();
        assert_eq!(two.value(), &PacketValue::GyroTurnSpeed(-2.0));

        let one = interpret(0x97, &[0x40]).unwrap();
        assert_eq!(one.value(), &PacketValue::GyroTurnSpeed(0.5));

        let empty = interpret(0x97, &[]).unwrap();
        assert_eq!(empty.value(), &PacketValue::GyroTurnSpeed(0.0));
    }

    #[test]
    fn test_gyro_turn_speed_too_wide() {
        let result = interpret(0x97, &[0u8; 9]);
        assert!(matches!(
            result,
            Err(DecodeError::PayloadShape {
                packet_type: PacketType::ResponseGyroTurnSpeed,
                expected: PayloadShape::Variable { max: 8 },
                actual: 9,
            })
        ));
    }

    #[test]
    fn test_active_user_function() {
        let packet = interpret(0x99, &[0xFE]).unwrap();
        assert_eq!(packet.value(), &PacketValue::ActiveUserFunction(-2));
    }

    #[test]
    fn test_speed_scaling_lateral_applies_to_both() {
        let packet = interpret(0x9B, &[0x50, 0xCE, 0x3C]).unwrap();
        assert_eq!(
            packet.value(),
            &PacketValue::SpeedScaling(SpeedScaling {
                forward: 80,
                reverse: -50,
                left: 60,
                right: 60
            })
        );
    }

    #[test]
    fn test_wrong_length_is_shape_error() {
        assert_eq!(
            interpret(0x93, &[0x01, 0x02, 0x03]),
            Err(DecodeError::PayloadShape {
                packet_type: PacketType::ResponseMotorSpeed,
                expected: PayloadShape::Fixed(4),
                actual: 3,
            })
        );
    }

    #[test]
    fn test_unknown_type_falls_back_to_hex() {
        let packet = interpret(0xFF, &[0xDE, 0xAD]).unwrap();
        assert_eq!(packet.packet_type(), None);
        assert_eq!(packet.value().to_string(), "de ad");
        assert_eq!(packet.to_string(), "UNKNOWN(0xff): de ad");
    }

    #[test]
    fn test_registered_type_without_interpreter_is_hex() {
        let packet = interpret(0x70, &[]).unwrap();
        assert_eq!(packet.packet_type(), Some(PacketType::RequestConnectedModules));
        assert!(matches!(packet.value(), PacketValue::Raw(_)));
    }

    #[test]
    fn test_verbose_rendering() {
        let packet = interpret(0x99, &[0x05]).unwrap();
        assert_eq!(
            packet.verbose().to_string(),
            "RESPONSE_ACTIVE_USER_FUNCTION (0x99): data (1 bytes): [05]: active user function: 5"
        );
    }
}
