//! Frame encoder
//!
//! Builds complete frames from a packet type and a typed payload. Each
//! packet type the host sends has one serializer; looking a type up by name
//! goes through the registry, so a misspelt name is an error rather than a
//! silently empty frame.

use heapless::Vec;

use crate::checksum::{Checksum, SaeJ1850};
use crate::demand::Demand;
use crate::error::EncodeError;
use crate::frame::{Frame, MAX_PAYLOAD_SIZE};
use crate::registry::{PacketType, StatusCode};

/// Payload handed to the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Payload {
    /// No payload
    Empty,
    /// A single boolean: status OK/error, stream on/off
    Flag(bool),
    /// Drive demand percentages, range-checked at encode time
    Demand { x: i32, y: i32 },
}

type PayloadBuf = Vec<u8, MAX_PAYLOAD_SIZE>;

type Serializer = fn(PacketType, &Payload, &mut PayloadBuf) -> Result<(), EncodeError>;

/// Serializer registered for a packet type
fn serializer_for(packet_type: PacketType) -> Option<Serializer> {
    match packet_type {
        PacketType::ResponseStatus => Some(status),
        PacketType::RequestConnectedModules => Some(empty),
        PacketType::RequestModifyDemand => Some(demand),
        PacketType::RequestEnableUserInput
        | PacketType::RequestEnableMotorSpeed
        | PacketType::RequestEnableButtonPresses
        | PacketType::RequestEnableGyroTurnSpeed
        | PacketType::RequestEnableActiveUserFunction
        | PacketType::RequestEnableSpeedScaling => Some(flag),
        _ => None,
    }
}

fn status(
    packet_type: PacketType,
    payload: &Payload,
    buf: &mut PayloadBuf,
) -> Result<(), EncodeError> {
    let Payload::Flag(ok) = *payload else {
        return Err(mismatch(packet_type, "a status flag"));
    };
    let status = if ok {
        StatusCode::Ok
    } else {
        StatusCode::OtherError
    };
    push_all(buf, &[status.id(), PacketType::None.id()])
}

fn flag(
    packet_type: PacketType,
    payload: &Payload,
    buf: &mut PayloadBuf,
) -> Result<(), EncodeError> {
    let Payload::Flag(on) = *payload else {
        return Err(mismatch(packet_type, "an enable flag"));
    };
    push_all(buf, &[u8::from(on)])
}

fn demand(
    packet_type: PacketType,
    payload: &Payload,
    buf: &mut PayloadBuf,
) -> Result<(), EncodeError> {
    let Payload::Demand { x, y } = *payload else {
        return Err(mismatch(packet_type, "a demand"));
    };
    push_all(buf, &Demand::new(x, y)?.to_bytes())
}

fn empty(
    packet_type: PacketType,
    payload: &Payload,
    _buf: &mut PayloadBuf,
) -> Result<(), EncodeError> {
    match payload {
        Payload::Empty => Ok(()),
        _ => Err(mismatch(packet_type, "no payload")),
    }
}

fn mismatch(packet_type: PacketType, expected: &'static str) -> EncodeError {
    EncodeError::PayloadMismatch {
        packet_type,
        expected,
    }
}

fn push_all(buf: &mut PayloadBuf, bytes: &[u8]) -> Result<(), EncodeError> {
    buf.extend_from_slice(bytes)
        .map_err(|_| EncodeError::PayloadTooLarge(buf.len() + bytes.len()))
}

/// Frame builder
#[derive(Debug, Clone, Default)]
pub struct Encoder<C = SaeJ1850> {
    checksum: C,
}

impl Encoder<SaeJ1850> {
    /// Create an encoder using the controller's checksum
    pub fn new() -> Self {
        Self { checksum: SaeJ1850 }
    }
}

impl<C: Checksum> Encoder<C> {
    /// Create an encoder with a specific checksum
    pub fn with_checksum(checksum: C) -> Self {
        Self { checksum }
    }

    /// Build a frame for the packet type called `type_name`
    pub fn build(&self, type_name: &str, payload: &Payload) -> Result<Frame, EncodeError> {
        let packet_type = PacketType::from_name(type_name)?;
        self.build_packet(packet_type, payload)
    }

    /// Build a frame for `packet_type`
    pub fn build_packet(
        &self,
        packet_type: PacketType,
        payload: &Payload,
    ) -> Result<Frame, EncodeError> {
        let serialize = serializer_for(packet_type).ok_or(EncodeError::NoEncoder(packet_type))?;

        let mut buf = PayloadBuf::new();
        serialize(packet_type, payload, &mut buf)?;

        Frame::new(packet_type.id(), &buf, &self.checksum)
    }

    /// `RESPONSE_STATUS` with OK or OTHER_ERROR
    pub fn status(&self, ok: bool) -> Result<Frame, EncodeError> {
        self.build_packet(PacketType::ResponseStatus, &Payload::Flag(ok))
    }

    /// Enable or disable one data stream
    pub fn enable_stream(&self, stream: PacketType, on: bool) -> Result<Frame, EncodeError> {
        if !stream.is_stream_enable() {
            return Err(EncodeError::NotAStream(stream));
        }
        self.build_packet(stream, &Payload::Flag(on))
    }

    /// `REQUEST_MODIFY_DEMAND` for an already range-checked demand
    pub fn demand(&self, demand: Demand) -> Result<Frame, EncodeError> {
        self.build_packet(
            PacketType::RequestModifyDemand,
            &Payload::Demand {
                x: i32::from(demand.x()),
                y: i32::from(demand.y()),
            },
        )
    }

    /// `REQUEST_CONNECTED_MODULES`
    pub fn request_connected_modules(&self) -> Result<Frame, EncodeError> {
        self.build_packet(PacketType::RequestConnectedModules, &Payload::Empty)
    }
}
