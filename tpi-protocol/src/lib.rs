//! TPI Serial Packet Protocol
//!
//! This crate defines the point-to-point serial protocol between a host
//! computer and the embedded motor/UI controller of a powered wheelchair.
//! The host enables telemetry streams, asks which modules are connected,
//! and refreshes a drive demand; the controller answers with status codes
//! and streamed readings.
//!
//! # Protocol Overview
//!
//! All messages use a delimiter-wrapped binary frame:
//! ```text
//! ┌───────┬─────────┬─────┬─────────────┬─────┬───────┐
//! │ START │ TYPE_ID │ LEN │ PAYLOAD     │ CRC │ END   │
//! │ 0xF0  │ 1B      │ 1B  │ 0–255B      │ 1B  │ 0xF0  │
//! └───────┴─────────┴─────┴─────────────┴─────┴───────┘
//! ```
//!
//! `CRC` is CRC-8/SAE-J1850 over `TYPE_ID || LEN || PAYLOAD`. Multi-byte
//! integers are big-endian. There is no escaping: a payload byte equal to
//! the delimiter is carried as-is and framing relies on `LEN`.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod checksum;
pub mod decoder;
pub mod demand;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod packets;
pub mod registry;

pub use checksum::{Checksum, SaeJ1850};
pub use decoder::{DecodeState, Feed, FrameDecoder};
pub use demand::{Demand, DEMAND_MAX, DEMAND_MIN};
pub use encoder::{Encoder, Payload};
pub use error::{DecodeError, EncodeError, FramingFault, LookupError, RawFrame};
pub use frame::{Frame, FRAME_DELIMITER, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use packets::{
    ButtonPress, DecodedPacket, HexDump, MotorSpeed, PacketValue, ResponseTarget, SpeedScaling,
    StatusReport, UserInput,
};
pub use registry::{
    module_id_for, module_name_for, status_code_for, status_name_for, type_id_for,
    type_name_for, ModuleType, PacketType, PayloadShape, StatusCode,
};
