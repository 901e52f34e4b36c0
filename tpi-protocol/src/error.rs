//! Protocol error types
//!
//! Decode-side errors describe what was wrong with bytes that came off the
//! link and carry the raw bytes for diagnostics. Encode-side errors are
//! caller mistakes (a value out of range, a payload that does not fit the
//! packet type) and are reported before anything reaches the wire.

use core::fmt;

use heapless::{String, Vec};
use thiserror::Error;

use crate::frame::{write_hex, MAX_FRAME_SIZE};
use crate::registry::{PacketType, PayloadShape};

/// Longest name kept when reporting an unknown lookup key
pub const MAX_NAME_LEN: usize = 40;

/// Bytes collected for a frame, from the start delimiter onward
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawFrame(pub Vec<u8, MAX_FRAME_SIZE>);

impl RawFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

/// A lookup key that matched nothing, truncated to [`MAX_NAME_LEN`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnknownName(String<MAX_NAME_LEN>);

impl UnknownName {
    pub fn new(name: &str) -> Self {
        let mut kept = String::new();
        for c in name.chars() {
            if kept.push(c).is_err() {
                break;
            }
        }
        Self(kept)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnknownName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry lookup failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LookupError {
    #[error("unknown packet type id 0x{0:02X}")]
    UnknownTypeId(u8),
    #[error("unknown packet type `{0}`")]
    UnknownTypeName(UnknownName),
    #[error("unknown module type id 0x{0:02X}")]
    UnknownModuleId(u8),
    #[error("unknown module type `{0}`")]
    UnknownModuleName(UnknownName),
    #[error("unknown status code 0x{0:02X}")]
    UnknownStatusCode(u8),
    #[error("unknown status `{0}`")]
    UnknownStatusName(UnknownName),
}

/// Structural problems with a received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FramingFault {
    /// The byte after the checksum was not the delimiter
    MissingEndDelimiter { found: u8 },
    /// Collected payload does not match the declared LEN
    LengthMismatch { declared: u8, collected: usize },
}

impl fmt::Display for FramingFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramingFault::MissingEndDelimiter { found } => {
                write!(f, "missing end delimiter (found 0x{:02X})", found)
            }
            FramingFault::LengthMismatch {
                declared,
                collected,
            } => write!(
                f,
                "declared {} payload bytes, collected {}",
                declared, collected
            ),
        }
    }
}

/// Errors produced while decoding received bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Malformed delimiter/length sequence
    #[error("bad framing: {fault} [{raw}]")]
    Framing { fault: FramingFault, raw: RawFrame },
    /// Received checksum differs from the computed one
    #[error("bad crc: expected 0x{expected:02X}, received 0x{received:02X} [{raw}]")]
    Checksum {
        expected: u8,
        received: u8,
        raw: RawFrame,
    },
    /// Payload length does not fit the packet type
    #[error("bad length for {packet_type}: expected {expected}, got {actual} bytes")]
    PayloadShape {
        packet_type: PacketType,
        expected: PayloadShape,
        actual: usize,
    },
    /// A code inside the payload is not in the registry
    #[error(transparent)]
    Lookup(#[from] LookupError),
    /// Byte fed to a decoder whose frame is already complete
    #[error("packet finished already")]
    AlreadyComplete,
}

/// Errors produced while building a frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Type name is not registered
    #[error(transparent)]
    Lookup(#[from] LookupError),
    /// Numeric input outside its declared bound
    #[error("{field} = {value} is outside [{min}, {max}]")]
    Range {
        field: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },
    /// Payload variant does not match what the packet type carries
    #[error("{packet_type} expects {expected}")]
    PayloadMismatch {
        packet_type: PacketType,
        expected: &'static str,
    },
    /// Registered type that the host never sends
    #[error("no encoder for {0}")]
    NoEncoder(PacketType),
    /// Type given where a stream-enable request was required
    #[error("{0} is not a stream-enable request")]
    NotAStream(PacketType),
    /// Payload exceeds maximum allowed size
    #[error("payload of {0} bytes exceeds the 255 byte limit")]
    PayloadTooLarge(usize),
    /// Buffer too small for encoding
    #[error("buffer too small for encoding")]
    BufferTooSmall,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_name_truncates() {
        let long = "X".repeat(100);
        let name = UnknownName::new(&long);
        assert_eq!(name.as_str().len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_checksum_error_message() {
        let raw = RawFrame(Vec::from_slice(&[0xF0, 0x88, 0x00]).unwrap());
        let err = DecodeError::Checksum {
            expected: 0x2D,
            received: 0x00,
            raw,
        };
        assert_eq!(
            err.to_string(),
            "bad crc: expected 0x2D, received 0x00 [f0 88 00]"
        );
    }

    #[test]
    fn test_range_error_message() {
        let err = EncodeError::Range {
            field: "x",
            value: 101,
            min: -100,
            max: 100,
        };
        assert_eq!(err.to_string(), "x = 101 is outside [-100, 100]");
    }

    #[test]
    fn test_lookup_is_transparent() {
        let err = DecodeError::from(LookupError::UnknownModuleId(0x40));
        assert_eq!(err.to_string(), "unknown module type id 0x40");
    }
}
