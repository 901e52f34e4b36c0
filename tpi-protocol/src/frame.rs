//! Frame encoding for the TPI protocol.
//!
//! Frame format:
//! - START (1 byte): 0xF0 delimiter
//! - TYPE_ID (1 byte): packet type identifier
//! - LEN (1 byte): payload length (0-255)
//! - PAYLOAD (LEN bytes): type-specific data
//! - CRC (1 byte): CRC-8/SAE-J1850 of TYPE_ID, LEN and PAYLOAD
//! - END (1 byte): 0xF0 delimiter

use core::fmt;

use heapless::Vec;

use crate::checksum::{frame_crc, Checksum};
use crate::error::EncodeError;

/// Frame delimiter, used for both START and END
pub const FRAME_DELIMITER: u8 = 0xF0;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 255;

/// Bytes a frame adds around its payload (START + TYPE_ID + LEN + CRC + END)
pub const FRAME_OVERHEAD: usize = 5;

/// Maximum complete frame size
pub const MAX_FRAME_SIZE: usize = MAX_PAYLOAD_SIZE + FRAME_OVERHEAD;

/// A constructed frame, ready for transmission
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    /// Packet type identifier
    pub type_id: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
    /// Checksum over TYPE_ID, LEN and payload
    pub crc: u8,
}

impl Frame {
    /// Create a new frame with the given type id and payload
    pub fn new<C: Checksum + ?Sized>(
        type_id: u8,
        payload: &[u8],
        checksum: &C,
    ) -> Result<Self, EncodeError> {
        let payload_vec =
            Vec::from_slice(payload).map_err(|_| EncodeError::PayloadTooLarge(payload.len()))?;
        let crc = frame_crc(checksum, type_id, payload_vec.len() as u8, &payload_vec);

        Ok(Self {
            type_id,
            payload: payload_vec,
            crc,
        })
    }

    /// Create a frame with no payload
    pub fn empty<C: Checksum + ?Sized>(type_id: u8, checksum: &C) -> Self {
        Self {
            type_id,
            payload: Vec::new(),
            crc: frame_crc(checksum, type_id, 0, &[]),
        }
    }

    /// The LEN byte
    pub fn len_byte(&self) -> u8 {
        self.payload.len() as u8
    }

    /// Number of bytes this frame occupies on the wire
    pub fn wire_len(&self) -> usize {
        self.payload.len() + FRAME_OVERHEAD
    }

    /// Check the stored checksum against `checksum`
    pub fn is_valid<C: Checksum + ?Sized>(&self, checksum: &C) -> bool {
        self.crc == frame_crc(checksum, self.type_id, self.len_byte(), &self.payload)
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, EncodeError> {
        let frame_len = self.wire_len();
        if buffer.len() < frame_len {
            return Err(EncodeError::BufferTooSmall);
        }

        let end = 3 + self.payload.len();
        buffer[0] = FRAME_DELIMITER;
        buffer[1] = self.type_id;
        buffer[2] = self.len_byte();
        buffer[3..end].copy_from_slice(&self.payload);
        buffer[end] = self.crc;
        buffer[end + 1] = FRAME_DELIMITER;

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn to_bytes(&self) -> Vec<u8, MAX_FRAME_SIZE> {
        let mut bytes = Vec::new();
        // Capacity covers the largest frame
        let _ = bytes.push(FRAME_DELIMITER);
        let _ = bytes.push(self.type_id);
        let _ = bytes.push(self.len_byte());
        let _ = bytes.extend_from_slice(&self.payload);
        let _ = bytes.push(self.crc);
        let _ = bytes.push(FRAME_DELIMITER);
        bytes
    }
}

/// Write bytes as space-separated lowercase hex pairs
pub(crate) fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{:02x}", byte)?;
    }
    Ok(())
}
