//! Frame checksum
//!
//! The controller validates every frame with CRC-8/SAE-J1850 (poly 0x1D,
//! init 0xFF, final XOR 0xFF), the AUTOSAR `Crc_CalculateCRC8` variant.
//! Both ends must agree bit-for-bit, so the algorithm is injected through
//! [`Checksum`] rather than hard-wired into the codec.

use crc::{Crc, CRC_8_SAE_J1850};
use heapless::Vec;

use crate::frame::MAX_PAYLOAD_SIZE;

/// CRC engine matching the controller firmware
pub const SAE_J1850: Crc<u8> = Crc::<u8>::new(&CRC_8_SAE_J1850);

/// Bytes covered by the checksum: TYPE_ID, LEN and the payload
const CRC_SPAN: usize = MAX_PAYLOAD_SIZE + 2;

/// A one-byte checksum over a byte sequence
///
/// Implementations must be pure. Any `Fn(&[u8]) -> u8` closure or function
/// is a `Checksum`, which keeps test doubles cheap.
pub trait Checksum {
    /// Checksum of `bytes`
    fn crc8(&self, bytes: &[u8]) -> u8;
}

/// CRC-8/SAE-J1850, the algorithm used by the controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SaeJ1850;

impl Checksum for SaeJ1850 {
    fn crc8(&self, bytes: &[u8]) -> u8 {
        SAE_J1850.checksum(bytes)
    }
}

impl<F> Checksum for F
where
    F: Fn(&[u8]) -> u8,
{
    fn crc8(&self, bytes: &[u8]) -> u8 {
        self(bytes)
    }
}

/// Checksum of `TYPE_ID || LEN || PAYLOAD`
///
/// `len` is the declared length byte, which on the decode side may differ
/// from `payload.len()` for a malformed frame.
pub fn frame_crc<C: Checksum + ?Sized>(checksum: &C, type_id: u8, len: u8, payload: &[u8]) -> u8 {
    let mut content = Vec::<u8, CRC_SPAN>::new();
    // Capacity covers the header plus the largest payload
    let _ = content.push(type_id);
    let _ = content.push(len);
    let take = payload.len().min(MAX_PAYLOAD_SIZE);
    let _ = content.extend_from_slice(&payload[..take]);
    checksum.crc8(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sae_j1850_check_value() {
        assert_eq!(SaeJ1850.crc8(b"123456789"), 0x4B);
    }

    #[test]
    fn test_frame_crc_status_ok() {
        // RESPONSE_STATUS, LEN 2, [STATUS_OK, NONE]
        assert_eq!(frame_crc(&SaeJ1850, 0x01, 2, &[0x00, 0x00]), 0xC7);
    }

    #[test]
    fn test_frame_crc_empty_payload() {
        // REQUEST_CONNECTED_MODULES carries no payload
        assert_eq!(frame_crc(&SaeJ1850, 0x70, 0, &[]), 0x95);
    }

    #[test]
    fn test_closure_checksum() {
        let xor = |bytes: &[u8]| bytes.iter().fold(0u8, |acc, b| acc ^ b);
        assert_eq!(frame_crc(&xor, 0x88, 2, &[0x01, 0x02]), 0x88 ^ 2 ^ 1 ^ 2);
    }
}
