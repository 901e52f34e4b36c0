//! Incremental frame decoder
//!
//! Bytes are fed one at a time. The decoder scans for a delimiter, takes
//! the next non-delimiter byte as the type id, then reads LEN, the payload,
//! the checksum and the closing delimiter. Validation and payload
//! interpretation run once, when the closing byte arrives.
//!
//! ```text
//! SeekingStart ─► ReadingLen ─► ReadingPayload ─► ReadingCrc ─► ReadingEnd ─► Complete
//!                                (skipped when LEN = 0)
//! ```
//!
//! A decoder handles exactly one frame; feeding it after `Complete` is an
//! error. Use a fresh decoder (or [`FrameDecoder::reset`]) for the next one.

use heapless::Vec;

use crate::checksum::{frame_crc, Checksum, SaeJ1850};
use crate::error::{DecodeError, FramingFault, RawFrame};
use crate::frame::{FRAME_DELIMITER, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
use crate::packets::{interpret, DecodedPacket};

/// Decoder position within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeState {
    /// Scanning for a delimiter; `armed` once one has been seen
    SeekingStart { armed: bool },
    ReadingLen,
    ReadingPayload { remaining: u8 },
    ReadingCrc,
    ReadingEnd,
    Complete,
}

/// Outcome of feeding one byte
#[derive(Debug, Clone, PartialEq)]
pub enum Feed {
    /// Frame still open; at least this many bytes are owed
    Need(usize),
    /// Frame closed and valid
    Done(DecodedPacket),
}

/// State machine for decoding one incoming frame
#[derive(Debug, Clone)]
pub struct FrameDecoder<C = SaeJ1850> {
    checksum: C,
    state: DecodeState,
    type_id: u8,
    declared_len: u8,
    payload: Vec<u8, MAX_PAYLOAD_SIZE>,
    rx_crc: u8,
    end: u8,
    raw: Vec<u8, MAX_FRAME_SIZE>,
}

impl Default for FrameDecoder<SaeJ1850> {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder<SaeJ1850> {
    /// Create a decoder using the controller's checksum
    pub fn new() -> Self {
        Self::with_checksum(SaeJ1850)
    }
}

impl<C: Checksum> FrameDecoder<C> {
    /// Create a decoder with a specific checksum
    pub fn with_checksum(checksum: C) -> Self {
        Self {
            checksum,
            state: DecodeState::SeekingStart { armed: false },
            type_id: 0,
            declared_len: 0,
            payload: Vec::new(),
            rx_crc: 0,
            end: 0,
            raw: Vec::new(),
        }
    }

    /// Reset the decoder state
    pub fn reset(&mut self) {
        self.state = DecodeState::SeekingStart { armed: false };
        self.type_id = 0;
        self.declared_len = 0;
        self.payload.clear();
        self.rx_crc = 0;
        self.end = 0;
        self.raw.clear();
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Returns true once a type id has been accepted
    pub fn in_frame(&self) -> bool {
        !matches!(
            self.state,
            DecodeState::SeekingStart { .. } | DecodeState::Complete
        )
    }

    pub fn is_complete(&self) -> bool {
        self.state == DecodeState::Complete
    }

    /// Bytes still owed before the frame completes
    ///
    /// Before LEN is known this is the minimum for an empty payload.
    pub fn remaining(&self) -> usize {
        match self.state {
            DecodeState::SeekingStart { armed: false } => 5,
            DecodeState::SeekingStart { armed: true } => 4,
            DecodeState::ReadingLen => 3,
            DecodeState::ReadingPayload { remaining } => usize::from(remaining) + 2,
            DecodeState::ReadingCrc => 2,
            DecodeState::ReadingEnd => 1,
            DecodeState::Complete => 0,
        }
    }

    /// Bytes collected since the current start delimiter
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Feed a single byte to the decoder
    ///
    /// Returns `Feed::Need(n)` while the frame is open and `Feed::Done` once
    /// a valid frame closes. An invalid frame is reported as `Err` on its
    /// closing byte and is never interpreted.
    pub fn feed(&mut self, byte: u8) -> Result<Feed, DecodeError> {
        match self.state {
            DecodeState::SeekingStart { armed } => {
                if byte == FRAME_DELIMITER {
                    // Any delimiter restarts the scan for the true frame start
                    self.raw.clear();
                    let _ = self.raw.push(byte);
                    self.state = DecodeState::SeekingStart { armed: true };
                } else if armed {
                    self.type_id = byte;
                    let _ = self.raw.push(byte);
                    self.state = DecodeState::ReadingLen;
                }
                // Silently ignore noise while unarmed
            }
            DecodeState::ReadingLen => {
                self.declared_len = byte;
                self.payload.clear();
                let _ = self.raw.push(byte);
                self.state = if byte == 0 {
                    DecodeState::ReadingCrc
                } else {
                    DecodeState::ReadingPayload { remaining: byte }
                };
            }
            DecodeState::ReadingPayload { remaining } => {
                // LEN is a u8, so the payload always fits
                let _ = self.payload.push(byte);
                let _ = self.raw.push(byte);
                self.state = match remaining - 1 {
                    0 => DecodeState::ReadingCrc,
                    left => DecodeState::ReadingPayload { remaining: left },
                };
            }
            DecodeState::ReadingCrc => {
                self.rx_crc = byte;
                let _ = self.raw.push(byte);
                self.state = DecodeState::ReadingEnd;
            }
            DecodeState::ReadingEnd => {
                self.end = byte;
                let _ = self.raw.push(byte);
                self.state = DecodeState::Complete;
                return self.finish().map(Feed::Done);
            }
            DecodeState::Complete => return Err(DecodeError::AlreadyComplete),
        }

        Ok(Feed::Need(self.remaining()))
    }

    /// Feed multiple bytes to the decoder
    ///
    /// Returns the frame if one completes. Bytes after the closing
    /// delimiter are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<DecodedPacket>, DecodeError> {
        for &byte in bytes {
            if let Feed::Done(packet) = self.feed(byte)? {
                return Ok(Some(packet));
            }
        }
        Ok(None)
    }

    /// Validate the closed frame and hand it to its interpreter
    fn finish(&self) -> Result<DecodedPacket, DecodeError> {
        let expected = frame_crc(
            &self.checksum,
            self.type_id,
            self.declared_len,
            &self.payload,
        );
        if self.rx_crc != expected {
            return Err(DecodeError::Checksum {
                expected,
                received: self.rx_crc,
                raw: RawFrame(self.raw.clone()),
            });
        }

        if self.end != FRAME_DELIMITER {
            return Err(DecodeError::Framing {
                fault: FramingFault::MissingEndDelimiter { found: self.end },
                raw: RawFrame(self.raw.clone()),
            });
        }

        if self.payload.len() != usize::from(self.declared_len) {
            return Err(DecodeError::Framing {
                fault: FramingFault::LengthMismatch {
                    declared: self.declared_len,
                    collected: self.payload.len(),
                },
                raw: RawFrame(self.raw.clone()),
            });
        }

        interpret(self.type_id, &self.payload)
    }
}
