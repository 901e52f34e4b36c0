//! Serial byte-link abstractions
//!
//! Blocking byte-level I/O with a bounded read wait. There is no line
//! discipline here beyond the per-byte timeout.

use core::time::Duration;

/// Baud rate used by the controller's TPI port
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Longest a single `read_byte` may wait
pub const DEFAULT_BYTE_TIMEOUT: Duration = Duration::from_millis(10);

/// Error type shared by both directions of a link
pub trait ErrorType {
    /// Error type for link operations
    type Error;
}

/// Link transmitter
pub trait LinkTx: ErrorType {
    /// Write all of `data` to the link
    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Link receiver
pub trait LinkRx: ErrorType {
    /// Read a single byte
    ///
    /// Waits at most the configured byte timeout. `Ok(None)` means nothing
    /// arrived in that window, which is not an error.
    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error>;
}

/// Combined link interface
///
/// For ports that provide both directions over one handle.
pub trait Link: LinkTx + LinkRx {}

// Blanket implementation
impl<T: LinkTx + LinkRx> Link for T {}

/// Link configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Baud rate in bits per second
    pub baud_rate: u32,
    /// Upper bound on a single byte read
    pub byte_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            byte_timeout: DEFAULT_BYTE_TIMEOUT,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LinkConfig {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "LinkConfig {{ baud_rate: {=u32}, byte_timeout_ms: {=u64} }}",
            self.baud_rate,
            self.byte_timeout.as_millis() as u64
        )
    }
}
