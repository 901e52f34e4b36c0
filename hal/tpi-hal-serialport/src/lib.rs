//! Host serial port backend for the TPI HAL
//!
//! Implements [`tpi_hal::Link`] on top of the `serialport` crate. The port
//! is opened with the byte timeout from [`LinkConfig`], so every
//! `read_byte` call returns within that window whether or not a byte
//! arrived. The port is closed when the [`SerialLink`] is dropped.

#![deny(unsafe_code)]

use std::io::{self, Read, Write};

use serialport::SerialPort;
use tracing::{debug, trace};

use tpi_hal::{ErrorType, LinkConfig, LinkRx, LinkTx};

pub use serialport;

/// A TPI link over a host serial port
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialLink {
    /// Open `path` with the given baud rate and byte timeout
    pub fn open(path: &str, config: &LinkConfig) -> Result<Self, serialport::Error> {
        let port = serialport::new(path, config.baud_rate)
            .timeout(config.byte_timeout)
            .open()?;

        debug!(
            port = path,
            baud = config.baud_rate,
            timeout_ms = config.byte_timeout.as_millis() as u64,
            "serial port opened"
        );

        Ok(Self {
            port,
            name: path.to_owned(),
        })
    }

    /// Port path this link was opened on
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Close the port
    ///
    /// Equivalent to dropping the link; provided so call sites read as the
    /// explicit end of the port's lifetime.
    pub fn close(self) {
        debug!(port = %self.name, "serial port closed");
    }
}

impl core::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SerialLink").field("name", &self.name).finish()
    }
}

impl ErrorType for SerialLink {
    type Error = io::Error;
}

impl LinkTx for SerialLink {
    fn write_all(&mut self, data: &[u8]) -> Result<(), io::Error> {
        trace!(len = data.len(), "TX bytes");
        self.port.write_all(data)
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        self.port.flush()
    }
}

impl LinkRx for SerialLink {
    fn read_byte(&mut self) -> Result<Option<u8>, io::Error> {
        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if is_idle(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Whether a read error only means "nothing arrived in the window"
fn is_idle(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_idle() {
        let err = io::Error::new(io::ErrorKind::TimedOut, "no data");
        assert!(is_idle(&err));
    }

    #[test]
    fn test_broken_pipe_is_not_idle() {
        let err = io::Error::new(io::ErrorKind::BrokenPipe, "unplugged");
        assert!(!is_idle(&err));
    }

    #[test]
    fn test_open_missing_port_fails() {
        let result = SerialLink::open("/dev/tpi-port-that-does-not-exist", &LinkConfig::default());
        assert!(result.is_err());
    }
}
