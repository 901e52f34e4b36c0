//! Driver error types

use std::io;

use thiserror::Error;
use tpi_protocol::EncodeError;

use crate::heartbeat::HeartbeatReport;

/// Boxed transport error, whatever the link's own error type is
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by a [`Session`](crate::Session)
///
/// Decode failures are not here: a corrupt frame is an expected event on a
/// noisy link and is reported through [`Received`](crate::Received).
#[derive(Debug, Error)]
pub enum SessionError {
    /// The link failed; the session cannot continue
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    /// A frame could not be built from the caller's input
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Invalid driver configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The serial port could not be opened
    #[cfg(feature = "serial")]
    #[error("cannot open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: tpi_hal_serialport::serialport::Error,
    },
}

impl SessionError {
    pub(crate) fn transport<E: Into<TransportError>>(error: E) -> Self {
        SessionError::Transport(error.into())
    }

    /// Whether the link itself failed
    pub fn is_transport(&self) -> bool {
        matches!(self, SessionError::Transport(_))
    }
}

/// Errors from starting or stopping the heartbeat thread
#[derive(Debug, Error)]
pub enum HeartbeatError {
    #[error("failed to spawn heartbeat thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("heartbeat thread panicked")]
    Panicked,

    /// The thread gave up after too many consecutive failed ticks
    #[error("link lost: {source}")]
    LinkLost {
        report: HeartbeatReport,
        #[source]
        source: SessionError,
    },
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}
