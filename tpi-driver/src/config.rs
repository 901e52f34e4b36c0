//! Driver configuration
//!
//! Loaded from a TOML file with `[link]`, `[session]` and `[heartbeat]`
//! sections. Every key is optional and falls back to the controller's
//! defaults:
//!
//! ```toml
//! [link]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//! byte_timeout_ms = 10
//!
//! [session]
//! receive_timeout_ms = 500
//! drain_timeout_ms = 20
//! handshake_attempts = 3
//!
//! [heartbeat]
//! interval_ms = 40
//! poll_every = 20
//! poll_timeout_ms = 5
//! fallback_window_ms = 50
//! max_failed_ticks = 3
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tpi_hal::{LinkConfig, DEFAULT_BAUD_RATE};

use crate::error::ConfigError;
use crate::heartbeat::HeartbeatConfig;
use crate::session::SessionConfig;

/// Serial port opened when none is configured
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Complete driver configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    pub link: LinkSection,
    pub session: SessionSection,
    pub heartbeat: HeartbeatSection,
}

/// `[link]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkSection {
    /// Serial port path
    pub port: String,
    pub baud_rate: u32,
    /// Longest wait for a single byte
    pub byte_timeout_ms: u64,
}

impl Default for LinkSection {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_owned(),
            baud_rate: DEFAULT_BAUD_RATE,
            byte_timeout_ms: 10,
        }
    }
}

/// `[session]` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSection {
    /// Window for an expected reply
    pub receive_timeout_ms: u64,
    /// Window for picking up a frame that may already be waiting
    pub drain_timeout_ms: u64,
    /// Replies to wait for after the startup status frame
    pub handshake_attempts: u32,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            receive_timeout_ms: 500,
            drain_timeout_ms: 20,
            handshake_attempts: 3,
        }
    }
}

/// `[heartbeat]` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeartbeatSection {
    /// Pause between demand frames
    pub interval_ms: u64,
    /// Drain one inbound frame every this many ticks
    pub poll_every: u32,
    pub poll_timeout_ms: u64,
    /// Silence after which the controller reverts to manual control
    pub fallback_window_ms: u64,
    /// Consecutive failed ticks before the link is declared lost
    pub max_failed_ticks: u32,
}

impl Default for HeartbeatSection {
    fn default() -> Self {
        Self {
            interval_ms: 40,
            poll_every: 20,
            poll_timeout_ms: 5,
            fallback_window_ms: 50,
            max_failed_ticks: 3,
        }
    }
}

impl DriverConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: DriverConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;

        tracing::info!(path = %path.display(), port = %config.link.port, "configuration loaded");
        Ok(config)
    }

    /// Check values the link cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.link.port.is_empty() {
            return Err(invalid("link.port", "must not be empty"));
        }
        if self.link.baud_rate == 0 {
            return Err(invalid("link.baud_rate", "must be non-zero"));
        }
        if self.link.byte_timeout_ms == 0 {
            return Err(invalid("link.byte_timeout_ms", "must be non-zero"));
        }
        if self.session.handshake_attempts == 0 {
            return Err(invalid("session.handshake_attempts", "must be at least 1"));
        }
        if self.heartbeat.poll_every == 0 {
            return Err(invalid("heartbeat.poll_every", "must be at least 1"));
        }
        if self.heartbeat.interval_ms >= self.heartbeat.fallback_window_ms {
            return Err(invalid(
                "heartbeat.interval_ms",
                "must be shorter than fallback_window_ms",
            ));
        }
        // A poll can overrun its timeout by one blocked byte read, and the
        // next send waits for it
        let poll_ms = self.heartbeat.poll_timeout_ms.saturating_add(self.link.byte_timeout_ms);
        if poll_ms >= self.heartbeat.fallback_window_ms {
            return Err(invalid(
                "heartbeat.poll_timeout_ms",
                "plus link.byte_timeout_ms must be shorter than fallback_window_ms",
            ));
        }
        if self.heartbeat.max_failed_ticks == 0 {
            return Err(invalid("heartbeat.max_failed_ticks", "must be at least 1"));
        }
        Ok(())
    }

    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            baud_rate: self.link.baud_rate,
            byte_timeout: Duration::from_millis(self.link.byte_timeout_ms),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            receive_timeout: Duration::from_millis(self.session.receive_timeout_ms),
            drain_timeout: Duration::from_millis(self.session.drain_timeout_ms),
            handshake_attempts: self.session.handshake_attempts,
        }
    }

    pub fn heartbeat_config(&self) -> HeartbeatConfig {
        HeartbeatConfig {
            interval: Duration::from_millis(self.heartbeat.interval_ms),
            poll_every: self.heartbeat.poll_every,
            poll_timeout: Duration::from_millis(self.heartbeat.poll_timeout_ms),
            fallback_window: Duration::from_millis(self.heartbeat.fallback_window_ms),
            max_failed_ticks: self.heartbeat.max_failed_ticks,
        }
    }
}

fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = DriverConfig::from_toml_str("").unwrap();
        assert_eq!(config, DriverConfig::default());
        assert_eq!(config.link.port, "/dev/ttyUSB0");
        assert_eq!(config.link_config(), LinkConfig::default());
        assert_eq!(config.session_config(), SessionConfig::default());
        assert_eq!(config.heartbeat_config(), HeartbeatConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = DriverConfig::from_toml_str(
            r#"
            [link]
            port = "/dev/ttyACM1"

            [heartbeat]
            interval_ms = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.link.port, "/dev/ttyACM1");
        assert_eq!(config.link.baud_rate, 115_200);
        assert_eq!(config.heartbeat.interval_ms, 30);
        assert_eq!(config.heartbeat.poll_every, 20);
        assert_eq!(config.session.handshake_attempts, 3);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = DriverConfig::from_toml_str("[link]\nparity = \"even\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_interval_must_fit_fallback_window() {
        let result = DriverConfig::from_toml_str("[heartbeat]\ninterval_ms = 50\n");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "heartbeat.interval_ms",
                ..
            })
        ));
    }

    #[test]
    fn test_poll_plus_byte_timeout_must_fit_fallback_window() {
        // 35 + 10 fits; the same poll behind a 15 ms byte timeout does not
        let text = "[heartbeat]\npoll_timeout_ms = 35\n";
        assert!(DriverConfig::from_toml_str(text).is_ok());

        let text = "[link]\nbyte_timeout_ms = 15\n[heartbeat]\npoll_timeout_ms = 35\n";
        assert!(matches!(
            DriverConfig::from_toml_str(text),
            Err(ConfigError::Invalid {
                field: "heartbeat.poll_timeout_ms",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_values_rejected() {
        for text in [
            "[link]\nbaud_rate = 0\n",
            "[link]\nbyte_timeout_ms = 0\n",
            "[session]\nhandshake_attempts = 0\n",
            "[heartbeat]\npoll_every = 0\n",
            "[heartbeat]\nmax_failed_ticks = 0\n",
        ] {
            assert!(
                matches!(
                    DriverConfig::from_toml_str(text),
                    Err(ConfigError::Invalid { .. })
                ),
                "{text}"
            );
        }
    }

    #[test]
    fn test_load_missing_file() {
        let result = DriverConfig::load("/nonexistent/tpi.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("tpi-driver-{}.toml", std::process::id()));
        fs::write(&path, "[session]\nreceive_timeout_ms = 250\n").unwrap();

        let config = DriverConfig::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(
            config.session_config().receive_timeout,
            Duration::from_millis(250)
        );
    }
}
