//! Sessions over a real serial port

use tracing::info;

use tpi_hal_serialport::SerialLink;

use crate::config::{DriverConfig, LinkSection};
use crate::error::SessionError;
use crate::session::{LinkState, Session};

/// Open `port` with default settings and run the startup handshake
///
/// The session is returned even if the controller did not answer; check
/// [`Session::link_state`].
pub fn start_session(port: &str) -> Result<Session<SerialLink>, SessionError> {
    let config = DriverConfig {
        link: LinkSection {
            port: port.to_owned(),
            ..LinkSection::default()
        },
        ..DriverConfig::default()
    };
    start_session_with(&config)
}

/// Open the configured port and run the startup handshake
pub fn start_session_with(config: &DriverConfig) -> Result<Session<SerialLink>, SessionError> {
    config.validate()?;

    let port = &config.link.port;
    let link = SerialLink::open(port, &config.link_config()).map_err(|source| {
        SessionError::Open {
            port: port.clone(),
            source,
        }
    })?;

    let mut session = Session::with_config(link, config.session_config());
    let state = session.handshake()?;

    info!(
        port = %port,
        confirmed = state == LinkState::Confirmed,
        "session started"
    );
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn test_missing_port() {
        let result = start_session("/dev/tpi-port-that-does-not-exist");
        assert!(matches!(result, Err(SessionError::Open { .. })));
    }

    #[test]
    fn test_invalid_config_checked_before_open() {
        let mut config = DriverConfig::default();
        config.session.handshake_attempts = 0;

        let result = start_session_with(&config);
        assert!(matches!(
            result,
            Err(SessionError::Config(ConfigError::Invalid { .. }))
        ));
    }
}
