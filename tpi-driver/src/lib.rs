//! Host-side TPI driver
//!
//! Ties the protocol crate to a byte link:
//!
//! ```text
//! ┌────────────┐  set(x, y)  ┌─────────────┐
//! │ application│────────────►│ DemandState │
//! └─────┬──────┘             └──────┬──────┘
//!       │ send / receive            │ every tick
//!       ▼                           ▼
//! ┌────────────────────────────────────────┐
//! │ Session (Arc<Mutex<..>> when shared)   │◄── Heartbeat thread
//! └───────────────────┬────────────────────┘
//!                     ▼
//!              tpi_hal::Link (serial port, MockLink)
//! ```
//!
//! Lock order: demand before session.

#![deny(unsafe_code)]

pub mod config;
pub mod demand;
pub mod error;
pub mod heartbeat;
pub mod mock;
pub mod session;
#[cfg(feature = "serial")]
pub mod serial;

pub use config::DriverConfig;
pub use demand::DemandState;
pub use error::{ConfigError, HeartbeatError, SessionError, TransportError};
pub use heartbeat::{Heartbeat, HeartbeatConfig, HeartbeatReport};
pub use mock::MockLink;
#[cfg(feature = "serial")]
pub use serial::{start_session, start_session_with};
pub use session::{LinkReport, LinkState, Received, Session, SessionConfig, SharedSession};
