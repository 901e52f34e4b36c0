//! TPI session over a byte link
//!
//! A [`Session`] owns the link, builds outbound frames and decodes inbound
//! ones, and keeps the traffic counters used to tell "no traffic" apart from
//! "traffic present but invalid".
//!
//! Inbound decode failures never end a session: they are counted, logged
//! and returned as [`Received::Rejected`]. Only transport failures surface
//! as errors.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use tpi_hal::{ErrorType, Link};
use tpi_protocol::{
    Checksum, DecodeError, DecodedPacket, Demand, EncodeError, Encoder, Feed, Frame, FrameDecoder,
    ModuleType, PacketType, PacketValue, Payload, SaeJ1850,
};

use crate::error::{SessionError, TransportError};

/// A session shared between the application and the heartbeat thread
pub type SharedSession<L, C = SaeJ1850> = Arc<Mutex<Session<L, C>>>;

/// Session timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Window for an expected reply
    pub receive_timeout: Duration,
    /// Window for picking up a frame that may already be waiting
    pub drain_timeout: Duration,
    /// Replies to wait for after the startup status frame
    pub handshake_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            receive_timeout: Duration::from_millis(500),
            drain_timeout: Duration::from_millis(20),
            handshake_attempts: 3,
        }
    }
}

/// Whether the controller has answered the startup handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Unconfirmed,
    Confirmed,
}

/// Outcome of one receive attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    /// A valid frame
    Packet(DecodedPacket),
    /// A frame arrived but failed validation
    Rejected(DecodeError),
    /// Nothing complete arrived before the deadline
    TimedOut,
}

impl Received {
    pub fn into_packet(self) -> Option<DecodedPacket> {
        match self {
            Received::Packet(packet) => Some(packet),
            _ => None,
        }
    }
}

/// Result of [`Session::link_check`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReport {
    /// Modules the controller reported, if it answered the request
    pub modules: Option<Vec<ModuleType>>,
    pub n_tx: u64,
    pub n_rx: u64,
    /// At least one valid frame has been received on this session
    pub passed: bool,
}

/// Host end of a TPI link
#[derive(Debug)]
pub struct Session<L, C = SaeJ1850> {
    link: L,
    encoder: Encoder<C>,
    checksum: C,
    config: SessionConfig,
    state: LinkState,
    n_tx: u64,
    n_rx: u64,
    n_rejected: u64,
}

impl<L> Session<L, SaeJ1850>
where
    L: Link,
    <L as ErrorType>::Error: Into<TransportError>,
{
    /// Create a session with default timing
    pub fn new(link: L) -> Self {
        Self::with_config(link, SessionConfig::default())
    }

    pub fn with_config(link: L, config: SessionConfig) -> Self {
        Self::with_checksum(link, config, SaeJ1850)
    }
}

impl<L, C> Session<L, C>
where
    L: Link,
    <L as ErrorType>::Error: Into<TransportError>,
    C: Checksum + Clone,
{
    /// Create a session with a specific checksum
    pub fn with_checksum(link: L, config: SessionConfig, checksum: C) -> Self {
        Self {
            link,
            encoder: Encoder::with_checksum(checksum.clone()),
            checksum,
            config,
            state: LinkState::Unconfirmed,
            n_tx: 0,
            n_rx: 0,
            n_rejected: 0,
        }
    }

    /// Frames written
    pub fn n_tx(&self) -> u64 {
        self.n_tx
    }

    /// Valid frames received
    pub fn n_rx(&self) -> u64 {
        self.n_rx
    }

    /// Frames received that failed validation
    pub fn n_rejected(&self) -> u64 {
        self.n_rejected
    }

    pub fn link_state(&self) -> LinkState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Encode and send a frame for the packet type called `type_name`
    pub fn send(&mut self, type_name: &str, payload: &Payload) -> Result<(), SessionError> {
        let frame = self.encoder.build(type_name, payload)?;
        self.transmit(&frame)
    }

    /// Encode and send a frame for `packet_type`
    pub fn send_packet(
        &mut self,
        packet_type: PacketType,
        payload: &Payload,
    ) -> Result<(), SessionError> {
        let frame = self.encoder.build_packet(packet_type, payload)?;
        self.transmit(&frame)
    }

    fn transmit(&mut self, frame: &Frame) -> Result<(), SessionError> {
        let bytes = frame.to_bytes();
        trace!(bytes = ?bytes.as_slice(), "TX");

        self.link.write_all(&bytes).map_err(SessionError::transport)?;
        self.link.flush().map_err(SessionError::transport)?;
        self.n_tx += 1;

        debug!(type_id = frame.type_id, len = frame.len_byte(), n_tx = self.n_tx, "frame sent");
        Ok(())
    }

    /// Read until one frame closes or `timeout` elapses
    ///
    /// A frame still open at the deadline is dropped; the next call starts
    /// a fresh scan.
    pub fn receive_frame(&mut self, timeout: Duration) -> Result<Received, SessionError> {
        let deadline = Instant::now() + timeout;
        let mut decoder = FrameDecoder::with_checksum(self.checksum.clone());

        while Instant::now() < deadline {
            let Some(byte) = self.link.read_byte().map_err(SessionError::transport)? else {
                continue;
            };

            match decoder.feed(byte) {
                Ok(Feed::Need(_)) => {}
                Ok(Feed::Done(packet)) => {
                    self.n_rx += 1;
                    debug!(packet = %packet, n_rx = self.n_rx, "RX");
                    return Ok(Received::Packet(packet));
                }
                Err(err) => {
                    self.n_rejected += 1;
                    warn!(error = %err, n_rejected = self.n_rejected, "frame rejected");
                    return Ok(Received::Rejected(err));
                }
            }
        }

        if decoder.in_frame() {
            debug!(raw = ?decoder.raw(), "partial frame dropped at deadline");
        }
        Ok(Received::TimedOut)
    }

    /// Receive one valid frame, or `None` on timeout or a rejected frame
    pub fn receive(&mut self, timeout: Duration) -> Result<Option<DecodedPacket>, SessionError> {
        self.receive_frame(timeout).map(Received::into_packet)
    }

    /// Enable or disable the data stream requested by `name`
    ///
    /// `name` is a stream-enable request type such as
    /// `REQUEST_ENABLE_MOTOR_SPEED`.
    pub fn enable_stream(&mut self, name: &str, on: bool) -> Result<(), SessionError> {
        let stream = PacketType::from_name(name).map_err(EncodeError::from)?;
        let frame = self.encoder.enable_stream(stream, on)?;
        self.transmit(&frame)
    }

    /// Enable or disable every data stream
    ///
    /// Each request is preceded by a short drain and followed by one
    /// receive, so replies do not pile up in the port buffer.
    pub fn enable_all_streams(&mut self, on: bool) -> Result<(), SessionError> {
        for stream in PacketType::STREAM_ENABLES {
            self.receive(self.config.drain_timeout)?;
            let frame = self.encoder.enable_stream(stream, on)?;
            self.transmit(&frame)?;
            self.receive(self.config.receive_timeout)?;
        }
        info!(on, "all data streams toggled");
        Ok(())
    }

    pub fn request_connected_modules(&mut self) -> Result<(), SessionError> {
        let frame = self.encoder.request_connected_modules()?;
        self.transmit(&frame)
    }

    /// Send a drive demand; both axes must be within [-100, 100]
    pub fn send_demand(&mut self, x: i32, y: i32) -> Result<(), SessionError> {
        self.send_demand_value(Demand::new(x, y)?)
    }

    pub fn send_demand_value(&mut self, demand: Demand) -> Result<(), SessionError> {
        let frame = self.encoder.demand(demand)?;
        self.transmit(&frame)
    }

    pub fn send_status(&mut self, ok: bool) -> Result<(), SessionError> {
        let frame = self.encoder.status(ok)?;
        self.transmit(&frame)
    }

    /// Startup handshake
    ///
    /// Sends a status-OK frame and waits for up to `handshake_attempts`
    /// replies, looking for an OK status. No reply leaves the link
    /// unconfirmed; the caller decides whether to carry on.
    pub fn handshake(&mut self) -> Result<LinkState, SessionError> {
        self.send_status(true)?;

        for attempt in 1..=self.config.handshake_attempts {
            match self.receive_frame(self.config.receive_timeout)? {
                Received::Packet(packet) if packet.status().is_some_and(|s| s.is_ok()) => {
                    self.state = LinkState::Confirmed;
                    info!(attempt, "controller answered handshake");
                    return Ok(self.state);
                }
                Received::Packet(packet) => {
                    debug!(attempt, packet = %packet, "unexpected handshake reply");
                }
                Received::Rejected(_) | Received::TimedOut => {}
            }
        }

        warn!(
            attempts = self.config.handshake_attempts,
            "no OK status from controller; link unconfirmed"
        );
        Ok(self.state)
    }

    /// Two-way link self-test
    ///
    /// Drains the port, asks for the connected modules, then exchanges two
    /// status frames. The check passes when anything valid has been
    /// received on this session.
    pub fn link_check(&mut self) -> Result<LinkReport, SessionError> {
        self.receive(self.config.drain_timeout)?;

        self.request_connected_modules()?;
        let modules = match self.receive(self.config.receive_timeout)? {
            Some(packet) => match packet.into_value() {
                PacketValue::ConnectedModules(modules) => Some(modules.to_vec()),
                _ => None,
            },
            None => None,
        };

        for _ in 0..2 {
            self.send_status(true)?;
            self.receive(self.config.receive_timeout)?;
        }

        let report = LinkReport {
            modules,
            n_tx: self.n_tx,
            n_rx: self.n_rx,
            passed: self.n_rx > 0,
        };
        if report.passed {
            info!(n_tx = report.n_tx, n_rx = report.n_rx, "link check passed");
        } else {
            warn!(n_tx = report.n_tx, "link check failed: nothing received");
        }
        Ok(report)
    }

    /// Drain pending frames and switch every data stream off
    pub fn shutdown(&mut self) -> Result<(), SessionError> {
        info!(n_tx = self.n_tx, n_rx = self.n_rx, "session shutting down");

        for _ in 0..2 {
            self.receive(self.config.drain_timeout)?;
        }
        for stream in PacketType::STREAM_ENABLES {
            let frame = self.encoder.enable_stream(stream, false)?;
            self.transmit(&frame)?;
            self.receive(self.config.drain_timeout)?;
        }
        Ok(())
    }

    /// Give the link back, ending the session
    pub fn into_link(self) -> L {
        self.link
    }

    /// Wrap the session for sharing with a heartbeat
    pub fn into_shared(self) -> SharedSession<L, C> {
        Arc::new(Mutex::new(self))
    }
}
