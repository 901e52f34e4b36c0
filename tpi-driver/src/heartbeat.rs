//! Demand heartbeat
//!
//! The controller drops back to manual control when no valid demand frame
//! arrives within its fallback window (about 50 ms). The heartbeat thread
//! re-sends the current demand on a fixed interval and, every few ticks,
//! drains one inbound frame so the port buffer cannot grow without bound.
//!
//! Ticks are scheduled against a deadline, so the time spent sending and
//! polling comes out of the interval instead of adding to it. Each tick
//! holds the demand lock and then the session lock. Everything else that
//! touches both must take them in that order. Sleeping happens with neither
//! lock held.
//!
//! A lost frame does not stop the loop. A run of `max_failed_ticks`
//! consecutive failed ticks means the link is gone: the thread exits and
//! [`Heartbeat::link_lost`] turns true.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use tpi_hal::{ErrorType, Link};
use tpi_protocol::Checksum;

use crate::demand::DemandState;
use crate::error::{HeartbeatError, SessionError, TransportError};
use crate::session::{Session, SharedSession};

/// Heartbeat cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Period between demand frames
    pub interval: Duration,
    /// Drain one inbound frame every this many ticks
    pub poll_every: u32,
    /// Receive window for that drain
    pub poll_timeout: Duration,
    /// Controller's manual-fallback window; longer gaps between frames are
    /// logged
    pub fallback_window: Duration,
    /// Consecutive failed ticks before the link is declared lost
    pub max_failed_ticks: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(40),
            poll_every: 20,
            poll_timeout: Duration::from_millis(5),
            fallback_window: Duration::from_millis(50),
            max_failed_ticks: 3,
        }
    }
}

/// What the heartbeat thread did before it stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatReport {
    pub ticks: u64,
    /// Demand frames written
    pub sent: u64,
    pub failed_sends: u64,
    pub polls: u64,
    /// Valid frames picked up by polls
    pub received: u64,
    /// Longest time between two consecutive demand frames
    pub max_gap: Duration,
}

struct Outcome {
    report: HeartbeatReport,
    lost: Option<SessionError>,
}

/// Handle to a running heartbeat thread
///
/// Dropping the handle stops and joins the thread.
#[derive(Debug)]
pub struct Heartbeat {
    stop: Arc<AtomicBool>,
    lost: Arc<AtomicBool>,
    handle: Option<JoinHandle<Outcome>>,
}

impl Heartbeat {
    /// Spawn the heartbeat thread
    pub fn start<L, C>(
        session: SharedSession<L, C>,
        demand: DemandState,
        config: HeartbeatConfig,
    ) -> Result<Self, HeartbeatError>
    where
        L: Link + Send + 'static,
        <L as ErrorType>::Error: Into<TransportError>,
        C: Checksum + Clone + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let lost = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let thread_lost = lost.clone();

        let handle = thread::Builder::new()
            .name("tpi-heartbeat".into())
            .spawn(move || run(&session, &demand, &config, &thread_stop, &thread_lost))
            .map_err(HeartbeatError::Spawn)?;

        info!(
            interval_ms = config.interval.as_millis() as u64,
            poll_every = config.poll_every,
            "heartbeat started"
        );

        Ok(Self {
            stop,
            lost,
            handle: Some(handle),
        })
    }

    /// Whether the thread is still running
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Whether the thread gave up because the link kept failing
    ///
    /// The owner should stop the heartbeat and release the link.
    pub fn link_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    /// Raise the stop flag and wait for the current tick to finish
    ///
    /// Once this returns the thread will not touch the link again. If the
    /// thread had already exited on a lost link the error is returned with
    /// the report.
    pub fn stop_and_join(mut self) -> Result<HeartbeatReport, HeartbeatError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<HeartbeatReport, HeartbeatError> {
        self.stop.store(true, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return Ok(HeartbeatReport::default());
        };

        let Outcome { report, lost } = handle.join().map_err(|_| HeartbeatError::Panicked)?;
        info!(
            ticks = report.ticks,
            sent = report.sent,
            failed = report.failed_sends,
            max_gap_ms = report.max_gap.as_millis() as u64,
            "heartbeat stopped"
        );
        match lost {
            Some(source) => Err(HeartbeatError::LinkLost { report, source }),
            None => Ok(report),
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!(error = %err, "heartbeat did not stop cleanly");
        }
    }
}

fn lock_session<L, C>(session: &Mutex<Session<L, C>>) -> MutexGuard<'_, Session<L, C>> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run<L, C>(
    session: &Mutex<Session<L, C>>,
    demand: &DemandState,
    config: &HeartbeatConfig,
    stop: &AtomicBool,
    lost: &AtomicBool,
) -> Outcome
where
    L: Link,
    <L as ErrorType>::Error: Into<TransportError>,
    C: Checksum + Clone,
{
    let mut report = HeartbeatReport::default();
    let mut since_poll = 0;
    let mut failed_ticks = 0;
    let mut last_sent: Option<Instant> = None;
    let mut next = Instant::now();

    while !stop.load(Ordering::Acquire) {
        let mut failure = None;
        {
            let current = demand.lock();
            let mut session = lock_session(session);
            let value = *current;

            report.ticks += 1;
            match session.send_demand_value(value) {
                Ok(()) => {
                    report.sent += 1;
                    let now = Instant::now();
                    if let Some(previous) = last_sent.replace(now) {
                        let gap = now - previous;
                        report.max_gap = report.max_gap.max(gap);
                        if gap >= config.fallback_window {
                            warn!(
                                gap_ms = gap.as_millis() as u64,
                                window_ms = config.fallback_window.as_millis() as u64,
                                "demand gap reached the fallback window"
                            );
                        }
                    }
                }
                Err(err) => {
                    report.failed_sends += 1;
                    warn!(error = %err, demand = %value, "heartbeat send failed");
                    failure = Some(err);
                }
            }

            since_poll += 1;
            if since_poll >= config.poll_every {
                since_poll = 0;
                report.polls += 1;
                match session.receive(config.poll_timeout) {
                    Ok(Some(packet)) => {
                        report.received += 1;
                        debug!(packet = %packet, "heartbeat poll");
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!(error = %err, "heartbeat poll failed");
                        failure = failure.or(Some(err));
                    }
                }
            }
        }

        match failure {
            None => failed_ticks = 0,
            Some(err) => {
                failed_ticks += 1;
                if failed_ticks >= config.max_failed_ticks {
                    error!(error = %err, failed_ticks, "link lost; heartbeat exiting");
                    lost.store(true, Ordering::Release);
                    return Outcome {
                        report,
                        lost: Some(err),
                    };
                }
            }
        }

        next += config.interval;
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        } else {
            // Overran the period; restart the schedule rather than burst
            next = now;
        }
    }

    Outcome { report, lost: None }
}
