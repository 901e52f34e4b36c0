//! In-memory link for exercising sessions without hardware
//!
//! A [`MockLink`] replays scripted inbound bytes and records every write.
//! Clones share the same state, so a test can hand one clone to a session
//! (or a heartbeat thread) and inspect the traffic through another.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tpi_hal::{ErrorType, LinkRx, LinkTx};
use tpi_protocol::Frame;

/// Default wait when no inbound byte is queued, standing in for the port's
/// byte timeout
pub const DEFAULT_IDLE: Duration = Duration::from_millis(1);

#[derive(Debug)]
struct MockState {
    inbound: VecDeque<u8>,
    writes: Vec<Vec<u8>>,
    replies: VecDeque<Vec<u8>>,
    failing_writes: usize,
    disconnected: bool,
    idle: Duration,
}

/// Scripted link shared between clones
#[derive(Debug, Clone)]
pub struct MockLink {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLink {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                inbound: VecDeque::new(),
                writes: Vec::new(),
                replies: VecDeque::new(),
                failing_writes: 0,
                disconnected: false,
                idle: DEFAULT_IDLE,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue raw bytes for the host to read
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.state().inbound.extend(bytes.iter().copied());
    }

    /// Queue a complete frame for the host to read
    pub fn push_frame(&self, frame: &Frame) {
        self.push_inbound(&frame.to_bytes());
    }

    /// Script a controller reply
    ///
    /// Each successful write releases the next scripted reply into the
    /// inbound queue.
    pub fn queue_reply(&self, frame: &Frame) {
        self.state().replies.push_back(frame.to_bytes().to_vec());
    }

    /// Inbound bytes not yet read
    pub fn pending_inbound(&self) -> usize {
        self.state().inbound.len()
    }

    /// Every `write_all` call so far, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state().writes.clone()
    }

    /// Take and clear the recorded writes
    pub fn take_writes(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.state().writes)
    }

    /// Make the next `count` writes fail with `BrokenPipe`
    pub fn fail_next_writes(&self, count: usize) {
        self.state().failing_writes = count;
    }

    /// Fail every operation from now on, as if the cable was pulled
    pub fn disconnect(&self) {
        self.state().disconnected = true;
    }

    /// Wait used by `read_byte` when nothing is queued
    pub fn set_idle(&self, idle: Duration) {
        self.state().idle = idle;
    }
}

fn broken_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "mock link disconnected")
}

impl ErrorType for MockLink {
    type Error = io::Error;
}

impl LinkTx for MockLink {
    fn write_all(&mut self, data: &[u8]) -> Result<(), io::Error> {
        let mut state = self.state();
        if state.disconnected {
            return Err(broken_pipe());
        }
        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(broken_pipe());
        }
        state.writes.push(data.to_vec());
        if let Some(reply) = state.replies.pop_front() {
            state.inbound.extend(reply);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        if self.state().disconnected {
            return Err(broken_pipe());
        }
        Ok(())
    }
}

impl LinkRx for MockLink {
    fn read_byte(&mut self) -> Result<Option<u8>, io::Error> {
        let idle = {
            let mut state = self.state();
            if state.disconnected {
                return Err(broken_pipe());
            }
            match state.inbound.pop_front() {
                Some(byte) => return Ok(Some(byte)),
                None => state.idle,
            }
        };
        // Sleep outside the lock so writers are not held up
        thread::sleep(idle);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_inbound_in_order() {
        let mut link = MockLink::new();
        link.push_inbound(&[0xF0, 0x01]);

        assert_eq!(link.read_byte().unwrap(), Some(0xF0));
        assert_eq!(link.read_byte().unwrap(), Some(0x01));
        assert_eq!(link.read_byte().unwrap(), None);
    }

    #[test]
    fn test_clones_share_writes() {
        let observer = MockLink::new();
        let mut link = observer.clone();

        link.write_all(&[1, 2, 3]).unwrap();
        link.write_all(&[4]).unwrap();

        assert_eq!(observer.writes(), vec![vec![1, 2, 3], vec![4]]);
        assert_eq!(observer.take_writes().len(), 2);
        assert!(observer.writes().is_empty());
    }

    #[test]
    fn test_reply_released_by_write() {
        let mut link = MockLink::new();
        let frame = Frame::new(0x01, &[0x00, 0x00], &tpi_protocol::SaeJ1850).unwrap();
        link.queue_reply(&frame);
        assert_eq!(link.pending_inbound(), 0);

        link.write_all(&[0xF0]).unwrap();
        assert_eq!(link.pending_inbound(), frame.wire_len());
    }

    #[test]
    fn test_failing_writes() {
        let mut link = MockLink::new();
        link.fail_next_writes(1);

        assert!(link.write_all(&[1]).is_err());
        assert!(link.write_all(&[2]).is_ok());
        assert_eq!(link.writes(), vec![vec![2]]);
    }

    #[test]
    fn test_disconnect() {
        let mut link = MockLink::new();
        link.push_inbound(&[0xF0]);
        link.disconnect();

        assert_eq!(
            link.read_byte().unwrap_err().kind(),
            io::ErrorKind::BrokenPipe
        );
        assert!(link.write_all(&[1]).is_err());
    }
}
