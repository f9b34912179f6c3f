//! # Mock Transport
//!
//! An in-memory [`Transport`] double for exercising the session state
//! machines without hardware. A minimal hand-rolled fake rather than an
//! external mocking crate, since the `Transport` surface is small enough
//! not to need one.
//!
//! Writes are recorded verbatim (with their wall-clock arrival time, so
//! chunk-pacing tests can assert on inter-write delay) and reads are
//! served from a scripted queue of canned responses.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::error::{DriverError, TransportErrorKind};
use crate::transport::Transport;

/// One write the mock transport observed.
#[derive(Debug, Clone)]
pub struct RecordedWrite {
    pub bytes: Vec<u8>,
    pub at: Instant,
}

/// A scripted in-memory transport for tests.
pub struct MockTransport {
    writes: Vec<RecordedWrite>,
    responses: VecDeque<Vec<u8>>,
    connected: bool,
    /// If set, the next `read_exact` fails with this error instead of
    /// popping from `responses`.
    pub fail_next_read: Option<TransportErrorKind>,
    /// If set, the next `write` fails with this error.
    pub fail_next_write: Option<TransportErrorKind>,
}

impl MockTransport {
    /// A transport with no scripted responses yet.
    pub fn new() -> Self {
        Self {
            writes: Vec::new(),
            responses: VecDeque::new(),
            connected: true,
            fail_next_read: None,
            fail_next_write: None,
        }
    }

    /// Queue a response to be returned by a future `read_exact`.
    pub fn push_response(&mut self, bytes: Vec<u8>) {
        self.responses.push_back(bytes);
    }

    /// All writes observed so far, in order.
    pub fn writes(&self) -> &[RecordedWrite] {
        &self.writes
    }

    /// Concatenation of every observed write's bytes.
    pub fn all_written(&self) -> Vec<u8> {
        self.writes.iter().flat_map(|w| w.bytes.clone()).collect()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), DriverError> {
        if let Some(kind) = self.fail_next_write.take() {
            return Err(DriverError::Transport(kind));
        }
        if !self.connected {
            return Err(DriverError::Transport(TransportErrorKind::Closed));
        }
        self.writes.push(RecordedWrite {
            bytes: bytes.to_vec(),
            at: Instant::now(),
        });
        Ok(())
    }

    fn read_exact(&mut self, n: usize, _timeout: Duration) -> Result<Vec<u8>, DriverError> {
        if let Some(kind) = self.fail_next_read.take() {
            return Err(DriverError::Transport(kind));
        }
        if !self.connected {
            return Err(DriverError::Transport(TransportErrorKind::Closed));
        }
        match self.responses.pop_front() {
            Some(bytes) if bytes.len() == n => Ok(bytes),
            Some(bytes) => Err(DriverError::ProtocolMismatch(format!(
                "mock response length {} != requested {}",
                bytes.len(),
                n
            ))),
            None => Err(DriverError::Transport(TransportErrorKind::Timeout)),
        }
    }

    fn close(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// ============================================================================
// TESTS
// ============================================================================
