//! # Printer Transport Layer
//!
//! This module defines the byte-stream contract the protocol layers
//! consume (§4.1, §6) and the concrete backends that implement it.
//!
//! ## Available Transports
//!
//! - [`rfcomm`]: Bluetooth RFCOMM Serial Port Profile (Linux).
//! - [`mock`]: an in-memory double used by the session state machine
//!   tests (no hardware required).
//!
//! The transport is a raw byte stream, not message-oriented. Packet-level
//! framing (fixed 34-byte frames) is enforced one layer up, in
//! [`crate::codec`], which always reads exactly 34 bytes per response.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DriverError;

pub mod mock;
pub mod rfcomm;

pub use mock::MockTransport;
pub use rfcomm::RfcommTransport;

/// SPP UUID both printer families advertise (§6).
pub const SPP_UUID: &str = "00001101-0000-1000-8000-00805F9B34FB";

/// RFCOMM channel both families use (§3, §6).
pub const DEFAULT_CHANNEL: u8 = 1;

/// A paired device's 48-bit Bluetooth address (§3).
///
/// Canonically rendered as six colon-separated hex octets, e.g.
/// `A4:62:DF:A9:72:D4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BluetoothAddress(pub [u8; 6]);

impl BluetoothAddress {
    /// Build an address from the raw bytes of a Kodak `GetAccessoryInfo`
    /// response (bytes 15–20, §4.2).
    pub fn from_bytes(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// The raw 6 octets, most-significant first.
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for BluetoothAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for BluetoothAddress {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(DriverError::InvalidArgument(format!(
                "'{s}' is not a colon-separated 6-octet Bluetooth address"
            )));
        }
        let mut octets = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            octets[i] = u8::from_str_radix(part, 16).map_err(|_| {
                DriverError::InvalidArgument(format!("'{part}' is not a valid hex octet"))
            })?;
        }
        Ok(Self(octets))
    }
}

/// # Transport
///
/// The byte-stream contract consumed by both session state machines
/// (§4.1, §6). Implementations are agnostic collaborators: a host native
/// SPP socket, a USB-connected embedded SPP master, a paired RFCOMM
/// channel on a headless Linux box — the core only requires exactly-once,
/// ordered byte delivery and failure surfacing.
pub trait Transport: Send {
    /// Write all of `bytes` or fail with `Transport(Io)`.
    fn write(&mut self, bytes: &[u8]) -> Result<(), DriverError>;

    /// Read exactly `n` bytes, aggregating partial reads internally.
    /// Fails with `Transport(Timeout)` if no progress is made for
    /// `timeout`.
    fn read_exact(&mut self, n: usize, timeout: Duration) -> Result<Vec<u8>, DriverError>;

    /// Idempotent; safe to call when already closed.
    fn close(&mut self);

    /// Best-effort liveness indicator.
    fn is_connected(&self) -> bool;
}
