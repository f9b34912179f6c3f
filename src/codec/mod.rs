//! # Packet Codec
//!
//! This module implements the fixed 34-byte framed packets for both
//! printer families (§3, §4.2). Every built packet is exactly 34 bytes,
//! carries the family's magic header, and zeros every byte it does not
//! explicitly document.
//!
//! ## Module Structure
//!
//! - [`kodak`]: Kodak Step family command builders + response parsing.
//! - [`canon`]: Canon Ivy 2 command builders + response parsing, plus the
//!   6-bit battery bit-reversal quirk.
//!
//! ## Reference
//!
//! Byte offsets and bit-reversal behavior are reverse-engineered from
//! device traffic (§4.2); there is no public protocol document.

use crate::error::DriverError;

pub mod canon;
pub mod kodak;

/// Fixed frame length both printer families use (§3).
pub const PACKET_LEN: usize = 34;

/// # Packet
///
/// A 34-byte buffer, stack-allocated (§5 "shared resources"). Both
/// family-specific codecs build and parse packets through this shared
/// shape so the zero-fill and length invariants live in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet(pub [u8; PACKET_LEN]);

impl Packet {
    /// An all-zero 34-byte buffer, ready to be overlaid with a header and
    /// command fields.
    pub fn zeroed() -> Self {
        Self([0u8; PACKET_LEN])
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; PACKET_LEN] {
        &self.0
    }

    /// Consume into the raw bytes (for handing to a `Transport::write`).
    pub fn into_bytes(self) -> [u8; PACKET_LEN] {
        self.0
    }

    /// Parse 34 bytes read off the wire into a `Packet`. Fails with
    /// `ProtocolMismatch` if `bytes` is not exactly `PACKET_LEN` long —
    /// this should not happen if the transport honored `read_exact`, but
    /// is checked here as the last line of defense before family parsing.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DriverError> {
        if bytes.len() != PACKET_LEN {
            return Err(DriverError::ProtocolMismatch(format!(
                "expected a {PACKET_LEN}-byte packet, got {}",
                bytes.len()
            )));
        }
        let mut buf = [0u8; PACKET_LEN];
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }
}

// ============================================================================
// TESTS
// ============================================================================
