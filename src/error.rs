//! # Error Types
//!
//! This module defines the error taxonomy shared by both printer families
//! (Kodak Step and Canon Ivy 2). Device-reported error codes from either
//! wire protocol are mapped onto the same set of variants so callers never
//! need to branch on which family they are talking to.

use thiserror::Error;

/// Transport-layer failure kinds (§4.1).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The peer did not respond within the connect timeout.
    #[error("device unreachable")]
    Unreachable,
    /// The OS reports the device is not paired.
    #[error("device not paired")]
    NotPaired,
    /// A read or write failed at the OS level.
    #[error("I/O error")]
    Io,
    /// A read made no progress within the allotted timeout.
    #[error("timed out")]
    Timeout,
    /// The transport was already closed.
    #[error("transport closed")]
    Closed,
}

/// Main error type for `zinkdrive` operations.
///
/// This is the single error type returned by every public operation in
/// this crate (transport, codec, pipeline, session, façade). Device-level
/// failures are surfaced as typed variants rather than strings so callers
/// can match on them directly (see spec §7).
#[derive(Debug, Error)]
pub enum DriverError {
    /// Connection-layer failure (§4.1, §7).
    #[error("transport error: {0}")]
    Transport(TransportErrorKind),

    /// Bad magic, wrong ACK echo, or a short packet (§4.2, §4.4, §4.5).
    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(String),

    /// Battery below `min_battery` at print time.
    #[error("battery too low to print")]
    BatteryTooLow,

    /// Device cover is open.
    #[error("cover open")]
    CoverOpen,
    /// Device is out of paper.
    #[error("no paper loaded")]
    NoPaper,
    /// Paper jam detected.
    #[error("paper jam")]
    PaperJam,
    /// Loaded paper does not match what the job expects.
    #[error("paper mismatch")]
    PaperMismatch,
    /// Paper failed to feed correctly.
    #[error("misfeed")]
    Misfeed,

    /// Device is over its safe operating temperature.
    #[error("device overheating")]
    Overheating,
    /// Device is cooling down after overheating.
    #[error("device cooling")]
    Cooling,

    /// Device refused the request; caller may retry after 10s.
    #[error("device busy")]
    Busy,

    /// Canon-only: calibration sheet missing or invalid.
    #[error("wrong smart sheet")]
    WrongSmartSheet,

    /// Image failed size/format validation (§4.3).
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// A parameter was out of range (e.g. copies=0).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The session received a method call it does not allow in its
    /// current state (§9 "state machine").
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// I/O error wrapper, for the rare case an operation needs the raw
    /// `std::io::Error` (e.g. opening the RFCOMM device node).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// True for the two kinds that trigger the §4.4/§7 six-second
    /// reconnect-and-retry-once recovery sequence.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DriverError::Transport(TransportErrorKind::Timeout)
                | DriverError::Transport(TransportErrorKind::Io)
        )
    }

    /// True for the error kinds that poison a session into `Failed`
    /// (§4.4, §4.5, §7): any transport failure, or a bad ACK/magic
    /// (`ProtocolMismatch`). Device-reported refusals (`BatteryTooLow`,
    /// `NoPaper`, `CoverOpen`, …) and argument/image validation errors
    /// leave the session's device state unchanged (§7 "either the device
    /// accepted the full image … or the caller sees a typed error with
    /// device state unchanged").
    pub fn poisons_session(&self) -> bool {
        matches!(
            self,
            DriverError::Transport(_) | DriverError::ProtocolMismatch(_)
        )
    }
}
