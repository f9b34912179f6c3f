//! # Printer Status
//!
//! The normalized device-readiness view surfaced to callers (§3), plus a
//! serializable tag for the subset of [`DriverError`] that represents a
//! device-reported operating condition rather than a transport or
//! programmer error.

use serde::{Deserialize, Serialize};

use crate::error::DriverError;

/// A `Clone` + `Serialize` stand-in for the device-condition variants of
/// [`DriverError`]. `DriverError` itself wraps `std::io::Error` and
/// carries free-form strings, so it is neither `Clone` nor `Serialize`;
/// `PrinterStatus` needs both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterErrorKind {
    CoverOpen,
    NoPaper,
    PaperJam,
    PaperMismatch,
    Misfeed,
    Overheating,
    Cooling,
    Busy,
    WrongSmartSheet,
    BatteryTooLow,
}

impl PrinterErrorKind {
    /// Map the device-condition variants of `DriverError` onto this
    /// smaller, serializable tag. Transport/protocol/argument errors have
    /// no equivalent here and map to `None` — they are surfaced as `Err`
    /// from the operation that raised them, not stashed in a status.
    pub fn from_driver_error(err: &DriverError) -> Option<Self> {
        match err {
            DriverError::CoverOpen => Some(Self::CoverOpen),
            DriverError::NoPaper => Some(Self::NoPaper),
            DriverError::PaperJam => Some(Self::PaperJam),
            DriverError::PaperMismatch => Some(Self::PaperMismatch),
            DriverError::Misfeed => Some(Self::Misfeed),
            DriverError::Overheating => Some(Self::Overheating),
            DriverError::Cooling => Some(Self::Cooling),
            DriverError::Busy => Some(Self::Busy),
            DriverError::WrongSmartSheet => Some(Self::WrongSmartSheet),
            DriverError::BatteryTooLow => Some(Self::BatteryTooLow),
            _ => None,
        }
    }
}

/// Normalized device status (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterStatus {
    /// 0–100; Canon's raw 6-bit-reversed value is already decoded into
    /// this range by the codec layer.
    pub battery_percent: u8,
    /// True iff no blocking error and battery is at or above the
    /// configured minimum.
    pub is_ready: bool,
    /// The blocking condition, if any.
    pub error: Option<PrinterErrorKind>,
    /// Populated only when the device family reports it.
    pub cover_open: Option<bool>,
    /// Populated only when the device family reports it.
    pub no_paper: Option<bool>,
    /// Populated only when the device family reports it (Kodak only).
    pub charging: Option<bool>,
}

// ============================================================================
// TESTS
// ============================================================================
