//! # Printer Façade
//!
//! The uniform entry point callers use instead of talking to a session
//! state machine directly (§4.6, §9 "polymorphism over printer families").
//! `Printer` is a tagged variant plus dispatch table — not a trait object
//! hierarchy — so each family's extension methods (`reboot`,
//! `set_auto_power_off`) stay behind an explicit capability check rather
//! than a fallible downcast.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DriverError;
use crate::pipeline::{self, FitMode};
use crate::printer::PrinterModel;
use crate::session::canon::CanonSession;
use crate::session::kodak::{KodakDeviceFamily, KodakSession};
use crate::session::SessionState;
use crate::status::PrinterStatus;
use crate::transport::{BluetoothAddress, RfcommTransport, DEFAULT_CHANNEL};

/// Which printer family a [`Printer`] talks to (§1, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    /// Kodak Step family. `is_slim` in [`FacadeConfig`] selects the wire
    /// device-family flag (§4.2).
    Kodak,
    /// Canon Ivy 2.
    CanonIvy2,
}

/// Optional, family-specific operations a caller must check for before
/// invoking (§4.6 "family-specific extensions … exposed as optional
/// capabilities").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// `auto_power_off()` / `set_auto_power_off()` (Canon only).
    pub auto_power_off: bool,
    /// `reboot()` (Canon only).
    pub reboot: bool,
    /// `print_count()` (Kodak only).
    pub print_count: bool,
}

/// Static descriptor returned by [`Printer::info`]: the device's fixed
/// characteristics plus which optional operations it supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrinterInfo {
    pub model: PrinterModel,
    pub capabilities: Capabilities,
}

/// Construction-time configuration (§4.6).
///
/// `chunk_delay_ms` is carried for configuration-surface completeness,
/// but both wire protocols mandate exactly a 20ms inter-chunk floor
/// (§4.4, §4.5) and the session layer enforces that directly;
/// `validate()` rejects any value below it rather than silently
/// overriding the protocol-mandated pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacadeConfig {
    pub address: BluetoothAddress,
    #[serde(default = "default_channel")]
    pub channel: u8,
    pub family: Family,
    #[serde(default)]
    pub is_slim: bool,
    #[serde(default = "default_min_battery")]
    pub min_battery: u8,
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,
    #[serde(default = "default_auto_disconnect_s")]
    pub auto_disconnect_s: u64,
}

fn default_channel() -> u8 {
    DEFAULT_CHANNEL
}
fn default_min_battery() -> u8 {
    30
}
fn default_command_timeout_ms() -> u64 {
    5000
}
fn default_chunk_delay_ms() -> u64 {
    20
}
fn default_auto_disconnect_s() -> u64 {
    30
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            address: BluetoothAddress::from_bytes([0, 0, 0, 0, 0, 0]),
            channel: default_channel(),
            family: Family::CanonIvy2,
            is_slim: false,
            min_battery: default_min_battery(),
            command_timeout_ms: default_command_timeout_ms(),
            chunk_delay_ms: default_chunk_delay_ms(),
            auto_disconnect_s: default_auto_disconnect_s(),
        }
    }
}

impl FacadeConfig {
    /// Validate range constraints, raising `InvalidArgument` the same way
    /// the codec layer does for out-of-range fields (§7).
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.min_battery > 100 {
            return Err(DriverError::InvalidArgument(format!(
                "min_battery must be 0-100, got {}",
                self.min_battery
            )));
        }
        if self.command_timeout_ms == 0 {
            return Err(DriverError::InvalidArgument(
                "command_timeout_ms must be nonzero".to_string(),
            ));
        }
        if self.chunk_delay_ms < 20 {
            return Err(DriverError::InvalidArgument(format!(
                "chunk_delay_ms must be at least the protocol-mandated 20ms, got {}",
                self.chunk_delay_ms
            )));
        }
        Ok(())
    }

    fn model(&self) -> PrinterModel {
        match (self.family, self.is_slim) {
            (Family::Kodak, false) => PrinterModel::KODAK_STEP_STANDARD,
            (Family::Kodak, true) => PrinterModel::KODAK_STEP_SLIM,
            (Family::CanonIvy2, _) => PrinterModel::CANON_IVY2,
        }
    }

    fn capabilities(&self) -> Capabilities {
        match self.family {
            Family::Kodak => Capabilities {
                auto_power_off: false,
                reboot: false,
                print_count: true,
            },
            Family::CanonIvy2 => Capabilities {
                auto_power_off: true,
                reboot: true,
                print_count: false,
            },
        }
    }
}

type Reconnect = Box<dyn FnMut() -> Result<RfcommTransport, DriverError> + Send>;

fn reconnect_closure(address: BluetoothAddress, channel: u8) -> Reconnect {
    Box::new(move || RfcommTransport::open(address, channel))
}

enum Inner {
    Kodak(KodakSession<RfcommTransport, Reconnect>),
    Canon(CanonSession<RfcommTransport, Reconnect>),
}

/// # Printer
///
/// The uniform façade over both printer families (§4.6). Holds the
/// device binding (§3, immutable after construction) and dispatches each
/// operation to the right session type.
pub struct Printer {
    config: FacadeConfig,
    info: PrinterInfo,
    inner: Option<Inner>,
}

impl Printer {
    /// Construct (but do not yet connect) a façade for `config`. The
    /// device binding (`address`, `channel`, `family`) is immutable for
    /// the lifetime of the façade from this point on (§3).
    pub fn new(config: FacadeConfig) -> Result<Self, DriverError> {
        config.validate()?;
        let info = PrinterInfo {
            model: config.model(),
            capabilities: config.capabilities(),
        };
        Ok(Self {
            config,
            info,
            inner: None,
        })
    }

    /// Static descriptor: family, model name, print dimensions, accepted
    /// formats, and which optional capabilities this instance supports
    /// (§4.6).
    pub fn info(&self) -> PrinterInfo {
        self.info
    }

    /// `open()` (§4.6): establishes the transport and runs the family's
    /// init handshake (`GetAccessoryInfo` for Kodak, `StartSession` for
    /// Canon).
    pub fn open(&mut self) -> Result<(), DriverError> {
        let config = &self.config;
        let timeout = Duration::from_millis(config.command_timeout_ms);
        let transport = RfcommTransport::open(config.address, config.channel)?;

        self.inner = Some(match config.family {
            Family::Kodak => {
                let family = if config.is_slim {
                    KodakDeviceFamily::Slim
                } else {
                    KodakDeviceFamily::Standard
                };
                let mut session = KodakSession::connect(
                    transport,
                    reconnect_closure(config.address, config.channel),
                    family,
                    timeout,
                    config.min_battery,
                );
                session.initialize()?;
                Inner::Kodak(session)
            }
            Family::CanonIvy2 => {
                let mut session = CanonSession::connect(
                    transport,
                    reconnect_closure(config.address, config.channel),
                    timeout,
                    config.min_battery,
                    Duration::from_secs(config.auto_disconnect_s),
                );
                session.start_session()?;
                Inner::Canon(session)
            }
        });
        Ok(())
    }

    /// `close()` (§4.6): idempotent.
    pub fn close(&mut self) {
        match &mut self.inner {
            Some(Inner::Kodak(s)) => s.close(),
            Some(Inner::Canon(s)) => s.close(),
            None => {}
        }
    }

    /// `status()` (§4.6, §3).
    pub fn status(&mut self) -> Result<PrinterStatus, DriverError> {
        match &mut self.inner {
            Some(Inner::Kodak(s)) => s.status(),
            Some(Inner::Canon(s)) => s.status(),
            None => Err(DriverError::InvalidState(
                "printer is not open".to_string(),
            )),
        }
    }

    /// `print(jpeg_bytes, copies)` (§4.6). For Canon, `jpeg_bytes` must
    /// already be the pipeline-prepared 640x1616 rotated JPEG (see
    /// [`Printer::prepare_image`]); for Kodak it is validated verbatim.
    pub fn print(&mut self, jpeg_bytes: &[u8], copies: u8) -> Result<(), DriverError> {
        if copies == 0 {
            return Err(DriverError::InvalidArgument(
                "copies must be at least 1".to_string(),
            ));
        }
        match &mut self.inner {
            Some(Inner::Kodak(s)) => {
                pipeline::validate_kodak_image(jpeg_bytes)?;
                s.print(jpeg_bytes, copies)
            }
            Some(Inner::Canon(s)) => s.print(jpeg_bytes, copies),
            None => Err(DriverError::InvalidState(
                "printer is not open".to_string(),
            )),
        }
    }

    /// Run this printer's family-specific image preparation (§4.3). Kodak
    /// only validates; Canon performs the full geometric transform.
    pub fn prepare_image(&self, source: &[u8], fit: FitMode) -> Result<Vec<u8>, DriverError> {
        match self.config.family {
            Family::CanonIvy2 => pipeline::prepare_canon_image(source, fit),
            Family::Kodak => {
                pipeline::validate_kodak_image(source)?;
                Ok(source.to_vec())
            }
        }
    }

    /// Reports the underlying session state, mostly useful for tests and
    /// diagnostics (§3, §9 "state machine").
    pub fn state(&self) -> SessionState {
        match &self.inner {
            Some(Inner::Kodak(s)) => s.state(),
            Some(Inner::Canon(s)) => s.state(),
            None => SessionState::Disconnected,
        }
    }

    /// `GetAutoPowerOff` / Canon `SettingAccessory` read (§4.5). Returns
    /// `InvalidArgument` if `info().capabilities.auto_power_off` is false.
    pub fn auto_power_off(&mut self) -> Result<u8, DriverError> {
        if !self.info.capabilities.auto_power_off {
            return Err(DriverError::InvalidArgument(
                "this printer family does not support auto_power_off".to_string(),
            ));
        }
        match &mut self.inner {
            Some(Inner::Canon(s)) => s.auto_power_off(),
            _ => Err(DriverError::InvalidState(
                "printer is not open".to_string(),
            )),
        }
    }

    /// Canon `SettingAccessory` write (§4.5); `minutes` must be one of
    /// `{3, 5, 10}`.
    pub fn set_auto_power_off(&mut self, minutes: u8) -> Result<(), DriverError> {
        if !self.info.capabilities.auto_power_off {
            return Err(DriverError::InvalidArgument(
                "this printer family does not support auto_power_off".to_string(),
            ));
        }
        match &mut self.inner {
            Some(Inner::Canon(s)) => s.set_auto_power_off(minutes),
            _ => Err(DriverError::InvalidState(
                "printer is not open".to_string(),
            )),
        }
    }

    /// Kodak `GetPrintCount` (§4.2). Returns `InvalidArgument` if
    /// `info().capabilities.print_count` is false.
    pub fn print_count(&mut self) -> Result<u16, DriverError> {
        if !self.info.capabilities.print_count {
            return Err(DriverError::InvalidArgument(
                "this printer family does not support print_count".to_string(),
            ));
        }
        match &mut self.inner {
            Some(Inner::Kodak(s)) => s.print_count(),
            _ => Err(DriverError::InvalidState(
                "printer is not open".to_string(),
            )),
        }
    }

    /// Canon `Reboot` (§4.5).
    pub fn reboot(&mut self) -> Result<(), DriverError> {
        if !self.info.capabilities.reboot {
            return Err(DriverError::InvalidArgument(
                "this printer family does not support reboot".to_string(),
            ));
        }
        match &mut self.inner {
            Some(Inner::Canon(s)) => s.reboot(),
            _ => Err(DriverError::InvalidState(
                "printer is not open".to_string(),
            )),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_spec_defaults() {
        let config = FacadeConfig::default();
        assert_eq!(config.channel, 1);
        assert_eq!(config.min_battery, 30);
        assert_eq!(config.command_timeout_ms, 5000);
        assert_eq!(config.chunk_delay_ms, 20);
        assert_eq!(config.auto_disconnect_s, 30);
    }

    #[test]
    fn test_validate_rejects_out_of_range_min_battery() {
        let mut config = FacadeConfig::default();
        config.min_battery = 101;
        assert!(matches!(
            config.validate(),
            Err(DriverError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_validate_rejects_sub_protocol_chunk_delay() {
        let mut config = FacadeConfig::default();
        config.chunk_delay_ms = 5;
        assert!(matches!(
            config.validate(),
            Err(DriverError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_kodak_capabilities_expose_print_count_not_reboot() {
        let config = FacadeConfig {
            family: Family::Kodak,
            ..FacadeConfig::default()
        };
        let caps = config.capabilities();
        assert!(caps.print_count);
        assert!(!caps.reboot);
        assert!(!caps.auto_power_off);
    }

    #[test]
    fn test_canon_capabilities_expose_reboot_and_auto_power_off() {
        let config = FacadeConfig {
            family: Family::CanonIvy2,
            ..FacadeConfig::default()
        };
        let caps = config.capabilities();
        assert!(caps.reboot);
        assert!(caps.auto_power_off);
        assert!(!caps.print_count);
    }

    #[test]
    fn test_slim_flag_selects_slim_model() {
        let config = FacadeConfig {
            family: Family::Kodak,
            is_slim: true,
            ..FacadeConfig::default()
        };
        assert_eq!(config.model().name, "Kodak Step Slim");
    }

    #[test]
    fn test_unopened_printer_reports_disconnected_state() {
        let config = FacadeConfig::default();
        let printer = Printer::new(config).unwrap();
        assert_eq!(printer.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_unopened_printer_rejects_status_and_print() {
        let config = FacadeConfig::default();
        let mut printer = Printer::new(config).unwrap();
        assert!(matches!(
            printer.status(),
            Err(DriverError::InvalidState(_))
        ));
        assert!(matches!(
            printer.print(b"\xFF\xD8\xFF\xD9", 1),
            Err(DriverError::InvalidState(_))
        ));
    }

    #[test]
    fn test_print_rejects_zero_copies() {
        let config = FacadeConfig::default();
        let mut printer = Printer::new(config).unwrap();
        assert!(matches!(
            printer.print(b"\xFF\xD8\xFF\xD9", 0),
            Err(DriverError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_kodak_printer_gates_canon_only_capabilities() {
        let config = FacadeConfig {
            family: Family::Kodak,
            ..FacadeConfig::default()
        };
        let mut printer = Printer::new(config).unwrap();
        assert!(matches!(
            printer.reboot(),
            Err(DriverError::InvalidArgument(_))
        ));
        assert!(matches!(
            printer.set_auto_power_off(5),
            Err(DriverError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_canon_printer_gates_kodak_only_print_count() {
        let config = FacadeConfig {
            family: Family::CanonIvy2,
            ..FacadeConfig::default()
        };
        let mut printer = Printer::new(config).unwrap();
        assert!(matches!(
            printer.print_count(),
            Err(DriverError::InvalidArgument(_))
        ));
    }
}
