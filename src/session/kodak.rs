//! # Kodak Step Session State Machine
//!
//! Implements the Kodak Step family lifecycle (§4.4): `connect`,
//! `initialize`, `status`, `print`, each enforcing the state machine and
//! falling back to the shared §4.4/§7 recovery sequence on a transient
//! transport failure.

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::codec::kodak as codec;
pub use crate::codec::kodak::KodakDeviceFamily;
use crate::codec::{Packet, PACKET_LEN};
use crate::error::DriverError;
use crate::session::{self, SessionState};
use crate::status::{PrinterErrorKind, PrinterStatus};
use crate::transport::Transport;

/// Chunk size for the image transfer (§4.4).
pub const CHUNK_SIZE: usize = 4096;
/// Delay between chunks during transfer (§4.4, §5).
pub const CHUNK_DELAY: Duration = Duration::from_millis(20);
/// Delay after `initialize` completes, before the session is usable
/// (§4.4).
const POST_INIT_DELAY: Duration = Duration::from_millis(500);

/// The Kodak Step state machine. Generic over its transport (`T`) and
/// over the closure (`R`) used to obtain a fresh transport during
/// recovery, so it can run against a real `RfcommTransport` or a
/// `MockTransport` with no trait-object overhead.
pub struct KodakSession<T, R>
where
    T: Transport,
    R: FnMut() -> Result<T, DriverError>,
{
    transport: T,
    reconnect: R,
    state: SessionState,
    family: KodakDeviceFamily,
    timeout: Duration,
    min_battery: u8,
    battery_percent: u8,
    init_error: Option<DriverError>,
}

impl<T, R> KodakSession<T, R>
where
    T: Transport,
    R: FnMut() -> Result<T, DriverError>,
{
    /// `connect()` (§4.4): takes ownership of an already-open transport;
    /// state → `Connected`.
    pub fn connect(
        transport: T,
        reconnect: R,
        family: KodakDeviceFamily,
        timeout: Duration,
        min_battery: u8,
    ) -> Self {
        debug!(target: "zinkdrive::session", ?family, "kodak session connected");
        Self {
            transport,
            reconnect,
            state: SessionState::Connected,
            family,
            timeout,
            min_battery,
            battery_percent: 0,
            init_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn require_state(&self, expected: SessionState) -> Result<(), DriverError> {
        if self.state != expected {
            return Err(DriverError::InvalidState(format!(
                "operation requires session state {expected:?}, was {:?}",
                self.state
            )));
        }
        Ok(())
    }

    fn roundtrip(&mut self, packet: Packet) -> Result<Packet, DriverError> {
        self.transport.write(packet.as_bytes())?;
        let bytes = self.transport.read_exact(PACKET_LEN, self.timeout)?;
        Packet::from_bytes(&bytes)
    }

    /// `initialize(is_slim)` (§4.4): sends `GetAccessoryInfo` with the
    /// matching family flag, caches battery and any tolerated `NoPaper`
    /// condition, sleeps 500 ms, state → `Initialized`.
    pub fn initialize(&mut self) -> Result<(), DriverError> {
        self.require_state(SessionState::Connected)?;
        let (info, tolerated) = self.run_accessory_info()?;
        self.battery_percent = info.battery_percent;
        self.init_error = tolerated;
        self.state = SessionState::Initialized;
        thread::sleep(POST_INIT_DELAY);
        Ok(())
    }

    fn run_accessory_info(
        &mut self,
    ) -> Result<(codec::AccessoryInfo, Option<DriverError>), DriverError> {
        let resp = self.roundtrip(codec::get_accessory_info(self.family))?;
        codec::parse_accessory_info(&resp)
    }

    /// `status()` (§4.4): battery from the cached accessory info, a
    /// fresh charging flag and paper readiness.
    pub fn status(&mut self) -> Result<PrinterStatus, DriverError> {
        self.require_state(SessionState::Initialized)?;
        let charging = {
            let resp = self.roundtrip(codec::get_battery_level())?;
            codec::parse_battery_level(&resp)?
        };
        let paper_error = {
            let resp = self.roundtrip(codec::get_page_type())?;
            codec::parse_page_type(&resp).err()
        };

        let is_no_paper = matches!(paper_error, Some(DriverError::NoPaper));
        let error = paper_error.as_ref().or(self.init_error.as_ref());
        let is_ready = error.is_none() && self.battery_percent >= self.min_battery;

        Ok(PrinterStatus {
            battery_percent: self.battery_percent,
            is_ready,
            error: error.and_then(PrinterErrorKind::from_driver_error),
            cover_open: None,
            no_paper: Some(is_no_paper),
            charging: Some(charging),
        })
    }

    /// `GetPrintCount` (§4.2): the device's cumulative print counter.
    /// Exposed as the `print_count` capability (§4.6).
    pub fn print_count(&mut self) -> Result<u16, DriverError> {
        self.require_state(SessionState::Initialized)?;
        let resp = self.roundtrip(codec::get_print_count())?;
        codec::parse_print_count(&resp)
    }

    /// `print(jpeg, copies)` (§4.4). On a recoverable transport failure,
    /// attempts the §4.4/§7 recovery sequence once and retries; a second
    /// failure after recovery, or any other transport/protocol failure,
    /// is terminal. A device-reported refusal (`BatteryTooLow`,
    /// `NoPaper`, …) leaves the session `Initialized` — the caller sees
    /// the typed error with device state otherwise unchanged (§7).
    pub fn print(&mut self, jpeg: &[u8], copies: u8) -> Result<(), DriverError> {
        self.require_state(SessionState::Initialized)?;

        match self.try_print(jpeg, copies) {
            Ok(()) => {
                self.state = SessionState::Initialized;
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                warn!(target: "zinkdrive::session", error = %e, "recovering kodak session");
                if let Err(e2) = self.recover() {
                    self.state = SessionState::Failed;
                    return Err(e2);
                }
                match self.try_print(jpeg, copies) {
                    Ok(()) => {
                        self.state = SessionState::Initialized;
                        Ok(())
                    }
                    Err(e2) => {
                        self.state = SessionState::Failed;
                        Err(e2)
                    }
                }
            }
            Err(e) if e.poisons_session() => {
                self.state = SessionState::Failed;
                Err(e)
            }
            Err(e) => {
                self.state = SessionState::Initialized;
                Err(e)
            }
        }
    }

    fn try_print(&mut self, jpeg: &[u8], copies: u8) -> Result<(), DriverError> {
        self.state = SessionState::Printing;

        let (info, _) = self.run_accessory_info()?;
        self.battery_percent = info.battery_percent;
        if self.battery_percent < self.min_battery {
            return Err(DriverError::BatteryTooLow);
        }

        let page_resp = self.roundtrip(codec::get_page_type())?;
        codec::parse_page_type(&page_resp)?;

        let ready = codec::print_ready(jpeg.len() as u32, copies)?;
        let ready_resp = self.roundtrip(ready)?;
        codec::parse_print_ready_ack(&ready_resp)?;

        let total_chunks = jpeg.chunks(CHUNK_SIZE).count().max(1);
        for (i, chunk) in jpeg.chunks(CHUNK_SIZE).enumerate() {
            self.transport.write(chunk)?;
            if i + 1 < total_chunks {
                thread::sleep(CHUNK_DELAY);
            }
        }

        Ok(())
    }

    fn recover(&mut self) -> Result<(), DriverError> {
        let family = self.family;
        let timeout = self.timeout;
        let (info, tolerated) =
            session::recover_once(&mut self.transport, &mut self.reconnect, move |t| {
                t.write(codec::get_accessory_info(family).as_bytes())?;
                let bytes = t.read_exact(PACKET_LEN, timeout)?;
                let resp = Packet::from_bytes(&bytes)?;
                codec::parse_accessory_info(&resp)
            })?;
        self.battery_percent = info.battery_percent;
        self.init_error = tolerated;
        self.state = SessionState::Initialized;
        Ok(())
    }

    /// Idempotent; safe to call when already disconnected.
    pub fn close(&mut self) {
        self.transport.close();
        self.state = SessionState::Disconnected;
    }
}

// ============================================================================
// TESTS
// ============================================================================
