//! # Canon Ivy 2 Session State Machine
//!
//! Implements the Canon Ivy 2 lifecycle (§4.5): `connect`,
//! `start_session`, `status`, `settings`/`set_auto_power_off`, `reboot`,
//! `print`, plus the 30-second auto-disconnect timer (§5, §9).
//!
//! The timer runs on a dedicated background thread and communicates with
//! the session exclusively through channels — it never touches session
//! state directly (§5 "message-passing to request disconnect rather
//! than modifying session state directly").

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::codec::canon::{self as codec, PrintMode, StatusInfo};
use crate::codec::{Packet, PACKET_LEN};
use crate::error::DriverError;
use crate::session::{self, SessionState};
use crate::status::{PrinterErrorKind, PrinterStatus};
use crate::transport::Transport;

/// Chunk size for the image transfer (§4.5).
pub const CHUNK_SIZE: usize = 990;
/// Delay between chunks during transfer (§4.5, §5).
pub const CHUNK_DELAY: Duration = Duration::from_millis(20);

enum TimerControl {
    Reset,
    Stop,
}

/// A one-shot, resettable auto-disconnect timer (§9). Runs on its own
/// thread; communicates purely by message-passing (§5).
struct AutoDisconnectTimer {
    control_tx: mpsc::Sender<TimerControl>,
    expired_rx: mpsc::Receiver<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl AutoDisconnectTimer {
    fn start(duration: Duration) -> Self {
        let (control_tx, control_rx) = mpsc::channel::<TimerControl>();
        let (expired_tx, expired_rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || loop {
            match control_rx.recv_timeout(duration) {
                Ok(TimerControl::Reset) => continue,
                Ok(TimerControl::Stop) => break,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    let _ = expired_tx.send(());
                    break;
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        });
        Self {
            control_tx,
            expired_rx,
            handle: Some(handle),
        }
    }

    /// Any traffic on the session resets the clock.
    fn reset(&self) {
        let _ = self.control_tx.send(TimerControl::Reset);
    }

    /// Non-blocking check: has the timer fired since we last asked?
    fn poll_expired(&self) -> bool {
        self.expired_rx.try_recv().is_ok()
    }

    fn stop(&mut self) {
        let _ = self.control_tx.send(TimerControl::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AutoDisconnectTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Map a parsed `GetStatus` response onto the single blocking error, if
/// any, in the priority order spec §4.5 step 1 lists them.
fn blocking_error(info: &StatusInfo, min_battery: u8) -> Option<DriverError> {
    if info.error_code != 0 {
        return codec::map_error_code(info.error_code);
    }
    if info.cover_open {
        return Some(DriverError::CoverOpen);
    }
    if info.no_paper {
        return Some(DriverError::NoPaper);
    }
    if info.wrong_smart_sheet {
        return Some(DriverError::WrongSmartSheet);
    }
    if info.battery_percent < min_battery {
        return Some(DriverError::BatteryTooLow);
    }
    None
}

/// The Canon Ivy 2 state machine, generic over its transport and
/// reconnect closure for the same reason as `KodakSession`.
pub struct CanonSession<T, R>
where
    T: Transport,
    R: FnMut() -> Result<T, DriverError>,
{
    transport: T,
    reconnect: R,
    state: SessionState,
    timeout: Duration,
    min_battery: u8,
    battery_percent: u8,
    mtu: u16,
    timer: Option<AutoDisconnectTimer>,
    auto_disconnect: Duration,
}

impl<T, R> CanonSession<T, R>
where
    T: Transport,
    R: FnMut() -> Result<T, DriverError>,
{
    /// `connect()` (§4.5): takes ownership of an already-open transport;
    /// state → `Connected`. Pass `auto_disconnect = Duration::ZERO` to
    /// disable the background timer entirely.
    pub fn connect(
        transport: T,
        reconnect: R,
        timeout: Duration,
        min_battery: u8,
        auto_disconnect: Duration,
    ) -> Self {
        debug!(target: "zinkdrive::session", "canon session connected");
        Self {
            transport,
            reconnect,
            state: SessionState::Connected,
            timeout,
            min_battery,
            battery_percent: 0,
            mtu: 0,
            timer: None,
            auto_disconnect,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mtu(&self) -> u16 {
        self.mtu
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

    /// Non-blocking poll for the auto-disconnect timer having fired.
    /// Every public operation calls this first so an idle session
    /// transitions to `Disconnected` without the caller needing to.
    fn check_auto_disconnect(&mut self) {
        if let Some(timer) = &self.timer {
            if timer.poll_expired() {
                debug!(target: "zinkdrive::session", "canon auto-disconnect fired");
                self.transport.close();
                self.state = SessionState::Disconnected;
                self.timer = None;
            }
        }
    }

    fn touch_timer(&mut self) {
        if self.timer.is_none() && !self.auto_disconnect.is_zero() {
            self.timer = Some(AutoDisconnectTimer::start(self.auto_disconnect));
        } else if let Some(timer) = &self.timer {
            timer.reset();
        }
    }

    fn roundtrip(&mut self, packet: Packet) -> Result<Packet, DriverError> {
        self.transport.write(packet.as_bytes())?;
        let bytes = self.transport.read_exact(PACKET_LEN, self.timeout)?;
        Packet::from_bytes(&bytes)
    }

    /// `start_session()` (§4.5): sends `StartSession`, caches battery and
    /// MTU, state → `Initialized`, (re)arms the auto-disconnect timer.
    pub fn start_session(&mut self) -> Result<(), DriverError> {
        self.require_state(SessionState::Connected)?;
        let resp = self.roundtrip(codec::start_session())?;
        let info = codec::parse_start_session(&resp)?;
        self.battery_percent = info.battery_percent;
        self.mtu = info.mtu;
        self.state = SessionState::Initialized;
        self.touch_timer();
        Ok(())
    }

    /// `status()` (§4.5).
    pub fn status(&mut self) -> Result<PrinterStatus, DriverError> {
        self.check_auto_disconnect();
        self.require_state(SessionState::Initialized)?;
        let info = self.fetch_status()?;
        self.touch_timer();

        let error = blocking_error(&info, self.min_battery);
        Ok(PrinterStatus {
            battery_percent: info.battery_percent,
            is_ready: error.is_none(),
            error: error.as_ref().and_then(PrinterErrorKind::from_driver_error),
            cover_open: Some(info.cover_open),
            no_paper: Some(info.no_paper),
            charging: None,
        })
    }

    fn fetch_status(&mut self) -> Result<StatusInfo, DriverError> {
        let resp = self.roundtrip(codec::get_status())?;
        let info = codec::parse_status(&resp)?;
        self.battery_percent = info.battery_percent;
        Ok(info)
    }

    /// `settings()` read (§4.5): current auto-power-off minutes.
    pub fn auto_power_off(&mut self) -> Result<u8, DriverError> {
        self.check_auto_disconnect();
        self.require_state(SessionState::Initialized)?;
        let resp = self.roundtrip(codec::get_auto_power_off())?;
        let r = codec::parse_response(&resp, codec::Command::SettingAccessory)?;
        self.touch_timer();
        Ok(r.payload[0])
    }

    /// `set_auto_power_off(minutes)` (§4.5); `minutes` must be one of
    /// `{3, 5, 10}`.
    pub fn set_auto_power_off(&mut self, minutes: u8) -> Result<(), DriverError> {
        self.check_auto_disconnect();
        self.require_state(SessionState::Initialized)?;
        let packet = codec::set_auto_power_off(minutes)?;
        let resp = self.roundtrip(packet)?;
        codec::parse_response(&resp, codec::Command::SettingAccessory)?;
        self.touch_timer();
        Ok(())
    }

    /// `reboot()` (§4.5).
    pub fn reboot(&mut self) -> Result<(), DriverError> {
        self.check_auto_disconnect();
        self.require_state(SessionState::Initialized)?;
        let resp = self.roundtrip(codec::reboot())?;
        codec::parse_response(&resp, codec::Command::Reboot)?;
        self.state = SessionState::Disconnected;
        self.transport.close();
        self.timer = None;
        Ok(())
    }

    /// `print(jpeg, copies=1)` (§4.5). On a recoverable transport
    /// failure, attempts the §4.5/§7 recovery sequence once and retries;
    /// a second failure after recovery, or any other transport/protocol
    /// failure, is terminal. A device-reported refusal (`BatteryTooLow`,
    /// `CoverOpen`, …) leaves the session `Initialized` (§7).
    pub fn print(&mut self, jpeg: &[u8], copies: u8) -> Result<(), DriverError> {
        self.check_auto_disconnect();
        self.require_state(SessionState::Initialized)?;

        match self.try_print(jpeg, copies) {
            Ok(()) => {
                self.state = SessionState::Initialized;
                self.touch_timer();
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                warn!(target: "zinkdrive::session", error = %e, "recovering canon session");
                if let Err(e2) = self.recover() {
                    self.state = SessionState::Failed;
                    return Err(e2);
                }
                match self.try_print(jpeg, copies) {
                    Ok(()) => {
                        self.state = SessionState::Initialized;
                        self.touch_timer();
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
                self.touch_timer();
                Err(e)
            }
        }
    }

    fn try_print(&mut self, jpeg: &[u8], copies: u8) -> Result<(), DriverError> {
        self.state = SessionState::Printing;
        let _ = copies; // Canon prints one copy per PrintReady (§4.5).

        let info = self.fetch_status()?;
        if let Some(err) = blocking_error(&info, self.min_battery) {
            return Err(err);
        }

        // Advisory only — the response isn't acted on (§4.5 step 2).
        let _ = self.roundtrip(codec::get_auto_power_off())?;

        let ready = codec::print_ready(jpeg.len() as u32, PrintMode::Normal);
        let ready_resp = self.roundtrip(ready)?;
        codec::parse_response(&ready_resp, codec::Command::PrintReady)?;

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
        let timeout = self.timeout;
        let info = session::recover_once(&mut self.transport, &mut self.reconnect, move |t| {
            t.write(codec::start_session().as_bytes())?;
            let bytes = t.read_exact(PACKET_LEN, timeout)?;
            let resp = Packet::from_bytes(&bytes)?;
            codec::parse_start_session(&resp)
        })?;
        self.battery_percent = info.battery_percent;
        self.mtu = info.mtu;
        self.state = SessionState::Initialized;
        Ok(())
    }

    /// Idempotent; safe to call when already disconnected.
    pub fn close(&mut self) {
        self.transport.close();
        self.state = SessionState::Disconnected;
        self.timer = None;
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, ByteOrder};

    use crate::error::TransportErrorKind;
    use crate::transport::mock::MockTransport;

    fn start_session_response(battery_raw: u16, mtu: u16) -> Vec<u8> {
        let mut raw = [0u8; PACKET_LEN];
        BigEndian::write_u16(&mut raw[0..2], codec::MAGIC);
        BigEndian::write_u16(&mut raw[5..7], codec::Command::StartSession.code());
        BigEndian::write_u16(&mut raw[9..11], battery_raw);
        BigEndian::write_u16(&mut raw[11..13], mtu);
        raw.to_vec()
    }

    fn status_response(battery_raw: u16, queue: u16, error_code: u8) -> Vec<u8> {
        let mut raw = [0u8; PACKET_LEN];
        BigEndian::write_u16(&mut raw[0..2], codec::MAGIC);
        BigEndian::write_u16(&mut raw[5..7], codec::Command::GetStatus.code());
        raw[7] = error_code;
        BigEndian::write_u16(&mut raw[8..10], battery_raw);
        BigEndian::write_u16(&mut raw[12..14], queue);
        raw.to_vec()
    }

    fn never_reconnect() -> impl FnMut() -> Result<MockTransport, DriverError> {
        || Err(DriverError::Transport(TransportErrorKind::Unreachable))
    }

    #[test]
    fn test_start_session_caches_battery_and_mtu() {
        let mut t = MockTransport::new();
        t.push_response(start_session_response(0b0011_0100, 990));
        let mut session =
            CanonSession::connect(t, never_reconnect(), Duration::from_millis(50), 30, Duration::ZERO);

        session.start_session().unwrap();
        assert_eq!(session.state(), SessionState::Initialized);
        assert_eq!(session.battery_percent, 0b001011);
        assert_eq!(session.mtu(), 990);
    }

    #[test]
    fn test_print_requires_initialized_state() {
        let t = MockTransport::new();
        let mut session =
            CanonSession::connect(t, never_reconnect(), Duration::from_millis(50), 30, Duration::ZERO);
        let err = session.print(b"\xFF\xD8\xFF\xD9", 1).unwrap_err();
        assert!(matches!(err, DriverError::InvalidState(_)));
    }

    #[test]
    fn test_print_refuses_on_low_battery() {
        let mut t = MockTransport::new();
        t.push_response(start_session_response(0b111111, 990)); // battery 0
        let mut session =
            CanonSession::connect(t, never_reconnect(), Duration::from_millis(50), 30, Duration::ZERO);
        session.start_session().unwrap();

        // low battery: raw low6 = 0 -> decoded battery 0
        session.transport.push_response(status_response(0, 0, 0));
        let err = session.print(b"\xFF\xD8\xFF\xD9", 1).unwrap_err();
        assert!(matches!(err, DriverError::BatteryTooLow));
        assert_eq!(session.state(), SessionState::Initialized);
    }

    #[test]
    fn test_print_refuses_on_cover_open() {
        let mut t = MockTransport::new();
        t.push_response(start_session_response(0b111111, 990));
        let mut session =
            CanonSession::connect(t, never_reconnect(), Duration::from_millis(50), 30, Duration::ZERO);
        session.start_session().unwrap();

        session
            .transport
            .push_response(status_response(0b111111, 0x01, 0));
        let err = session.print(b"\xFF\xD8\xFF\xD9", 1).unwrap_err();
        assert!(matches!(err, DriverError::CoverOpen));
        assert_eq!(session.state(), SessionState::Initialized);
    }

    #[test]
    fn test_print_chunks_at_990_bytes() {
        let mut t = MockTransport::new();
        t.push_response(start_session_response(0b111111, 990));
        let mut session = CanonSession::connect(
            t,
            never_reconnect(),
            Duration::from_millis(200),
            30,
            Duration::ZERO,
        );
        session.start_session().unwrap();

        session
            .transport
            .push_response(status_response(0b111111, 0, 0));
        session
            .transport
            .push_response(ok_auto_power_off_response());
        session
            .transport
            .push_response(print_ready_ack_response());

        let jpeg = vec![0xCDu8; 2000];
        session.print(&jpeg, 1).unwrap();
        assert_eq!(session.state(), SessionState::Initialized);

        let chunk_writes: Vec<_> = session
            .transport
            .writes()
            .iter()
            .filter(|w| w.bytes.len() != PACKET_LEN)
            .collect();
        assert_eq!(chunk_writes.len(), 3);
        assert_eq!(chunk_writes[0].bytes.len(), 990);
        assert_eq!(chunk_writes[1].bytes.len(), 990);
        assert_eq!(chunk_writes[2].bytes.len(), 20);
    }

    fn ok_auto_power_off_response() -> Vec<u8> {
        let mut raw = [0u8; PACKET_LEN];
        BigEndian::write_u16(&mut raw[0..2], codec::MAGIC);
        BigEndian::write_u16(&mut raw[5..7], codec::Command::SettingAccessory.code());
        raw.to_vec()
    }

    fn print_ready_ack_response() -> Vec<u8> {
        let mut raw = [0u8; PACKET_LEN];
        BigEndian::write_u16(&mut raw[0..2], codec::MAGIC);
        BigEndian::write_u16(&mut raw[5..7], codec::Command::PrintReady.code());
        raw.to_vec()
    }

    #[test]
    fn test_reboot_closes_session() {
        let mut t = MockTransport::new();
        t.push_response(start_session_response(0b111111, 990));
        let mut session =
            CanonSession::connect(t, never_reconnect(), Duration::from_millis(50), 30, Duration::ZERO);
        session.start_session().unwrap();

        let mut reboot_ack = [0u8; PACKET_LEN];
        BigEndian::write_u16(&mut reboot_ack[0..2], codec::MAGIC);
        BigEndian::write_u16(&mut reboot_ack[5..7], codec::Command::Reboot.code());
        session.transport.push_response(reboot_ack.to_vec());

        session.reboot().unwrap();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(!session.transport.is_connected());
    }

    #[test]
    fn test_close_is_idempotent() {
        let t = MockTransport::new();
        let mut session =
            CanonSession::connect(t, never_reconnect(), Duration::from_millis(50), 30, Duration::ZERO);
        session.close();
        session.close();
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_auto_disconnect_timer_fires_and_closes_session() {
        let mut t = MockTransport::new();
        t.push_response(start_session_response(0b111111, 990));
        let mut session = CanonSession::connect(
            t,
            never_reconnect(),
            Duration::from_millis(50),
            30,
            Duration::from_millis(30),
        );
        session.start_session().unwrap();
        assert_eq!(session.state(), SessionState::Initialized);

        thread::sleep(Duration::from_millis(80));
        session.check_auto_disconnect();
        assert_eq!(session.state(), SessionState::Disconnected);
    }
}
