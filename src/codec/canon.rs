//! # Canon Ivy 2 Packet Codec
//!
//! Builds and parses the 34-byte packets exchanged with the Canon Ivy 2
//! mini photo printer over RFCOMM (§4.2). Unlike the Kodak family, every
//! multi-byte Canon field is big-endian, so this module leans on
//! [`byteorder`] rather than hand-rolled shifts.
//!
//! ## Header
//!
//! | Bytes | Field | Notes |
//! |---|---|---|
//! | 0–1 | magic | `0x430F`, big-endian |
//! | 2–3 | flags1 | signed 16-bit; `-1` for session init, else `1` |
//! | 4 | flags2 | signed 8-bit; `-1` for session init, else `32` |
//! | 5–6 | command | `0x0000` StartSession, `0x0101` GetStatus, `0x0103` SettingAccessory, `0x0301` PrintReady, `0xFFFF` Reboot |
//! | 7 | modifier | 0 = read, 1 = write |
//! | 8–33 | payload | command-specific |
//!
//! ## Response
//!
//! Bytes 5–6 echo the request's command code (the ACK); byte 7 carries
//! the device's error code; bytes 8–33 are the response payload. An
//! echoed command code that does not match the request is a fatal
//! `ProtocolMismatch` (§4.5 "ACK discipline").
//!
//! ## Battery Bit-Reversal
//!
//! The device reports battery percentage as a raw 6-bit value whose bits
//! are in reversed order (§4.2, §8). [`decode_battery_percent`]
//! reproduces this exactly: take the low 6 bits, emit them in reverse
//! bit order. Applying it twice is the identity over 0–63.

use byteorder::{BigEndian, ByteOrder};

use crate::codec::{Packet, PACKET_LEN};
use crate::error::DriverError;

/// Canon magic header (bytes 0–1), big-endian `0x430F`.
pub const MAGIC: u16 = 0x430F;

/// Command codes (bytes 5–6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartSession,
    GetStatus,
    SettingAccessory,
    PrintReady,
    Reboot,
}

impl Command {
    /// The wire command code this variant encodes to (bytes 5–6, §4.2).
    pub fn code(self) -> u16 {
        match self {
            Command::StartSession => 0x0000,
            Command::GetStatus => 0x0101,
            Command::SettingAccessory => 0x0103,
            Command::PrintReady => 0x0301,
            Command::Reboot => 0xFFFF,
        }
    }
}

/// `PrintReady` byte 13: which print mode to request. What distinguishes
/// the two modes on-device is undocumented (§9); this crate always sends
/// `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    Normal = 1,
    Alternate = 2,
}

fn header(flags1: i16, flags2: i8, command: Command, modifier: u8) -> Packet {
    let mut p = Packet::zeroed();
    BigEndian::write_u16(&mut p.0[0..2], MAGIC);
    BigEndian::write_i16(&mut p.0[2..4], flags1);
    p.0[4] = flags2 as u8;
    BigEndian::write_u16(&mut p.0[5..7], command.code());
    p.0[7] = modifier;
    p
}

/// `StartSession`: the only command using the `-1/-1` flag pair, all-zero
/// payload, modifier 0 (§4.5).
pub fn start_session() -> Packet {
    header(-1, -1, Command::StartSession, 0)
}

/// `GetStatus`: a read, modifier 0.
pub fn get_status() -> Packet {
    header(1, 32, Command::GetStatus, 0)
}

/// `SettingAccessory` read (auto-power-off query).
pub fn get_auto_power_off() -> Packet {
    header(1, 32, Command::SettingAccessory, 0)
}

/// `SettingAccessory` write (auto-power-off set). `minutes` must be one
/// of `{3, 5, 10}` (§4.5).
pub fn set_auto_power_off(minutes: u8) -> Result<Packet, DriverError> {
    if ![3, 5, 10].contains(&minutes) {
        return Err(DriverError::InvalidArgument(format!(
            "auto_power_off minutes must be 3, 5, or 10, got {minutes}"
        )));
    }
    let mut p = header(1, 32, Command::SettingAccessory, 1);
    p.0[8] = minutes;
    Ok(p)
}

/// `PrintReady(length, mode)`. `length` is the JPEG byte length, sent as
/// a big-endian 32-bit integer.
pub fn print_ready(length: u32, mode: PrintMode) -> Packet {
    let mut p = header(1, 32, Command::PrintReady, 1);
    BigEndian::write_u32(&mut p.0[8..12], length);
    p.0[12] = 1;
    p.0[13] = mode as u8;
    p
}

/// `Reboot`: modifier 1, byte 8 = 1 (§4.5).
pub fn reboot() -> Packet {
    let mut p = header(1, 32, Command::Reboot, 1);
    p.0[8] = 1;
    p
}

/// A parsed Canon response: the echoed command, the device's error code
/// (0 = none), and the raw payload bytes.
#[derive(Debug, Clone, Copy)]
pub struct Response {
    pub error_code: u8,
    pub payload: [u8; PACKET_LEN - 8],
}

/// Parse a response and verify it ACKs `expected`. A bad magic or a
/// mismatched command echo is `ProtocolMismatch` and fatal (§4.5).
pub fn parse_response(resp: &Packet, expected: Command) -> Result<Response, DriverError> {
    let magic = BigEndian::read_u16(&resp.0[0..2]);
    if magic != MAGIC {
        return Err(DriverError::ProtocolMismatch(
            "response does not carry the Canon magic header".to_string(),
        ));
    }
    let echoed = BigEndian::read_u16(&resp.0[5..7]);
    if echoed != expected.code() {
        return Err(DriverError::ProtocolMismatch(format!(
            "response echoed command 0x{echoed:04X}, expected 0x{:04X}",
            expected.code()
        )));
    }
    let mut payload = [0u8; PACKET_LEN - 8];
    payload.copy_from_slice(&resp.0[8..PACKET_LEN]);
    Ok(Response {
        error_code: resp.0[7],
        payload,
    })
}

/// Reverse the low 6 bits of `raw`, yielding a value in 0–63. This
/// exactly reproduces the device's battery-percentage encoding quirk
/// (§4.2, §8); applying it twice is the identity.
pub fn decode_battery_percent(raw: u16) -> u8 {
    let low6 = (raw & 0x3F) as u8;
    let mut out = 0u8;
    for i in 0..6 {
        if low6 & (1 << i) != 0 {
            out |= 1 << (5 - i);
        }
    }
    out
}

/// The normalized result of a `StartSession` response: battery and MTU
/// (§4.5).
#[derive(Debug, Clone, Copy)]
pub struct SessionInfo {
    pub battery_percent: u8,
    pub mtu: u16,
}

/// Parse a `StartSession` response. Battery is bytes 9–10 (payload
/// indices 1–2) via bit-reversal; MTU is bytes 11–12 (payload indices
/// 3–4), big-endian.
pub fn parse_start_session(resp: &Packet) -> Result<SessionInfo, DriverError> {
    let r = parse_response(resp, Command::StartSession)?;
    let raw_battery = BigEndian::read_u16(&r.payload[1..3]);
    let mtu = BigEndian::read_u16(&r.payload[3..5]);
    Ok(SessionInfo {
        battery_percent: decode_battery_percent(raw_battery),
        mtu,
    })
}

/// The normalized result of a `GetStatus` response (§4.5).
#[derive(Debug, Clone, Copy)]
pub struct StatusInfo {
    pub battery_percent: u8,
    pub usb_connected: bool,
    pub error_code: u8,
    pub cover_open: bool,
    pub no_paper: bool,
    pub wrong_smart_sheet: bool,
}

/// Parse a `GetStatus` response. Battery/USB come from bytes 8–9
/// (payload indices 0–1); queue flags from bytes 12–13 (payload indices
/// 4–5): `0x01` cover open, `0x02` no paper, `0x10` wrong smart sheet.
pub fn parse_status(resp: &Packet) -> Result<StatusInfo, DriverError> {
    let r = parse_response(resp, Command::GetStatus)?;
    let raw_battery = BigEndian::read_u16(&r.payload[0..2]);
    let queue = BigEndian::read_u16(&r.payload[4..6]);
    Ok(StatusInfo {
        battery_percent: decode_battery_percent(raw_battery),
        usb_connected: raw_battery & 0x8000 != 0,
        error_code: r.error_code,
        cover_open: queue & 0x01 != 0,
        no_paper: queue & 0x02 != 0,
        wrong_smart_sheet: queue & 0x10 != 0,
    })
}

/// Map a Canon `error_code` (response byte 7) to a `DriverError`. `0`
/// means no error.
pub fn map_error_code(code: u8) -> Option<DriverError> {
    match code {
        0x00 => None,
        other => Some(DriverError::ProtocolMismatch(format!(
            "Canon device reported error code 0x{other:02X}"
        ))),
    }
}

// ============================================================================
// TESTS
// ============================================================================
