//! # Kodak Step Packet Codec
//!
//! Builds and parses the 34-byte packets exchanged with the Kodak Step
//! family (Step, Step Touch, Step Slim, Step Touch Snap 2) over RFCOMM
//! (§4.2).
//!
//! ## Header
//!
//! Every Kodak packet starts with the 4-byte magic `1B 2A 43 41` at bytes
//! 0–3. A response with any other value there is not a Kodak packet and
//! is rejected as `ProtocolMismatch`.
//!
//! ## Command Table
//!
//! | Command | b5 | b6 | b7 | Payload |
//! |---|---|---|---|---|
//! | GetAccessoryInfo | 0/2 | 0x01 | 0x00 | — |
//! | GetBatteryLevel (charging status) | 0 | 0x0E | 0x00 | — |
//! | GetPageType | 0 | 0x0D | 0x00 | — |
//! | GetPrintCount | 0 | 0x00 | 0x01 | — |
//! | GetAutoPowerOff | 0 | 0x10 | 0x00 | — |
//! | PrintReady | 0 | 0x00 | 0x00 | b8–b10 size (BE24), b11 copies |
//! | StartOfSendAck | 0 | 0x01 | 0x00 | b8 = 0x02 |
//! | EndOfReceivedAck | 0 | 0x01 | 0x01 | b8 = 0x02 |
//! | ErrorMessageAck(ec) | 0 | 0x01 | 0x00 | b8 = ec |
//!
//! `b5` is the device-family flag: 0 for Standard, 2 for Slim/Snap 2.
//! Only `GetAccessoryInfo` varies it; every other command sends 0.
//!
//! ## Response Parsing
//!
//! Byte 8 holds the error code (§7) for every response *except*
//! `GetBatteryLevel`'s, where byte 8 is overloaded as a charging flag
//! (1/0), not an error code — this is the one field where the two
//! drafts in the original source disagreed, and byte 12 of
//! `GetAccessoryInfo` (not byte 8 of `GetBatteryLevel`) is authoritative
//! for battery percentage (§9).

use crate::codec::{Packet, PACKET_LEN};
use crate::error::DriverError;
use crate::transport::BluetoothAddress;

/// Kodak magic header (bytes 0–3).
pub const MAGIC: [u8; 4] = [0x1B, 0x2A, 0x43, 0x41];

/// Device family flag sent in byte 5 of most commands (§3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KodakDeviceFamily {
    Standard,
    Slim,
}

impl KodakDeviceFamily {
    fn flag(self) -> u8 {
        match self {
            KodakDeviceFamily::Standard => 0,
            KodakDeviceFamily::Slim => 2,
        }
    }
}

fn header(flags1: u8, family_flag: u8, command: u8, sub_type: u8) -> Packet {
    let mut p = Packet::zeroed();
    p.0[0..4].copy_from_slice(&MAGIC);
    p.0[4] = flags1;
    p.0[5] = family_flag;
    p.0[6] = command;
    p.0[7] = sub_type;
    p
}

/// `GetAccessoryInfo` — the only command whose family flag varies.
pub fn get_accessory_info(family: KodakDeviceFamily) -> Packet {
    header(0, family.flag(), 0x01, 0x00)
}

/// `GetBatteryLevel` — really a charging-status query (§9); the device's
/// actual battery percentage only comes from `GetAccessoryInfo`.
pub fn get_battery_level() -> Packet {
    header(0, 0, 0x0E, 0x00)
}

/// `GetPageType` — paper readiness.
pub fn get_page_type() -> Packet {
    header(0, 0, 0x0D, 0x00)
}

/// `GetPrintCount`.
pub fn get_print_count() -> Packet {
    header(0, 0, 0x00, 0x01)
}

/// `GetAutoPowerOff`.
pub fn get_auto_power_off() -> Packet {
    header(0, 0, 0x10, 0x00)
}

/// `PrintReady(size, copies)`. `size` is the JPEG byte length and must fit
/// in 24 bits: `s <= 2^24 - 1`.
pub fn print_ready(size: u32, copies: u8) -> Result<Packet, DriverError> {
    if size > 0x00FF_FFFF {
        return Err(DriverError::InvalidImage(format!(
            "image size {size} exceeds the 24-bit field PrintReady can carry"
        )));
    }
    let mut p = header(0, 0, 0x00, 0x00);
    p.0[8] = (size >> 16) as u8;
    p.0[9] = (size >> 8) as u8;
    p.0[10] = size as u8;
    p.0[11] = copies;
    Ok(p)
}

/// `StartOfSendAck`. Defined by the protocol but never observed on the
/// happy-path print flow (§9) — retained for completeness.
pub fn start_of_send_ack() -> Packet {
    let mut p = header(0, 0, 0x01, 0x00);
    p.0[8] = 0x02;
    p
}

/// `EndOfReceivedAck`. See `start_of_send_ack` note.
pub fn end_of_received_ack() -> Packet {
    let mut p = header(0, 0, 0x01, 0x01);
    p.0[8] = 0x02;
    p
}

/// `ErrorMessageAck(ec)`. See `start_of_send_ack` note.
pub fn error_message_ack(ec: u8) -> Packet {
    let mut p = header(0, 0, 0x01, 0x00);
    p.0[8] = ec;
    p
}

fn check_magic(resp: &Packet) -> Result<(), DriverError> {
    if resp.0[0..4] != MAGIC {
        return Err(DriverError::ProtocolMismatch(
            "response does not carry the Kodak magic header".to_string(),
        ));
    }
    Ok(())
}

/// Map a Kodak byte-8 error code (§7) to a `DriverError`. `0` means no
/// error (`None`).
pub fn map_error_code(code: u8) -> Option<DriverError> {
    match code {
        0x00 => None,
        0x01 => Some(DriverError::PaperJam),
        0x02 => Some(DriverError::NoPaper),
        0x03 => Some(DriverError::CoverOpen),
        0x04 => Some(DriverError::PaperMismatch),
        0x05 => Some(DriverError::BatteryTooLow),
        0x06 => Some(DriverError::Overheating),
        0x07 => Some(DriverError::Cooling),
        0x08 => Some(DriverError::Misfeed),
        0x09 => Some(DriverError::Busy),
        other => Some(DriverError::ProtocolMismatch(format!(
            "unknown Kodak error code 0x{other:02X}"
        ))),
    }
}

/// The normalized view of a `GetAccessoryInfo` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessoryInfo {
    pub battery_percent: u8,
    pub mac: BluetoothAddress,
}

/// Parse a `GetAccessoryInfo` response. `NoPaper` (byte 8 == 0x02) is
/// returned as `Ok` with the error stashed in the second tuple slot,
/// since the device tolerates paper-absence at init time (§4.4, §9);
/// every other non-zero code is a hard error.
pub fn parse_accessory_info(
    resp: &Packet,
) -> Result<(AccessoryInfo, Option<DriverError>), DriverError> {
    check_magic(resp)?;
    let code = resp.0[8];
    let info = AccessoryInfo {
        battery_percent: resp.0[12],
        mac: BluetoothAddress::from_bytes([
            resp.0[15], resp.0[16], resp.0[17], resp.0[18], resp.0[19], resp.0[20],
        ]),
    };
    match code {
        0x00 => Ok((info, None)),
        0x02 => Ok((info, Some(DriverError::NoPaper))),
        other => Err(map_error_code(other).unwrap()),
    }
}

/// Parse a `GetBatteryLevel` response: byte 8 is a charging flag, not an
/// error code or battery percentage (§9).
pub fn parse_battery_level(resp: &Packet) -> Result<bool, DriverError> {
    check_magic(resp)?;
    Ok(resp.0[8] != 0)
}

/// Parse a `GetPageType` response. Returns `Ok(())` if the device reports
/// no error, or the mapped paper-related `DriverError` otherwise.
pub fn parse_page_type(resp: &Packet) -> Result<(), DriverError> {
    check_magic(resp)?;
    match map_error_code(resp.0[8]) {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

/// Parse a `PrintReady` response's error code.
pub fn parse_print_ready_ack(resp: &Packet) -> Result<(), DriverError> {
    check_magic(resp)?;
    match map_error_code(resp.0[8]) {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

/// Parse a `GetPrintCount` response (big-endian u16 at bytes 8–9).
pub fn parse_print_count(resp: &Packet) -> Result<u16, DriverError> {
    check_magic(resp)?;
    Ok(u16::from_be_bytes([resp.0[8], resp.0[9]]))
}

/// Parse a `GetAutoPowerOff` response (minutes at byte 8).
pub fn parse_auto_power_off(resp: &Packet) -> Result<u8, DriverError> {
    check_magic(resp)?;
    Ok(resp.0[8])
}

// ============================================================================
// TESTS
// ============================================================================
