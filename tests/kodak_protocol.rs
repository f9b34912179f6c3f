//! Cross-module Kodak Step scenarios: a full session lifecycle driven
//! purely through the public API, plus the `GetPrintCount` /
//! `GetAutoPowerOff` accessory queries that no single unit test exercises
//! end-to-end.

use std::time::Duration;

use pretty_assertions::assert_eq;

use zinkdrive::codec::kodak as codec;
use zinkdrive::codec::{Packet, PACKET_LEN};
use zinkdrive::error::DriverError;
use zinkdrive::session::kodak::{KodakDeviceFamily, KodakSession};
use zinkdrive::session::SessionState;
use zinkdrive::transport::MockTransport;
use zinkdrive::Transport;

fn accessory_info_response(battery: u8, mac: [u8; 6]) -> Vec<u8> {
    let mut raw = [0u8; PACKET_LEN];
    raw[0..4].copy_from_slice(&codec::MAGIC);
    raw[12] = battery;
    raw[15..21].copy_from_slice(&mac);
    raw.to_vec()
}

fn ok_response() -> Vec<u8> {
    let mut raw = [0u8; PACKET_LEN];
    raw[0..4].copy_from_slice(&codec::MAGIC);
    raw.to_vec()
}

fn never_reconnect() -> impl FnMut() -> Result<MockTransport, DriverError> {
    || Err(DriverError::Transport(zinkdrive::error::TransportErrorKind::Unreachable))
}

/// Full happy-path lifecycle driven entirely through the public session
/// API: connect, initialize, status, print, close. Every response the
/// session will need is scripted up front, since `MockTransport` is owned
/// exclusively by the session once constructed (§5 "ownership of the byte
/// stream") and cannot be reached into from outside the crate.
#[test]
fn test_full_lifecycle_through_public_api() {
    let mac = [0xA4, 0x62, 0xDF, 0xA9, 0x72, 0xD4];
    let mut transport = MockTransport::new();
    transport.push_response(accessory_info_response(90, mac)); // initialize
    transport.push_response(ok_response()); // status: GetBatteryLevel
    transport.push_response(ok_response()); // status: GetPageType
    transport.push_response(accessory_info_response(90, mac)); // print: battery refresh
    transport.push_response(ok_response()); // print: GetPageType
    transport.push_response(ok_response()); // print: PrintReady ack

    let mut session = KodakSession::connect(
        transport,
        never_reconnect(),
        KodakDeviceFamily::Standard,
        Duration::from_millis(200),
        30,
    );

    session.initialize().unwrap();
    assert_eq!(session.state(), SessionState::Initialized);

    let status = session.status().unwrap();
    assert_eq!(status.battery_percent, 90);
    assert!(status.is_ready);
    assert_eq!(status.charging, Some(false));

    let jpeg = [0xFFu8, 0xD8, 0x00, 0x00, 0xFF, 0xD9];
    session.print(&jpeg, 1).unwrap();
    assert_eq!(session.state(), SessionState::Initialized);

    session.close();
    session.close(); // idempotent
    assert_eq!(session.state(), SessionState::Disconnected);
}

/// `GetPrintCount` and `GetAutoPowerOff`, built and parsed together
/// through a live `Transport`, exercising the big-endian count parse and
/// the single-byte minutes parse in the same roundtrip pattern a session
/// uses internally.
#[test]
fn test_print_count_and_auto_power_off_round_trip() {
    let mut raw_count = [0u8; PACKET_LEN];
    raw_count[0..4].copy_from_slice(&codec::MAGIC);
    raw_count[8] = 0x01;
    raw_count[9] = 0x2C; // 300

    let mut raw_apo = [0u8; PACKET_LEN];
    raw_apo[0..4].copy_from_slice(&codec::MAGIC);
    raw_apo[8] = 5;

    let mut transport = MockTransport::new();
    transport.push_response(raw_count.to_vec());
    transport.push_response(raw_apo.to_vec());

    transport.write(codec::get_print_count().as_bytes()).unwrap();
    let count_resp = transport
        .read_exact(PACKET_LEN, Duration::from_millis(50))
        .unwrap();
    let count = codec::parse_print_count(&Packet::from_bytes(&count_resp).unwrap()).unwrap();
    assert_eq!(count, 300);

    transport
        .write(codec::get_auto_power_off().as_bytes())
        .unwrap();
    let apo_resp = transport
        .read_exact(PACKET_LEN, Duration::from_millis(50))
        .unwrap();
    let minutes = codec::parse_auto_power_off(&Packet::from_bytes(&apo_resp).unwrap()).unwrap();
    assert_eq!(minutes, 5);
}

/// A session stuck in `Connected` rejects `print` before `initialize` is
/// ever called (§9 "state machine").
#[test]
fn test_print_before_initialize_is_invalid_state() {
    let transport = MockTransport::new();
    let mut session = KodakSession::connect(
        transport,
        never_reconnect(),
        KodakDeviceFamily::Slim,
        Duration::from_millis(50),
        30,
    );
    let err = session.print(b"\xFF\xD8\xFF\xD9", 1).unwrap_err();
    assert!(matches!(err, DriverError::InvalidState(_)));
}
