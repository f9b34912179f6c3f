//! Façade-level scenarios that don't require a live transport:
//! configuration validation, capability gating, and the
//! family-to-`PrinterModel` dispatch (§4.6).

use pretty_assertions::assert_eq;

use zinkdrive::facade::{FacadeConfig, Family, Printer};
use zinkdrive::transport::BluetoothAddress;
use zinkdrive::DriverError;

fn config(family: Family) -> FacadeConfig {
    FacadeConfig {
        address: BluetoothAddress::from_bytes([0xA4, 0x62, 0xDF, 0xA9, 0x72, 0xD4]),
        family,
        ..FacadeConfig::default()
    }
}

#[test]
fn test_canon_info_reports_fixed_print_dimensions_and_capabilities() {
    let printer = Printer::new(config(Family::CanonIvy2)).unwrap();
    let info = printer.info();
    assert_eq!(info.model.print_dimensions, Some((640, 1616)));
    assert!(info.capabilities.reboot);
    assert!(info.capabilities.auto_power_off);
    assert!(!info.capabilities.print_count);
}

#[test]
fn test_kodak_info_reports_no_fixed_dimensions_and_print_count_capability() {
    let printer = Printer::new(config(Family::Kodak)).unwrap();
    let info = printer.info();
    assert!(info.model.print_dimensions.is_none());
    assert!(info.capabilities.print_count);
    assert!(!info.capabilities.reboot);
}

#[test]
fn test_invalid_config_rejected_at_construction() {
    let mut cfg = config(Family::CanonIvy2);
    cfg.min_battery = 200;
    let err = Printer::new(cfg).unwrap_err();
    assert!(matches!(err, DriverError::InvalidArgument(_)));
}

#[test]
fn test_slim_flag_changes_model_name() {
    let mut cfg = config(Family::Kodak);
    cfg.is_slim = true;
    let printer = Printer::new(cfg).unwrap();
    assert_eq!(printer.info().model.name, "Kodak Step Slim");
}

#[test]
fn test_address_round_trips_through_canonical_display() {
    let addr: BluetoothAddress = "A4:62:DF:A9:72:D4".parse().unwrap();
    assert_eq!(addr.to_string(), "A4:62:DF:A9:72:D4");
    assert_eq!(addr.octets(), [0xA4, 0x62, 0xDF, 0xA9, 0x72, 0xD4]);
}

#[test]
fn test_address_parse_rejects_malformed_input() {
    assert!("not-an-address".parse::<BluetoothAddress>().is_err());
    assert!("A4:62:DF:A9:72".parse::<BluetoothAddress>().is_err());
}
