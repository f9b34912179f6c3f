//! # zinkdrive
//!
//! A driver for Zink (zero-ink) mini photo printers reachable over
//! Bluetooth Classic Serial Port Profile (SPP/RFCOMM): the Kodak Step
//! family (Step, Step Touch, Step Slim, Step Touch Snap 2) and the Canon
//! Ivy 2.
//!
//! This crate implements the two wire protocols, their image-transfer
//! state machines, pre-print readiness checks, and the shared error
//! taxonomy. It does not implement Bluetooth discovery/pairing, image
//! cropping/filtering beyond Canon's required geometric transform, or any
//! user interface — those are external collaborators (see
//! [`transport::Transport`] and [`pipeline`]).
//!
//! ## Quick Start
//!
//! ```no_run
//! use zinkdrive::{
//!     facade::{Family, FacadeConfig, Printer},
//!     pipeline::FitMode,
//!     transport::BluetoothAddress,
//! };
//!
//! let config = FacadeConfig {
//!     address: "A4:62:DF:A9:72:D4".parse::<BluetoothAddress>()?,
//!     family: Family::CanonIvy2,
//!     ..FacadeConfig::default()
//! };
//!
//! let mut printer = Printer::new(config)?;
//! printer.open()?;
//!
//! let status = printer.status()?;
//! if status.is_ready {
//!     let jpeg = std::fs::read("photo.jpg")?;
//!     let prepared = printer.prepare_image(&jpeg, FitMode::AutoCrop)?;
//!     printer.print(&prepared, 1)?;
//! }
//! printer.close();
//! # Ok::<(), zinkdrive::error::DriverError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`facade`] | `Printer` entry point: `open`/`status`/`print`/`info`. |
//! | [`session`] | Per-family state machines (`KodakSession`, `CanonSession`). |
//! | [`codec`] | 34-byte packet builders and parsers for both families. |
//! | [`pipeline`] | Canon geometric transform; Kodak JPEG validation. |
//! | [`transport`] | RFCOMM byte-stream backends. |
//! | [`printer`] | Static `PrinterModel` descriptors. |
//! | [`status`] | Normalized `PrinterStatus`. |
//! | [`error`] | Shared error taxonomy. |
//!
//! ## Supported Printers
//!
//! - Kodak Step, Step Touch, Step Slim, Step Touch Snap 2
//! - Canon Ivy 2

pub mod codec;
pub mod error;
pub mod facade;
pub mod pipeline;
pub mod printer;
pub mod session;
pub mod status;
pub mod transport;

pub use error::DriverError;
pub use facade::{Capabilities, FacadeConfig, Family, Printer, PrinterInfo};
pub use printer::PrinterModel;
pub use status::PrinterStatus;
pub use transport::{BluetoothAddress, Transport};
