//! # Session State Machines
//!
//! Both printer families share the same lifecycle shape (§3, §9) and the
//! same transient-failure recovery sequence (§4.4, §4.5, §7): close the
//! transport, wait six seconds, reopen, redo the init handshake, and let
//! the caller retry its failed operation exactly once.
//!
//! ## Modules
//!
//! - [`kodak`]: `KodakSession` state machine.
//! - [`canon`]: `CanonSession` state machine, plus the auto-disconnect
//!   timer.

use std::thread;
use std::time::Duration;

use crate::error::DriverError;
use crate::transport::Transport;

pub mod canon;
pub mod kodak;

/// Session lifecycle state (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Initialized,
    Printing,
    Failed,
}

/// How long to wait before reopening the transport during recovery
/// (§4.4, §7).
pub const RECOVERY_DELAY: Duration = Duration::from_secs(6);

/// The shared §4.4/§7 recovery sequence. Closes `transport`, waits
/// [`RECOVERY_DELAY`], obtains a fresh transport from `reconnect`, and
/// runs the family-specific `handshake` against it. Returns whatever the
/// handshake returns (each family parses a different response shape out
/// of its init command), or the first error encountered — the caller is
/// responsible for mapping that into a terminal `Failed` transition.
pub fn recover_once<T, R, F, X>(
    transport: &mut T,
    reconnect: &mut R,
    handshake: F,
) -> Result<X, DriverError>
where
    T: Transport,
    R: FnMut() -> Result<T, DriverError>,
    F: FnOnce(&mut T) -> Result<X, DriverError>,
{
    transport.close();
    thread::sleep(RECOVERY_DELAY);
    *transport = reconnect()?;
    handshake(transport)
}

// ============================================================================
// TESTS
// ============================================================================
