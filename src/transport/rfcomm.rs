//! # Bluetooth RFCOMM Transport
//!
//! This module provides the default [`crate::transport::Transport`]
//! backend: a Bluetooth Classic RFCOMM socket (Serial Port Profile) to an
//! already-paired device (§4.1, §6).
//!
//! ## Socket, not TTY
//!
//! Unlike a `/dev/rfcommN` bound TTY, this opens `AF_BLUETOOTH` /
//! `BTPROTO_RFCOMM` directly against the device's address and channel, so
//! no out-of-band `rfcomm bind` step is required — only pairing, which is
//! explicitly out of scope for this crate (§1) and assumed already done.
//!
//! `libc` does not carry Bluetooth-specific constants, so the handful this
//! module needs (`AF_BLUETOOTH`, `BTPROTO_RFCOMM`, the `sockaddr_rc`
//! layout) are defined locally; they match the Linux BlueZ kernel ABI
//! (`<bluetooth/bluetooth.h>`, `<bluetooth/rfcomm.h>`).
//!
//! ## Read timeouts
//!
//! `read_exact` aggregates partial reads internally and fails with
//! `Transport(Timeout)` if no additional bytes arrive for the caller's
//! timeout, via `SO_RCVTIMEO` plus a stall-tracking loop (a single
//! `SO_RCVTIMEO` read can still return early with a partial chunk).

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::{Duration, Instant};

use crate::error::{DriverError, TransportErrorKind};
use crate::transport::{BluetoothAddress, Transport};

const AF_BLUETOOTH: libc::c_int = 31;
const BTPROTO_RFCOMM: libc::c_int = 3;

/// Connect timeout for `RfcommTransport::open` (§4.1).
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Mirrors `struct sockaddr_rc` from `<bluetooth/rfcomm.h>`.
#[repr(C)]
struct SockaddrRc {
    rc_family: libc::sa_family_t,
    rc_bdaddr: [u8; 6],
    rc_channel: u8,
}

/// # RFCOMM Bluetooth Transport
///
/// Owns one connected RFCOMM socket for the lifetime of a session (§3,
/// §5 "ownership of the byte stream").
pub struct RfcommTransport {
    fd: RawFd,
    connected: bool,
}

impl RfcommTransport {
    /// Open an RFCOMM connection to `address` on `channel` (both families
    /// use channel 1, §3).
    ///
    /// Fails with `Transport(Unreachable)` if the peer does not accept the
    /// connection within 10s, `Transport(NotPaired)` if the OS reports a
    /// pairing-related errno, or `Transport(Io)` for any other socket
    /// failure.
    pub fn open(address: BluetoothAddress, channel: u8) -> Result<Self, DriverError> {
        // SAFETY: a plain socket() call with constant, valid arguments.
        let fd = unsafe { libc::socket(AF_BLUETOOTH, libc::SOCK_STREAM, BTPROTO_RFCOMM) };
        if fd < 0 {
            return Err(DriverError::Transport(TransportErrorKind::Io));
        }

        set_timeout(fd, CONNECT_TIMEOUT, libc::SO_SNDTIMEO)?;

        // Bluetooth addresses go on the wire in reversed octet order;
        // callers of this module always see the canonical big-endian
        // form via `BluetoothAddress`.
        let mut bdaddr = address.octets();
        bdaddr.reverse();

        let addr = SockaddrRc {
            rc_family: AF_BLUETOOTH as libc::sa_family_t,
            rc_bdaddr: bdaddr,
            rc_channel: channel,
        };

        // SAFETY: `addr` is a valid, correctly-sized sockaddr_rc and `fd`
        // is the socket just created above.
        let result = unsafe {
            libc::connect(
                fd,
                &addr as *const SockaddrRc as *const libc::sockaddr,
                std::mem::size_of::<SockaddrRc>() as libc::socklen_t,
            )
        };

        if result != 0 {
            let errno = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(match errno.raw_os_error() {
                Some(libc::ETIMEDOUT) | Some(libc::EHOSTDOWN) | Some(libc::EHOSTUNREACH) => {
                    DriverError::Transport(TransportErrorKind::Unreachable)
                }
                Some(libc::ECONNREFUSED) => DriverError::Transport(TransportErrorKind::NotPaired),
                _ => DriverError::Transport(TransportErrorKind::Io),
            });
        }

        Ok(Self {
            fd,
            connected: true,
        })
    }
}

impl Transport for RfcommTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), DriverError> {
        if !self.connected {
            return Err(DriverError::Transport(TransportErrorKind::Closed));
        }
        let mut written = 0;
        while written < bytes.len() {
            // SAFETY: writing a valid slice's bytes into a live socket fd.
            let n = unsafe {
                libc::write(
                    self.fd,
                    bytes[written..].as_ptr() as *const libc::c_void,
                    bytes.len() - written,
                )
            };
            if n < 0 {
                self.connected = false;
                return Err(DriverError::Transport(TransportErrorKind::Io));
            }
            written += n as usize;
        }
        Ok(())
    }

    fn read_exact(&mut self, n: usize, timeout: Duration) -> Result<Vec<u8>, DriverError> {
        if !self.connected {
            return Err(DriverError::Transport(TransportErrorKind::Closed));
        }
        set_timeout(self.fd, timeout, libc::SO_RCVTIMEO)?;

        let mut buf = vec![0u8; n];
        let mut read = 0;
        let deadline = Instant::now() + timeout;

        while read < n {
            if Instant::now() >= deadline {
                return Err(DriverError::Transport(TransportErrorKind::Timeout));
            }
            // SAFETY: writing into `buf[read..]`, a valid mutable slice
            // within bounds of the allocation.
            let r = unsafe {
                libc::read(
                    self.fd,
                    buf[read..].as_mut_ptr() as *mut libc::c_void,
                    n - read,
                )
            };
            if r < 0 {
                let errno = io::Error::last_os_error();
                if errno.kind() == io::ErrorKind::WouldBlock
                    || errno.kind() == io::ErrorKind::TimedOut
                {
                    return Err(DriverError::Transport(TransportErrorKind::Timeout));
                }
                self.connected = false;
                return Err(DriverError::Transport(TransportErrorKind::Io));
            }
            if r == 0 {
                self.connected = false;
                return Err(DriverError::Transport(TransportErrorKind::Closed));
            }
            read += r as usize;
        }

        Ok(buf)
    }

    fn close(&mut self) {
        if self.connected {
            // SAFETY: closing a valid, open fd exactly once.
            unsafe { libc::close(self.fd) };
            self.connected = false;
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

impl Drop for RfcommTransport {
    fn drop(&mut self) {
        self.close();
    }
}

impl AsRawFd for RfcommTransport {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

fn set_timeout(fd: RawFd, timeout: Duration, which: libc::c_int) -> Result<(), DriverError> {
    let tv = libc::timeval {
        tv_sec: timeout.as_secs() as libc::time_t,
        tv_usec: timeout.subsec_micros() as libc::suseconds_t,
    };
    // SAFETY: `tv` is a valid, correctly-sized timeval and `fd` is owned
    // by the caller for the duration of this call.
    let result = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            which,
            &tv as *const libc::timeval as *const libc::c_void,
            std::mem::size_of::<libc::timeval>() as libc::socklen_t,
        )
    };
    if result != 0 {
        return Err(DriverError::Transport(TransportErrorKind::Io));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sockaddr_rc_layout_size() {
        // rc_family (u16, possibly padded) + 6 address bytes + 1 channel byte.
        assert!(std::mem::size_of::<SockaddrRc>() >= 9);
    }

    #[test]
    fn test_bdaddr_reversal_round_trips() {
        let addr = BluetoothAddress::from_bytes([0xA4, 0x62, 0xDF, 0xA9, 0x72, 0xD4]);
        let mut bdaddr = addr.octets();
        bdaddr.reverse();
        let back = bdaddr;
        let mut back2 = back;
        back2.reverse();
        assert_eq!(back2, addr.octets());
    }
}
