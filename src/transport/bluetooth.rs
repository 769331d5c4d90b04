//! # Bluetooth RFCOMM Transport
//!
//! This module provides communication with ESC/POS printers over Bluetooth
//! Serial Port Profile (SPP) via RFCOMM.
//!
//! ## Bluetooth Setup (Linux)
//!
//! Before using this transport, the printer must be paired and bound to an
//! RFCOMM device:
//!
//! ```bash
//! # 1. Find the printer's Bluetooth address
//! $ bluetoothctl
//! [bluetooth]# scan on
//! # Note the address, e.g., 66:22:XX:XX:XX:XX
//!
//! # 2. Pair with the printer
//! [bluetooth]# pair 66:22:XX:XX:XX:XX
//!
//! # 3. Bind to RFCOMM device
//! $ sudo rfcomm bind 0 66:22:XX:XX:XX:XX
//! # This creates /dev/rfcomm0
//! ```
//!
//! ## TTY Configuration
//!
//! The RFCOMM device is opened in raw mode to ensure binary data is
//! transmitted without modification:
//!
//! - **No input processing**: Disable IGNBRK, BRKINT, PARMRK, ISTRIP, etc.
//! - **No output processing**: Disable OPOST (no CR/LF translation)
//! - **8-bit characters**: CS8 (8 data bits, no parity)
//! - **No echo**: Disable ECHO, ECHONL
//! - **Non-canonical mode**: Disable ICANON (no line buffering)
//!
//! Reads use `VMIN = 0` and `VTIME` so a status read returns after the
//! timeout instead of blocking forever.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::debug;

use super::{AbortHandle, Channel, Connection, Connector};
use crate::error::ConnectionError;

/// Default RFCOMM device path
pub const DEFAULT_DEVICE: &str = "/dev/rfcomm0";

pub type BluetoothConnection = Connection<BluetoothConnector>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// Resolved to a bound `/dev/rfcommN` on every connect.
    Address(String),
    Device(PathBuf),
}

/// # Bluetooth Printer Connector
///
/// Opens the RFCOMM TTY of a paired printer.
///
/// ## Example
///
/// ```no_run
/// use recibo::transport::{BluetoothConnector, Connection, Transport};
/// use recibo::protocol::commands;
///
/// let mut printer = Connection::new(BluetoothConnector::address("66:22:B3:01:02:03")?);
/// printer.open()?;
/// printer.write(&commands::init())?;
///
/// # Ok::<(), recibo::error::ReciboError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BluetoothConnector {
    target: Target,
}

impl BluetoothConnector {
    /// Connect to the RFCOMM device bound to `mac` (`XX:XX:XX:XX:XX:XX`).
    pub fn address(mac: &str) -> Result<Self, ConnectionError> {
        if !is_valid_mac(mac) {
            return Err(ConnectionError::DeviceNotFound(format!(
                "{:?} is not a Bluetooth address",
                mac
            )));
        }
        Ok(Self {
            target: Target::Address(mac.to_uppercase()),
        })
    }

    /// Connect to an explicit TTY path such as `/dev/rfcomm0`.
    pub fn device(path: impl Into<PathBuf>) -> Self {
        Self {
            target: Target::Device(path.into()),
        }
    }

    fn resolve(&self) -> Result<PathBuf, ConnectionError> {
        match &self.target {
            Target::Device(path) => Ok(path.clone()),
            Target::Address(mac) => find_rfcomm_for_mac(mac)?.ok_or_else(|| {
                ConnectionError::DeviceNotFound(format!("no RFCOMM device is bound to {}", mac))
            }),
        }
    }
}

impl Default for BluetoothConnector {
    fn default() -> Self {
        Self::device(DEFAULT_DEVICE)
    }
}

impl Connector for BluetoothConnector {
    type Channel = RfcommChannel;

    fn connect(&mut self) -> Result<RfcommChannel, ConnectionError> {
        let path = self.resolve()?;
        debug!(device = %path.display(), "opening RFCOMM device");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    ConnectionError::DeviceNotFound(path.display().to_string())
                }
                _ => ConnectionError::Open(e),
            })?;

        // Configure TTY for raw mode
        configure_tty_raw(file.as_raw_fd()).map_err(ConnectionError::Open)?;

        Ok(RfcommChannel { file })
    }

    fn describe(&self) -> String {
        match &self.target {
            Target::Address(mac) => format!("bluetooth:{}", mac),
            Target::Device(path) => format!("rfcomm:{}", path.display()),
        }
    }
}

/// An open, raw-mode RFCOMM TTY.
#[derive(Debug)]
pub struct RfcommChannel {
    file: File,
}

impl Write for RfcommChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Read for RfcommChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Channel for RfcommChannel {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        configure_read_timeout(self.file.as_raw_fd(), timeout)
    }

    /// Discarding the TTY's queued output frees room for a writer blocked on
    /// a printer that stopped reading.
    fn abort_handle(&self) -> Option<AbortHandle> {
        let file = match self.file.try_clone() {
            Ok(file) => file,
            Err(e) => {
                debug!(error = %e, "RFCOMM device cannot be cloned, interrupts wait for the next write");
                return None;
            }
        };
        Some(Box::new(move || {
            if let Err(e) = discard_pending_io(file.as_raw_fd()) {
                debug!(error = %e, "tcflush failed");
            }
        }))
    }
}

/// `VTIME` is in tenths of a second, 1-255.
fn vtime_deciseconds(timeout: Duration) -> u8 {
    timeout.as_millis().div_ceil(100).clamp(1, 255) as u8
}

/// Configure a file descriptor for raw TTY mode.
///
/// This disables all input/output processing so binary data passes through
/// unmodified. Essential for printer communication.
///
/// ## What Gets Disabled
///
/// - **Input flags**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR, ICRNL, IXON, IXOFF, IXANY
/// - **Output flags**: OPOST
/// - **Local flags**: ECHO, ECHONL, ICANON, ISIG, IEXTEN
/// - **Control flags**: CSIZE, PARENB (then CS8 is set)
///
/// Note: IXON/IXOFF/IXANY disable XON/XOFF software flow control. This is critical
/// because 0x11 (XON/DC1) and 0x13 (XOFF/DC3) can appear in binary raster data.
#[cfg(unix)]
fn configure_tty_raw(fd: i32) -> io::Result<()> {
    update_termios(fd, |termios| {
        termios.c_iflag &= !(libc::IGNBRK
            | libc::BRKINT
            | libc::PARMRK
            | libc::ISTRIP
            | libc::INLCR
            | libc::IGNCR
            | libc::ICRNL
            | libc::IXON
            | libc::IXOFF
            | libc::IXANY);

        termios.c_oflag &= !libc::OPOST;

        termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);

        termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
        termios.c_cflag |= libc::CS8;

        termios.c_cc[libc::VMIN] = 0;
        termios.c_cc[libc::VTIME] = 1;
    })
}

#[cfg(unix)]
fn configure_read_timeout(fd: i32, timeout: Duration) -> io::Result<()> {
    update_termios(fd, |termios| {
        termios.c_cc[libc::VMIN] = 0;
        termios.c_cc[libc::VTIME] = vtime_deciseconds(timeout);
    })
}

#[cfg(unix)]
fn update_termios(fd: i32, update: impl FnOnce(&mut libc::termios)) -> io::Result<()> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    let mut termios = unsafe { termios.assume_init() };

    update(&mut termios);

    // Apply settings immediately
    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(unix)]
fn discard_pending_io(fd: i32) -> io::Result<()> {
    if unsafe { libc::tcflush(fd, libc::TCIOFLUSH) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn discard_pending_io(_fd: i32) -> io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_fd: i32) -> io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn configure_read_timeout(_fd: i32, _timeout: Duration) -> io::Result<()> {
    Ok(())
}

// ============================================================================
// RFCOMM LOOKUP
// ============================================================================

/// Validate a Bluetooth MAC address format (XX:XX:XX:XX:XX:XX).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return false;
    }
    parts
        .iter()
        .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Find the device name on the line of an RFCOMM listing that mentions `mac`.
///
/// Both `/proc/net/rfcomm` and `rfcomm -a` print lines starting with
/// `rfcommN:`.
fn rfcomm_device_in(listing: &str, mac: &str) -> Option<String> {
    let mac_upper = mac.to_uppercase();
    listing
        .lines()
        .filter(|line| line.to_uppercase().contains(&mac_upper))
        .filter_map(|line| line.split(':').next())
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
}

/// Find an existing RFCOMM device bound to the given MAC address.
///
/// Checks `/proc/net/rfcomm` and falls back to the `rfcomm -a` command.
/// Returns the device path (e.g., "/dev/rfcomm0") if found.
pub fn find_rfcomm_for_mac(mac: &str) -> Result<Option<PathBuf>, ConnectionError> {
    let existing = |name: String| {
        let path = Path::new("/dev").join(name);
        path.exists().then_some(path)
    };

    if let Ok(contents) = fs::read_to_string("/proc/net/rfcomm") {
        if let Some(path) = rfcomm_device_in(&contents, mac).and_then(existing) {
            return Ok(Some(path));
        }
    }

    let output = match Command::new("rfcomm").arg("-a").output() {
        Ok(output) => output,
        Err(e) => {
            debug!(error = %e, "could not run 'rfcomm -a'");
            return Ok(None);
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(rfcomm_device_in(&stdout, mac).and_then(existing))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_device_path() {
        assert_eq!(
            BluetoothConnector::default().describe(),
            "rfcomm:/dev/rfcomm0"
        );
    }

    #[test]
    fn test_valid_mac_addresses() {
        assert!(is_valid_mac("00:11:22:33:44:55"));
        assert!(is_valid_mac("AA:BB:CC:DD:EE:FF"));
        assert!(is_valid_mac("aa:bb:cc:dd:ee:ff"));
        assert!(is_valid_mac("00:00:00:00:00:00"));
    }

    #[test]
    fn test_invalid_mac_addresses() {
        assert!(!is_valid_mac("00:11:22:33:44")); // too short
        assert!(!is_valid_mac("00:11:22:33:44:55:66")); // too long
        assert!(!is_valid_mac("00-11-22-33-44-55")); // wrong separator
        assert!(!is_valid_mac("GG:HH:II:JJ:KK:LL")); // invalid hex
        assert!(!is_valid_mac("")); // empty
        assert!(!is_valid_mac("not-a-mac")); // garbage
    }

    #[test]
    fn test_address_is_validated() {
        assert!(matches!(
            BluetoothConnector::address("nope"),
            Err(ConnectionError::DeviceNotFound(_))
        ));
        let connector = BluetoothConnector::address("66:22:b3:01:02:03").unwrap();
        assert_eq!(connector.describe(), "bluetooth:66:22:B3:01:02:03");
    }

    #[test]
    fn test_rfcomm_listing() {
        let proc_listing = "rfcomm0: 00:11:22:33:44:55 channel 1 closed\n\
                            rfcomm1: 66:22:B3:01:02:03 channel 1 clean\n";
        assert_eq!(
            rfcomm_device_in(proc_listing, "66:22:b3:01:02:03"),
            Some("rfcomm1".to_string())
        );
        assert_eq!(rfcomm_device_in(proc_listing, "AA:AA:AA:AA:AA:AA"), None);
    }

    #[test]
    fn test_vtime() {
        assert_eq!(vtime_deciseconds(Duration::ZERO), 1);
        assert_eq!(vtime_deciseconds(Duration::from_millis(2000)), 20);
        assert_eq!(vtime_deciseconds(Duration::from_millis(150)), 2);
        assert_eq!(vtime_deciseconds(Duration::from_secs(60)), 255);
    }

    #[test]
    fn test_missing_device() {
        let mut connector = BluetoothConnector::device("/dev/recibo-does-not-exist");
        assert!(matches!(
            connector.connect(),
            Err(ConnectionError::DeviceNotFound(_))
        ));
    }
}
