//! # USB Transport
//!
//! USB receipt printers expose a printer-class interface with one bulk OUT
//! endpoint (commands) and usually one bulk IN endpoint (status replies).
//! Endpoints are discovered from the active configuration unless given
//! explicitly.
//!
//! On Linux the `usblp` kernel driver may hold the interface; it is detached
//! automatically where libusb supports it.

use std::fmt;
use std::io::{self, ErrorKind, Read, Write};
use std::time::Duration;

use rusb::{Direction, GlobalContext, TransferType};
use tracing::debug;

use super::{Channel, Connection, Connector};
use crate::error::ConnectionError;

pub const DEFAULT_TRANSFER_TIMEOUT_MS: u64 = 5000;

/// Largest single bulk OUT transfer. Keeps each blocking call short so an
/// interrupt is seen between transfers.
pub const MAX_BULK_WRITE: usize = 4096;

pub type UsbConnection = Connection<UsbConnector>;

/// Connects to a USB printer by vendor and product id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbConnector {
    vendor_id: u16,
    product_id: u16,
    interface: u8,
    out_endpoint: Option<u8>,
    in_endpoint: Option<u8>,
    timeout: Duration,
}

impl UsbConnector {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            interface: 0,
            out_endpoint: None,
            in_endpoint: None,
            timeout: Duration::from_millis(DEFAULT_TRANSFER_TIMEOUT_MS),
        }
    }

    /// Parse `VID:PID` in hex, e.g. `04b8:0202`.
    pub fn parse(ids: &str) -> Result<Self, String> {
        let (vid, pid) = ids
            .split_once(':')
            .ok_or_else(|| format!("Expected VID:PID, got '{}'", ids))?;
        let hex = |s: &str| {
            u16::from_str_radix(s.trim_start_matches("0x"), 16)
                .map_err(|_| format!("Invalid USB id '{}'", s))
        };
        Ok(Self::new(hex(vid)?, hex(pid)?))
    }

    pub fn with_interface(mut self, interface: u8) -> Self {
        self.interface = interface;
        self
    }

    /// Use these endpoint addresses instead of discovering them.
    pub fn with_endpoints(mut self, out_endpoint: u8, in_endpoint: Option<u8>) -> Self {
        self.out_endpoint = Some(out_endpoint);
        self.in_endpoint = in_endpoint;
        self
    }

    /// Limit for a single bulk OUT transfer.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bulk (OUT, IN) endpoint addresses of the configured interface.
    fn discover_endpoints(
        &self,
        device: &rusb::Device<GlobalContext>,
    ) -> Result<(Option<u8>, Option<u8>), ConnectionError> {
        let config = device.active_config_descriptor().map_err(usb_open_error)?;

        let mut out_ep = None;
        let mut in_ep = None;
        for interface in config.interfaces() {
            if interface.number() != self.interface {
                continue;
            }
            for descriptor in interface.descriptors() {
                for endpoint in descriptor.endpoint_descriptors() {
                    if endpoint.transfer_type() != TransferType::Bulk {
                        continue;
                    }
                    match endpoint.direction() {
                        Direction::Out => out_ep = out_ep.or(Some(endpoint.address())),
                        Direction::In => in_ep = in_ep.or(Some(endpoint.address())),
                    }
                }
            }
        }
        Ok((out_ep, in_ep))
    }
}

impl Connector for UsbConnector {
    type Channel = UsbChannel;

    fn connect(&mut self) -> Result<UsbChannel, ConnectionError> {
        let handle = rusb::open_device_with_vid_pid(self.vendor_id, self.product_id)
            .ok_or_else(|| ConnectionError::DeviceNotFound(self.describe()))?;

        let (found_out, found_in) = match self.out_endpoint {
            Some(out_ep) => (Some(out_ep), self.in_endpoint),
            None => self.discover_endpoints(&handle.device())?,
        };
        let out_endpoint = found_out.ok_or_else(|| {
            ConnectionError::DeviceNotFound(format!(
                "{} has no bulk OUT endpoint on interface {}",
                self.describe(),
                self.interface
            ))
        })?;

        // Not supported on every platform
        if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
            debug!(error = %e, "kernel driver auto-detach unavailable");
        }
        handle
            .claim_interface(self.interface)
            .map_err(usb_open_error)?;
        debug!(
            out_endpoint = format_args!("0x{:02x}", out_endpoint),
            in_endpoint = ?found_in,
            "claimed USB interface {}",
            self.interface
        );

        Ok(UsbChannel {
            handle,
            interface: self.interface,
            out_endpoint,
            in_endpoint: found_in,
            write_timeout: self.timeout,
            read_timeout: self.timeout,
        })
    }

    fn describe(&self) -> String {
        format!("usb:{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// A claimed printer interface.
pub struct UsbChannel {
    handle: rusb::DeviceHandle<GlobalContext>,
    interface: u8,
    out_endpoint: u8,
    in_endpoint: Option<u8>,
    write_timeout: Duration,
    read_timeout: Duration,
}

impl fmt::Debug for UsbChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsbChannel")
            .field("interface", &self.interface)
            .field("out_endpoint", &self.out_endpoint)
            .field("in_endpoint", &self.in_endpoint)
            .finish_non_exhaustive()
    }
}

impl Write for UsbChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let len = buf.len().min(MAX_BULK_WRITE);
        self.handle
            .write_bulk(self.out_endpoint, &buf[..len], self.write_timeout)
            .map_err(usb_io_error)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for UsbChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(in_endpoint) = self.in_endpoint else {
            return Err(io::Error::new(
                ErrorKind::Unsupported,
                "printer has no bulk IN endpoint",
            ));
        };
        self.handle
            .read_bulk(in_endpoint, buf, self.read_timeout)
            .map_err(usb_io_error)
    }
}

impl Channel for UsbChannel {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        // libusb treats zero as "wait forever"
        self.read_timeout = timeout.max(Duration::from_millis(1));
        Ok(())
    }
}

impl Drop for UsbChannel {
    fn drop(&mut self) {
        let _ = self.handle.release_interface(self.interface);
    }
}

fn usb_io_error(e: rusb::Error) -> io::Error {
    let kind = match e {
        rusb::Error::Timeout => ErrorKind::TimedOut,
        rusb::Error::Interrupted => ErrorKind::Interrupted,
        rusb::Error::NoDevice => ErrorKind::NotConnected,
        rusb::Error::Access => ErrorKind::PermissionDenied,
        rusb::Error::Pipe => ErrorKind::BrokenPipe,
        rusb::Error::Busy => ErrorKind::ResourceBusy,
        _ => ErrorKind::Other,
    };
    io::Error::new(kind, e)
}

fn usb_open_error(e: rusb::Error) -> ConnectionError {
    match e {
        rusb::Error::NoDevice | rusb::Error::NotFound => ConnectionError::DeviceNotFound(e.to_string()),
        _ => ConnectionError::Open(usb_io_error(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ids() {
        let c = UsbConnector::parse("04b8:0202").unwrap();
        assert_eq!((c.vendor_id, c.product_id), (0x04B8, 0x0202));
        assert_eq!(c.describe(), "usb:04b8:0202");

        let c = UsbConnector::parse("0x0416:0x5011").unwrap();
        assert_eq!((c.vendor_id, c.product_id), (0x0416, 0x5011));

        assert!(UsbConnector::parse("04b8").is_err());
        assert!(UsbConnector::parse("zz:0202").is_err());
    }

    #[test]
    fn test_builder() {
        let c = UsbConnector::new(1, 2)
            .with_interface(1)
            .with_endpoints(0x02, Some(0x81))
            .with_timeout(Duration::from_secs(1));
        assert_eq!(c.interface, 1);
        assert_eq!(c.out_endpoint, Some(0x02));
        assert_eq!(c.in_endpoint, Some(0x81));
        assert_eq!(c.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(usb_io_error(rusb::Error::Timeout).kind(), ErrorKind::TimedOut);
        assert!(matches!(
            usb_open_error(rusb::Error::NoDevice),
            ConnectionError::DeviceNotFound(_)
        ));
        assert!(matches!(
            usb_open_error(rusb::Error::Access),
            ConnectionError::Open(_)
        ));
    }
}
