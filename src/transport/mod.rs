//! # Printer Transport Layer
//!
//! This module provides communication backends for sending data to printers.
//!
//! Every medium plugs a [`Connector`] into the same [`Connection`] state
//! machine, so the rules for writing, reading and faulting are identical
//! everywhere:
//!
//! ```text
//!            open()              write/read failure
//! Closed ───────────► Open ─────────────────────────► Faulted
//!   ▲                  │                                 │
//!   └──── close() ─────┘◄──────────── open() ────────────┘
//! ```
//!
//! ## Available Transports
//!
//! - [`bluetooth`]: Bluetooth RFCOMM serial (Linux)
//! - [`tcp`]: raw TCP socket, port 9100 by default
//! - [`usb`]: USB bulk endpoints via libusb
//! - [`memory`]: in-process medium for tests

pub mod bluetooth;
pub mod memory;
pub mod tcp;
pub mod usb;

use std::fmt;
use std::io::{self, ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::error::{ConnectionError, TransportError};

pub use bluetooth::{BluetoothConnection, BluetoothConnector};
pub use memory::{MemoryConnection, MemoryConnector, MemoryProbe};
pub use tcp::{TcpConnection, TcpConnector};
pub use usb::{UsbConnection, UsbConnector};

/// Lifecycle state of a connection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Closed,
    Open,
    /// A write or read failed. Only `open` and `close` are allowed.
    Faulted,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Closed => "closed",
            ConnectionState::Open => "open",
            ConnectionState::Faulted => "faulted",
        })
    }
}

/// A byte pipe to one printer.
pub trait Transport {
    /// Establish the link. Allowed from Closed and Faulted.
    fn open(&mut self) -> Result<(), ConnectionError>;

    /// Send all of `bytes`, returning how many were sent.
    ///
    /// Short writes are retried until everything is sent. Any failure moves
    /// the handle to Faulted and reports how far the write got.
    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError>;

    /// Read up to `max` bytes, waiting at most `timeout`.
    ///
    /// Returns an empty vector if nothing arrived in time.
    fn read_available(&mut self, max: usize, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// Release the link. Always succeeds.
    fn close(&mut self);

    fn state(&self) -> ConnectionState;

    fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// A handle other threads can use to abort an in-flight write.
    fn interrupter(&self) -> Option<Interrupter> {
        None
    }
}

/// Breaks a write that is blocked inside the OS. Called from another thread.
pub type AbortHandle = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct InterruptState {
    fired: AtomicBool,
    abort: Mutex<Option<AbortHandle>>,
}

/// Cancels the write in progress on a connection.
///
/// Firing it aborts the open channel, so a write stuck waiting on the
/// device returns, and fails the current write. The connection is left
/// Faulted.
#[derive(Clone, Default)]
pub struct Interrupter(Arc<InterruptState>);

impl fmt::Debug for Interrupter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupter")
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

impl Interrupter {
    pub fn interrupt(&self) {
        self.0.fired.store(true, Ordering::SeqCst);
        if let Some(abort) = self.abort_slot().as_ref() {
            debug!("aborting channel");
            abort();
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.0.fired.load(Ordering::SeqCst)
    }

    fn abort_slot(&self) -> MutexGuard<'_, Option<AbortHandle>> {
        self.0.abort.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the flag and watch a newly opened channel.
    fn arm(&self, abort: Option<AbortHandle>) {
        *self.abort_slot() = abort;
        self.0.fired.store(false, Ordering::SeqCst);
    }

    fn disarm(&self) {
        *self.abort_slot() = None;
    }
}

fn interrupted() -> io::Error {
    io::Error::new(ErrorKind::Interrupted, "write was interrupted")
}

/// The raw byte stream a [`Connector`] produces.
pub trait Channel: Read + Write + Send {
    /// Bound how long the next `read` may block.
    ///
    /// A read that times out returns `Ok(0)`, or an error of kind
    /// `WouldBlock` or `TimedOut`.
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// A handle that makes a blocked `write` on this channel return.
    ///
    /// Channels whose writes are already bounded return `None`; the
    /// interrupt then takes effect at the next partial write.
    fn abort_handle(&self) -> Option<AbortHandle> {
        None
    }
}

/// Opens channels to one specific device.
pub trait Connector: Send {
    type Channel: Channel;

    fn connect(&mut self) -> Result<Self::Channel, ConnectionError>;

    /// Human readable device address, for logs.
    fn describe(&self) -> String;
}

/// A connection handle owning at most one open channel.
pub struct Connection<C: Connector> {
    connector: C,
    channel: Option<C::Channel>,
    state: ConnectionState,
    interrupter: Interrupter,
}

impl<C: Connector> fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("device", &self.connector.describe())
            .field("state", &self.state)
            .finish()
    }
}

impl<C: Connector> Connection<C> {
    /// A Closed handle. Nothing is opened until [`Transport::open`].
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            channel: None,
            state: ConnectionState::Closed,
            interrupter: Interrupter::default(),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    fn fault(&mut self) {
        self.interrupter.disarm();
        self.channel = None;
        self.state = ConnectionState::Faulted;
    }

    fn open_channel(&mut self) -> Result<&mut C::Channel, ConnectionError> {
        match (self.state, self.channel.as_mut()) {
            (ConnectionState::Open, Some(channel)) => Ok(channel),
            (state, _) => Err(ConnectionError::NotConnected { state }),
        }
    }
}

impl<C: Connector> Transport for Connection<C> {
    fn open(&mut self) -> Result<(), ConnectionError> {
        if self.state == ConnectionState::Open {
            return Err(ConnectionError::AlreadyOpen);
        }

        let device = self.connector.describe();
        debug!(device = %device, from = %self.state, "opening connection");
        let channel = self.connector.connect().inspect_err(|e| {
            warn!(device = %device, error = %e, "connection failed");
        })?;

        self.interrupter.arm(channel.abort_handle());
        self.channel = Some(channel);
        self.state = ConnectionState::Open;
        info!(device = %device, "connected");
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        let interrupter = self.interrupter.clone();
        let channel = self.open_channel()?;

        let mut written = 0;
        let mut result = Ok(());
        while written < bytes.len() {
            if interrupter.is_interrupted() {
                result = Err(interrupted());
                break;
            }
            match channel.write(&bytes[written..]) {
                Ok(0) => {
                    result = Err(io::Error::from(ErrorKind::WriteZero));
                    break;
                }
                Ok(n) => {
                    written += n;
                    trace!(written, requested = bytes.len(), "partial write");
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) if interrupter.is_interrupted() => {
                    result = Err(interrupted());
                    break;
                }
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        if result.is_ok() {
            result = channel.flush();
        }
        // an abort may have let the last write through, but the link is gone
        if result.is_ok() && interrupter.is_interrupted() {
            result = Err(interrupted());
        }

        match result {
            Ok(()) => Ok(written),
            Err(source) => {
                warn!(
                    device = %self.connector.describe(),
                    written,
                    requested = bytes.len(),
                    error = %source,
                    "write failed, connection faulted"
                );
                self.fault();
                Err(TransportError::PartialWriteFailure {
                    written,
                    requested: bytes.len(),
                    source,
                })
            }
        }
    }

    fn read_available(&mut self, max: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let channel = self.open_channel()?;
        if max == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; max];
        let result = channel.set_read_timeout(timeout).and_then(|()| loop {
            match channel.read(&mut buf) {
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    break Ok(0);
                }
                other => break other,
            }
        });

        match result {
            Ok(n) => {
                buf.truncate(n);
                trace!(bytes = n, "read");
                Ok(buf)
            }
            Err(e) => {
                warn!(device = %self.connector.describe(), error = %e, "read failed, connection faulted");
                self.fault();
                Err(TransportError::ReadFailure(e))
            }
        }
    }

    fn close(&mut self) {
        self.interrupter.disarm();
        if self.channel.take().is_some() {
            info!(device = %self.connector.describe(), "disconnected");
        }
        self.state = ConnectionState::Closed;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn interrupter(&self) -> Option<Interrupter> {
        Some(self.interrupter.clone())
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn open(&mut self) -> Result<(), ConnectionError> {
        (**self).open()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        (**self).write(bytes)
    }

    fn read_available(&mut self, max: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        (**self).read_available(max, timeout)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn state(&self) -> ConnectionState {
        (**self).state()
    }

    fn interrupter(&self) -> Option<Interrupter> {
        (**self).interrupter()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self) -> Result<(), ConnectionError> {
        (**self).open()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        (**self).write(bytes)
    }

    fn read_available(&mut self, max: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        (**self).read_available(max, timeout)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn state(&self) -> ConnectionState {
        (**self).state()
    }

    fn interrupter(&self) -> Option<Interrupter> {
        (**self).interrupter()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> (MemoryConnection, MemoryProbe) {
        let probe = MemoryProbe::new();
        (Connection::new(MemoryConnector::new(probe.clone())), probe)
    }

    #[test]
    fn test_never_opened_write_does_no_io() {
        let (mut conn, probe) = connection();
        let err = conn.write(&[0x1B, 0x40]).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Connection(ConnectionError::NotConnected {
                state: ConnectionState::Closed
            })
        ));
        assert_eq!(probe.connects(), 0);
        assert!(probe.writes().is_empty());
    }

    #[test]
    fn test_open_twice() {
        let (mut conn, _) = connection();
        conn.open().unwrap();
        assert!(conn.is_open());
        assert!(matches!(conn.open(), Err(ConnectionError::AlreadyOpen)));
    }

    #[test]
    fn test_short_writes_are_completed() {
        let (mut conn, probe) = connection();
        probe.limit_write_size(3);
        conn.open().unwrap();

        assert_eq!(conn.write(b"abcdefgh").unwrap(), 8);
        assert_eq!(probe.writes(), vec![b"abc".to_vec(), b"def".to_vec(), b"gh".to_vec()]);
        assert_eq!(probe.written(), b"abcdefgh");
    }

    #[test]
    fn test_failure_faults_connection() {
        let (mut conn, probe) = connection();
        probe.fail_after(5);
        conn.open().unwrap();

        match conn.write(b"0123456789") {
            Err(TransportError::PartialWriteFailure {
                written, requested, ..
            }) => {
                assert_eq!(written, 5);
                assert_eq!(requested, 10);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(conn.state(), ConnectionState::Faulted);

        // Faulted handles fail fast
        let writes = probe.writes().len();
        assert!(matches!(
            conn.write(b"x"),
            Err(TransportError::Connection(ConnectionError::NotConnected {
                state: ConnectionState::Faulted
            }))
        ));
        assert_eq!(probe.writes().len(), writes);
    }

    #[test]
    fn test_reopen_after_fault() {
        let (mut conn, probe) = connection();
        probe.fail_after(0);
        conn.open().unwrap();
        assert!(conn.write(b"x").is_err());

        probe.clear_faults();
        conn.open().unwrap();
        assert_eq!(conn.write(b"x").unwrap(), 1);
        assert_eq!(probe.connects(), 2);
    }

    #[test]
    fn test_read_available() {
        let (mut conn, probe) = connection();
        conn.open().unwrap();
        assert!(conn.read_available(1, Duration::from_millis(10)).unwrap().is_empty());

        probe.push_read(&[0x12, 0x16]);
        assert_eq!(conn.read_available(1, Duration::from_millis(10)).unwrap(), vec![0x12]);
        assert_eq!(conn.read_available(8, Duration::from_millis(10)).unwrap(), vec![0x16]);
    }

    #[test]
    fn test_interrupt_fails_write() {
        let (mut conn, probe) = connection();
        conn.open().unwrap();
        let interrupter = conn.interrupter().unwrap();
        interrupter.interrupt();

        assert!(matches!(
            conn.write(b"abc"),
            Err(TransportError::PartialWriteFailure { written: 0, .. })
        ));
        assert_eq!(conn.state(), ConnectionState::Faulted);
        assert!(probe.writes().is_empty());

        // reopening clears the interrupt
        conn.open().unwrap();
        assert!(!interrupter.is_interrupted());
        assert_eq!(conn.write(b"abc").unwrap(), 3);
    }

    /// A channel that counts how often it was aborted.
    struct AbortCounting(Arc<std::sync::atomic::AtomicUsize>);

    impl Write for AbortCounting {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Read for AbortCounting {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    impl Channel for AbortCounting {
        fn set_read_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
            Ok(())
        }

        fn abort_handle(&self) -> Option<AbortHandle> {
            let aborts = self.0.clone();
            Some(Box::new(move || {
                aborts.fetch_add(1, Ordering::SeqCst);
            }))
        }
    }

    struct AbortCountingConnector(Arc<std::sync::atomic::AtomicUsize>);

    impl Connector for AbortCountingConnector {
        type Channel = AbortCounting;

        fn connect(&mut self) -> Result<AbortCounting, ConnectionError> {
            Ok(AbortCounting(self.0.clone()))
        }

        fn describe(&self) -> String {
            "abort-counting".to_string()
        }
    }

    #[test]
    fn test_interrupt_aborts_open_channel() {
        let aborts = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut conn = Connection::new(AbortCountingConnector(aborts.clone()));
        let interrupter = conn.interrupter().unwrap();

        // nothing to abort yet
        interrupter.interrupt();
        assert_eq!(aborts.load(Ordering::SeqCst), 0);

        conn.open().unwrap();
        assert!(!interrupter.is_interrupted());
        interrupter.interrupt();
        assert_eq!(aborts.load(Ordering::SeqCst), 1);
        assert!(matches!(
            conn.write(b"abc"),
            Err(TransportError::PartialWriteFailure { written: 0, ref source, .. })
                if source.kind() == ErrorKind::Interrupted
        ));

        // a faulted handle has released its channel
        interrupter.interrupt();
        assert_eq!(aborts.load(Ordering::SeqCst), 1);

        conn.open().unwrap();
        conn.close();
        interrupter.interrupt();
        assert_eq!(aborts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_connect_failure_keeps_state() {
        let (mut conn, probe) = connection();
        probe.fail_connect(true);
        assert!(matches!(conn.open(), Err(ConnectionError::DeviceNotFound(_))));
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_close_always_succeeds() {
        let (mut conn, _) = connection();
        conn.close();
        assert_eq!(conn.state(), ConnectionState::Closed);
        conn.open().unwrap();
        conn.close();
        assert_eq!(conn.state(), ConnectionState::Closed);
    }
}
