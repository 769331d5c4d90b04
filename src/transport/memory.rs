//! # In-Memory Transport
//!
//! A medium that never leaves the process. Every channel write is recorded,
//! reads are served from a script, and faults can be injected. A
//! [`MemoryProbe`] is shared between the test and the connector so the test
//! can inspect and steer the connection while it is in use.
//!
//! ```
//! use recibo::transport::{Connection, MemoryConnector, MemoryProbe, Transport};
//!
//! let probe = MemoryProbe::new();
//! let mut conn = Connection::new(MemoryConnector::new(probe.clone()));
//! conn.open().unwrap();
//! conn.write(&[0x1B, 0x40]).unwrap();
//! assert_eq!(probe.written(), vec![0x1B, 0x40]);
//! ```

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{Channel, Connection, Connector};
use crate::error::ConnectionError;

pub type MemoryConnection = Connection<MemoryConnector>;

#[derive(Debug, Default)]
struct Script {
    writes: Vec<Vec<u8>>,
    reads: VecDeque<u8>,
    connects: usize,
    max_write: Option<usize>,
    fail_after: Option<usize>,
    fail_connect: bool,
}

impl Script {
    fn total_written(&self) -> usize {
        self.writes.iter().map(Vec::len).sum()
    }
}

/// Shared view of an in-memory medium.
#[derive(Debug, Clone, Default)]
pub struct MemoryProbe(Arc<Mutex<Script>>);

impl MemoryProbe {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every accepted channel write, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.script().writes.clone()
    }

    /// All accepted bytes, concatenated.
    pub fn written(&self) -> Vec<u8> {
        self.script().writes.concat()
    }

    /// Number of successful connects.
    pub fn connects(&self) -> usize {
        self.script().connects
    }

    /// Queue bytes for the device to "send back".
    pub fn push_read(&self, bytes: &[u8]) {
        self.script().reads.extend(bytes);
    }

    /// Accept at most `n` bytes per write call.
    pub fn limit_write_size(&self, n: usize) {
        self.script().max_write = Some(n.max(1));
    }

    /// Fail every write once `n` bytes in total have been accepted.
    pub fn fail_after(&self, n: usize) {
        self.script().fail_after = Some(n);
    }

    /// Make the next connects fail with `DeviceNotFound`.
    pub fn fail_connect(&self, fail: bool) {
        self.script().fail_connect = fail;
    }

    /// Remove all injected faults. Recorded writes are kept.
    pub fn clear_faults(&self) {
        let mut script = self.script();
        script.max_write = None;
        script.fail_after = None;
        script.fail_connect = false;
    }
}

/// Connector for the in-memory medium.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    probe: MemoryProbe,
}

impl MemoryConnector {
    pub fn new(probe: MemoryProbe) -> Self {
        Self { probe }
    }
}

impl Connector for MemoryConnector {
    type Channel = MemoryChannel;

    fn connect(&mut self) -> Result<MemoryChannel, ConnectionError> {
        let mut script = self.probe.script();
        if script.fail_connect {
            return Err(ConnectionError::DeviceNotFound(self.describe()));
        }
        script.connects += 1;
        Ok(MemoryChannel {
            probe: self.probe.clone(),
        })
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[derive(Debug)]
pub struct MemoryChannel {
    probe: MemoryProbe,
}

impl Write for MemoryChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut script = self.probe.script();

        let mut n = buf.len().min(script.max_write.unwrap_or(usize::MAX));
        if let Some(limit) = script.fail_after {
            let remaining = limit.saturating_sub(script.total_written());
            if remaining == 0 && !buf.is_empty() {
                return Err(io::Error::new(ErrorKind::BrokenPipe, "injected write failure"));
            }
            n = n.min(remaining);
        }
        if n > 0 {
            script.writes.push(buf[..n].to_vec());
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for MemoryChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut script = self.probe.script();
        let n = buf.len().min(script.reads.len());
        for (slot, byte) in buf.iter_mut().zip(script.reads.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Channel for MemoryChannel {
    fn set_read_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }
}
