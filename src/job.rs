//! # Print Job Writer
//!
//! Streams an encoded receipt onto an open [`Transport`] and reports how the
//! job ended.
//!
//! ```text
//! PrintSpec ──encode──► bytes ──chunks──► Transport ──DLE EOT──► DeviceStatus
//!  (Encoding)                  (Writing)              (StatusCheck)
//! ```
//!
//! The writer never retries and never reopens a connection; a failed job
//! says which phase failed and how many bytes had already been sent.
//!
//! ## Example
//!
//! ```
//! use recibo::ir::markup;
//! use recibo::job::{JobResult, PrintJobWriter};
//! use recibo::printer::WriterConfig;
//! use recibo::transport::{Connection, MemoryConnector, MemoryProbe, Transport};
//!
//! let probe = MemoryProbe::new();
//! let mut printer = Connection::new(MemoryConnector::new(probe.clone()));
//! printer.open().unwrap();
//!
//! let writer = PrintJobWriter::new(&WriterConfig::usb());
//! let spec = markup::parse("[C]<b>Thanks!</b>\n").unwrap();
//! match writer.submit(&spec, &mut printer) {
//!     JobResult::Completed(report) => assert_eq!(report.bytes_written, probe.written().len()),
//!     JobResult::Failed(failure) => panic!("{}", failure),
//! }
//! ```

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{ConnectionError, DeviceFault, EncodingError, TransportError};
use crate::ir::{Encoder, PrintSpec};
use crate::printer::WriterConfig;
use crate::protocol::status::DeviceStatus;
use crate::transport::Transport;

/// Where a job was when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobPhase {
    Encoding,
    Writing,
    StatusCheck,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobPhase::Encoding => "encoding",
            JobPhase::Writing => "writing",
            JobPhase::StatusCheck => "checking status",
        })
    }
}

/// Why a job failed.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Transport(TransportError),

    #[error(transparent)]
    Device(#[from] DeviceFault),
}

impl From<TransportError> for JobError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Connection(e) => JobError::Connection(e),
            other => JobError::Transport(other),
        }
    }
}

/// A job that reached the printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub bytes_written: usize,
    pub chunks: usize,
    /// Present when status polling is enabled.
    pub status: Option<DeviceStatus>,
}

#[derive(Debug, Error)]
#[error("print job failed while {phase} after {bytes_written} bytes: {error}")]
pub struct JobFailure {
    pub phase: JobPhase,
    /// Job bytes accepted by the transport before the failure.
    pub bytes_written: usize,
    #[source]
    pub error: JobError,
}

/// Outcome of [`PrintJobWriter::submit`].
#[derive(Debug)]
pub enum JobResult {
    Completed(JobReport),
    Failed(JobFailure),
}

impl JobResult {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobResult::Completed(_))
    }

    pub fn into_result(self) -> Result<JobReport, JobFailure> {
        match self {
            JobResult::Completed(report) => Ok(report),
            JobResult::Failed(failure) => Err(failure),
        }
    }

    fn failed(phase: JobPhase, bytes_written: usize, error: impl Into<JobError>) -> Self {
        JobResult::Failed(JobFailure {
            phase,
            bytes_written,
            error: error.into(),
        })
    }
}

/// Sends print jobs to a printer.
///
/// One writer can serve any number of connections; it holds no connection
/// state of its own. Callers must not submit two jobs to the same
/// connection at once ([`PrintJobWriter::submit_locked`] helps with that).
#[derive(Debug, Clone)]
pub struct PrintJobWriter {
    config: WriterConfig,
    encoder: Encoder,
}

impl PrintJobWriter {
    pub fn new(config: &WriterConfig) -> Self {
        Self::with_encoder(config, Encoder::new(config.profile()))
    }

    /// A writer using a custom encoder (e.g. another symbol generator).
    pub fn with_encoder(config: &WriterConfig, encoder: Encoder) -> Self {
        Self {
            config: config.clone(),
            encoder,
        }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Encode `spec` and send it.
    ///
    /// Nothing is written if encoding fails.
    pub fn submit<T: Transport + ?Sized>(&self, spec: &PrintSpec, transport: &mut T) -> JobResult {
        match self.encoder.encode(spec) {
            Ok(bytes) => self.submit_bytes(&bytes, transport),
            Err(e) => {
                warn!(error = %e, "print job rejected by encoder");
                JobResult::failed(JobPhase::Encoding, 0, e)
            }
        }
    }

    /// Like [`submit`](Self::submit), holding `transport`'s lock for the
    /// whole job including the status poll.
    pub fn submit_locked<T: Transport>(&self, spec: &PrintSpec, transport: &Mutex<T>) -> JobResult {
        let mut guard = transport.lock().unwrap_or_else(PoisonError::into_inner);
        self.submit(spec, &mut *guard)
    }

    /// Send already-encoded bytes.
    pub fn submit_bytes<T: Transport + ?Sized>(&self, bytes: &[u8], transport: &mut T) -> JobResult {
        let chunk_size = self.config.max_chunk_bytes.max(1);
        let delay = Duration::from_millis(self.config.inter_chunk_delay_ms);
        info!(bytes = bytes.len(), chunk_size, "print job started");

        let mut written = 0;
        let mut chunks = 0;
        for chunk in bytes.chunks(chunk_size) {
            if chunks > 0 && !delay.is_zero() {
                thread::sleep(delay);
            }
            match transport.write(chunk) {
                Ok(n) => {
                    written += n;
                    chunks += 1;
                    debug!(chunk = chunks, written, total = bytes.len(), "chunk sent");
                }
                Err(e) => {
                    if let TransportError::PartialWriteFailure { written: partial, .. } = &e {
                        written += partial;
                    }
                    warn!(written, total = bytes.len(), error = %e, "print job failed while writing");
                    return JobResult::failed(JobPhase::Writing, written, e);
                }
            }
        }

        // let the printer work through its buffer before anyone closes the link
        let drain = self.config.drain_time(written);
        if written > 0 && !drain.is_zero() {
            debug!(wait_ms = drain.as_millis() as u64, "waiting for the printer to drain");
            thread::sleep(drain);
        }

        let status = if self.config.query_status {
            match self.query_status(transport) {
                Ok(status) => Some(status),
                Err(e) => return JobResult::failed(JobPhase::StatusCheck, written, e),
            }
        } else {
            None
        };

        if let Some(fault) = status.as_ref().and_then(DeviceStatus::fault) {
            warn!(%fault, "printer reported a fault after the job was sent");
            return JobResult::failed(JobPhase::StatusCheck, written, fault);
        }

        info!(bytes = written, chunks, "print job completed");
        JobResult::Completed(JobReport {
            bytes_written: written,
            chunks,
            status,
        })
    }

    /// Ask for every configured status kind and merge the replies.
    ///
    /// A missing reply is a [`ConnectionError::Timeout`]; a byte that is not
    /// a status reply is a [`DeviceFault::Unknown`]. Faults reported in a
    /// well-formed reply are returned in the status, not as an error.
    pub fn query_status<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<DeviceStatus, JobError> {
        let timeout = Duration::from_millis(self.config.status_timeout_ms);
        let mut status = DeviceStatus::default();

        for &kind in &self.config.status_queries {
            transport.write(&kind.request())?;
            let reply = transport.read_available(1, timeout)?;
            let Some(&byte) = reply.first() else {
                return Err(ConnectionError::Timeout {
                    after_ms: self.config.status_timeout_ms,
                }
                .into());
            };
            debug!(?kind, reply = format_args!("0x{:02X}", byte), "status reply");
            status.apply(kind, byte)?;
        }

        Ok(status)
    }
}
