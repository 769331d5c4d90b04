//! # Real-Time Status Decoding (DLE EOT n)
//!
//! Every reply byte has the fixed pattern `0xx1 0x10`: bits 1 and 4 are set,
//! bits 0 and 7 are clear. A byte that does not match is not a status reply.
//!
//! | n | Bit | Meaning when set |
//! |---|-----|------------------|
//! | 1 | 2 | drawer kick-out connector pin 3 is high |
//! | 1 | 3 | offline |
//! | 2 | 2 | cover is open |
//! | 2 | 5 | printing stopped because the paper ran out |
//! | 2 | 6 | error condition |
//! | 3 | 2 | recoverable error |
//! | 3 | 3 | autocutter error |
//! | 3 | 5 | unrecoverable error |
//! | 3 | 6 | auto-recoverable error |
//! | 4 | 2,3 | paper roll near end |
//! | 4 | 5,6 | paper roll end |

use serde::{Deserialize, Serialize};

use crate::error::DeviceFault;

const FIXED_MASK: u8 = 0x93;
const FIXED_BITS: u8 = 0x12;

/// Which status a `DLE EOT n` request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum StatusKind {
    Printer = 1,
    Offline = 2,
    Error = 3,
    Paper = 4,
}

impl StatusKind {
    /// The `DLE EOT n` request for this status.
    pub fn request(self) -> Vec<u8> {
        super::commands::status_request(self as u8)
    }
}

/// Printer condition merged from one or more status replies.
///
/// Fields not covered by any reply keep their defaults (online, no faults).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub online: bool,
    pub paper_out: bool,
    pub cover_open: bool,
    pub error: bool,
    pub drawer_open: bool,
    pub paper_near_end: bool,
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self {
            online: true,
            paper_out: false,
            cover_open: false,
            error: false,
            drawer_open: false,
            paper_near_end: false,
        }
    }
}

impl DeviceStatus {
    /// Merge one reply byte into the status.
    ///
    /// Returns [`DeviceFault::Unknown`] if the byte is not a status reply.
    pub fn apply(&mut self, kind: StatusKind, byte: u8) -> Result<(), DeviceFault> {
        if byte & FIXED_MASK != FIXED_BITS {
            return Err(DeviceFault::Unknown(format!(
                "malformed status reply 0x{:02X} to DLE EOT {}",
                byte, kind as u8
            )));
        }

        match kind {
            StatusKind::Printer => {
                self.drawer_open = byte & 0x04 != 0;
                self.online = byte & 0x08 == 0;
            }
            StatusKind::Offline => {
                self.cover_open = byte & 0x04 != 0;
                self.paper_out |= byte & 0x20 != 0;
                self.error |= byte & 0x40 != 0;
            }
            StatusKind::Error => {
                self.error |= byte & 0x6C != 0;
            }
            StatusKind::Paper => {
                self.paper_near_end = byte & 0x0C != 0;
                self.paper_out |= byte & 0x60 != 0;
            }
        }
        Ok(())
    }

    /// Decode a single reply into a fresh status.
    pub fn decode(kind: StatusKind, byte: u8) -> Result<Self, DeviceFault> {
        let mut status = Self::default();
        status.apply(kind, byte)?;
        Ok(status)
    }

    /// The fault that should fail a job, if any.
    ///
    /// Paper out wins over an open cover, which wins over a generic error.
    /// Being offline by itself is not a fault; the printer goes offline
    /// while feeding paper.
    pub fn fault(&self) -> Option<DeviceFault> {
        if self.paper_out {
            Some(DeviceFault::PaperOut)
        } else if self.cover_open {
            Some(DeviceFault::CoverOpen)
        } else if self.error {
            Some(DeviceFault::Unknown("printer reported an error condition".to_string()))
        } else {
            None
        }
    }
}
