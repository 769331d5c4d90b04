//! # Error Types
//!
//! This module defines the error taxonomy used throughout the recibo library.
//!
//! | Type | Raised by | When |
//! |------|-----------|------|
//! | [`ConnectionError`] | transports | opening, or using a handle that is not open |
//! | [`EncodingError`] | encoder, rasterizer, symbol adapter | before any byte reaches a transport |
//! | [`DeviceFault`] | print job writer | the printer reported a fault in its status |
//! | [`TransportError`] | transports | I/O failed mid-write or mid-read |
//!
//! [`ReciboError`] wraps all of them for callers that do not care which layer
//! failed (the CLI, configuration loading).

use std::io;

use thiserror::Error;

use crate::protocol::codepage::CodePage;
use crate::transport::ConnectionState;

/// Errors opening a connection or using one that is not open.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The handle is Closed or Faulted. No I/O was attempted.
    #[error("not connected (connection is {state})")]
    NotConnected { state: ConnectionState },

    /// `open` was called on a handle that is already Open.
    #[error("connection is already open")]
    AlreadyOpen,

    /// Connecting, or waiting for a status reply, took too long.
    #[error("timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    /// The device address did not resolve to a reachable device.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The medium refused the connection for another reason.
    #[error("failed to open connection: {0}")]
    Open(#[source] io::Error),
}

/// Errors detected while turning a print job into bytes.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// Unknown, unterminated or badly nested markup tag.
    #[error("malformed markup tag `{tag}` at position {position}: {reason}")]
    MalformedMarkup {
        tag: String,
        position: usize,
        reason: &'static str,
    },

    /// A character of a Text command has no representation in the code page.
    #[error(
        "character {character:?} at offset {offset} of command {command} is not representable in {code_page}"
    )]
    UnsupportedCharacter {
        character: char,
        command: usize,
        offset: usize,
        code_page: CodePage,
    },

    /// An image is wider than the printer's print head.
    #[error("image is {width} dots wide but the printer prints at most {max} dots per line")]
    ImageTooWide { width: u32, max: u32 },

    /// A command parameter is out of the range the wire format allows.
    #[error("invalid {command} parameter: {detail}")]
    InvalidParameter {
        command: &'static str,
        detail: String,
    },

    /// Packed raster data does not match its declared dimensions.
    #[error("raster data is {actual} bytes, expected {expected}")]
    InvalidRaster { expected: usize, actual: usize },

    /// The symbol generator could not build a matrix for the data.
    #[error("symbol generation failed: {0}")]
    Symbol(String),
}

/// Faults reported by the printer itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceFault {
    #[error("printer is out of paper")]
    PaperOut,

    #[error("printer cover is open")]
    CoverOpen,

    #[error("printer reported an error: {0}")]
    Unknown(String),
}

/// I/O failures on an open connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The channel failed after accepting `written` of `requested` bytes.
    #[error("write failed after {written} of {requested} bytes: {source}")]
    PartialWriteFailure {
        written: usize,
        requested: usize,
        #[source]
        source: io::Error,
    },

    /// Reading a reply from the device failed.
    #[error("read failed: {0}")]
    ReadFailure(#[source] io::Error),

    /// The handle was not usable in the first place.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Main error type for recibo operations
#[derive(Debug, Error)]
pub enum ReciboError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Device(#[from] DeviceFault),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Job(#[from] crate::job::JobFailure),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Image decoding error
    #[error("Image error: {0}")]
    Image(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
