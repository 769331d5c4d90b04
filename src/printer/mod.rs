//! # Printer Module
//!
//! Printer hardware profiles and writer configuration.
//!
//! ## Modules
//!
//! - [`config`]: Capabilities, profiles and the JSON configuration surface

pub mod config;

pub use config::{PrinterCapabilities, PrinterProfile, WriterConfig};
