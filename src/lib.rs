//! # Recibo - ESC/POS Receipt Printing Library
//!
//! Recibo composes receipts and delivers them, byte-exact, to ESC/POS
//! thermal printers over Bluetooth, TCP or USB. It provides:
//!
//! - **Encoding**: a command model and markup language compiled to ESC/POS
//! - **Rasterization**: threshold, Floyd-Steinberg and Bayer dithering to 1-bit raster
//! - **Symbols**: native barcode/QR commands or rasterized fallbacks
//! - **Transport**: one connection state machine over several media
//! - **Print jobs**: chunked writes and status polling with typed failures
//!
//! ## Quick Start
//!
//! ```no_run
//! use recibo::{
//!     ir::markup,
//!     job::PrintJobWriter,
//!     printer::WriterConfig,
//!     transport::{Connection, TcpConnector, Transport},
//! };
//!
//! let spec = markup::parse(
//!     "[C]<b>COFFEE SHOP</b>\n\
//!      [L]Latte\n\
//!      [R]3.50\n\
//!      [C]<qrcode size='4'>https://example.com</qrcode>\n",
//! )?;
//!
//! let mut printer = Connection::new(TcpConnector::new("192.168.1.50", 9100));
//! printer.open()?;
//!
//! let writer = PrintJobWriter::new(&WriterConfig::tcp());
//! let report = writer.submit(&spec, &mut printer).into_result()?;
//! println!("sent {} bytes", report.bytes_written);
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`ir`] | Command model, markup parser and encoder |
//! | [`protocol`] | ESC/POS command builders and status decoding |
//! | [`render`] | Rasterization and dithering |
//! | [`symbol`] | Barcode / QR adapter |
//! | [`transport`] | Communication backends |
//! | [`job`] | Print job writer |
//! | [`printer`] | Printer profiles and writer configuration |
//! | [`error`] | Error types |

pub mod error;
pub mod ir;
pub mod job;
pub mod printer;
pub mod protocol;
pub mod render;
pub mod symbol;
pub mod transport;

// Re-exports for convenience
pub use error::ReciboError;
pub use ir::{Command, Encoder, PrintSpec};
pub use job::{JobResult, PrintJobWriter};
pub use printer::{PrinterProfile, WriterConfig};
pub use transport::{Connection, Transport};
