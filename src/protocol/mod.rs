//! # ESC/POS Protocol Implementation
//!
//! This module provides low-level command builders for the ESC/POS command
//! set understood by most thermal receipt printers (Epson, Xprinter, Rongta,
//! generic 58/80 mm Bluetooth printers).
//!
//! ## Module Structure
//!
//! - [`commands`]: Basic printer commands (init, cut, feed, status request)
//! - [`text`]: Text styling (alignment, emphasis, underline, size, code page)
//! - [`graphics`]: `GS v 0` raster images
//! - [`barcode`]: Native 1D barcodes and QR codes
//! - [`codepage`]: Unicode to single-byte code page conversion
//! - [`status`]: `DLE EOT` status reply decoding
//!
//! ## Usage Example
//!
//! ```
//! use recibo::protocol::{commands, graphics, text};
//! use recibo::protocol::text::Alignment;
//!
//! let mut data = Vec::new();
//! data.extend(commands::init());
//!
//! data.extend(text::align(Alignment::Center));
//! data.extend(text::emphasis(true));
//! data.extend(b"RECEIPT\n");
//! data.extend(text::emphasis(false));
//! data.extend(text::align(Alignment::Left));
//!
//! // A 24-row block of vertical stripes
//! let raster = vec![0xAA; 48 * 24];
//! data.extend(graphics::raster(384, 24, graphics::RasterScale::Normal, &raster));
//!
//! data.extend(commands::feed_lines(3));
//! data.extend(commands::cut(commands::CutMode::Partial));
//! ```

pub mod barcode;
pub mod codepage;
pub mod commands;
pub mod graphics;
pub mod status;
pub mod text;
