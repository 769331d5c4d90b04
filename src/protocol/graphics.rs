//! # ESC/POS Raster Graphics
//!
//! Raster bit images are sent with `GS v 0`, the command every ESC/POS
//! printer since the TM-T88 understands.
//!
//! ## Bit Packing
//!
//! Graphics data is packed as bytes where each bit represents one dot:
//! - Bit 7 (MSB) = leftmost dot
//! - Bit 0 (LSB) = rightmost dot
//! - 1 = black (print), 0 = white (no print)
//!
//! ```text
//! Byte value 0xF0 = 11110000 = ████░░░░
//! Byte value 0x0F = 00001111 = ░░░░████
//! Byte value 0xAA = 10101010 = █░█░█░█░
//! ```
//!
//! ## Common Print Widths
//!
//! | Paper | Dots | Bytes per row |
//! |-------|------|---------------|
//! | 58mm | 384 | 48 |
//! | 80mm | 576 | 72 |

use serde::{Deserialize, Serialize};

use super::commands::{GS, u16_le};

/// Size of the `GS v 0` header preceding the raster data.
pub const RASTER_HEADER_LEN: usize = 8;

/// Raster scaling mode (the `m` parameter of `GS v 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RasterScale {
    #[default]
    Normal = 0,
    DoubleWidth = 1,
    DoubleHeight = 2,
    Quadruple = 3,
}

impl RasterScale {
    /// Horizontal magnification applied by the printer.
    pub fn x_factor(self) -> u32 {
        match self {
            RasterScale::DoubleWidth | RasterScale::Quadruple => 2,
            RasterScale::Normal | RasterScale::DoubleHeight => 1,
        }
    }

    /// Decode the `m` byte of a raster header.
    pub fn from_byte(m: u8) -> Option<Self> {
        match m {
            0 | 48 => Some(RasterScale::Normal),
            1 | 49 => Some(RasterScale::DoubleWidth),
            2 | 50 => Some(RasterScale::DoubleHeight),
            3 | 51 => Some(RasterScale::Quadruple),
            _ => None,
        }
    }
}

/// # Print Raster Bit Image (GS v 0 m xL xH yL yH d1...dk)
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | GS v 0 m xL xH yL yH d1...dk |
/// | Hex     | 1D 76 30 m xL xH yL yH d1...dk |
///
/// ## Parameters
///
/// - `m`: scale (0 normal, 1 double width, 2 double height, 3 both)
/// - `xL, xH`: width in **bytes**, little-endian
/// - `yL, yH`: height in dots, little-endian
/// - `d1...dk`: k = width_bytes × height
///
/// ## Example
///
/// ```
/// use recibo::protocol::graphics::{raster, RasterScale};
///
/// let cmd = raster(24, 1, RasterScale::Normal, &[0xFF, 0xFF, 0xFF]);
/// assert_eq!(cmd, vec![0x1D, 0x76, 0x30, 0x00, 3, 0, 1, 0, 0xFF, 0xFF, 0xFF]);
/// ```
pub fn raster(width_dots: u16, height: u16, scale: RasterScale, data: &[u8]) -> Vec<u8> {
    let width_bytes = width_dots.div_ceil(8);
    let expected_len = width_bytes as usize * height as usize;

    debug_assert!(
        data.len() == expected_len,
        "Raster data length mismatch. Expected {} ({} bytes × {} rows), got {}",
        expected_len,
        width_bytes,
        height,
        data.len()
    );

    let [xl, xh] = u16_le(width_bytes);
    let [yl, yh] = u16_le(height);

    let mut cmd = Vec::with_capacity(RASTER_HEADER_LEN + data.len());
    cmd.push(GS);
    cmd.push(b'v');
    cmd.push(b'0');
    cmd.push(scale as u8);
    cmd.push(xl);
    cmd.push(xh);
    cmd.push(yl);
    cmd.push(yh);
    cmd.extend_from_slice(data);
    cmd
}

/// Decoded `GS v 0` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterHeader {
    pub scale: RasterScale,
    pub width_bytes: u16,
    pub height: u16,
}

impl RasterHeader {
    /// Width in dots covered by the packed data.
    pub fn width_dots(&self) -> u32 {
        self.width_bytes as u32 * 8
    }

    /// Number of data bytes following the header.
    pub fn data_len(&self) -> usize {
        self.width_bytes as usize * self.height as usize
    }
}

/// Parse a `GS v 0` header from the start of `bytes`.
///
/// Returns `None` if the bytes do not start with a raster command.
pub fn parse_raster_header(bytes: &[u8]) -> Option<RasterHeader> {
    match bytes {
        [GS, b'v', b'0', m, xl, xh, yl, yh, ..] => Some(RasterHeader {
            scale: RasterScale::from_byte(*m)?,
            width_bytes: u16::from_le_bytes([*xl, *xh]),
            height: u16::from_le_bytes([*yl, *yh]),
        }),
        _ => None,
    }
}

// ============================================================================
// TESTS
// ============================================================================
