//! # ESC/POS Text Styling Commands
//!
//! | Style | Command | Effect |
//! |-------|---------|--------|
//! | Alignment | ESC a n | left / center / right |
//! | Emphasis | ESC E n | **bold** text |
//! | Underline | ESC - n | 1 or 2 dot underline |
//! | Size | GS ! n | 1x-8x width and height |
//! | Code page | ESC t n | character table for bytes 0x80-0xFF |
//!
//! ## Text Alignment
//!
//! ```text
//! Left aligned (default)    |LEFT TEXT
//! Center aligned            |  CENTER TEXT
//! Right aligned             |      RIGHT TEXT
//! ```

use serde::{Deserialize, Serialize};

use super::codepage::CodePage;
use super::commands::{ESC, GS};

// ============================================================================
// TEXT ALIGNMENT
// ============================================================================

/// Text alignment options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

/// # Select Justification (ESC a n)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC a n |
/// | Hex     | 1B 61 n |
///
/// - `n = 0`: Left alignment (default)
/// - `n = 1`: Center alignment
/// - `n = 2`: Right alignment
///
/// Takes effect at the start of the next line. Raster images and barcodes
/// are aligned too.
///
/// ```
/// use recibo::protocol::text::{align, Alignment};
///
/// assert_eq!(align(Alignment::Center), vec![0x1B, 0x61, 0x01]);
/// ```
pub fn align(alignment: Alignment) -> Vec<u8> {
    vec![ESC, b'a', alignment as u8]
}

// ============================================================================
// EMPHASIS
// ============================================================================

/// # Turn Emphasized Mode On/Off (ESC E n)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | Hex     | 1B 45 n |
///
/// ```
/// use recibo::protocol::text::emphasis;
///
/// assert_eq!(emphasis(true), vec![0x1B, 0x45, 0x01]);
/// assert_eq!(emphasis(false), vec![0x1B, 0x45, 0x00]);
/// ```
pub fn emphasis(enabled: bool) -> Vec<u8> {
    vec![ESC, b'E', u8::from(enabled)]
}

// ============================================================================
// UNDERLINE
// ============================================================================

/// Underline thickness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Underline {
    #[default]
    Off = 0,
    /// 1-dot underline
    Single = 1,
    /// 2-dot underline
    Double = 2,
}

impl From<bool> for Underline {
    fn from(enabled: bool) -> Self {
        if enabled {
            Underline::Single
        } else {
            Underline::Off
        }
    }
}

/// # Turn Underline Mode On/Off (ESC - n)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | Hex     | 1B 2D n |
///
/// - `n = 0`: off
/// - `n = 1`: 1-dot thick
/// - `n = 2`: 2-dot thick
pub fn underline(mode: Underline) -> Vec<u8> {
    vec![ESC, b'-', mode as u8]
}

// ============================================================================
// CHARACTER SIZE
// ============================================================================

/// # Select Character Size (GS ! n)
///
/// Width and height multipliers (1-8) are packed into one byte:
///
/// ```text
/// bit  7 6 5 4 | 3 2 1 0
///      width-1 | height-1
/// ```
///
/// | Format  | Bytes |
/// |---------|-------|
/// | Hex     | 1D 21 n |
///
/// Callers validate the range; values are masked to 3 bits here.
///
/// ```
/// use recibo::protocol::text::size;
///
/// assert_eq!(size(1, 1), vec![0x1D, 0x21, 0x00]);
/// assert_eq!(size(2, 2), vec![0x1D, 0x21, 0x11]);
/// assert_eq!(size(2, 1), vec![0x1D, 0x21, 0x10]); // wide
/// assert_eq!(size(1, 2), vec![0x1D, 0x21, 0x01]); // tall
/// ```
pub fn size(width: u8, height: u8) -> Vec<u8> {
    let w = width.saturating_sub(1) & 0x07;
    let h = height.saturating_sub(1) & 0x07;
    vec![GS, b'!', (w << 4) | h]
}

// ============================================================================
// CODE PAGE SELECTION
// ============================================================================

/// # Select Character Code Table (ESC t n)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | Hex     | 1B 74 n |
///
/// ```
/// use recibo::protocol::codepage::CodePage;
/// use recibo::protocol::text::codepage;
///
/// assert_eq!(codepage(CodePage::Wpc1252), vec![0x1B, 0x74, 16]);
/// ```
pub fn codepage(cp: CodePage) -> Vec<u8> {
    vec![ESC, b't', cp.table_number()]
}

// ============================================================================
// TESTS
// ============================================================================
