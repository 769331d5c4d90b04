//! # ESC/POS Printer Control Commands
//!
//! Basic printer control: initialization, paper feed, cutting, cash drawer
//! and real-time status requests.
//!
//! ## Escape Sequence Structure
//!
//! Commands follow these patterns:
//! - Two bytes: `ESC @`
//! - With parameters: `ESC d n`, `GS V m`, `DLE EOT n`
//!
//! ## Byte Order
//!
//! Multi-byte integers use **little-endian** encoding:
//! - `u16` value 0x1234 is sent as bytes `[0x34, 0x12]`

// ============================================================================
// ESCAPE SEQUENCE CONSTANTS
// ============================================================================

/// ESC (Escape) - Command prefix byte
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - Extended command prefix
///
/// Used for graphics, barcodes, character size and cutting.
pub const GS: u8 = 0x1D;

/// DLE (Data Link Escape) - Real-time command prefix
///
/// `DLE EOT n` is executed by the printer as soon as it is received, even
/// while the print buffer is still full.
pub const DLE: u8 = 0x10;

/// EOT (End Of Transmission) - second byte of the status request
pub const EOT: u8 = 0x04;

/// LF (Line Feed) - Print and advance one line
pub const LF: u8 = 0x0A;

// ============================================================================
// INITIALIZATION COMMANDS
// ============================================================================

/// # Initialize Printer (ESC @)
///
/// Resets the printer to its power-on default state.
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC @ |
/// | Hex     | 1B 40 |
/// | Decimal | 27 64 |
///
/// ## What Gets Reset
///
/// - Print buffer is cleared
/// - Emphasis and underline disabled
/// - Character size reset to 1x1
/// - Alignment reset to left
/// - Character code table reset to page 0 (CP437)
///
/// ## Example
///
/// ```
/// use recibo::protocol::commands;
///
/// assert_eq!(commands::init(), vec![0x1B, 0x40]);
/// ```
#[inline]
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

// ============================================================================
// CUTTER CONTROL COMMANDS
// ============================================================================

/// Cut style for `GS V m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CutMode {
    /// Cut the paper completely.
    #[default]
    Full = 0,
    /// Leave a small uncut hinge.
    Partial = 1,
}

/// # Cut Paper (GS V m)
///
/// ## Protocol Details
///
/// | Format  | Bytes     |
/// |---------|-----------|
/// | ASCII   | GS V m    |
/// | Hex     | 1D 56 m   |
///
/// - `m = 0`: full cut
/// - `m = 1`: partial cut (leaves a hinge so the receipt does not fall)
///
/// ## Example
///
/// ```
/// use recibo::protocol::commands::{cut, CutMode};
///
/// assert_eq!(cut(CutMode::Full), vec![0x1D, 0x56, 0x00]);
/// assert_eq!(cut(CutMode::Partial), vec![0x1D, 0x56, 0x01]);
/// ```
#[inline]
pub fn cut(mode: CutMode) -> Vec<u8> {
    vec![GS, b'V', mode as u8]
}

// ============================================================================
// PAPER FEED COMMANDS
// ============================================================================

/// # Print and Feed n Lines (ESC d n)
///
/// Prints the line buffer and feeds `n` lines at the current line spacing.
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | Hex     | 1B 64 n  |
#[inline]
pub fn feed_lines(n: u8) -> Vec<u8> {
    vec![ESC, b'd', n]
}

/// # Print and Feed n Dots (ESC J n)
///
/// Feeds the paper by `n` motion units (one dot on most 203 DPI printers).
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | Hex     | 1B 4A n  |
///
/// ## Example
///
/// ```
/// use recibo::protocol::commands;
///
/// assert_eq!(commands::feed_dots(65), vec![0x1B, 0x4A, 65]);
/// ```
#[inline]
pub fn feed_dots(n: u8) -> Vec<u8> {
    vec![ESC, b'J', n]
}

// ============================================================================
// CASH DRAWER
// ============================================================================

/// Drawer kick-out connector pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawerPin {
    /// Connector pin 2 (the usual one)
    #[default]
    Pin2 = 0,
    /// Connector pin 5
    Pin5 = 1,
}

/// # Generate Pulse (ESC p m t1 t2)
///
/// Kicks the cash drawer connected to `pin`. The pulse is on for
/// 25 × 2 ms and off for 250 × 2 ms.
///
/// | Format  | Bytes          |
/// |---------|----------------|
/// | Hex     | 1B 70 m 19 FA  |
#[inline]
pub fn open_cash_drawer(pin: DrawerPin) -> Vec<u8> {
    vec![ESC, b'p', pin as u8, 0x19, 0xFA]
}

// ============================================================================
// REAL-TIME STATUS
// ============================================================================

/// # Transmit Real-Time Status (DLE EOT n)
///
/// | n | Status |
/// |---|--------|
/// | 1 | printer (online, drawer) |
/// | 2 | offline cause (cover, paper end) |
/// | 3 | error cause (cutter, unrecoverable) |
/// | 4 | paper roll sensor |
///
/// The printer answers with a single status byte.
///
/// ```
/// use recibo::protocol::commands;
///
/// assert_eq!(commands::status_request(4), vec![0x10, 0x04, 0x04]);
/// ```
#[inline]
pub fn status_request(n: u8) -> Vec<u8> {
    vec![DLE, EOT, n]
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Encode a u16 value as little-endian bytes [low, high]
///
/// ## Example
///
/// ```
/// use recibo::protocol::commands::u16_le;
///
/// assert_eq!(u16_le(0x1234), [0x34, 0x12]);
/// assert_eq!(u16_le(576), [0x40, 0x02]);
/// ```
#[inline]
pub const fn u16_le(value: u16) -> [u8; 2] {
    [value as u8, (value >> 8) as u8]
}

/// Parse a hexadecimal command string into bytes.
///
/// Accepts space- or comma-separated pairs with optional `0x` prefixes, or a
/// contiguous run of hex digits: `"1B 40"`, `"1B40"`, `"0x1B,0x40"`.
/// Returns `None` on any non-hex content or an odd number of digits.
pub fn parse_hex(input: &str) -> Option<Vec<u8>> {
    let mut digits = String::with_capacity(input.len());
    for token in input.split(|c: char| c.is_whitespace() || c == ',') {
        if token.is_empty() {
            continue;
        }
        let token = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        if token.is_empty() || !token.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        // A lone digit inside a separated list is a single byte ("0xA")
        if token.len() == 1 {
            digits.push('0');
        }
        digits.push_str(token);
    }

    if digits.is_empty() || digits.len() % 2 != 0 {
        return None;
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).ok())
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        assert_eq!(init(), vec![0x1B, 0x40]);
    }

    #[test]
    fn test_cut() {
        assert_eq!(cut(CutMode::Full), vec![0x1D, 0x56, 0x00]);
        assert_eq!(cut(CutMode::Partial), vec![0x1D, 0x56, 0x01]);
    }

    #[test]
    fn test_feed_lines() {
        assert_eq!(feed_lines(0), vec![0x1B, 0x64, 0x00]);
        assert_eq!(feed_lines(3), vec![0x1B, 0x64, 0x03]);
        assert_eq!(feed_lines(255), vec![0x1B, 0x64, 0xFF]);
    }

    #[test]
    fn test_feed_dots() {
        assert_eq!(feed_dots(12), vec![0x1B, 0x4A, 0x0C]);
    }

    #[test]
    fn test_cash_drawer() {
        assert_eq!(
            open_cash_drawer(DrawerPin::Pin2),
            vec![0x1B, 0x70, 0x00, 0x19, 0xFA]
        );
        assert_eq!(open_cash_drawer(DrawerPin::Pin5)[2], 0x01);
    }

    #[test]
    fn test_status_request() {
        assert_eq!(status_request(1), vec![0x10, 0x04, 0x01]);
        assert_eq!(status_request(2), vec![0x10, 0x04, 0x02]);
    }

    #[test]
    fn test_u16_le() {
        assert_eq!(u16_le(0x0000), [0x00, 0x00]);
        assert_eq!(u16_le(0x00FF), [0xFF, 0x00]);
        assert_eq!(u16_le(0xFF00), [0x00, 0xFF]);
        assert_eq!(u16_le(384), [0x80, 0x01]);
    }

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(parse_hex("1B 40"), Some(vec![0x1B, 0x40]));
        assert_eq!(parse_hex("1B40"), Some(vec![0x1B, 0x40]));
        assert_eq!(parse_hex("0x1B,0x40"), Some(vec![0x1B, 0x40]));
        assert_eq!(parse_hex("  1b  61 1 "), Some(vec![0x1B, 0x61, 0x01]));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert_eq!(parse_hex(""), None);
        assert_eq!(parse_hex("1B4"), None);
        assert_eq!(parse_hex("ZZ"), None);
        assert_eq!(parse_hex("0x"), None);
    }
}
