//! # Printer Configuration
//!
//! Hardware characteristics of the target printer and the limits the print
//! job writer obeys when streaming bytes to it.
//!
//! ## Printer Presets
//!
//! | Preset | Paper | Print width | Resolution |
//! |--------|-------|-------------|------------|
//! | `MM58` | 58mm | 48mm (384 dots) | 203 DPI |
//! | `MM80` | 80mm | 72mm (576 dots) | 203 DPI |
//!
//! ## Medium Presets
//!
//! | Medium | Chunk | Delay | Drain rate |
//! |--------|-------|-------|------------|
//! | Bluetooth | 200 bytes | 20 ms | 8 bytes/ms |
//! | USB | 256 bytes | none | 16 bytes/ms |
//! | TCP | 16 KiB | none | 16 bytes/ms |
//!
//! After the last chunk the writer waits `drainDelayMs + bytes / drainBytesPerMs`
//! so the printer can work through its buffer before the link is closed.
//!
//! ## Usage
//!
//! ```
//! use recibo::printer::WriterConfig;
//!
//! let config = WriterConfig::from_json(r#"{ "maxChunkBytes": 512, "codePage": "cp858" }"#).unwrap();
//! assert_eq!(config.max_chunk_bytes, 512);
//! assert_eq!(config.printer_capabilities.max_dots_per_line, 384);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ReciboError;
use crate::protocol::codepage::CodePage;
use crate::protocol::status::StatusKind;

/// Rows per `GS v 0` block most printers buffer comfortably.
pub const DEFAULT_MAX_RASTER_ROWS: u16 = 256;

/// What the printer firmware can do natively.
///
/// Every command is encoded the same way for every printer; only these
/// checks branch on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrinterCapabilities {
    /// Firmware renders QR codes from `GS ( k`
    pub native_qr: bool,
    /// Firmware renders 1D barcodes from `GS k`
    pub native_barcode: bool,
    /// Print head width in dots
    pub max_dots_per_line: u32,
    /// Largest raster block sent in one `GS v 0` command
    pub max_raster_rows: u16,
}

impl PrinterCapabilities {
    /// # Generic 58mm Printer
    ///
    /// ```text
    /// ├ 5mm ┼──── 48mm printable ────┼ 5mm ┤
    /// │     │       384 dots         │     │
    /// ```
    pub const MM58: Self = Self {
        native_qr: false,
        native_barcode: true,
        max_dots_per_line: 384,
        max_raster_rows: DEFAULT_MAX_RASTER_ROWS,
    };

    /// # Generic 80mm Printer
    ///
    /// ```text
    /// ├── 4mm ──┼────── 72mm printable ──────┼── 4mm ──┤
    /// │ margin  │         576 dots           │ margin  │
    /// ```
    pub const MM80: Self = Self {
        native_qr: true,
        native_barcode: true,
        max_dots_per_line: 576,
        max_raster_rows: DEFAULT_MAX_RASTER_ROWS,
    };
}

impl Default for PrinterCapabilities {
    fn default() -> Self {
        Self::MM58
    }
}

/// Everything the encoder needs to know about the target printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrinterProfile {
    /// Code page the printer is set to when a job starts
    pub code_page: CodePage,
    /// Resolution in dots per inch (for mm↔dots conversion)
    pub dpi: u16,
    pub capabilities: PrinterCapabilities,
}

impl PrinterProfile {
    pub const MM58: Self = Self {
        code_page: CodePage::Cp437,
        dpi: 203,
        capabilities: PrinterCapabilities::MM58,
    };

    pub const MM80: Self = Self {
        code_page: CodePage::Cp437,
        dpi: 203,
        capabilities: PrinterCapabilities::MM80,
    };

    /// Calculate dots per millimeter
    ///
    /// ```
    /// use recibo::printer::PrinterProfile;
    ///
    /// assert!((PrinterProfile::MM80.dots_per_mm() - 8.0).abs() < 0.1);
    /// ```
    #[inline]
    pub fn dots_per_mm(&self) -> f32 {
        self.dpi as f32 / 25.4
    }

    /// Convert millimeters to dots
    #[inline]
    pub fn mm_to_dots(&self, mm: f32) -> u32 {
        (mm * self.dots_per_mm()).round().max(0.0) as u32
    }

    /// Print width in millimeters
    #[inline]
    pub fn width_mm(&self) -> f32 {
        self.capabilities.max_dots_per_line as f32 / self.dots_per_mm()
    }

    /// Parse a preset name (`58mm`, `80mm`).
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "58" | "58mm" | "mm58" => Ok(Self::MM58),
            "80" | "80mm" | "mm80" => Ok(Self::MM80),
            _ => Err(format!("Unknown printer '{}'. Use '58mm' or '80mm'", s)),
        }
    }
}

impl Default for PrinterProfile {
    fn default() -> Self {
        Self::MM58
    }
}

// ============================================================================
// WRITER CONFIGURATION
// ============================================================================

/// Configuration consumed when constructing a print job writer.
///
/// Loaded from JSON with camelCase keys; every field has a default so a
/// file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WriterConfig {
    /// Largest single write handed to the transport (the printer's input
    /// buffer size)
    pub max_chunk_bytes: usize,
    /// Pause between chunks; 0 disables it
    pub inter_chunk_delay_ms: u64,
    /// Rate the printer consumes its buffer at; 0 skips the drain wait
    pub drain_bytes_per_ms: u32,
    /// Fixed extra wait after the last chunk
    pub drain_delay_ms: u64,
    /// How long to wait for each status reply
    pub status_timeout_ms: u64,
    /// Poll `DLE EOT` after the job has been written
    pub query_status: bool,
    /// Which statuses to poll, in order
    pub status_queries: Vec<StatusKind>,
    pub printer_capabilities: PrinterCapabilities,
    pub code_page: CodePage,
    pub dpi: u16,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_chunk_bytes: 256,
            inter_chunk_delay_ms: 10,
            drain_bytes_per_ms: 16,
            drain_delay_ms: 0,
            status_timeout_ms: 2000,
            query_status: false,
            status_queries: vec![StatusKind::Printer, StatusKind::Offline, StatusKind::Paper],
            printer_capabilities: PrinterCapabilities::default(),
            code_page: CodePage::default(),
            dpi: 203,
        }
    }
}

impl WriterConfig {
    /// Limits for a Bluetooth serial link: small chunks with a pause so the
    /// printer's buffer keeps up.
    pub fn bluetooth() -> Self {
        Self {
            max_chunk_bytes: 200,
            inter_chunk_delay_ms: 20,
            drain_bytes_per_ms: 8,
            ..Self::default()
        }
    }

    /// Limits for USB bulk transfers.
    pub fn usb() -> Self {
        Self {
            max_chunk_bytes: 256,
            inter_chunk_delay_ms: 0,
            ..Self::default()
        }
    }

    /// Limits for a raw TCP socket. The stack handles flow control.
    pub fn tcp() -> Self {
        Self {
            max_chunk_bytes: 16 * 1024,
            inter_chunk_delay_ms: 0,
            ..Self::default()
        }
    }

    /// How long to let the printer drain a job of `bytes` before the
    /// writer returns.
    ///
    /// ```
    /// use std::time::Duration;
    /// use recibo::printer::WriterConfig;
    ///
    /// let config = WriterConfig { drain_delay_ms: 5, ..WriterConfig::bluetooth() };
    /// assert_eq!(config.drain_time(800), Duration::from_millis(105));
    /// ```
    pub fn drain_time(&self, bytes: usize) -> Duration {
        let by_rate = match self.drain_bytes_per_ms {
            0 => 0,
            rate => (bytes / rate as usize) as u64,
        };
        Duration::from_millis(self.drain_delay_ms + by_rate)
    }

    /// The printer this configuration targets.
    pub fn profile(&self) -> PrinterProfile {
        PrinterProfile {
            code_page: self.code_page,
            dpi: self.dpi,
            capabilities: self.printer_capabilities,
        }
    }

    /// Replace the printer half of the configuration.
    pub fn with_profile(mut self, profile: PrinterProfile) -> Self {
        self.code_page = profile.code_page;
        self.dpi = profile.dpi;
        self.printer_capabilities = profile.capabilities;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ReciboError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReciboError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(PrinterProfile::MM58.capabilities.max_dots_per_line, 384);
        assert_eq!(PrinterProfile::MM80.capabilities.max_dots_per_line, 576);
        assert_eq!(PrinterProfile::default(), PrinterProfile::MM58);
    }

    #[test]
    fn test_width_mm() {
        let width = PrinterProfile::MM80.width_mm();
        // 576 dots / 8 dpmm = 72mm
        assert!((width - 72.0).abs() < 1.0);
    }

    #[test]
    fn test_mm_to_dots() {
        // 10mm ≈ 80 dots
        let dots = PrinterProfile::MM58.mm_to_dots(10.0);
        assert!((dots as i32 - 80).abs() < 2);
    }

    #[test]
    fn test_parse_profile() {
        assert_eq!(PrinterProfile::parse("80mm"), Ok(PrinterProfile::MM80));
        assert_eq!(PrinterProfile::parse("58"), Ok(PrinterProfile::MM58));
        assert!(PrinterProfile::parse("a4").is_err());
    }

    #[test]
    fn test_empty_json_is_default() {
        let config = WriterConfig::from_json("{}").unwrap();
        assert_eq!(config, WriterConfig::default());
    }

    #[test]
    fn test_full_json() {
        let config = WriterConfig::from_json(
            r#"{
                "maxChunkBytes": 100,
                "interChunkDelayMs": 5,
                "drainBytesPerMs": 4,
                "drainDelayMs": 30,
                "statusTimeoutMs": 300,
                "queryStatus": true,
                "statusQueries": ["paper"],
                "printerCapabilities": { "nativeQr": true, "maxDotsPerLine": 576 },
                "codePage": "wpc1252",
                "dpi": 180
            }"#,
        )
        .unwrap();

        assert_eq!(config.max_chunk_bytes, 100);
        assert_eq!(config.inter_chunk_delay_ms, 5);
        assert_eq!(config.drain_time(100), Duration::from_millis(55));
        assert_eq!(config.status_timeout_ms, 300);
        assert!(config.query_status);
        assert_eq!(config.status_queries, vec![StatusKind::Paper]);
        assert!(config.printer_capabilities.native_qr);
        // unspecified capability fields keep their defaults
        assert!(config.printer_capabilities.native_barcode);
        assert_eq!(config.printer_capabilities.max_raster_rows, 256);
        assert_eq!(config.profile().code_page, CodePage::Wpc1252);
        assert_eq!(config.profile().dpi, 180);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            WriterConfig::from_json(r#"{ "maxChunkBytes": "lots" }"#),
            Err(ReciboError::Config(_))
        ));
    }

    #[test]
    fn test_medium_presets() {
        assert_eq!(WriterConfig::bluetooth().max_chunk_bytes, 200);
        assert_eq!(WriterConfig::bluetooth().inter_chunk_delay_ms, 20);
        assert_eq!(WriterConfig::usb().inter_chunk_delay_ms, 0);
        assert_eq!(WriterConfig::tcp().max_chunk_bytes, 16384);
    }

    #[test]
    fn test_drain_time() {
        let config = WriterConfig::default();
        assert_eq!(config.drain_time(0), Duration::ZERO);
        assert_eq!(config.drain_time(1600), Duration::from_millis(100));
        assert_eq!(WriterConfig::bluetooth().drain_time(1600), Duration::from_millis(200));

        let off = WriterConfig {
            drain_bytes_per_ms: 0,
            ..WriterConfig::default()
        };
        assert_eq!(off.drain_time(1_000_000), Duration::ZERO);
    }

    #[test]
    fn test_with_profile() {
        let config = WriterConfig::tcp().with_profile(PrinterProfile::MM80);
        assert_eq!(config.profile(), PrinterProfile::MM80);
        assert_eq!(config.max_chunk_bytes, 16384);
    }
}
