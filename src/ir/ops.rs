//! # Print Commands
//!
//! A [`PrintSpec`] is an ordered, append-only list of [`Command`]s. Each
//! command is one atomic printer operation; the encoder turns every variant
//! into a fixed ESC/POS byte template.
//!
//! ```text
//! markup ─┐
//!         ├─► PrintSpec (inspectable) ─► resolve ─► encode ─► bytes
//! code  ──┘
//! ```

use crate::error::EncodingError;
use crate::protocol::barcode::barcode1d::BarcodeSpec;
use crate::protocol::barcode::qr::QrSpec;
use crate::protocol::codepage::CodePage;
use crate::protocol::commands::{self, CutMode, DrawerPin};
use crate::protocol::graphics::RasterScale;
use crate::protocol::status::StatusKind;
use crate::protocol::text::{Alignment, Underline};
use crate::render::dither::{GrayPixels, MonoBitmap, RasterMode};

/// Print commands.
///
/// Immutable once constructed. The IR can be:
/// - Inspected for debugging (`{:#?}`)
/// - Resolved (images, barcodes, QR codes expanded for the target printer)
/// - Encoded to ESC/POS bytes
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ========== Printer Control ==========
    /// Initialize printer (ESC @). Resets styles and the code page.
    InitPrinter,

    /// Cut paper.
    CutPaper(CutMode),

    /// Print and feed n lines.
    FeedLines(u8),

    /// Print and feed n dots.
    FeedDots(u8),

    /// Pulse the cash drawer kick-out connector.
    OpenCashDrawer(DrawerPin),

    /// Ask for a real-time status byte.
    StatusQuery(StatusKind),

    // ========== Style Changes ==========
    SetAlignment(Alignment),

    SetEmphasis(bool),

    SetUnderline(Underline),

    /// Character size multipliers, 1-8 each.
    SetFontSize { width: u8, height: u8 },

    /// Switch the printer's character table.
    SelectCodePage(CodePage),

    // ========== Content ==========
    /// Text in the active code page, or in `code_page` if given.
    Text {
        content: String,
        code_page: Option<CodePage>,
    },

    /// Raw bytes (for direct protocol access).
    Raw(Vec<u8>),

    // ========== Graphics ==========
    /// A packed 1-bit image.
    RasterImage {
        bitmap: MonoBitmap,
        scale: RasterScale,
    },

    /// A grayscale image, rasterized by the encoder.
    Image { pixels: GrayPixels, mode: RasterMode },

    // ========== Barcodes ==========
    Barcode(BarcodeSpec),

    QrCode(QrSpec),
}

impl Command {
    /// Text in the active code page.
    pub fn text(content: impl Into<String>) -> Self {
        Command::Text {
            content: content.into(),
            code_page: None,
        }
    }

    /// Raw bytes from a hex string (`"1B 40"`, `"1B40"`, `"0x1B,0x40"`).
    ///
    /// ```
    /// use recibo::ir::Command;
    ///
    /// assert_eq!(Command::raw_hex("1B 40").unwrap(), Command::Raw(vec![0x1B, 0x40]));
    /// assert!(Command::raw_hex("1B4").is_err());
    /// ```
    pub fn raw_hex(hex: &str) -> Result<Self, EncodingError> {
        commands::parse_hex(hex)
            .map(Command::Raw)
            .ok_or_else(|| EncodingError::InvalidParameter {
                command: "raw",
                detail: format!("{:?} is not a hex byte string", hex),
            })
    }

    /// Short name for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::InitPrinter => "init",
            Command::CutPaper(_) => "cut",
            Command::FeedLines(_) => "feed",
            Command::FeedDots(_) => "feed-dots",
            Command::OpenCashDrawer(_) => "cash-drawer",
            Command::StatusQuery(_) => "status",
            Command::SetAlignment(_) => "align",
            Command::SetEmphasis(_) => "emphasis",
            Command::SetUnderline(_) => "underline",
            Command::SetFontSize { .. } => "font-size",
            Command::SelectCodePage(_) => "code-page",
            Command::Text { .. } => "text",
            Command::Raw(_) => "raw",
            Command::RasterImage { .. } => "raster",
            Command::Image { .. } => "image",
            Command::Barcode(_) => "barcode",
            Command::QrCode(_) => "qrcode",
        }
    }
}

/// An ordered sequence of commands.
///
/// Commands can be appended but never removed or reordered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrintSpec {
    commands: Vec<Command>,
}

impl PrintSpec {
    /// Create an empty spec.
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Create a spec starting with `InitPrinter`.
    pub fn with_init() -> Self {
        Self {
            commands: vec![Command::InitPrinter],
        }
    }

    /// Add a command.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Add multiple commands.
    pub fn extend(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.commands.extend(commands);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }
}

impl FromIterator<Command> for PrintSpec {
    fn from_iter<T: IntoIterator<Item = Command>>(iter: T) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PrintSpec {
    type Item = Command;
    type IntoIter = std::vec::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

impl<'a> IntoIterator for &'a PrintSpec {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_new() {
        let spec = PrintSpec::new();
        assert!(spec.is_empty());
    }

    #[test]
    fn test_spec_with_init() {
        let spec = PrintSpec::with_init();
        assert_eq!(spec.len(), 1);
        assert_eq!(spec.commands()[0], Command::InitPrinter);
    }

    #[test]
    fn test_spec_preserves_order() {
        let mut spec = PrintSpec::new();
        spec.push(Command::SetEmphasis(true));
        spec.extend([Command::text("Hello"), Command::FeedLines(2)]);
        let names: Vec<_> = spec.iter().map(Command::name).collect();
        assert_eq!(names, vec!["emphasis", "text", "feed"]);
    }

    #[test]
    fn test_collect() {
        let spec: PrintSpec = (1..=3).map(Command::FeedLines).collect();
        assert_eq!(spec.len(), 3);
        assert_eq!(spec.into_iter().last(), Some(Command::FeedLines(3)));
    }

    #[test]
    fn test_raw_hex() {
        assert_eq!(
            Command::raw_hex("0x1B,0x40").unwrap(),
            Command::Raw(vec![0x1B, 0x40])
        );
        assert!(matches!(
            Command::raw_hex("hello"),
            Err(EncodingError::InvalidParameter { command: "raw", .. })
        ));
    }

    #[test]
    fn test_command_debug() {
        let cmd = Command::QrCode(QrSpec::new("https://example.com"));
        let debug = format!("{:?}", cmd);
        assert!(debug.contains("QrCode"));
        assert!(debug.contains("example.com"));
    }
}
