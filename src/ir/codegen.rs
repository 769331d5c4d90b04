//! # Code Generation
//!
//! Converts print specs to ESC/POS bytes.
//!
//! Encoding happens in two passes:
//!
//! 1. **resolve**: `Image`, `Barcode` and `QrCode` commands are expanded for
//!    the target printer (rasterized, or kept native if the printer can
//!    render them itself).
//! 2. **serialize**: every command is written out with its fixed template.
//!
//! Both passes are pure. The same `PrintSpec` and profile always produce the same
//! bytes, and nothing is added that the commands did not ask for.

use std::sync::Arc;

use tracing::{debug, trace};

use super::markup::MarkupParser;
use super::ops::{Command, PrintSpec};
use crate::error::EncodingError;
use crate::printer::PrinterProfile;
use crate::protocol::codepage::CodePage;
use crate::protocol::{barcode, commands, graphics, text};
use crate::render::dither::{MonoBitmap, Rasterizer};
use crate::symbol::{SymbolAdapter, SymbolGenerator};

/// Turns [`PrintSpec`]s into printer bytes for one printer profile.
#[derive(Debug, Clone)]
pub struct Encoder {
    profile: PrinterProfile,
    symbols: SymbolAdapter,
}

impl Encoder {
    /// An encoder using the built-in barcode and QR generator.
    pub fn new(profile: PrinterProfile) -> Self {
        Self {
            symbols: SymbolAdapter::builtin(profile.capabilities),
            profile,
        }
    }

    /// An encoder with a custom symbol generator for rasterized barcodes.
    pub fn with_generator(profile: PrinterProfile, generator: Arc<dyn SymbolGenerator>) -> Self {
        Self {
            symbols: SymbolAdapter::new(profile.capabilities, generator),
            profile,
        }
    }

    pub fn profile(&self) -> &PrinterProfile {
        &self.profile
    }

    /// Expand images, barcodes and QR codes for this printer.
    ///
    /// The result has the same number of commands, in the same order.
    pub fn resolve(&self, spec: &PrintSpec) -> Result<PrintSpec, EncodingError> {
        let rasterizer = Rasterizer::new(self.profile.capabilities.max_dots_per_line);

        spec.iter()
            .enumerate()
            .map(|(index, command)| {
                let resolved = match command {
                    Command::Image { pixels, mode } => rasterizer
                        .rasterize(pixels, *mode)
                        .map(|bitmap| Command::RasterImage {
                            bitmap,
                            scale: graphics::RasterScale::Normal,
                        }),
                    Command::Barcode(barcode) => self.symbols.encode_barcode(barcode),
                    Command::QrCode(qr) => self.symbols.encode_qr(qr),
                    other => Ok(other.clone()),
                };
                resolved.inspect_err(|e| {
                    debug!(index, command = command.name(), error = %e, "command could not be resolved");
                })
            })
            .collect()
    }

    /// Resolve and serialize a spec.
    pub fn encode(&self, spec: &PrintSpec) -> Result<Vec<u8>, EncodingError> {
        let resolved = self.resolve(spec)?;

        let mut out = Vec::new();
        let mut code_page = self.profile.code_page;

        for (index, command) in resolved.iter().enumerate() {
            trace!(index, command = command.name(), "serializing");
            match command {
                // ===== Printer Control =====
                Command::InitPrinter => {
                    out.extend(commands::init());
                    code_page = CodePage::Cp437;
                }
                Command::CutPaper(mode) => {
                    out.extend(commands::cut(*mode));
                }
                Command::FeedLines(n) => {
                    out.extend(commands::feed_lines(*n));
                }
                Command::FeedDots(n) => {
                    out.extend(commands::feed_dots(*n));
                }
                Command::OpenCashDrawer(pin) => {
                    out.extend(commands::open_cash_drawer(*pin));
                }
                Command::StatusQuery(kind) => {
                    out.extend(kind.request());
                }

                // ===== Style Changes =====
                Command::SetAlignment(alignment) => {
                    out.extend(text::align(*alignment));
                }
                Command::SetEmphasis(enabled) => {
                    out.extend(text::emphasis(*enabled));
                }
                Command::SetUnderline(mode) => {
                    out.extend(text::underline(*mode));
                }
                Command::SetFontSize { width, height } => {
                    for value in [width, height] {
                        if !(1..=8).contains(value) {
                            return Err(EncodingError::InvalidParameter {
                                command: command.name(),
                                detail: format!("multiplier {} is outside 1-8", value),
                            });
                        }
                    }
                    out.extend(text::size(*width, *height));
                }
                Command::SelectCodePage(page) => {
                    out.extend(text::codepage(*page));
                    code_page = *page;
                }

                // ===== Content =====
                Command::Text {
                    content,
                    code_page: explicit,
                } => {
                    if let Some(page) = explicit {
                        if *page != code_page {
                            out.extend(text::codepage(*page));
                            code_page = *page;
                        }
                    }
                    let bytes = code_page.encode(content).map_err(|(offset, character)| {
                        EncodingError::UnsupportedCharacter {
                            character,
                            command: index,
                            offset,
                            code_page,
                        }
                    })?;
                    out.extend(bytes);
                }
                Command::Raw(bytes) => {
                    out.extend(bytes);
                }

                // ===== Graphics =====
                Command::RasterImage { bitmap, scale } => {
                    self.raster(&mut out, bitmap, *scale)?;
                }
                Command::Image { pixels, mode } => {
                    let bitmap = Rasterizer::new(self.profile.capabilities.max_dots_per_line)
                        .rasterize(pixels, *mode)?;
                    self.raster(&mut out, &bitmap, graphics::RasterScale::Normal)?;
                }

                // ===== Barcodes =====
                Command::Barcode(spec) => {
                    out.extend(barcode::barcode1d::generate(spec));
                }
                Command::QrCode(spec) => {
                    out.extend(barcode::qr::generate(spec));
                }
            }
        }

        debug!(commands = spec.len(), bytes = out.len(), "encoded print spec");
        Ok(out)
    }

    /// Parse markup and encode it.
    pub fn encode_markup(&self, markup: &str) -> Result<Vec<u8>, EncodingError> {
        let spec = MarkupParser::new(&self.profile).parse(markup)?;
        self.encode(&spec)
    }

    /// Emit a raster image as `GS v 0` blocks of at most `max_raster_rows`
    /// rows each.
    fn raster(
        &self,
        out: &mut Vec<u8>,
        bitmap: &MonoBitmap,
        scale: graphics::RasterScale,
    ) -> Result<(), EncodingError> {
        let caps = &self.profile.capabilities;
        let printed_width = bitmap.width() * scale.x_factor();
        if printed_width > caps.max_dots_per_line {
            return Err(EncodingError::ImageTooWide {
                width: printed_width,
                max: caps.max_dots_per_line,
            });
        }
        if bitmap.width() > u16::MAX as u32 {
            return Err(EncodingError::InvalidParameter {
                command: "raster",
                detail: format!("width {} does not fit the raster header", bitmap.width()),
            });
        }

        let chunk_rows = caps.max_raster_rows.max(1) as u32;
        let mut row = 0;
        while row < bitmap.height() {
            let rows = (bitmap.height() - row).min(chunk_rows);
            out.extend(graphics::raster(
                bitmap.width() as u16,
                rows as u16,
                scale,
                bitmap.rows(row, row + rows),
            ));
            row += rows;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::PrinterCapabilities;
    use crate::protocol::barcode::barcode1d::{BarcodeKind, BarcodeSpec};
    use crate::protocol::barcode::qr::QrSpec;
    use crate::protocol::commands::CutMode;
    use crate::protocol::graphics::{RasterScale, parse_raster_header};
    use crate::protocol::text::Alignment;
    use crate::render::dither::{GrayPixels, RasterMode};

    fn encoder() -> Encoder {
        Encoder::new(PrinterProfile::MM58)
    }

    #[test]
    fn test_empty_spec() {
        assert!(encoder().encode(&PrintSpec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_init_only() {
        let bytes = encoder().encode(&PrintSpec::with_init()).unwrap();
        assert_eq!(bytes, vec![0x1B, 0x40]);
    }

    #[test]
    fn test_centered_text() {
        let bytes = encoder().encode_markup("[C]Hi[/C]").unwrap();
        assert_eq!(bytes, vec![0x1B, 0x61, 0x01, 0x48, 0x69]);
    }

    #[test]
    fn test_templates() {
        let spec: PrintSpec = [
            Command::SetAlignment(Alignment::Right),
            Command::SetEmphasis(true),
            Command::SetUnderline(true.into()),
            Command::SetFontSize {
                width: 2,
                height: 3,
            },
            Command::FeedLines(4),
            Command::CutPaper(CutMode::Partial),
            Command::StatusQuery(crate::protocol::status::StatusKind::Printer),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            encoder().encode(&spec).unwrap(),
            vec![
                0x1B, 0x61, 0x02, // align right
                0x1B, 0x45, 0x01, // emphasis on
                0x1B, 0x2D, 0x01, // underline
                0x1D, 0x21, 0x12, // 2x3
                0x1B, 0x64, 0x04, // feed
                0x1D, 0x56, 0x01, // partial cut
                0x10, 0x04, 0x01, // status
            ]
        );
    }

    #[test]
    fn test_font_size_range() {
        let spec: PrintSpec = [Command::SetFontSize {
            width: 9,
            height: 1,
        }]
        .into_iter()
        .collect();
        assert!(matches!(
            encoder().encode(&spec),
            Err(EncodingError::InvalidParameter { command: "font-size", .. })
        ));
    }

    #[test]
    fn test_unsupported_character_position() {
        let spec: PrintSpec = [Command::InitPrinter, Command::text("ok"), Command::text("a€")]
            .into_iter()
            .collect();
        match encoder().encode(&spec) {
            Err(EncodingError::UnsupportedCharacter {
                character,
                command,
                offset,
                code_page,
            }) => {
                assert_eq!(character, '€');
                assert_eq!(command, 2);
                assert_eq!(offset, 1);
                assert_eq!(code_page, CodePage::Cp437);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_explicit_code_page_switches_once() {
        let spec: PrintSpec = [
            Command::Text {
                content: "€".into(),
                code_page: Some(CodePage::Cp858),
            },
            Command::Text {
                content: "€".into(),
                code_page: Some(CodePage::Cp858),
            },
            Command::text("€"),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            encoder().encode(&spec).unwrap(),
            vec![0x1B, 0x74, 19, 0xD5, 0xD5, 0xD5]
        );
    }

    #[test]
    fn test_init_resets_code_page() {
        let profile = PrinterProfile {
            code_page: CodePage::Wpc1252,
            ..PrinterProfile::MM58
        };
        let spec: PrintSpec = [
            Command::text("€"),
            Command::InitPrinter,
            Command::Text {
                content: "é".into(),
                code_page: Some(CodePage::Wpc1252),
            },
        ]
        .into_iter()
        .collect();
        assert_eq!(
            Encoder::new(profile).encode(&spec).unwrap(),
            vec![0x80, 0x1B, 0x40, 0x1B, 0x74, 16, 0xE9]
        );
    }

    #[test]
    fn test_raster_24x1() {
        let bitmap = MonoBitmap::from_packed(24, 1, vec![0xFF, 0xFF, 0xFF]).unwrap();
        let spec: PrintSpec = [Command::RasterImage {
            bitmap,
            scale: RasterScale::Normal,
        }]
        .into_iter()
        .collect();
        assert_eq!(
            encoder().encode(&spec).unwrap(),
            vec![0x1D, 0x76, 0x30, 0x00, 0x03, 0x00, 0x01, 0x00, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_raster_split_into_blocks() {
        let bitmap = MonoBitmap::from_packed(8, 600, vec![0xAA; 600]).unwrap();
        let spec: PrintSpec = [Command::RasterImage {
            bitmap,
            scale: RasterScale::Normal,
        }]
        .into_iter()
        .collect();
        let bytes = encoder().encode(&spec).unwrap();

        let mut heights = Vec::new();
        let mut rest = &bytes[..];
        while let Some(header) = parse_raster_header(rest) {
            heights.push(header.height);
            rest = &rest[graphics::RASTER_HEADER_LEN + header.data_len()..];
        }
        assert!(rest.is_empty());
        assert_eq!(heights, vec![256, 256, 88]);
    }

    #[test]
    fn test_double_width_checks_printed_width() {
        let bitmap = MonoBitmap::from_packed(200, 1, vec![0; 25]).unwrap();
        let spec: PrintSpec = [Command::RasterImage {
            bitmap,
            scale: RasterScale::Quadruple,
        }]
        .into_iter()
        .collect();
        assert!(matches!(
            encoder().encode(&spec),
            Err(EncodingError::ImageTooWide { width: 400, max: 384 })
        ));
    }

    #[test]
    fn test_image_too_wide() {
        let spec: PrintSpec = [Command::Image {
            pixels: GrayPixels::from_fn(600, 2, |_, _| 0),
            mode: RasterMode::default(),
        }]
        .into_iter()
        .collect();
        assert!(matches!(
            encoder().encode(&spec),
            Err(EncodingError::ImageTooWide { width: 600, max: 384 })
        ));
    }

    #[test]
    fn test_image_is_rasterized() {
        let spec: PrintSpec = [Command::Image {
            pixels: GrayPixels::new(2, 2, vec![0, 255, 0, 255]).unwrap(),
            mode: RasterMode::Threshold(128),
        }]
        .into_iter()
        .collect();
        let bytes = encoder().encode(&spec).unwrap();
        assert_eq!(bytes, vec![0x1D, 0x76, 0x30, 0, 1, 0, 2, 0, 0x80, 0x80]);
    }

    #[test]
    fn test_native_barcode() {
        let spec: PrintSpec = [Command::Barcode(BarcodeSpec::new(BarcodeKind::Code39, "AB"))]
            .into_iter()
            .collect();
        let bytes = encoder().encode(&spec).unwrap();
        assert!(bytes.ends_with(&[0x1D, 0x6B, 69, 2, b'A', b'B']));
    }

    #[test]
    fn test_qr_fallback_on_58mm() {
        // MM58 has no native QR
        let spec: PrintSpec = [Command::QrCode(QrSpec::new("recibo"))].into_iter().collect();
        let bytes = encoder().encode(&spec).unwrap();
        let header = parse_raster_header(&bytes).unwrap();
        assert!(header.height > 0);
        assert_eq!(bytes.len(), graphics::RASTER_HEADER_LEN + header.data_len());

        let native = Encoder::new(PrinterProfile {
            capabilities: PrinterCapabilities {
                native_qr: true,
                ..PrinterCapabilities::MM58
            },
            ..PrinterProfile::MM58
        });
        let bytes = native.encode(&spec).unwrap();
        assert!(bytes.starts_with(&[0x1D, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x32, 0x00]));
    }

    #[test]
    fn test_deterministic() {
        let markup = "[C]<b>RECEIPT</b>\n[L]<font size='big'>Total</font> 9.99\n\
                      <qrcode size='3'>https://example.com</qrcode>\n";
        let a = encoder().encode_markup(markup).unwrap();
        let b = encoder().encode_markup(markup).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_resolve_keeps_order() {
        let spec: PrintSpec = [
            Command::InitPrinter,
            Command::QrCode(QrSpec::new("x")),
            Command::CutPaper(CutMode::Full),
        ]
        .into_iter()
        .collect();
        let resolved = encoder().resolve(&spec).unwrap();
        assert_eq!(resolved.len(), 3);
        assert!(matches!(resolved.commands()[1], Command::RasterImage { .. }));
    }
}
