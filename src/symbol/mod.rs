//! # Symbol Adapter
//!
//! Decides, once per encoder, whether barcodes and QR codes are sent as
//! native printer commands or as raster images.
//!
//! ```text
//! BarcodeSpec / QrSpec
//!        │ validate
//!        ├── native capability ──► Command::Barcode / Command::QrCode
//!        └── otherwise ──► SymbolGenerator ──► SymbolMatrix ──► Rasterizer ──► Command::RasterImage
//! ```
//!
//! The matrix generator sits behind the [`SymbolGenerator`] trait;
//! [`BuiltinSymbols`] implements it with the `qrcode` and `barcoders` crates.

mod builtin;

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::EncodingError;
use crate::ir::Command;
use crate::printer::PrinterCapabilities;
use crate::protocol::barcode::barcode1d::{BarcodeKind, BarcodeSpec};
use crate::protocol::barcode::qr::{QrErrorLevel, QrSpec};
use crate::protocol::graphics::RasterScale;
use crate::render::dither::{PixelSource, RasterMode, Rasterizer};

pub use builtin::BuiltinSymbols;

/// Which symbol to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbology {
    Qr(QrErrorLevel),
    Barcode(BarcodeKind),
}

/// A grid of modules, row-major, `true` = dark.
///
/// Linear barcodes are one row tall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMatrix {
    pub width: u32,
    pub height: u32,
    pub modules: Vec<bool>,
}

impl SymbolMatrix {
    pub fn new(width: u32, height: u32, modules: Vec<bool>) -> Result<Self, EncodingError> {
        let expected = width as usize * height as usize;
        if modules.len() != expected || expected == 0 {
            return Err(EncodingError::Symbol(format!(
                "matrix of {}x{} has {} modules",
                width,
                height,
                modules.len()
            )));
        }
        Ok(Self {
            width,
            height,
            modules,
        })
    }

    /// A single-row matrix from a bar/space sequence.
    pub fn linear(bars: Vec<bool>) -> Result<Self, EncodingError> {
        Self::new(bars.len() as u32, 1, bars)
    }

    #[inline]
    pub fn is_dark(&self, x: u32, y: u32) -> bool {
        self.modules[y as usize * self.width as usize + x as usize]
    }

    /// View the matrix magnified to printer dots.
    pub fn scaled(&self, x_scale: u32, y_scale: u32) -> ScaledMatrix<'_> {
        ScaledMatrix {
            matrix: self,
            x_scale: x_scale.max(1),
            y_scale: y_scale.max(1),
        }
    }
}

/// A [`SymbolMatrix`] magnified by integer factors, as a pixel source.
#[derive(Debug, Clone, Copy)]
pub struct ScaledMatrix<'a> {
    matrix: &'a SymbolMatrix,
    x_scale: u32,
    y_scale: u32,
}

impl PixelSource for ScaledMatrix<'_> {
    fn width(&self) -> u32 {
        self.matrix.width * self.x_scale
    }

    fn height(&self) -> u32 {
        self.matrix.height * self.y_scale
    }

    fn luminance(&self, x: u32, y: u32) -> u8 {
        if self.matrix.is_dark(x / self.x_scale, y / self.y_scale) {
            0
        } else {
            255
        }
    }
}

/// Builds module matrices for barcodes and QR codes.
pub trait SymbolGenerator: Send + Sync {
    fn generate_matrix(
        &self,
        data: &str,
        symbology: Symbology,
    ) -> Result<SymbolMatrix, EncodingError>;
}

/// Turns barcode and QR specs into printable commands.
#[derive(Clone)]
pub struct SymbolAdapter {
    capabilities: PrinterCapabilities,
    generator: Arc<dyn SymbolGenerator>,
}

impl fmt::Debug for SymbolAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolAdapter")
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl SymbolAdapter {
    pub fn new(capabilities: PrinterCapabilities, generator: Arc<dyn SymbolGenerator>) -> Self {
        Self {
            capabilities,
            generator,
        }
    }

    /// An adapter using [`BuiltinSymbols`].
    pub fn builtin(capabilities: PrinterCapabilities) -> Self {
        Self::new(capabilities, Arc::new(BuiltinSymbols))
    }

    pub fn capabilities(&self) -> &PrinterCapabilities {
        &self.capabilities
    }

    /// Encode a 1D barcode.
    ///
    /// Without native support the bars are rasterized at `module_width`
    /// dots per module and `height` dots tall. The HRI line is only printed
    /// by the native path.
    pub fn encode_barcode(&self, spec: &BarcodeSpec) -> Result<Command, EncodingError> {
        spec.validate()?;
        if self.capabilities.native_barcode {
            return Ok(Command::Barcode(spec.clone()));
        }

        debug!(kind = spec.kind.name(), "rasterizing barcode");
        let matrix = self
            .generator
            .generate_matrix(&spec.data, Symbology::Barcode(spec.kind))?;
        // one row of bars stretched to the bar height
        self.rasterize(&matrix, spec.module_width as u32, spec.height as u32)
    }

    /// Encode a QR code.
    ///
    /// Without native support each module becomes a `module_size` square.
    pub fn encode_qr(&self, spec: &QrSpec) -> Result<Command, EncodingError> {
        spec.validate()?;
        if self.capabilities.native_qr {
            return Ok(Command::QrCode(spec.clone()));
        }

        debug!(ecc = ?spec.ecc, "rasterizing QR code");
        let matrix = self
            .generator
            .generate_matrix(&spec.data, Symbology::Qr(spec.ecc))?;
        let size = spec.module_size as u32;
        self.rasterize(&matrix, size, size)
    }

    fn rasterize(
        &self,
        matrix: &SymbolMatrix,
        x_scale: u32,
        y_scale: u32,
    ) -> Result<Command, EncodingError> {
        let bitmap = Rasterizer::new(self.capabilities.max_dots_per_line)
            .rasterize(&matrix.scaled(x_scale, y_scale), RasterMode::Threshold(128))?;
        Ok(Command::RasterImage {
            bitmap,
            scale: RasterScale::Normal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::barcode::barcode1d::HriPosition;

    /// Returns a fixed checkerboard regardless of input.
    struct Checker;

    impl SymbolGenerator for Checker {
        fn generate_matrix(
            &self,
            _data: &str,
            symbology: Symbology,
        ) -> Result<SymbolMatrix, EncodingError> {
            match symbology {
                Symbology::Qr(_) => SymbolMatrix::new(2, 2, vec![true, false, false, true]),
                Symbology::Barcode(_) => SymbolMatrix::linear(vec![true, false, true]),
            }
        }
    }

    fn caps(native: bool) -> PrinterCapabilities {
        PrinterCapabilities {
            native_qr: native,
            native_barcode: native,
            ..PrinterCapabilities::MM58
        }
    }

    #[test]
    fn test_native_passthrough() {
        let adapter = SymbolAdapter::new(caps(true), Arc::new(Checker));
        let spec = BarcodeSpec::new(BarcodeKind::Code128, "ABC");
        assert_eq!(
            adapter.encode_barcode(&spec).unwrap(),
            Command::Barcode(spec)
        );
        let qr = QrSpec::new("hi");
        assert_eq!(adapter.encode_qr(&qr).unwrap(), Command::QrCode(qr));
    }

    #[test]
    fn test_native_still_validates() {
        let adapter = SymbolAdapter::new(caps(true), Arc::new(Checker));
        let spec = BarcodeSpec::new(BarcodeKind::Ean13, "12AB");
        assert!(matches!(
            adapter.encode_barcode(&spec),
            Err(EncodingError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_qr_fallback_scales_modules() {
        let adapter = SymbolAdapter::new(caps(false), Arc::new(Checker));
        let mut qr = QrSpec::new("hi");
        qr.module_size = 4;

        let Command::RasterImage { bitmap, scale } = adapter.encode_qr(&qr).unwrap() else {
            panic!("expected a raster image");
        };
        assert_eq!(scale, RasterScale::Normal);
        assert_eq!((bitmap.width(), bitmap.height()), (8, 8));
        // top half: dark, light; bottom half: light, dark
        assert_eq!(bitmap.rows(0, 4), &[0xF0; 4]);
        assert_eq!(bitmap.rows(4, 8), &[0x0F; 4]);
    }

    #[test]
    fn test_barcode_fallback_stretches_height() {
        let adapter = SymbolAdapter::new(caps(false), Arc::new(Checker));
        let spec = BarcodeSpec {
            kind: BarcodeKind::Code39,
            data: "A".to_string(),
            height: 10,
            module_width: 2,
            hri: HriPosition::None,
        };

        let Command::RasterImage { bitmap, .. } = adapter.encode_barcode(&spec).unwrap() else {
            panic!("expected a raster image");
        };
        assert_eq!((bitmap.width(), bitmap.height()), (6, 10));
        assert!(bitmap.data().iter().all(|&b| b == 0b1100_1100));
    }

    #[test]
    fn test_fallback_too_wide() {
        let adapter = SymbolAdapter::new(caps(false), Arc::new(Checker));
        let mut qr = QrSpec::new("hi");
        qr.module_size = 16;
        let narrow = SymbolAdapter::new(
            PrinterCapabilities {
                max_dots_per_line: 24,
                ..caps(false)
            },
            Arc::new(Checker),
        );
        assert!(adapter.encode_qr(&qr).is_ok());
        assert!(matches!(
            narrow.encode_qr(&qr),
            Err(EncodingError::ImageTooWide { width: 32, max: 24 })
        ));
    }

    #[test]
    fn test_matrix_shape_checked() {
        assert!(SymbolMatrix::new(2, 2, vec![true; 3]).is_err());
        assert!(SymbolMatrix::linear(vec![]).is_err());
    }
}
