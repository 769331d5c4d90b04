//! Symbol matrices from the `qrcode` and `barcoders` crates.

use barcoders::sym::codabar::Codabar;
use barcoders::sym::code128::Code128;
use barcoders::sym::code39::Code39;
use barcoders::sym::code93::Code93;
use barcoders::sym::ean13::EAN13;
use barcoders::sym::ean8::EAN8;
use barcoders::sym::tf::TF;
use qrcode::{EcLevel, QrCode};

use super::{SymbolGenerator, SymbolMatrix, Symbology};
use crate::error::EncodingError;
use crate::protocol::barcode::barcode1d::{BarcodeKind, Code128Set, code128_parts, validate_data};
use crate::protocol::barcode::qr::QrErrorLevel;

/// Default [`SymbolGenerator`].
///
/// Supports every barcode kind except UPC-E.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinSymbols;

impl SymbolGenerator for BuiltinSymbols {
    fn generate_matrix(
        &self,
        data: &str,
        symbology: Symbology,
    ) -> Result<SymbolMatrix, EncodingError> {
        match symbology {
            Symbology::Qr(level) => qr_matrix(data, level),
            Symbology::Barcode(kind) => SymbolMatrix::linear(bars(kind, data)?),
        }
    }
}

fn qr_matrix(data: &str, level: QrErrorLevel) -> Result<SymbolMatrix, EncodingError> {
    let ec_level = match level {
        QrErrorLevel::L => EcLevel::L,
        QrErrorLevel::M => EcLevel::M,
        QrErrorLevel::Q => EcLevel::Q,
        QrErrorLevel::H => EcLevel::H,
    };

    let code = QrCode::with_error_correction_level(data, ec_level)
        .map_err(|e| EncodingError::Symbol(format!("QR code generation failed: {}", e)))?;

    let size = code.width();
    let mut modules = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            modules.push(code[(x, y)] == qrcode::Color::Dark);
        }
    }
    SymbolMatrix::new(size as u32, size as u32, modules)
}

/// Encode `data` as a bar (true) / space (false) sequence, one entry per
/// module.
fn bars(kind: BarcodeKind, data: &str) -> Result<Vec<bool>, EncodingError> {
    let failed = |e: barcoders::error::Error| {
        EncodingError::Symbol(format!("{} encoding failed: {:?}", kind.name(), e))
    };

    // Same rules as the native path: a given check digit must be right,
    // and Code128 braces mean the same thing on both.
    validate_data(kind, data)?;

    // barcoders appends the check digit itself
    let body = |len: usize| {
        data.get(..len).ok_or_else(|| {
            EncodingError::Symbol(format!("{} needs at least {} digits", kind.name(), len))
        })
    };

    let encoded = match kind {
        BarcodeKind::UpcA => EAN13::new(format!("0{}", body(11)?))
            .map_err(failed)?
            .encode(),
        BarcodeKind::Ean13 => EAN13::new(body(12)?).map_err(failed)?.encode(),
        BarcodeKind::Ean8 => EAN8::new(body(7)?).map_err(failed)?.encode(),
        BarcodeKind::Code39 => Code39::new(data.trim_matches('*')).map_err(failed)?.encode(),
        BarcodeKind::Itf => TF::interleaved(data).map_err(failed)?.encode(),
        BarcodeKind::Codabar => Codabar::new(data.to_ascii_uppercase())
            .map_err(failed)?
            .encode(),
        BarcodeKind::Code93 => Code93::new(data).map_err(failed)?.encode(),
        BarcodeKind::Code128 => Code128::new(code128_data(data)?).map_err(failed)?.encode(),
        BarcodeKind::UpcE => {
            return Err(EncodingError::Symbol(
                "UPC-E can only be printed by printers with native barcode support".to_string(),
            ));
        }
    };

    Ok(encoded.into_iter().map(|module| module == 1).collect())
}

/// Prefix the text with the marker character barcoders uses for its code
/// set. Braces after the selector are literal text.
fn code128_data(data: &str) -> Result<String, EncodingError> {
    let (set, text) = code128_parts(data)?;
    let marker = match set {
        Code128Set::A => '\u{00C0}',
        Code128Set::B => '\u{0181}',
        Code128Set::C => '\u{0106}',
    };
    Ok(format!("{}{}", marker, text))
}
