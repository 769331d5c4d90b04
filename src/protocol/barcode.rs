//! # ESC/POS Barcode Commands
//!
//! Native barcode and QR code printing. Printers without these functions get
//! rasterized symbols from [`crate::symbol`] instead; both paths share the
//! data validation in this module.
//!
//! ## Supported Barcode Types
//!
//! | Type | `m` | Data |
//! |------|-----|------|
//! | UPC-A | 65 | 11-12 digits, a given check digit must be correct |
//! | UPC-E | 66 | 6-8, 11 or 12 digits |
//! | EAN-13 | 67 | 12-13 digits, a given check digit must be correct |
//! | EAN-8 | 68 | 7-8 digits, a given check digit must be correct |
//! | Code39 | 69 | A-Z 0-9 space `-.$/%+` |
//! | ITF | 70 | even number of digits |
//! | Codabar | 71 | `A-D` start/stop around `0-9-$:/.+` |
//! | Code93 | 72 | ASCII |
//! | Code128 | 73 | ASCII, optional leading `{A` / `{B` / `{C` |
//!
//! ## QR Code Usage
//!
//! QR codes are sent as a sequence of `GS ( k` functions:
//!
//! ```
//! use recibo::protocol::barcode::qr;
//!
//! let mut data = Vec::new();
//! data.extend(qr::set_model());
//! data.extend(qr::set_cell_size(6));
//! data.extend(qr::set_error_correction(qr::QrErrorLevel::M));
//! data.extend(qr::store_data(b"https://example.com"));
//! data.extend(qr::print());
//! ```

use crate::error::EncodingError;

use super::commands::GS;

// ============================================================================
// 1D BARCODE COMMANDS (GS k)
// ============================================================================

/// 1D barcode command builders
pub mod barcode1d {
    use super::{EncodingError, GS};

    /// Barcode systems of `GS k m n d1...dn` (function B, `m` = 65..73).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[repr(u8)]
    pub enum BarcodeKind {
        /// UPC-A (12 digits)
        UpcA = 65,
        /// UPC-E (compressed UPC-A)
        UpcE = 66,
        /// EAN-13 / JAN-13
        Ean13 = 67,
        /// EAN-8 / JAN-8
        Ean8 = 68,
        /// Code39
        Code39 = 69,
        /// Interleaved 2 of 5
        Itf = 70,
        /// Codabar / NW-7
        Codabar = 71,
        /// Code93
        Code93 = 72,
        /// Code128
        Code128 = 73,
    }

    impl BarcodeKind {
        /// Parse the names used in receipt markup (`ean13`, `code128`, ...).
        pub fn from_name(name: &str) -> Option<Self> {
            let kind = match name.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
                "upca" => BarcodeKind::UpcA,
                "upce" => BarcodeKind::UpcE,
                "ean13" | "jan13" => BarcodeKind::Ean13,
                "ean8" | "jan8" => BarcodeKind::Ean8,
                "code39" => BarcodeKind::Code39,
                "itf" => BarcodeKind::Itf,
                "codabar" | "nw7" => BarcodeKind::Codabar,
                "code93" => BarcodeKind::Code93,
                "code128" => BarcodeKind::Code128,
                _ => return None,
            };
            Some(kind)
        }

        pub fn name(self) -> &'static str {
            match self {
                BarcodeKind::UpcA => "UPC-A",
                BarcodeKind::UpcE => "UPC-E",
                BarcodeKind::Ean13 => "EAN-13",
                BarcodeKind::Ean8 => "EAN-8",
                BarcodeKind::Code39 => "Code39",
                BarcodeKind::Itf => "ITF",
                BarcodeKind::Codabar => "Codabar",
                BarcodeKind::Code93 => "Code93",
                BarcodeKind::Code128 => "Code128",
            }
        }
    }

    /// HRI (Human Readable Interpretation) position
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum HriPosition {
        /// No HRI text printed
        None = 0,
        Above = 1,
        /// HRI below barcode (default)
        #[default]
        Below = 2,
        Both = 3,
    }

    impl HriPosition {
        pub fn from_name(name: &str) -> Option<Self> {
            match name.to_ascii_lowercase().as_str() {
                "none" => Some(HriPosition::None),
                "above" => Some(HriPosition::Above),
                "below" => Some(HriPosition::Below),
                "both" => Some(HriPosition::Both),
                _ => None,
            }
        }
    }

    /// Module width range accepted by `GS w n`.
    pub const MODULE_WIDTH_RANGE: std::ops::RangeInclusive<u8> = 2..=6;

    /// A 1D barcode to print.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct BarcodeSpec {
        pub kind: BarcodeKind,
        pub data: String,
        /// Bar height in dots (1-255)
        pub height: u8,
        /// Narrow module width in dots (2-6)
        pub module_width: u8,
        pub hri: HriPosition,
    }

    impl BarcodeSpec {
        /// A barcode with the common defaults: 80 dots tall, 3-dot modules,
        /// text below.
        pub fn new(kind: BarcodeKind, data: impl Into<String>) -> Self {
            Self {
                kind,
                data: data.into(),
                height: 80,
                module_width: 3,
                hri: HriPosition::Below,
            }
        }

        /// Check the data and the size parameters.
        pub fn validate(&self) -> Result<(), EncodingError> {
            if self.height == 0 {
                return Err(EncodingError::InvalidParameter {
                    command: "barcode",
                    detail: "height must be at least 1 dot".to_string(),
                });
            }
            if !MODULE_WIDTH_RANGE.contains(&self.module_width) {
                return Err(EncodingError::InvalidParameter {
                    command: "barcode",
                    detail: format!("module width {} is outside 2-6", self.module_width),
                });
            }
            validate_data(self.kind, &self.data)
        }
    }

    /// Check that `data` is encodable as `kind`.
    pub fn validate_data(kind: BarcodeKind, data: &str) -> Result<(), EncodingError> {
        let invalid = |detail: String| EncodingError::InvalidParameter {
            command: "barcode",
            detail: format!("{}: {}", kind.name(), detail),
        };

        if data.is_empty() {
            return Err(invalid("data is empty".to_string()));
        }
        let digits = data.bytes().all(|b| b.is_ascii_digit());
        let len = data.len();

        match kind {
            BarcodeKind::UpcA | BarcodeKind::UpcE | BarcodeKind::Ean13 | BarcodeKind::Ean8 => {
                let lengths: &[usize] = match kind {
                    BarcodeKind::UpcA => &[11, 12],
                    BarcodeKind::UpcE => &[6, 7, 8, 11, 12],
                    BarcodeKind::Ean13 => &[12, 13],
                    _ => &[7, 8],
                };
                if !digits {
                    return Err(invalid("only digits are allowed".to_string()));
                }
                if !lengths.contains(&len) {
                    return Err(invalid(format!("{} digits is not one of {:?}", len, lengths)));
                }
                let with_check = match kind {
                    BarcodeKind::UpcA => 12,
                    BarcodeKind::Ean13 => 13,
                    BarcodeKind::Ean8 => 8,
                    _ => 0,
                };
                if len == with_check {
                    let (body, given) = data.split_at(len - 1);
                    let expected = check_digit(body);
                    if given.as_bytes()[0] - b'0' != expected {
                        return Err(invalid(format!(
                            "check digit {} is wrong, expected {}",
                            given, expected
                        )));
                    }
                }
            }
            BarcodeKind::Itf => {
                if !digits {
                    return Err(invalid("only digits are allowed".to_string()));
                }
                if len % 2 != 0 {
                    return Err(invalid("needs an even number of digits".to_string()));
                }
            }
            BarcodeKind::Code39 => {
                let body = data.trim_matches('*');
                if let Some(c) = body
                    .chars()
                    .find(|c| !(c.is_ascii_uppercase() || c.is_ascii_digit() || " -.$/%+".contains(*c)))
                {
                    return Err(invalid(format!("character {:?} is not allowed", c)));
                }
            }
            BarcodeKind::Codabar => {
                let bytes = data.as_bytes();
                let is_guard = |b: u8| matches!(b.to_ascii_uppercase(), b'A'..=b'D');
                if len < 2 || !is_guard(bytes[0]) || !is_guard(bytes[len - 1]) {
                    return Err(invalid("must start and end with A, B, C or D".to_string()));
                }
                if let Some(c) = data[1..len - 1]
                    .chars()
                    .find(|c| !(c.is_ascii_digit() || "-$:/.+".contains(*c)))
                {
                    return Err(invalid(format!("character {:?} is not allowed", c)));
                }
            }
            BarcodeKind::Code93 | BarcodeKind::Code128 => {
                if let Some(c) = data.chars().find(|c| !c.is_ascii()) {
                    return Err(invalid(format!("character {:?} is not ASCII", c)));
                }
                if kind == BarcodeKind::Code128 {
                    code128_parts(data)?;
                }
            }
        }

        if payload(kind, data).len() > u8::MAX as usize {
            return Err(invalid(format!("{} bytes is too long", len)));
        }
        Ok(())
    }

    /// Modulo-10 check digit of a UPC/EAN body (weights 3, 1, 3, ... from
    /// the right).
    pub fn check_digit(body: &str) -> u8 {
        let sum: u32 = body
            .bytes()
            .rev()
            .enumerate()
            .map(|(i, b)| (b - b'0') as u32 * if i % 2 == 0 { 3 } else { 1 })
            .sum();
        ((10 - sum % 10) % 10) as u8
    }

    /// Code128 code sets.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Code128Set {
        A,
        B,
        C,
    }

    /// Split Code128 data into its code set and the text to encode.
    ///
    /// Only a leading `{A`, `{B` or `{C` selects a set (B otherwise). Any
    /// later `{` is a literal brace. A leading `{` followed by anything
    /// else is rejected since it cannot be read either way.
    pub fn code128_parts(data: &str) -> Result<(Code128Set, &str), EncodingError> {
        match data.as_bytes() {
            [b'{', b'A', ..] => Ok((Code128Set::A, &data[2..])),
            [b'{', b'B', ..] => Ok((Code128Set::B, &data[2..])),
            [b'{', b'C', ..] => Ok((Code128Set::C, &data[2..])),
            [b'{', ..] => Err(EncodingError::InvalidParameter {
                command: "barcode",
                detail: "Code128: a leading `{` must select code set A, B or C".to_string(),
            }),
            _ => Ok((Code128Set::B, data)),
        }
    }

    /// Bytes sent after `n`. Code128 always starts with a code set selector
    /// and literal braces are doubled, as function B requires.
    fn payload(kind: BarcodeKind, data: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len() + 2);
        if kind != BarcodeKind::Code128 {
            out.extend_from_slice(data.as_bytes());
            return out;
        }

        let (set, text) = code128_parts(data).unwrap_or((Code128Set::B, data));
        out.push(b'{');
        out.push(match set {
            Code128Set::A => b'A',
            Code128Set::B => b'B',
            Code128Set::C => b'C',
        });
        for b in text.bytes() {
            if b == b'{' {
                out.push(b'{');
            }
            out.push(b);
        }
        out
    }

    /// # Set Bar Code Height (GS h n)
    #[inline]
    pub fn set_height(dots: u8) -> Vec<u8> {
        vec![GS, b'h', dots]
    }

    /// # Set Bar Code Width (GS w n)
    #[inline]
    pub fn set_module_width(dots: u8) -> Vec<u8> {
        vec![GS, b'w', dots]
    }

    /// # Select HRI Print Position (GS H n)
    #[inline]
    pub fn set_hri(position: HriPosition) -> Vec<u8> {
        vec![GS, b'H', position as u8]
    }

    /// # Print Bar Code (GS k m n d1...dn)
    ///
    /// | Format  | Bytes |
    /// |---------|-------|
    /// | Hex     | 1D 6B m n d1...dn |
    ///
    /// Function B form: `m` selects the system and `n` is the data length.
    /// The data must already be validated.
    pub fn print(kind: BarcodeKind, data: &str) -> Vec<u8> {
        let payload = payload(kind, data);
        let mut cmd = Vec::with_capacity(4 + payload.len());
        cmd.push(GS);
        cmd.push(b'k');
        cmd.push(kind as u8);
        cmd.push(payload.len() as u8);
        cmd.extend_from_slice(&payload);
        cmd
    }

    /// Full native sequence for a validated spec: height, width, HRI, print.
    ///
    /// ```
    /// use recibo::protocol::barcode::barcode1d::{generate, BarcodeKind, BarcodeSpec};
    ///
    /// let cmd = generate(&BarcodeSpec::new(BarcodeKind::Ean8, "1234567"));
    /// assert_eq!(&cmd[..9], &[0x1D, 0x68, 80, 0x1D, 0x77, 3, 0x1D, 0x48, 2]);
    /// ```
    pub fn generate(spec: &BarcodeSpec) -> Vec<u8> {
        let mut cmd = Vec::new();
        cmd.extend(set_height(spec.height));
        cmd.extend(set_module_width(spec.module_width));
        cmd.extend(set_hri(spec.hri));
        cmd.extend(print(spec.kind, &spec.data));
        cmd
    }
}

// ============================================================================
// QR CODE COMMANDS (GS ( k)
// ============================================================================

/// QR Code command builders
///
/// Every function is `GS ( k pL pH cn fn ...` with `cn = 49` (QR).
pub mod qr {
    use super::{EncodingError, GS};

    /// Largest payload the symbol storage area accepts.
    pub const MAX_DATA_LEN: usize = 7089;

    /// Module size range accepted by function 167.
    pub const MODULE_SIZE_RANGE: std::ops::RangeInclusive<u8> = 1..=16;

    /// QR Code error correction level
    ///
    /// | Level | Recovery |
    /// |-------|----------|
    /// | L | ~7% |
    /// | M | ~15% |
    /// | Q | ~25% |
    /// | H | ~30% |
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub enum QrErrorLevel {
        L = 48,
        #[default]
        M = 49,
        Q = 50,
        H = 51,
    }

    impl QrErrorLevel {
        pub fn from_name(name: &str) -> Option<Self> {
            match name.to_ascii_uppercase().as_str() {
                "L" => Some(QrErrorLevel::L),
                "M" => Some(QrErrorLevel::M),
                "Q" => Some(QrErrorLevel::Q),
                "H" => Some(QrErrorLevel::H),
                _ => None,
            }
        }
    }

    /// A QR code to print.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct QrSpec {
        pub data: String,
        /// Dots per module (1-16)
        pub module_size: u8,
        pub ecc: QrErrorLevel,
    }

    impl QrSpec {
        pub fn new(data: impl Into<String>) -> Self {
            Self {
                data: data.into(),
                module_size: 6,
                ecc: QrErrorLevel::M,
            }
        }

        pub fn validate(&self) -> Result<(), EncodingError> {
            if !MODULE_SIZE_RANGE.contains(&self.module_size) {
                return Err(EncodingError::InvalidParameter {
                    command: "qrcode",
                    detail: format!("module size {} is outside 1-16", self.module_size),
                });
            }
            if self.data.is_empty() || self.data.len() > MAX_DATA_LEN {
                return Err(EncodingError::InvalidParameter {
                    command: "qrcode",
                    detail: format!(
                        "data is {} bytes, must be 1-{}",
                        self.data.len(),
                        MAX_DATA_LEN
                    ),
                });
            }
            Ok(())
        }
    }

    fn function(fn_code: u8, params: &[u8]) -> Vec<u8> {
        let len = (params.len() + 2) as u16;
        let mut cmd = Vec::with_capacity(5 + len as usize);
        cmd.extend_from_slice(&[GS, b'(', b'k']);
        cmd.extend_from_slice(&len.to_le_bytes());
        cmd.push(49);
        cmd.push(fn_code);
        cmd.extend_from_slice(params);
        cmd
    }

    /// # Select Model (function 165): Model 2
    ///
    /// `1D 28 6B 04 00 31 41 32 00`
    pub fn set_model() -> Vec<u8> {
        function(65, &[50, 0])
    }

    /// # Set Module Size (function 167)
    ///
    /// `1D 28 6B 03 00 31 43 n`
    pub fn set_cell_size(dots: u8) -> Vec<u8> {
        function(67, &[dots])
    }

    /// # Set Error Correction Level (function 169)
    ///
    /// `1D 28 6B 03 00 31 45 n`
    pub fn set_error_correction(level: QrErrorLevel) -> Vec<u8> {
        function(69, &[level as u8])
    }

    /// # Store Data (function 180)
    ///
    /// `1D 28 6B pL pH 31 50 30 d1...dk` with `pL + pH×256 = k + 3`.
    pub fn store_data(data: &[u8]) -> Vec<u8> {
        let mut params = Vec::with_capacity(data.len() + 1);
        params.push(48);
        params.extend_from_slice(data);
        function(80, &params)
    }

    /// # Print Symbol (function 181)
    ///
    /// `1D 28 6B 03 00 31 51 30`
    pub fn print() -> Vec<u8> {
        function(81, &[48])
    }

    /// Full native sequence for a validated spec.
    pub fn generate(spec: &QrSpec) -> Vec<u8> {
        let mut cmd = Vec::new();
        cmd.extend(set_model());
        cmd.extend(set_cell_size(spec.module_size));
        cmd.extend(set_error_correction(spec.ecc));
        cmd.extend(store_data(spec.data.as_bytes()));
        cmd.extend(print());
        cmd
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod barcode1d_tests {
        use super::barcode1d::*;
        use crate::error::EncodingError;

        #[test]
        fn test_print_header() {
            let cmd = print(BarcodeKind::Ean13, "590123412345");
            assert_eq!(&cmd[..4], &[0x1D, 0x6B, 67, 12]);
            assert_eq!(&cmd[4..], b"590123412345");
        }

        #[test]
        fn test_code128_gets_code_set() {
            let cmd = print(BarcodeKind::Code128, "Hi");
            assert_eq!(cmd, vec![0x1D, 0x6B, 73, 4, b'{', b'B', b'H', b'i']);

            let cmd = print(BarcodeKind::Code128, "{A12");
            assert_eq!(cmd[3], 4);
        }

        #[test]
        fn test_code128_literal_brace_is_doubled() {
            assert!(validate_data(BarcodeKind::Code128, "A{B").is_ok());
            let cmd = print(BarcodeKind::Code128, "A{B");
            assert_eq!(&cmd[3..], &[6, b'{', b'B', b'A', b'{', b'{', b'B']);

            let cmd = print(BarcodeKind::Code128, "{C12{");
            assert_eq!(&cmd[4..], b"{C12{{");
        }

        #[test]
        fn test_code128_leading_brace_must_select_set() {
            assert!(validate_data(BarcodeKind::Code128, "{x1").is_err());
            assert!(validate_data(BarcodeKind::Code128, "{").is_err());
            assert!(validate_data(BarcodeKind::Code128, "{{").is_err());
            assert_eq!(code128_parts("{Cab").unwrap(), (Code128Set::C, "ab"));
            assert_eq!(code128_parts("plain").unwrap(), (Code128Set::B, "plain"));
        }

        #[test]
        fn test_check_digit() {
            assert_eq!(check_digit("590123412345"), 7);
            assert_eq!(check_digit("1234567"), 0);
            assert_eq!(check_digit("01234567890"), 5);
        }

        #[test]
        fn test_wrong_check_digit_is_rejected() {
            assert!(validate_data(BarcodeKind::Ean13, "5901234123457").is_ok());
            let err = validate_data(BarcodeKind::Ean13, "5901234123458").unwrap_err();
            match err {
                EncodingError::InvalidParameter { command, detail } => {
                    assert_eq!(command, "barcode");
                    assert!(detail.contains("expected 7"), "{}", detail);
                }
                other => panic!("unexpected {:?}", other),
            }
            assert!(validate_data(BarcodeKind::Ean8, "12345670").is_ok());
            assert!(validate_data(BarcodeKind::Ean8, "12345671").is_err());
            assert!(validate_data(BarcodeKind::UpcA, "012345678901").is_err());
        }

        #[test]
        fn test_generate_sequence() {
            let spec = BarcodeSpec {
                kind: BarcodeKind::Code39,
                data: "ABC".to_string(),
                height: 100,
                module_width: 2,
                hri: HriPosition::None,
            };
            assert_eq!(
                generate(&spec),
                vec![
                    0x1D, 0x68, 100, 0x1D, 0x77, 2, 0x1D, 0x48, 0, 0x1D, 0x6B, 69, 3, b'A',
                    b'B', b'C'
                ]
            );
        }

        #[test]
        fn test_digit_kinds() {
            assert!(validate_data(BarcodeKind::UpcA, "01234567890").is_ok());
            assert!(validate_data(BarcodeKind::UpcA, "012345678905").is_ok());
            assert!(validate_data(BarcodeKind::UpcA, "0123456789").is_err());
            assert!(validate_data(BarcodeKind::Ean13, "59012341234X").is_err());
            assert!(validate_data(BarcodeKind::Ean8, "1234567").is_ok());
            assert!(validate_data(BarcodeKind::UpcE, "123456").is_ok());
            assert!(validate_data(BarcodeKind::UpcE, "12345").is_err());
        }

        #[test]
        fn test_itf_even_length() {
            assert!(validate_data(BarcodeKind::Itf, "1234").is_ok());
            assert!(validate_data(BarcodeKind::Itf, "123").is_err());
        }

        #[test]
        fn test_code39_charset() {
            assert!(validate_data(BarcodeKind::Code39, "HELLO-123").is_ok());
            assert!(validate_data(BarcodeKind::Code39, "*ABC*").is_ok());
            assert!(validate_data(BarcodeKind::Code39, "hello").is_err());
        }

        #[test]
        fn test_codabar_guards() {
            assert!(validate_data(BarcodeKind::Codabar, "A40156B").is_ok());
            assert!(validate_data(BarcodeKind::Codabar, "40156").is_err());
            assert!(validate_data(BarcodeKind::Codabar, "A40X56B").is_err());
        }

        #[test]
        fn test_ascii_kinds() {
            assert!(validate_data(BarcodeKind::Code128, "Hello World").is_ok());
            assert!(validate_data(BarcodeKind::Code93, "Ünicode").is_err());
            assert!(validate_data(BarcodeKind::Code128, "").is_err());
            assert!(validate_data(BarcodeKind::Code128, &"x".repeat(254)).is_err());
        }

        #[test]
        fn test_spec_ranges() {
            let mut spec = BarcodeSpec::new(BarcodeKind::Code128, "X");
            assert!(spec.validate().is_ok());
            spec.module_width = 7;
            assert!(spec.validate().is_err());
            spec.module_width = 2;
            spec.height = 0;
            assert!(spec.validate().is_err());
        }

        #[test]
        fn test_names() {
            assert_eq!(BarcodeKind::from_name("EAN-13"), Some(BarcodeKind::Ean13));
            assert_eq!(BarcodeKind::from_name("code_128"), Some(BarcodeKind::Code128));
            assert_eq!(BarcodeKind::from_name("pdf417"), None);
            assert_eq!(HriPosition::from_name("Both"), Some(HriPosition::Both));
        }
    }

    mod qr_tests {
        use super::qr::*;

        #[test]
        fn test_set_model() {
            assert_eq!(
                set_model(),
                vec![0x1D, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x32, 0x00]
            );
        }

        #[test]
        fn test_set_cell_size() {
            assert_eq!(
                set_cell_size(6),
                vec![0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x43, 6]
            );
        }

        #[test]
        fn test_set_error_correction() {
            assert_eq!(set_error_correction(QrErrorLevel::L)[7], 48);
            assert_eq!(set_error_correction(QrErrorLevel::H)[7], 51);
        }

        #[test]
        fn test_store_data_length() {
            let cmd = store_data(b"Hello");
            // pL pH = 5 + 3
            assert_eq!(&cmd[..8], &[0x1D, 0x28, 0x6B, 8, 0, 0x31, 0x50, 0x30]);
            assert_eq!(&cmd[8..], b"Hello");

            let big = vec![b'A'; 300];
            let cmd = store_data(&big);
            assert_eq!(cmd[3], 0x2F); // 303 = 0x012F
            assert_eq!(cmd[4], 0x01);
        }

        #[test]
        fn test_print() {
            assert_eq!(print(), vec![0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30]);
        }

        #[test]
        fn test_validate() {
            assert!(QrSpec::new("https://example.com").validate().is_ok());
            assert!(QrSpec::new("").validate().is_err());
            assert!(QrSpec::new("x".repeat(MAX_DATA_LEN + 1)).validate().is_err());
            let mut spec = QrSpec::new("x");
            spec.module_size = 17;
            assert!(spec.validate().is_err());
        }

        #[test]
        fn test_generate_order() {
            let cmd = generate(&QrSpec::new("A"));
            assert_eq!(&cmd[..9], &set_model()[..]);
            assert!(cmd.ends_with(&print()));
        }
    }
}
