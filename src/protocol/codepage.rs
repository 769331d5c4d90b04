//! # Character Code Tables
//!
//! Converts Unicode strings to the single-byte code page selected on the
//! printer with `ESC t n`. ASCII (U+0020–U+007E) is identical in every table;
//! the upper half (0x80–0xFF) differs per code page.
//!
//! Characters with no representation are an error. The printer would
//! otherwise print whatever glyph happens to sit at the substituted byte.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Code pages supported by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodePage {
    /// PC437 (USA, Standard Europe), table 0
    #[default]
    Cp437,
    /// PC850 (Multilingual), table 2
    Cp850,
    /// WPC1252 (Windows Latin-1), table 16
    Wpc1252,
    /// PC858 (Multilingual + Euro), table 19
    Cp858,
}

impl CodePage {
    /// The `n` of `ESC t n` selecting this table.
    pub fn table_number(self) -> u8 {
        match self {
            CodePage::Cp437 => 0,
            CodePage::Cp850 => 2,
            CodePage::Wpc1252 => 16,
            CodePage::Cp858 => 19,
        }
    }

    /// Upper-half glyphs, index 0 = byte 0x80.
    fn upper_half(self) -> &'static [char; 128] {
        match self {
            CodePage::Cp437 => &CP437_UPPER,
            CodePage::Cp850 => &CP850_UPPER,
            CodePage::Wpc1252 => &WPC1252_UPPER,
            CodePage::Cp858 => &CP858_UPPER,
        }
    }

    /// Map one character to its byte in this code page.
    ///
    /// Printable ASCII plus `\n`, `\r` and `\t` pass through. Other control
    /// characters are rejected so text can never smuggle in a command.
    pub fn encode_char(self, ch: char) -> Option<u8> {
        match ch {
            '\n' | '\r' | '\t' => Some(ch as u8),
            ' '..='~' => Some(ch as u8),
            c if (c as u32) < 0xA0 && (c as u32) >= 0x80 => None,
            c if (c as u32) < 0x20 || c == '\u{7F}' => None,
            c => self
                .upper_half()
                .iter()
                .position(|&g| g == c && g != UNDEFINED)
                .map(|i| 0x80 + i as u8),
        }
    }

    /// Encode a string, reporting the character offset of the first
    /// unrepresentable character.
    pub fn encode(self, s: &str) -> Result<Vec<u8>, (usize, char)> {
        let mut out = Vec::with_capacity(s.len());
        for (offset, ch) in s.chars().enumerate() {
            match self.encode_char(ch) {
                Some(byte) => out.push(byte),
                None => return Err((offset, ch)),
            }
        }
        Ok(out)
    }
}

impl fmt::Display for CodePage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CodePage::Cp437 => "CP437",
            CodePage::Cp850 => "CP850",
            CodePage::Wpc1252 => "WPC1252",
            CodePage::Cp858 => "CP858",
        };
        f.write_str(name)
    }
}

/// Placeholder for byte values with no assigned glyph.
const UNDEFINED: char = '\u{0}';

/// IBM Code Page 437, bytes 0x80–0xFF.
#[rustfmt::skip]
const CP437_UPPER: [char; 128] = [
    // 0x80
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    // 0x90
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ',
    // 0xA0
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»',
    // 0xB0
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    // 0xC0
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    // 0xD0
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
    // 0xE0
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩',
    // 0xF0
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{A0}',
];

/// IBM Code Page 850, bytes 0x80–0xFF.
#[rustfmt::skip]
const CP850_UPPER: [char; 128] = [
    // 0x80
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    // 0x90
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', 'ø', '£', 'Ø', '×', 'ƒ',
    // 0xA0
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '®', '¬', '½', '¼', '¡', '«', '»',
    // 0xB0
    '░', '▒', '▓', '│', '┤', 'Á', 'Â', 'À', '©', '╣', '║', '╗', '╝', '¢', '¥', '┐',
    // 0xC0
    '└', '┴', '┬', '├', '─', '┼', 'ã', 'Ã', '╚', '╔', '╩', '╦', '╠', '═', '╬', '¤',
    // 0xD0
    'ð', 'Ð', 'Ê', 'Ë', 'È', 'ı', 'Í', 'Î', 'Ï', '┘', '┌', '█', '▄', '¦', 'Ì', '▀',
    // 0xE0
    'Ó', 'ß', 'Ô', 'Ò', 'õ', 'Õ', 'µ', 'þ', 'Þ', 'Ú', 'Û', 'Ù', 'ý', 'Ý', '¯', '´',
    // 0xF0
    '\u{AD}', '±', '‗', '¾', '¶', '§', '÷', '¸', '°', '¨', '·', '¹', '³', '²', '■', '\u{A0}',
];

/// IBM Code Page 858: CP850 with the euro sign at 0xD5 in place of `ı`.
const CP858_UPPER: [char; 128] = {
    let mut table = CP850_UPPER;
    table[0xD5 - 0x80] = '€';
    table
};

/// Windows-1252, bytes 0x80–0xFF. 0xA0–0xFF coincide with Latin-1.
#[rustfmt::skip]
const WPC1252_UPPER: [char; 128] = [
    // 0x80
    '€', UNDEFINED, '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', UNDEFINED, 'Ž', UNDEFINED,
    // 0x90
    UNDEFINED, '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ', UNDEFINED, 'ž', 'Ÿ',
    // 0xA0
    '\u{A0}', '¡', '¢', '£', '¤', '¥', '¦', '§', '¨', '©', 'ª', '«', '¬', '\u{AD}', '®', '¯',
    // 0xB0
    '°', '±', '²', '³', '´', 'µ', '¶', '·', '¸', '¹', 'º', '»', '¼', '½', '¾', '¿',
    // 0xC0
    'À', 'Á', 'Â', 'Ã', 'Ä', 'Å', 'Æ', 'Ç', 'È', 'É', 'Ê', 'Ë', 'Ì', 'Í', 'Î', 'Ï',
    // 0xD0
    'Ð', 'Ñ', 'Ò', 'Ó', 'Ô', 'Õ', 'Ö', '×', 'Ø', 'Ù', 'Ú', 'Û', 'Ü', 'Ý', 'Þ', 'ß',
    // 0xE0
    'à', 'á', 'â', 'ã', 'ä', 'å', 'æ', 'ç', 'è', 'é', 'ê', 'ë', 'ì', 'í', 'î', 'ï',
    // 0xF0
    'ð', 'ñ', 'ò', 'ó', 'ô', 'õ', 'ö', '÷', 'ø', 'ù', 'ú', 'û', 'ü', 'ý', 'þ', 'ÿ',
];
