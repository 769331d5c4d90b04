//! # Receipt Markup
//!
//! A small inline markup for writing receipts as text:
//!
//! ```text
//! [C]<u><font size='big'>ORDER 045</font></u>
//! [L]<b>BEAUTIFUL SHIRT</b> 9.99 EUR
//! [C]<barcode type='ean13' height='10'>831254784551</barcode>
//! [C]<qrcode size='6'>https://example.com/</qrcode>
//! ```
//!
//! ## Tags
//!
//! | Tag | Command |
//! |-----|---------|
//! | `[L]` `[C]` `[R]` | alignment; `[/L]` etc. close it and emit nothing |
//! | `<b>` | emphasis |
//! | `<u>`, `<u type='double'>` | underline |
//! | `<font size='normal\|wide\|tall\|big\|big-2..big-6'>` | character size |
//! | `<barcode type= height=(mm) width= text=>` | 1D barcode |
//! | `<qrcode size=(dots per module) ecc=>` | QR code |
//!
//! Style spans must nest; closing one restores the enclosing style.
//! `\[`, `\<` and `\\` produce literal characters. Everything else,
//! newlines included, is text.

use crate::error::EncodingError;
use crate::printer::PrinterProfile;
use crate::protocol::barcode::barcode1d::{BarcodeKind, BarcodeSpec, HriPosition};
use crate::protocol::barcode::qr::{QrErrorLevel, QrSpec};
use crate::protocol::text::{Alignment, Underline};

use super::ops::{Command, PrintSpec};

/// Parse markup for a 203 DPI printer.
///
/// ```
/// use recibo::ir::{markup, Command};
/// use recibo::protocol::text::Alignment;
///
/// let spec = markup::parse("[C]Hi[/C]").unwrap();
/// assert_eq!(
///     spec.commands(),
///     &[Command::SetAlignment(Alignment::Center), Command::text("Hi")]
/// );
/// ```
pub fn parse(markup: &str) -> Result<PrintSpec, EncodingError> {
    MarkupParser::new(&PrinterProfile::default()).parse(markup)
}

/// Markup parser bound to a printer resolution (for barcode heights in mm).
#[derive(Debug, Clone, Copy)]
pub struct MarkupParser {
    profile: PrinterProfile,
}

impl MarkupParser {
    pub fn new(profile: &PrinterProfile) -> Self {
        Self { profile: *profile }
    }

    pub fn parse(&self, markup: &str) -> Result<PrintSpec, EncodingError> {
        let mut state = ParseState {
            chars: markup.chars().collect(),
            pos: 0,
            text: String::new(),
            out: PrintSpec::new(),
            spans: Vec::new(),
            alignment: None,
            emphasis: false,
            underline: Underline::Off,
            size: (1, 1),
            profile: self.profile,
        };
        state.run()?;
        Ok(state.out)
    }
}

/// An open style span and the value it replaced.
#[derive(Debug)]
enum Span {
    Bold(bool),
    Underline(Underline),
    Font((u8, u8)),
}

impl Span {
    fn tag(&self) -> &'static str {
        match self {
            Span::Bold(_) => "b",
            Span::Underline(_) => "u",
            Span::Font(_) => "font",
        }
    }
}

struct ParseState {
    chars: Vec<char>,
    pos: usize,
    text: String,
    out: PrintSpec,
    /// open spans with the position of their opening tag
    spans: Vec<(Span, usize, String)>,
    alignment: Option<Alignment>,
    emphasis: bool,
    underline: Underline,
    size: (u8, u8),
    profile: PrinterProfile,
}

fn malformed(tag: impl Into<String>, position: usize, reason: &'static str) -> EncodingError {
    EncodingError::MalformedMarkup {
        tag: tag.into(),
        position,
        reason,
    }
}

impl ParseState {
    fn run(&mut self) -> Result<(), EncodingError> {
        while self.pos < self.chars.len() {
            let c = self.chars[self.pos];
            match c {
                '\\' => {
                    match self.chars.get(self.pos + 1) {
                        Some(&next @ ('[' | '<' | '\\')) => {
                            self.text.push(next);
                            self.pos += 2;
                        }
                        _ => {
                            self.text.push('\\');
                            self.pos += 1;
                        }
                    }
                }
                '[' => self.bracket_tag()?,
                '<' => self.angle_tag()?,
                _ => {
                    self.text.push(c);
                    self.pos += 1;
                }
            }
        }
        self.flush_text();

        if let Some((_, position, tag)) = self.spans.pop() {
            return Err(malformed(tag, position, "unclosed tag"));
        }
        Ok(())
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            let content = std::mem::take(&mut self.text);
            self.out.push(Command::text(content));
        }
    }

    /// Read from the current `open` character up to `close`. Returns the
    /// body and the full tag text, and moves past the tag.
    fn read_tag(&mut self, close: char) -> Result<(usize, String, String), EncodingError> {
        let start = self.pos;
        let rest = &self.chars[start + 1..];
        match rest.iter().position(|&c| c == close) {
            Some(len) => {
                let body: String = rest[..len].iter().collect();
                let full: String = self.chars[start..start + len + 2].iter().collect();
                self.pos = start + len + 2;
                Ok((start, body, full))
            }
            None => {
                let partial: String = self.chars[start..].iter().take(16).collect();
                Err(malformed(partial, start, "unterminated tag"))
            }
        }
    }

    fn bracket_tag(&mut self) -> Result<(), EncodingError> {
        let (position, body, full) = self.read_tag(']')?;
        let (closing, name) = match body.strip_prefix('/') {
            Some(name) => (true, name),
            None => (false, body.as_str()),
        };
        let alignment = match name {
            "L" => Alignment::Left,
            "C" => Alignment::Center,
            "R" => Alignment::Right,
            _ => return Err(malformed(full, position, "unknown tag")),
        };

        self.flush_text();
        if closing {
            if self.alignment != Some(alignment) {
                return Err(malformed(full, position, "closing tag does not match"));
            }
            self.alignment = None;
        } else {
            self.alignment = Some(alignment);
            self.out.push(Command::SetAlignment(alignment));
        }
        Ok(())
    }

    fn angle_tag(&mut self) -> Result<(), EncodingError> {
        let (position, body, full) = self.read_tag('>')?;

        if let Some(name) = body.strip_prefix('/') {
            return self.close_span(name.trim(), position, full);
        }

        let (name, attrs) = parse_attrs(&body).ok_or_else(|| {
            malformed(full.clone(), position, "malformed attributes")
        })?;
        let attr = |key: &str| attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
        let allow_only = |keys: &[&str]| {
            if attrs.iter().all(|(k, _)| keys.contains(&k.as_str())) {
                Ok(())
            } else {
                Err(malformed(full.clone(), position, "unknown attribute"))
            }
        };

        match name.as_str() {
            "b" => {
                allow_only(&[])?;
                self.flush_text();
                self.open(Span::Bold(self.emphasis), position, &full);
                self.emphasis = true;
                self.out.push(Command::SetEmphasis(true));
            }
            "u" => {
                allow_only(&["type"])?;
                let mode = match attr("type") {
                    None | Some("normal") | Some("single") => Underline::Single,
                    Some("double") => Underline::Double,
                    Some(_) => return Err(malformed(full, position, "unknown underline type")),
                };
                self.flush_text();
                self.open(Span::Underline(self.underline), position, &full);
                self.underline = mode;
                self.out.push(Command::SetUnderline(mode));
            }
            "font" => {
                allow_only(&["size"])?;
                let size = match attr("size") {
                    None => self.size,
                    Some(s) => font_size(s)
                        .ok_or_else(|| malformed(full.clone(), position, "unknown font size"))?,
                };
                self.flush_text();
                self.open(Span::Font(self.size), position, &full);
                self.size = size;
                self.out.push(Command::SetFontSize {
                    width: size.0,
                    height: size.1,
                });
            }
            "barcode" => {
                allow_only(&["type", "height", "width", "text"])?;
                let kind = match attr("type") {
                    None => BarcodeKind::Ean13,
                    Some(t) => BarcodeKind::from_name(t)
                        .ok_or_else(|| malformed(full.clone(), position, "unknown barcode type"))?,
                };
                let height_mm: f32 = parse_number(attr("height"), 10.0)
                    .ok_or_else(|| malformed(full.clone(), position, "invalid barcode height"))?;
                let height = self.profile.mm_to_dots(height_mm);
                if !(1..=255).contains(&height) {
                    return Err(malformed(full, position, "barcode height out of range"));
                }
                let module_width: u8 = parse_number(attr("width"), 3)
                    .ok_or_else(|| malformed(full.clone(), position, "invalid barcode width"))?;
                let hri = match attr("text") {
                    None => HriPosition::Below,
                    Some(t) => HriPosition::from_name(t)
                        .ok_or_else(|| malformed(full.clone(), position, "unknown text position"))?,
                };
                let data = self.content_until("barcode", position, &full)?;
                self.flush_text();
                self.out.push(Command::Barcode(BarcodeSpec {
                    kind,
                    data,
                    height: height as u8,
                    module_width,
                    hri,
                }));
            }
            "qrcode" => {
                allow_only(&["size", "ecc"])?;
                let module_size: u8 = parse_number(attr("size"), 6)
                    .ok_or_else(|| malformed(full.clone(), position, "invalid QR size"))?;
                let ecc = match attr("ecc") {
                    None => QrErrorLevel::M,
                    Some(e) => QrErrorLevel::from_name(e)
                        .ok_or_else(|| malformed(full.clone(), position, "unknown QR error level"))?,
                };
                let data = self.content_until("qrcode", position, &full)?;
                self.flush_text();
                self.out.push(Command::QrCode(QrSpec {
                    data,
                    module_size,
                    ecc,
                }));
            }
            _ => return Err(malformed(full, position, "unknown tag")),
        }
        Ok(())
    }

    fn open(&mut self, span: Span, position: usize, full: &str) {
        self.spans.push((span, position, full.to_string()));
    }

    fn close_span(&mut self, name: &str, position: usize, full: String) -> Result<(), EncodingError> {
        match self.spans.last() {
            Some((span, _, _)) if span.tag() == name => {}
            Some(_) => return Err(malformed(full, position, "closing tag does not match")),
            None => {
                let reason = if matches!(name, "b" | "u" | "font") {
                    "closing tag without opening tag"
                } else {
                    "unknown tag"
                };
                return Err(malformed(full, position, reason));
            }
        }

        self.flush_text();
        if let Some((span, _, _)) = self.spans.pop() {
            let restore = match span {
                Span::Bold(prev) => {
                    self.emphasis = prev;
                    Command::SetEmphasis(prev)
                }
                Span::Underline(prev) => {
                    self.underline = prev;
                    Command::SetUnderline(prev)
                }
                Span::Font(prev) => {
                    self.size = prev;
                    Command::SetFontSize {
                        width: prev.0,
                        height: prev.1,
                    }
                }
            };
            self.out.push(restore);
        }
        Ok(())
    }

    /// Take the raw content of a symbol tag up to its closing tag.
    fn content_until(
        &mut self,
        name: &str,
        position: usize,
        full: &str,
    ) -> Result<String, EncodingError> {
        let closing: Vec<char> = format!("</{}>", name).chars().collect();
        let rest = &self.chars[self.pos..];
        let end = rest
            .windows(closing.len())
            .position(|w| w == closing.as_slice())
            .ok_or_else(|| malformed(full, position, "unclosed tag"))?;
        let content: String = rest[..end].iter().collect();
        self.pos += end + closing.len();
        Ok(content)
    }
}

/// Split `name key='value' key="value"` into its parts.
fn parse_attrs(body: &str) -> Option<(String, Vec<(String, String)>)> {
    let body = body.trim();
    let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
    let name = &body[..name_end];
    if name.is_empty() {
        return None;
    }

    let mut attrs = Vec::new();
    let mut rest = body[name_end..].trim_start();
    while !rest.is_empty() {
        let eq = rest.find('=')?;
        let key = rest[..eq].trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return None;
        }
        let value_part = rest[eq + 1..].trim_start();
        let quote = value_part.chars().next().filter(|c| *c == '\'' || *c == '"')?;
        let value_end = value_part[1..].find(quote)?;
        attrs.push((key.to_string(), value_part[1..1 + value_end].to_string()));
        rest = value_part[value_end + 2..].trim_start();
    }
    Some((name.to_string(), attrs))
}

fn parse_number<T: std::str::FromStr>(value: Option<&str>, default: T) -> Option<T> {
    match value {
        None => Some(default),
        Some(v) => v.trim().parse().ok(),
    }
}

/// Width and height multipliers for a `<font size=...>` name.
fn font_size(name: &str) -> Option<(u8, u8)> {
    let size = match name {
        "normal" => (1, 1),
        "wide" => (2, 1),
        "tall" => (1, 2),
        "big" => (2, 2),
        "big-2" => (3, 3),
        "big-3" => (4, 4),
        "big-4" => (5, 5),
        "big-5" => (6, 6),
        "big-6" => (7, 7),
        _ => return None,
    };
    Some(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(result: Result<PrintSpec, EncodingError>) -> (String, usize, &'static str) {
        match result {
            Err(EncodingError::MalformedMarkup {
                tag,
                position,
                reason,
            }) => (tag, position, reason),
            other => panic!("expected MalformedMarkup, got {:?}", other),
        }
    }

    #[test]
    fn test_alignment() {
        let spec = parse("[C]Hi[/C]").unwrap();
        assert_eq!(
            spec.commands(),
            &[Command::SetAlignment(Alignment::Center), Command::text("Hi")]
        );
    }

    #[test]
    fn test_lines_keep_newlines() {
        let spec = parse("[L]one\n[R]two\n").unwrap();
        assert_eq!(
            spec.commands(),
            &[
                Command::SetAlignment(Alignment::Left),
                Command::text("one\n"),
                Command::SetAlignment(Alignment::Right),
                Command::text("two\n"),
            ]
        );
    }

    #[test]
    fn test_bold_span() {
        let spec = parse("a<b>b</b>c").unwrap();
        assert_eq!(
            spec.commands(),
            &[
                Command::text("a"),
                Command::SetEmphasis(true),
                Command::text("b"),
                Command::SetEmphasis(false),
                Command::text("c"),
            ]
        );
    }

    #[test]
    fn test_nested_spans_restore() {
        let spec = parse("<u><font size='big'>X</font></u>").unwrap();
        assert_eq!(
            spec.commands(),
            &[
                Command::SetUnderline(Underline::Single),
                Command::SetFontSize { width: 2, height: 2 },
                Command::text("X"),
                Command::SetFontSize { width: 1, height: 1 },
                Command::SetUnderline(Underline::Off),
            ]
        );
    }

    #[test]
    fn test_double_underline() {
        let spec = parse("<u type='double'>x</u>").unwrap();
        assert_eq!(spec.commands()[0], Command::SetUnderline(Underline::Double));
    }

    #[test]
    fn test_inner_bold_restores_bold() {
        let spec = parse("<b><b>x</b>y</b>").unwrap();
        assert_eq!(spec.commands()[3], Command::SetEmphasis(true));
        assert_eq!(spec.commands()[5], Command::SetEmphasis(false));
    }

    #[test]
    fn test_font_sizes() {
        for (name, expected) in [("wide", (2, 1)), ("tall", (1, 2)), ("big-6", (7, 7))] {
            let spec = parse(&format!("<font size='{}'>x</font>", name)).unwrap();
            assert_eq!(
                spec.commands()[0],
                Command::SetFontSize {
                    width: expected.0,
                    height: expected.1
                }
            );
        }
    }

    #[test]
    fn test_escapes() {
        let spec = parse(r"\[C] \<b> \\ \n").unwrap();
        assert_eq!(spec.commands(), &[Command::text(r"[C] <b> \ \n")]);
    }

    #[test]
    fn test_barcode_tag() {
        let spec =
            parse("<barcode type='ean8' height='10' width='2' text='none'>1234567</barcode>!")
                .unwrap();
        assert_eq!(
            spec.commands(),
            &[
                Command::Barcode(BarcodeSpec {
                    kind: BarcodeKind::Ean8,
                    data: "1234567".to_string(),
                    height: 80,
                    module_width: 2,
                    hri: HriPosition::None,
                }),
                Command::text("!"),
            ]
        );
    }

    #[test]
    fn test_qrcode_tag() {
        let spec = parse(r#"[C]<qrcode size="4" ecc="H">https://x.io/?a=<b></qrcode>"#).unwrap();
        assert_eq!(
            spec.commands()[1],
            Command::QrCode(QrSpec {
                data: "https://x.io/?a=<b>".to_string(),
                module_size: 4,
                ecc: QrErrorLevel::H,
            })
        );
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(
            reason(parse("ok <blink>x</blink>")),
            ("<blink>".to_string(), 3, "unknown tag")
        );
        assert_eq!(reason(parse("[X]")), ("[X]".to_string(), 0, "unknown tag"));
    }

    #[test]
    fn test_unterminated_tag() {
        let (tag, position, why) = reason(parse("hello <b world"));
        assert_eq!(position, 6);
        assert!(tag.starts_with("<b"));
        assert_eq!(why, "unterminated tag");
    }

    #[test]
    fn test_unclosed_span() {
        assert_eq!(
            reason(parse("x<b>bold")),
            ("<b>".to_string(), 1, "unclosed tag")
        );
    }

    #[test]
    fn test_mismatched_closer() {
        let (_, position, why) = reason(parse("<b><u>x</b></u>"));
        assert_eq!(position, 7);
        assert_eq!(why, "closing tag does not match");

        let (_, _, why) = reason(parse("[C]x[/R]"));
        assert_eq!(why, "closing tag does not match");
    }

    #[test]
    fn test_position_counts_characters() {
        let (_, position, _) = reason(parse("ñandú <x>"));
        assert_eq!(position, 6);
    }

    #[test]
    fn test_bad_attribute() {
        let (_, _, why) = reason(parse("<font size='huge'>x</font>"));
        assert_eq!(why, "unknown font size");
        let (_, _, why) = reason(parse("<b color='red'>x</b>"));
        assert_eq!(why, "unknown attribute");
    }

    #[test]
    fn test_profile_dpi_converts_height() {
        let profile = PrinterProfile {
            dpi: 300,
            ..PrinterProfile::MM80
        };
        let spec = MarkupParser::new(&profile)
            .parse("<barcode type='code39' height='5'>A</barcode>")
            .unwrap();
        let Command::Barcode(barcode) = &spec.commands()[0] else {
            panic!("expected barcode");
        };
        assert_eq!(barcode.height, 59);
    }
}
