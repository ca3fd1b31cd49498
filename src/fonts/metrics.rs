//! Glyph advance widths.
//!
//! Widths come from the font dictionary when present (`/Widths` for simple
//! fonts, `/W` for composite fonts). The standard-14 fonts may omit them, so
//! their printable-ASCII advances are tabulated here. All widths are in
//! thousandths of a text-space unit.

use serde::{Deserialize, Serialize};

/// Helvetica, codes 32..=126.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

/// Helvetica-Bold, codes 32..=126.
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Times-Roman, codes 32..=126.
const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

/// Times-Bold, codes 32..=126.
const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

/// The standard-14 font families every PDF consumer provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
    Symbol,
    ZapfDingbats,
}

impl StandardFont {
    /// All fourteen fonts.
    pub const ALL: [StandardFont; 14] = [
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::HelveticaOblique,
        StandardFont::HelveticaBoldOblique,
        StandardFont::TimesRoman,
        StandardFont::TimesBold,
        StandardFont::TimesItalic,
        StandardFont::TimesBoldItalic,
        StandardFont::Courier,
        StandardFont::CourierBold,
        StandardFont::CourierOblique,
        StandardFont::CourierBoldOblique,
        StandardFont::Symbol,
        StandardFont::ZapfDingbats,
    ];

    /// The PostScript name used as `/BaseFont`.
    pub fn base_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
            StandardFont::Symbol => "Symbol",
            StandardFont::ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Four-letter short name, as accepted in font mapping files.
    pub fn short_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "helv",
            StandardFont::HelveticaBold => "hebo",
            StandardFont::HelveticaOblique => "heit",
            StandardFont::HelveticaBoldOblique => "hebi",
            StandardFont::TimesRoman => "tiro",
            StandardFont::TimesBold => "tibo",
            StandardFont::TimesItalic => "tiit",
            StandardFont::TimesBoldItalic => "tibi",
            StandardFont::Courier => "cour",
            StandardFont::CourierBold => "cobo",
            StandardFont::CourierOblique => "coit",
            StandardFont::CourierBoldOblique => "cobi",
            StandardFont::Symbol => "symb",
            StandardFont::ZapfDingbats => "zadb",
        }
    }

    /// Look up a font by exact PostScript name or short name (case-insensitive).
    pub fn from_name(name: &str) -> Option<StandardFont> {
        let name = name.trim();
        StandardFont::ALL.into_iter().find(|f| {
            f.base_name().eq_ignore_ascii_case(name) || f.short_name().eq_ignore_ascii_case(name)
        })
    }

    /// Best standard-14 stand-in for an arbitrary font name.
    ///
    /// Used for metrics of non-embedded fonts that carry no `/Widths`.
    pub fn closest(name: &str) -> StandardFont {
        if let Some(f) = StandardFont::from_name(name) {
            return f;
        }
        let lower = name.to_ascii_lowercase();
        let bold = ["bold", "black", "heavy", "semibold", "demi"]
            .iter()
            .any(|w| lower.contains(w));
        let italic = lower.contains("italic") || lower.contains("oblique");

        if lower.contains("symbol") {
            return StandardFont::Symbol;
        }
        if lower.contains("dingbat") {
            return StandardFont::ZapfDingbats;
        }
        if lower.contains("courier") || lower.contains("mono") {
            return match (bold, italic) {
                (true, true) => StandardFont::CourierBoldOblique,
                (true, false) => StandardFont::CourierBold,
                (false, true) => StandardFont::CourierOblique,
                (false, false) => StandardFont::Courier,
            };
        }
        let serif = lower.contains("times")
            || (lower.contains("serif") && !lower.contains("sans"))
            || lower.contains("georgia")
            || lower.contains("garamond");
        match (serif, bold, italic) {
            (true, true, true) => StandardFont::TimesBoldItalic,
            (true, true, false) => StandardFont::TimesBold,
            (true, false, true) => StandardFont::TimesItalic,
            (true, false, false) => StandardFont::TimesRoman,
            (false, true, true) => StandardFont::HelveticaBoldOblique,
            (false, true, false) => StandardFont::HelveticaBold,
            (false, false, true) => StandardFont::HelveticaOblique,
            (false, false, false) => StandardFont::Helvetica,
        }
    }

    pub fn is_monospaced(self) -> bool {
        matches!(
            self,
            StandardFont::Courier
                | StandardFont::CourierBold
                | StandardFont::CourierOblique
                | StandardFont::CourierBoldOblique
        )
    }

    /// Symbolic fonts have their own built-in encoding.
    pub fn is_symbolic(self) -> bool {
        matches!(self, StandardFont::Symbol | StandardFont::ZapfDingbats)
    }

    /// Advance width of a character code (WinAnsi), in 1/1000 em.
    pub fn width(self, code: u32) -> f32 {
        // oblique and italic cuts share the upright advances closely enough
        let table = match self {
            StandardFont::Helvetica | StandardFont::HelveticaOblique => &HELVETICA,
            StandardFont::HelveticaBold | StandardFont::HelveticaBoldOblique => &HELVETICA_BOLD,
            StandardFont::TimesRoman | StandardFont::TimesItalic => &TIMES_ROMAN,
            StandardFont::TimesBold | StandardFont::TimesBoldItalic => &TIMES_BOLD,
            StandardFont::Symbol => return 500.0,
            StandardFont::ZapfDingbats => return 788.0,
            _ => return 600.0,
        };
        match code {
            32..=126 => f32::from(table[(code - 32) as usize]),
            160 => f32::from(table[0]),
            _ => self.default_width(),
        }
    }

    fn default_width(self) -> f32 {
        match self {
            StandardFont::TimesRoman
            | StandardFont::TimesBold
            | StandardFont::TimesItalic
            | StandardFont::TimesBoldItalic => 500.0,
            StandardFont::Symbol => 500.0,
            StandardFont::ZapfDingbats => 788.0,
            _ if self.is_monospaced() => 600.0,
            _ => 556.0,
        }
    }

    /// Length of `text` set in this font at `size`, in points.
    ///
    /// Characters are measured by their WinAnsi code; those without one
    /// count with the font's average width.
    pub fn text_length(self, text: &str, size: f32) -> f32 {
        text.chars()
            .map(|c| match win_ansi_code(c) {
                Some(code) => self.width(u32::from(code)),
                None => self.default_width(),
            })
            .sum::<f32>()
            * size
            / 1000.0
    }
}

/// Characters of the WinAnsi codes 0x80..=0x9F; `None` marks unused codes.
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

/// WinAnsi code of a character, if the encoding has one.
pub fn win_ansi_code(c: char) -> Option<u8> {
    match u32::from(c) {
        code @ (0..=0x7F | 0xA0..=0xFF) => u8::try_from(code).ok(),
        _ => WIN_ANSI_HIGH
            .iter()
            .position(|entry| *entry == Some(c))
            .and_then(|i| u8::try_from(0x80 + i).ok()),
    }
}

/// Encode text for a font declared with `/WinAnsiEncoding`; characters the
/// encoding lacks become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(|c| win_ansi_code(c).unwrap_or(b'?')).collect()
}

impl std::fmt::Display for StandardFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.base_name())
    }
}

/// Advance widths of one font.
#[derive(Debug, Clone, PartialEq)]
pub enum FontWidths {
    /// Simple font: `/FirstChar` and `/Widths`, with `/MissingWidth` fallback.
    Simple {
        first_char: u32,
        widths: Vec<f32>,
        missing: f32,
    },
    /// Composite font: `/W` ranges as `(first, last, width)` and `/DW`.
    Composite {
        ranges: Vec<(u32, u32, f32)>,
        default: f32,
    },
    /// Non-embedded standard font without explicit widths.
    Standard(StandardFont),
}

impl FontWidths {
    /// Advance of a character code, in 1/1000 text space units.
    pub fn width(&self, code: u32) -> f32 {
        match self {
            FontWidths::Simple {
                first_char,
                widths,
                missing,
            } => code
                .checked_sub(*first_char)
                .and_then(|i| widths.get(i as usize))
                .copied()
                .unwrap_or(*missing),
            FontWidths::Composite { ranges, default } => ranges
                .iter()
                .find(|(first, last, _)| (*first..=*last).contains(&code))
                .map(|(_, _, w)| *w)
                .unwrap_or(*default),
            FontWidths::Standard(font) => font.width(code),
        }
    }

    /// Parse a composite font `/W` array (already flattened to numbers and
    /// nested arrays).
    ///
    /// Two forms are allowed: `c [w1 w2 ...]` and `c_first c_last w`.
    pub fn parse_w(items: &[WEntry]) -> Vec<(u32, u32, f32)> {
        let mut ranges = Vec::new();
        let mut i = 0;
        while i < items.len() {
            match (items.get(i), items.get(i + 1), items.get(i + 2)) {
                (Some(WEntry::Number(first)), Some(WEntry::List(ws)), _) => {
                    let first = *first as u32;
                    for (k, w) in ws.iter().enumerate() {
                        let code = first + k as u32;
                        ranges.push((code, code, *w));
                    }
                    i += 2;
                }
                (
                    Some(WEntry::Number(first)),
                    Some(WEntry::Number(last)),
                    Some(WEntry::Number(w)),
                ) => {
                    ranges.push((*first as u32, *last as u32, *w));
                    i += 3;
                }
                _ => {
                    log::debug!("Malformed /W array at position {}", i);
                    break;
                }
            }
        }
        ranges
    }
}

/// One element of a `/W` array.
#[derive(Debug, Clone, PartialEq)]
pub enum WEntry {
    Number(f32),
    List(Vec<f32>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_lookup() {
        assert_eq!(StandardFont::from_name("helv"), Some(StandardFont::Helvetica));
        assert_eq!(
            StandardFont::from_name("Times-BoldItalic"),
            Some(StandardFont::TimesBoldItalic)
        );
        assert_eq!(StandardFont::from_name("Arial"), None);
        assert_eq!(StandardFont::closest("Arial,Bold"), StandardFont::HelveticaBold);
        assert_eq!(
            StandardFont::closest("TimesNewRomanPS-ItalicMT"),
            StandardFont::TimesItalic
        );
        assert_eq!(StandardFont::closest("DejaVuSansMono"), StandardFont::Courier);
    }

    #[test]
    fn test_standard_widths() {
        assert_eq!(StandardFont::Helvetica.width(b' ' as u32), 278.0);
        assert_eq!(StandardFont::Helvetica.width(b'W' as u32), 944.0);
        assert_eq!(StandardFont::TimesRoman.width(b'a' as u32), 444.0);
        assert_eq!(StandardFont::Courier.width(b'i' as u32), 600.0);
        // "Hello" in Helvetica: 722 + 556 + 222 + 222 + 556
        let len = StandardFont::Helvetica.text_length("Hello", 10.0);
        assert!((len - 22.78).abs() < 1e-3);
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(
            encode_win_ansi("Caf\u{e9} \u{2019}\u{201C}ok\u{201D} \u{2013}\u{2014} \u{20AC}\u{2022}\u{2122}"),
            b"Caf\xe9 \x92\x93ok\x94 \x96\x97 \x80\x95\x99".to_vec()
        );
        // C1 controls and characters outside the code page
        assert_eq!(encode_win_ansi("\u{0092}\u{4E2D}"), b"??".to_vec());
        assert_eq!(win_ansi_code('\u{0178}'), Some(0x9F));
        assert_eq!(win_ansi_code('\u{00A0}'), Some(0xA0));
    }

    #[test]
    fn test_simple_widths() {
        let widths = FontWidths::Simple {
            first_char: 65,
            widths: vec![600.0, 700.0],
            missing: 250.0,
        };
        assert_eq!(widths.width(65), 600.0);
        assert_eq!(widths.width(66), 700.0);
        assert_eq!(widths.width(67), 250.0);
        assert_eq!(widths.width(10), 250.0);
    }

    #[test]
    fn test_parse_w() {
        let items = vec![
            WEntry::Number(1.0),
            WEntry::List(vec![500.0, 600.0]),
            WEntry::Number(10.0),
            WEntry::Number(20.0),
            WEntry::Number(1000.0),
        ];
        let ranges = FontWidths::parse_w(&items);
        let widths = FontWidths::Composite {
            ranges,
            default: 1000.0,
        };
        assert_eq!(widths.width(1), 500.0);
        assert_eq!(widths.width(2), 600.0);
        assert_eq!(widths.width(15), 1000.0);
        assert_eq!(widths.width(3), 1000.0);
    }
}
