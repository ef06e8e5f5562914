//! Font metrics for the base-14 PDF fonts.
//!
//! Documents are rendered with the standard Helvetica, Times and Courier
//! faces, which every PDF reader provides, so nothing is embedded. Text is
//! measured from the Adobe AFM advance widths (units per 1000 em) after
//! mapping each character to WinAnsiEncoding, the encoding the renderer
//! writes.

use std::collections::HashMap;

use crate::style::{ComputedStyle, FontFamily};

/// Identifies one face of a family.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct FontKey {
    pub family: FontFamily,
    pub bold: bool,
    pub italic: bool,
}

impl FontKey {
    pub fn from_style(style: &ComputedStyle) -> Self {
        Self {
            family: style.font_family,
            bold: style.is_bold(),
            italic: style.is_italic(),
        }
    }

    /// PostScript name of the base-14 face.
    pub fn postscript_name(&self) -> &'static str {
        match (self.family, self.bold, self.italic) {
            (FontFamily::Sans, false, false) => "Helvetica",
            (FontFamily::Sans, true, false) => "Helvetica-Bold",
            (FontFamily::Sans, false, true) => "Helvetica-Oblique",
            (FontFamily::Sans, true, true) => "Helvetica-BoldOblique",
            (FontFamily::Serif, false, false) => "Times-Roman",
            (FontFamily::Serif, true, false) => "Times-Bold",
            (FontFamily::Serif, false, true) => "Times-Italic",
            (FontFamily::Serif, true, true) => "Times-BoldItalic",
            (FontFamily::Mono, false, false) => "Courier",
            (FontFamily::Mono, true, false) => "Courier-Bold",
            (FontFamily::Mono, false, true) => "Courier-Oblique",
            (FontFamily::Mono, true, true) => "Courier-BoldOblique",
        }
    }

    /// Inverse of [`FontKey::postscript_name`].
    pub fn from_postscript_name(name: &str) -> Option<Self> {
        let family = if name.starts_with("Helvetica") {
            FontFamily::Sans
        } else if name.starts_with("Times") {
            FontFamily::Serif
        } else if name.starts_with("Courier") {
            FontFamily::Mono
        } else {
            return None;
        };
        Some(Self {
            family,
            bold: name.contains("Bold"),
            italic: name.contains("Oblique") || name.contains("Italic"),
        })
    }
}

/// Advance widths for printable ASCII (0x20..=0x7E), in 1/1000 em.
type AsciiWidths = [u16; 95];

#[rustfmt::skip]
const HELVETICA: AsciiWidths = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: AsciiWidths = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN: AsciiWidths = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD: AsciiWidths = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

/// Face metrics needed by line layout.
#[derive(Debug, Clone, Copy)]
pub struct FontData {
    widths: Option<&'static AsciiWidths>,
    /// Advance used for every glyph when `widths` is `None` (Courier).
    fixed_advance: u16,
    pub ascender: f32,
    pub descender: f32,
}

impl FontData {
    fn char_advance(&self, byte: u8) -> u16 {
        let Some(widths) = self.widths else {
            return self.fixed_advance;
        };
        match byte {
            0x20..=0x7E => widths[(byte - 0x20) as usize],
            // Upper half of WinAnsi: use the closest ASCII shape.
            0x95 => 350,                                      // bullet
            0x96 => widths[(b'-' - 0x20) as usize] + 223,     // en dash
            0x97 | 0x89 | 0x99 => 1000,                       // em dash, per mille, trademark
            0x85 => 1000,                                     // ellipsis
            0x91 | 0x92 | 0x82 => widths[(b'\'' - 0x20) as usize] + 31,
            0x93 | 0x94 | 0x84 => widths[(b'"' - 0x20) as usize],
            0x80 => widths[(b'0' - 0x20) as usize],           // euro
            0xC0..=0xDF => widths[(b'A' - 0x20) as usize],
            0xE0..=0xFF => widths[(b'a' - 0x20) as usize],
            _ => widths[(b'o' - 0x20) as usize],
        }
    }
}

/// Registry of the base-14 faces and their metrics.
pub struct FontManager {
    fonts: HashMap<FontKey, FontData>,
}

impl FontManager {
    pub fn new() -> Self {
        let mut fonts = HashMap::new();
        for bold in [false, true] {
            for italic in [false, true] {
                let sans = if bold { &HELVETICA_BOLD } else { &HELVETICA };
                let serif = if bold { &TIMES_BOLD } else { &TIMES_ROMAN };
                fonts.insert(
                    FontKey { family: FontFamily::Sans, bold, italic },
                    FontData { widths: Some(sans), fixed_advance: 556, ascender: 718.0, descender: -207.0 },
                );
                fonts.insert(
                    FontKey { family: FontFamily::Serif, bold, italic },
                    FontData { widths: Some(serif), fixed_advance: 500, ascender: 683.0, descender: -217.0 },
                );
                fonts.insert(
                    FontKey { family: FontFamily::Mono, bold, italic },
                    FontData { widths: None, fixed_advance: 600, ascender: 629.0, descender: -157.0 },
                );
            }
        }
        Self { fonts }
    }

    /// Get font data for a key. Every base-14 face is registered.
    pub fn get(&self, key: &FontKey) -> FontData {
        self.fonts.get(key).copied().unwrap_or(FontData {
            widths: Some(&HELVETICA),
            fixed_advance: 556,
            ascender: 718.0,
            descender: -207.0,
        })
    }

    /// Width of `text` in points at `font_size`.
    pub fn measure_text_width(&self, text: &str, font_size: f32, key: &FontKey) -> f32 {
        let data = self.get(key);
        let units: u32 = text
            .chars()
            .map(|c| u32::from(data.char_advance(win_ansi_byte(c))))
            .sum();
        units as f32 * font_size / 1000.0
    }

    /// Distance from the baseline to the top of the tallest glyphs.
    pub fn ascender(&self, font_size: f32, key: &FontKey) -> f32 {
        self.get(key).ascender * font_size / 1000.0
    }
}

impl Default for FontManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a character to its WinAnsiEncoding byte; unmappable characters become
/// `?`.
pub fn win_ansi_byte(c: char) -> u8 {
    match c {
        '\u{20AC}' => 0x80, // euro
        '\u{201A}' => 0x82, // single low-9 quote
        '\u{0192}' => 0x83, // florin
        '\u{201E}' => 0x84, // double low-9 quote
        '\u{2026}' => 0x85, // ellipsis
        '\u{2020}' => 0x86, // dagger
        '\u{2021}' => 0x87, // double dagger
        '\u{02C6}' => 0x88, // circumflex
        '\u{2030}' => 0x89, // per mille
        '\u{0160}' => 0x8A, // S caron
        '\u{2039}' => 0x8B, // single left angle quote
        '\u{0152}' => 0x8C, // OE
        '\u{017D}' => 0x8E, // Z caron
        '\u{2018}' => 0x91, // left single quote
        '\u{2019}' => 0x92, // right single quote
        '\u{201C}' => 0x93, // left double quote
        '\u{201D}' => 0x94, // right double quote
        '\u{2022}' | '\u{25AA}' | '\u{25A0}' => 0x95, // bullet, squares
        '\u{2013}' => 0x96, // en-dash
        '\u{2014}' => 0x97, // em-dash
        '\u{02DC}' => 0x98, // small tilde
        '\u{2122}' => 0x99, // trademark
        '\u{0161}' => 0x9A, // s caron
        '\u{203A}' => 0x9B, // single right angle quote
        '\u{0153}' => 0x9C, // oe
        '\u{017E}' => 0x9E, // z caron
        '\u{0178}' => 0x9F, // Y diaeresis
        '\u{25E6}' => b'o', // white bullet
        '\u{00A0}' | '\t' => 0x20,
        c if (c as u32) >= 0x20 && (c as u32) < 0x7F => c as u8,
        c if (c as u32) >= 0xA0 && (c as u32) < 0x100 => c as u8,
        _ => b'?',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(family: FontFamily, bold: bool) -> FontKey {
        FontKey {
            family,
            bold,
            italic: false,
        }
    }

    #[test]
    fn helvetica_widths() {
        let mgr = FontManager::default();
        // H 722 + e 556 + l 222 + l 222 + o 556 = 2278
        let w = mgr.measure_text_width("Hello", 10.0, &key(FontFamily::Sans, false));
        assert!((w - 22.78).abs() < 0.01);
        let bold = mgr.measure_text_width("Hello", 10.0, &key(FontFamily::Sans, true));
        assert!(bold > w);
    }

    #[test]
    fn courier_is_monospaced() {
        let mgr = FontManager::default();
        let k = key(FontFamily::Mono, false);
        assert_eq!(
            mgr.measure_text_width("iiii", 10.0, &k),
            mgr.measure_text_width("MMMM", 10.0, &k)
        );
        assert!((mgr.measure_text_width("ab", 10.0, &k) - 12.0).abs() < 0.001);
    }

    #[test]
    fn postscript_names_round_trip() {
        for family in [FontFamily::Sans, FontFamily::Serif, FontFamily::Mono] {
            for bold in [false, true] {
                for italic in [false, true] {
                    let k = FontKey { family, bold, italic };
                    assert_eq!(FontKey::from_postscript_name(k.postscript_name()), Some(k));
                }
            }
        }
    }

    #[test]
    fn win_ansi_mapping() {
        assert_eq!(win_ansi_byte('A'), b'A');
        assert_eq!(win_ansi_byte('é'), 0xE9);
        assert_eq!(win_ansi_byte('\u{2014}'), 0x97);
        assert_eq!(win_ansi_byte('\u{4E2D}'), b'?');
    }
}
