//! Style resolver – runs the CSS cascade over the DOM and produces a flat
//! [`ComputedStyle`] per element for the layout engine.
//!
//! Cascade order, lowest to highest: the built-in user-agent sheet, author
//! sheets (`<style>` elements), the `style` attribute, author `!important`,
//! inline `!important`. Within one level, specificity then source order
//! decide. All lengths are resolved to PDF points (1px = 0.75pt).

use std::collections::HashMap;

use crate::css::{parse_declarations, parse_stylesheet, Declaration, PathEntry, Stylesheet};
use crate::dom::{DomNode, ElementNode, Tag};

/// Points per CSS pixel.
pub const PT_PER_PX: f32 = 0.75;

/// Initial font size: 16px.
pub const ROOT_FONT_SIZE: f32 = 12.0;

/// Browser-like defaults for the elements the HTML renderer emits.
pub const USER_AGENT_CSS: &str = r#"
html, body, div, p, h1, h2, h3, h4, h5, h6, ul, ol, blockquote, pre, hr,
section, article, header, footer, nav, main, aside, figure, figcaption,
address, dl, dt, dd, form, fieldset, details, summary { display: block; }
li { display: list-item; }
table { display: table; }
thead, tbody, tfoot { display: table-row-group; }
tr { display: table-row; }
td, th { display: table-cell; padding: 1px; }
head, style, script, title, meta, link, template, base, noscript { display: none; }
body { margin: 8px; }
h1 { font-size: 2em; font-weight: bold; margin: 0.67em 0; }
h2 { font-size: 1.5em; font-weight: bold; margin: 0.83em 0; }
h3 { font-size: 1.17em; font-weight: bold; margin: 1em 0; }
h4 { font-size: 1em; font-weight: bold; margin: 1.33em 0; }
h5 { font-size: 0.83em; font-weight: bold; margin: 1.67em 0; }
h6 { font-size: 0.67em; font-weight: bold; margin: 2.33em 0; }
h1, h2, h3, h4, h5, h6 { page-break-after: avoid; }
p, ul, ol, pre, dl { margin: 1em 0; }
blockquote { margin: 1em 40px; }
ul, ol { padding-left: 40px; }
ul { list-style-type: disc; }
ol { list-style-type: decimal; }
ul ul, ol ul { list-style-type: circle; }
ul ul ul, ul ol ul, ol ul ul, ol ol ul { list-style-type: square; }
ul ul, ul ol, ol ul, ol ol { margin-top: 0; margin-bottom: 0; }
strong, b, th { font-weight: bold; }
em, i, cite, var, dfn { font-style: italic; }
u, ins { text-decoration: underline; }
s, del, strike { text-decoration: line-through; }
a { color: #0000ee; text-decoration: underline; }
code, kbd, samp, pre, tt { font-family: monospace; }
pre { white-space: pre; }
small { font-size: smaller; }
th { text-align: center; }
hr { border-top: 1px solid #808080; margin: 0.5em 0; }
img, tr { page-break-inside: avoid; }
"#;

/// Fully resolved style for a single element.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    // Display / layout
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub flex_wrap: FlexWrap,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub gap: f32,

    // Sizing
    pub width: Dimension,
    pub height: Dimension,
    pub min_width: Dimension,
    pub max_width: Dimension,

    // Spacing (pt)
    pub margin_top: Margin,
    pub margin_right: Margin,
    pub margin_bottom: Margin,
    pub margin_left: Margin,
    pub padding_top: f32,
    pub padding_right: f32,
    pub padding_bottom: f32,
    pub padding_left: f32,

    // Border
    pub border_top: BorderSide,
    pub border_right: BorderSide,
    pub border_bottom: BorderSide,
    pub border_left: BorderSide,

    // Typography (inherited)
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_family: FontFamily,
    pub font_style: FontStyle,
    pub color: Color,
    pub text_align: TextAlign,
    /// Multiple of `font_size`.
    pub line_height: f32,
    pub text_decoration: TextDecoration,
    pub text_transform: TextTransform,
    pub white_space: WhiteSpace,
    pub list_style_type: ListStyleType,

    // Background
    pub background_color: Color,

    // Page break
    pub page_break_before: bool,
    pub page_break_after: bool,
    pub page_break_inside_avoid: bool,
    pub page_break_after_avoid: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Inline,
            flex_direction: FlexDirection::Row,
            flex_wrap: FlexWrap::NoWrap,
            flex_grow: 0.0,
            flex_shrink: 1.0,
            justify_content: JustifyContent::Start,
            align_items: AlignItems::Stretch,
            gap: 0.0,
            width: Dimension::Auto,
            height: Dimension::Auto,
            min_width: Dimension::Auto,
            max_width: Dimension::Auto,
            margin_top: Margin::ZERO,
            margin_right: Margin::ZERO,
            margin_bottom: Margin::ZERO,
            margin_left: Margin::ZERO,
            padding_top: 0.0,
            padding_right: 0.0,
            padding_bottom: 0.0,
            padding_left: 0.0,
            border_top: BorderSide::NONE,
            border_right: BorderSide::NONE,
            border_bottom: BorderSide::NONE,
            border_left: BorderSide::NONE,
            font_size: ROOT_FONT_SIZE,
            font_weight: FontWeight::Normal,
            font_family: FontFamily::Sans,
            font_style: FontStyle::Normal,
            color: Color::BLACK,
            text_align: TextAlign::Left,
            line_height: 1.2,
            text_decoration: TextDecoration::None,
            text_transform: TextTransform::None,
            white_space: WhiteSpace::Normal,
            list_style_type: ListStyleType::Disc,
            background_color: Color::TRANSPARENT,
            page_break_before: false,
            page_break_after: false,
            page_break_inside_avoid: false,
            page_break_after_avoid: false,
        }
    }
}

impl ComputedStyle {
    /// Initial values with the inherited properties copied from `parent`.
    pub fn inherit_from(parent: &ComputedStyle) -> Self {
        Self {
            font_size: parent.font_size,
            font_weight: parent.font_weight,
            font_family: parent.font_family,
            font_style: parent.font_style,
            color: parent.color,
            text_align: parent.text_align,
            line_height: parent.line_height,
            text_decoration: parent.text_decoration,
            text_transform: parent.text_transform,
            white_space: parent.white_space,
            list_style_type: parent.list_style_type,
            ..Self::default()
        }
    }

    pub fn is_bold(&self) -> bool {
        self.font_weight == FontWeight::Bold
    }

    pub fn is_italic(&self) -> bool {
        self.font_style == FontStyle::Italic
    }

    /// Line box height in points.
    pub fn line_height_pt(&self) -> f32 {
        self.font_size * self.line_height
    }

    pub fn is_block_level(&self) -> bool {
        !matches!(
            self.display,
            Display::Inline | Display::InlineBlock | Display::None
        )
    }

    /// Border colour of a side, falling back to `currentColor`.
    pub fn border_color(&self, side: &BorderSide) -> Color {
        side.color.unwrap_or(self.color)
    }

    pub fn has_border(&self) -> bool {
        [
            &self.border_top,
            &self.border_right,
            &self.border_bottom,
            &self.border_left,
        ]
        .iter()
        .any(|s| s.used_width() > 0.0)
    }
}

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Flex,
    Inline,
    InlineBlock,
    ListItem,
    Table,
    TableRowGroup,
    TableRow,
    TableCell,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexWrap {
    NoWrap,
    Wrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustifyContent {
    Start,
    End,
    Center,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignItems {
    Start,
    End,
    Center,
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

/// Generic family, mapped onto the base-14 PDF fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFamily {
    /// Helvetica
    Sans,
    /// Times
    Serif,
    /// Courier
    Mono,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDecoration {
    None,
    Underline,
    LineThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTransform {
    None,
    Uppercase,
    Lowercase,
    Capitalize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteSpace {
    Normal,
    NoWrap,
    /// `pre` and `pre-wrap`: spaces and newlines kept, long lines wrapped.
    Pre,
    PreLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyleType {
    Disc,
    Circle,
    Square,
    Decimal,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Pt(f32),
    /// 0 – 100
    Percent(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Margin {
    Pt(f32),
    Auto,
}

impl Margin {
    pub const ZERO: Self = Margin::Pt(0.0);

    /// Fixed size; `auto` counts as zero.
    pub fn pt(self) -> f32 {
        match self {
            Margin::Pt(v) => v,
            Margin::Auto => 0.0,
        }
    }

    pub fn is_auto(self) -> bool {
        self == Margin::Auto
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderSide {
    pub width: f32,
    /// `false` for `border-style: none | hidden` (the initial value).
    pub visible: bool,
    /// `None` means `currentColor`.
    pub color: Option<Color>,
}

impl BorderSide {
    pub const NONE: Self = Self {
        width: 3.0 * PT_PER_PX,
        visible: false,
        color: None,
    };

    pub fn used_width(&self) -> f32 {
        if self.visible {
            self.width
        } else {
            0.0
        }
    }
}

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
        let short = |i: usize| channel(&hex[i..i + 1].repeat(2));
        let (r, g, b, a) = match hex.len() {
            3 => (short(0)?, short(1)?, short(2)?, 1.0),
            4 => (short(0)?, short(1)?, short(2)?, short(3)?),
            6 => (channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?, 1.0),
            8 => (
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            ),
            _ => return None,
        };
        Some(Self { r, g, b, a })
    }

    /// Parse any supported colour value. `currentcolor` resolves to
    /// `current`.
    pub fn parse(value: &str, current: Color) -> Option<Self> {
        let v = value.trim().to_ascii_lowercase();
        if v.starts_with('#') {
            return Self::from_hex(&v);
        }
        if let Some(args) = v
            .strip_prefix("rgba(")
            .or_else(|| v.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts: Vec<&str> = args
                .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
                .filter(|p| !p.is_empty())
                .collect();
            if parts.len() < 3 {
                return None;
            }
            let channel = |p: &str| -> Option<f32> {
                match p.strip_suffix('%') {
                    Some(pct) => pct.parse::<f32>().ok().map(|v| v / 100.0),
                    None => p.parse::<f32>().ok().map(|v| v / 255.0),
                }
            };
            let alpha = match parts.get(3) {
                Some(p) => match p.strip_suffix('%') {
                    Some(pct) => pct.parse::<f32>().ok()? / 100.0,
                    None => p.parse::<f32>().ok()?,
                },
                None => 1.0,
            };
            return Some(Self {
                r: channel(parts[0])?.clamp(0.0, 1.0),
                g: channel(parts[1])?.clamp(0.0, 1.0),
                b: channel(parts[2])?.clamp(0.0, 1.0),
                a: alpha.clamp(0.0, 1.0),
            });
        }
        Some(match v.as_str() {
            "currentcolor" => current,
            "transparent" => Self::TRANSPARENT,
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "red" => Self::rgb(255, 0, 0),
            "green" => Self::rgb(0, 128, 0),
            "blue" => Self::rgb(0, 0, 255),
            "navy" => Self::rgb(0, 0, 128),
            "teal" => Self::rgb(0, 128, 128),
            "maroon" => Self::rgb(128, 0, 0),
            "purple" => Self::rgb(128, 0, 128),
            "olive" => Self::rgb(128, 128, 0),
            "orange" => Self::rgb(255, 165, 0),
            "yellow" => Self::rgb(255, 255, 0),
            "silver" => Self::rgb(192, 192, 192),
            "gray" | "grey" => Self::rgb(128, 128, 128),
            "darkgray" | "darkgrey" => Self::rgb(169, 169, 169),
            "lightgray" | "lightgrey" => Self::rgb(211, 211, 211),
            "dimgray" | "dimgrey" => Self::rgb(105, 105, 105),
            "whitesmoke" => Self::rgb(245, 245, 245),
            "steelblue" => Self::rgb(70, 130, 180),
            "darkblue" => Self::rgb(0, 0, 139),
            _ => return None,
        })
    }
}

// ---------------------------------------------------------------------------
// Value parsing
// ---------------------------------------------------------------------------

/// Resolve a CSS length to points. `em` is relative to `font_size`.
pub fn parse_length(value: &str, font_size: f32) -> Option<f32> {
    let v = value.trim().to_ascii_lowercase();
    if v == "0" {
        return Some(0.0);
    }
    let split = v
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(v.len());
    let (number, unit) = v.split_at(split);
    let n: f32 = number.parse().ok()?;
    let pt = match unit {
        "px" => n * PT_PER_PX,
        "pt" => n,
        "pc" => n * 12.0,
        "in" => n * 72.0,
        "cm" => n * 72.0 / 2.54,
        "mm" => n * 72.0 / 25.4,
        "q" => n * 72.0 / 101.6,
        "em" => n * font_size,
        "rem" => n * ROOT_FONT_SIZE,
        "ex" | "ch" => n * font_size * 0.5,
        _ => return None,
    };
    Some(pt)
}

fn parse_dimension(value: &str, font_size: f32) -> Option<Dimension> {
    let v = value.trim();
    match v {
        "auto" | "none" | "initial" => return Some(Dimension::Auto),
        _ => {}
    }
    if let Some(pct) = v.strip_suffix('%') {
        return pct.trim().parse::<f32>().ok().map(Dimension::Percent);
    }
    parse_length(v, font_size).map(Dimension::Pt)
}

fn parse_margin(value: &str, font_size: f32) -> Option<Margin> {
    if value.trim() == "auto" {
        return Some(Margin::Auto);
    }
    if value.trim().ends_with('%') {
        // Percentages need the containing block width; ignored.
        return None;
    }
    parse_length(value, font_size).map(Margin::Pt)
}

/// Expand a 1–4 value box shorthand to `[top, right, bottom, left]`.
fn box_values<T: Copy>(values: &[T]) -> Option<[T; 4]> {
    match *values {
        [a] => Some([a, a, a, a]),
        [v, h] => Some([v, h, v, h]),
        [t, h, b] => Some([t, h, b, h]),
        [t, r, b, l] => Some([t, r, b, l]),
        _ => None,
    }
}

fn font_size_keyword(value: &str, parent_size: f32) -> Option<f32> {
    Some(match value {
        "xx-small" => 9.0 * PT_PER_PX,
        "x-small" => 10.0 * PT_PER_PX,
        "small" => 13.0 * PT_PER_PX,
        "medium" => 16.0 * PT_PER_PX,
        "large" => 18.0 * PT_PER_PX,
        "x-large" => 24.0 * PT_PER_PX,
        "xx-large" => 32.0 * PT_PER_PX,
        "smaller" => parent_size * 0.83,
        "larger" => parent_size * 1.2,
        _ => return None,
    })
}

/// Resolve a `font-size` value against the parent's font size.
pub fn parse_font_size(value: &str, parent_size: f32) -> Option<f32> {
    let v = value.trim().to_ascii_lowercase();
    if let Some(size) = font_size_keyword(&v, parent_size) {
        return Some(size);
    }
    if let Some(pct) = v.strip_suffix('%') {
        return pct.trim().parse::<f32>().ok().map(|p| parent_size * p / 100.0);
    }
    parse_length(&v, parent_size).filter(|s| *s >= 0.0)
}

fn parse_font_weight(value: &str, parent: FontWeight) -> Option<FontWeight> {
    match value {
        "bold" => Some(FontWeight::Bold),
        "normal" => Some(FontWeight::Normal),
        "bolder" => Some(FontWeight::Bold),
        "lighter" => Some(if parent == FontWeight::Bold {
            FontWeight::Normal
        } else {
            parent
        }),
        n => n.parse::<u32>().ok().map(|w| {
            if w >= 600 {
                FontWeight::Bold
            } else {
                FontWeight::Normal
            }
        }),
    }
}

/// Pick the first family in a `font-family` list that maps onto a base-14
/// family.
pub fn parse_font_family(value: &str) -> Option<FontFamily> {
    value.split(',').find_map(|family| {
        let name = family
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .to_ascii_lowercase();
        if name.contains("mono")
            || ["courier", "menlo", "consolas", "monaco", "courier new"]
                .iter()
                .any(|m| name.contains(m))
        {
            Some(FontFamily::Mono)
        } else if name == "sans-serif"
            || name.contains("sans")
            || [
                "helvetica", "arial", "verdana", "tahoma", "segoe", "roboto", "system-ui",
                "-apple-system", "calibri", "inter",
            ]
            .iter()
            .any(|s| name.contains(s))
        {
            Some(FontFamily::Sans)
        } else if name == "serif"
            || ["times", "georgia", "garamond", "palatino", "cambria", "book antiqua"]
                .iter()
                .any(|s| name.contains(s))
        {
            Some(FontFamily::Serif)
        } else {
            None
        }
    })
}

fn parse_line_height(value: &str, font_size: f32) -> Option<f32> {
    let v = value.trim();
    if v == "normal" {
        return Some(1.2);
    }
    if let Ok(factor) = v.parse::<f32>() {
        return Some(factor);
    }
    if let Some(pct) = v.strip_suffix('%') {
        return pct.trim().parse::<f32>().ok().map(|p| p / 100.0);
    }
    if font_size <= 0.0 {
        return None;
    }
    parse_length(v, font_size).map(|pt| pt / font_size)
}

fn parse_list_style_type(value: &str) -> Option<ListStyleType> {
    Some(match value {
        "disc" => ListStyleType::Disc,
        "circle" => ListStyleType::Circle,
        "square" => ListStyleType::Square,
        "decimal" | "decimal-leading-zero" => ListStyleType::Decimal,
        "lower-alpha" | "lower-latin" => ListStyleType::LowerAlpha,
        "upper-alpha" | "upper-latin" => ListStyleType::UpperAlpha,
        "lower-roman" => ListStyleType::LowerRoman,
        "upper-roman" => ListStyleType::UpperRoman,
        "none" => ListStyleType::None,
        _ => return None,
    })
}

fn border_width_value(token: &str, font_size: f32) -> Option<f32> {
    match token {
        "thin" => Some(1.0 * PT_PER_PX),
        "medium" => Some(3.0 * PT_PER_PX),
        "thick" => Some(5.0 * PT_PER_PX),
        t => parse_length(t, font_size),
    }
}

fn border_style_visible(token: &str) -> Option<bool> {
    match token {
        "none" | "hidden" => Some(false),
        "solid" | "dashed" | "dotted" | "double" | "groove" | "ridge" | "inset" | "outset" => {
            Some(true)
        }
        _ => None,
    }
}

/// Parse `border` / `border-<side>` shorthand. Omitted parts reset to their
/// initial values.
fn parse_border_shorthand(value: &str, font_size: f32, current: Color) -> Option<BorderSide> {
    let mut side = BorderSide::NONE;
    for token in value.split_whitespace() {
        if let Some(visible) = border_style_visible(token) {
            side.visible = visible;
        } else if let Some(w) = border_width_value(token, font_size) {
            side.width = w;
        } else if let Some(c) = Color::parse(token, current) {
            side.color = Some(c);
        } else {
            return None;
        }
    }
    Some(side)
}

/// Split a value on whitespace outside of parentheses.
fn value_tokens(value: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0i32;
    let mut start: Option<usize> = None;
    for (i, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    tokens.push(&value[s..i]);
                }
                continue;
            }
            _ => {}
        }
        if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(&value[s..]);
    }
    tokens
}

fn is_break(value: &str) -> bool {
    matches!(value, "always" | "page" | "left" | "right" | "recto" | "verso")
}

// ---------------------------------------------------------------------------
// Property application
// ---------------------------------------------------------------------------

fn sides_mut<T>(top: &mut T, right: &mut T, bottom: &mut T, left: &mut T, values: [T; 4]) {
    let [t, r, b, l] = values;
    *top = t;
    *right = r;
    *bottom = b;
    *left = l;
}

impl ComputedStyle {
    fn border_side_mut(&mut self, side: &str) -> Option<&mut BorderSide> {
        match side {
            "top" => Some(&mut self.border_top),
            "right" => Some(&mut self.border_right),
            "bottom" => Some(&mut self.border_bottom),
            "left" => Some(&mut self.border_left),
            _ => None,
        }
    }

    fn border_sides_mut(&mut self) -> [&mut BorderSide; 4] {
        [
            &mut self.border_top,
            &mut self.border_right,
            &mut self.border_bottom,
            &mut self.border_left,
        ]
    }

    /// Copy one property's value from `from` (for `inherit` and `initial`).
    fn copy_property(&mut self, prop: &str, from: &ComputedStyle) {
        match prop {
            "color" => self.color = from.color,
            "font-size" => self.font_size = from.font_size,
            "font-weight" => self.font_weight = from.font_weight,
            "font-family" => self.font_family = from.font_family,
            "font-style" => self.font_style = from.font_style,
            "line-height" => self.line_height = from.line_height,
            "text-align" => self.text_align = from.text_align,
            "text-decoration" | "text-decoration-line" => {
                self.text_decoration = from.text_decoration
            }
            "text-transform" => self.text_transform = from.text_transform,
            "white-space" => self.white_space = from.white_space,
            "list-style-type" | "list-style" => self.list_style_type = from.list_style_type,
            "background-color" | "background" => self.background_color = from.background_color,
            "display" => self.display = from.display,
            "width" => self.width = from.width,
            "height" => self.height = from.height,
            "max-width" => self.max_width = from.max_width,
            "min-width" => self.min_width = from.min_width,
            "margin" => {
                self.margin_top = from.margin_top;
                self.margin_right = from.margin_right;
                self.margin_bottom = from.margin_bottom;
                self.margin_left = from.margin_left;
            }
            "padding" => {
                self.padding_top = from.padding_top;
                self.padding_right = from.padding_right;
                self.padding_bottom = from.padding_bottom;
                self.padding_left = from.padding_left;
            }
            "border" => {
                self.border_top = from.border_top;
                self.border_right = from.border_right;
                self.border_bottom = from.border_bottom;
                self.border_left = from.border_left;
            }
            _ => {}
        }
    }

    /// Apply one declaration. `font-size` must already be resolved so that
    /// `em` lengths use this element's size.
    pub fn apply_declaration(&mut self, prop: &str, value: &str, parent: &ComputedStyle) {
        let val_lower = value.trim().to_ascii_lowercase();
        let val = val_lower.as_str();
        match val {
            "inherit" => return self.copy_property(prop, parent),
            "initial" | "unset" | "revert" => {
                return self.copy_property(prop, &ComputedStyle::default())
            }
            _ => {}
        }
        let fs = self.font_size;

        match prop {
            "display" => {
                self.display = match val {
                    "block" | "flow-root" => Display::Block,
                    "flex" | "inline-flex" => Display::Flex,
                    "grid" | "inline-grid" => Display::Block,
                    "inline" | "contents" => Display::Inline,
                    "inline-block" => Display::InlineBlock,
                    "list-item" => Display::ListItem,
                    "table" | "inline-table" => Display::Table,
                    "table-row-group" | "table-header-group" | "table-footer-group" => {
                        Display::TableRowGroup
                    }
                    "table-row" => Display::TableRow,
                    "table-cell" => Display::TableCell,
                    "none" => Display::None,
                    _ => self.display,
                }
            }
            "flex-direction" => {
                self.flex_direction = match val {
                    "row" | "row-reverse" => FlexDirection::Row,
                    "column" | "column-reverse" => FlexDirection::Column,
                    _ => self.flex_direction,
                }
            }
            "flex-wrap" => {
                self.flex_wrap = match val {
                    "wrap" | "wrap-reverse" => FlexWrap::Wrap,
                    _ => FlexWrap::NoWrap,
                }
            }
            "flex-grow" => {
                if let Ok(v) = val.parse() {
                    self.flex_grow = v;
                }
            }
            "flex-shrink" => {
                if let Ok(v) = val.parse() {
                    self.flex_shrink = v;
                }
            }
            "flex" => {
                let parts: Vec<&str> = val.split_whitespace().collect();
                match parts.as_slice() {
                    ["none"] => {
                        self.flex_grow = 0.0;
                        self.flex_shrink = 0.0;
                    }
                    ["auto"] => {
                        self.flex_grow = 1.0;
                        self.flex_shrink = 1.0;
                    }
                    [grow, rest @ ..] => {
                        if let Ok(g) = grow.parse() {
                            self.flex_grow = g;
                        }
                        if let Some(Ok(s)) = rest.first().map(|s| s.parse()) {
                            self.flex_shrink = s;
                        }
                    }
                    [] => {}
                }
            }
            "justify-content" => {
                self.justify_content = match val {
                    "flex-start" | "start" | "left" | "normal" => JustifyContent::Start,
                    "flex-end" | "end" | "right" => JustifyContent::End,
                    "center" => JustifyContent::Center,
                    "space-between" => JustifyContent::SpaceBetween,
                    "space-around" => JustifyContent::SpaceAround,
                    "space-evenly" => JustifyContent::SpaceEvenly,
                    _ => self.justify_content,
                }
            }
            "align-items" => {
                self.align_items = match val {
                    "flex-start" | "start" | "baseline" => AlignItems::Start,
                    "flex-end" | "end" => AlignItems::End,
                    "center" => AlignItems::Center,
                    "stretch" | "normal" => AlignItems::Stretch,
                    _ => self.align_items,
                }
            }
            "gap" | "column-gap" | "row-gap" | "grid-gap" => {
                if let Some(v) = val.split_whitespace().next().and_then(|v| parse_length(v, fs)) {
                    self.gap = v;
                }
            }
            "width" => {
                if let Some(d) = parse_dimension(val, fs) {
                    self.width = d;
                }
            }
            "height" => {
                if let Some(d) = parse_dimension(val, fs) {
                    self.height = d;
                }
            }
            "min-width" => {
                if let Some(d) = parse_dimension(val, fs) {
                    self.min_width = d;
                }
            }
            "max-width" => {
                if let Some(d) = parse_dimension(val, fs) {
                    self.max_width = d;
                }
            }
            "margin" => {
                let values: Option<Vec<Margin>> =
                    val.split_whitespace().map(|v| parse_margin(v, fs)).collect();
                if let Some(sides) = values.as_deref().and_then(box_values) {
                    sides_mut(
                        &mut self.margin_top,
                        &mut self.margin_right,
                        &mut self.margin_bottom,
                        &mut self.margin_left,
                        sides,
                    );
                }
            }
            "margin-top" | "margin-right" | "margin-bottom" | "margin-left" => {
                if let Some(m) = parse_margin(val, fs) {
                    match prop {
                        "margin-top" => self.margin_top = m,
                        "margin-right" => self.margin_right = m,
                        "margin-bottom" => self.margin_bottom = m,
                        _ => self.margin_left = m,
                    }
                }
            }
            "padding" => {
                let values: Option<Vec<f32>> =
                    val.split_whitespace().map(|v| parse_length(v, fs)).collect();
                if let Some(sides) = values.as_deref().and_then(box_values) {
                    sides_mut(
                        &mut self.padding_top,
                        &mut self.padding_right,
                        &mut self.padding_bottom,
                        &mut self.padding_left,
                        sides.map(|v| v.max(0.0)),
                    );
                }
            }
            "padding-top" | "padding-right" | "padding-bottom" | "padding-left" => {
                if let Some(p) = parse_length(val, fs).map(|v| v.max(0.0)) {
                    match prop {
                        "padding-top" => self.padding_top = p,
                        "padding-right" => self.padding_right = p,
                        "padding-bottom" => self.padding_bottom = p,
                        _ => self.padding_left = p,
                    }
                }
            }
            "border" => {
                if let Some(side) = parse_border_shorthand(val, fs, self.color) {
                    for s in self.border_sides_mut() {
                        *s = side;
                    }
                }
            }
            "border-width" => {
                let values: Option<Vec<f32>> = val
                    .split_whitespace()
                    .map(|v| border_width_value(v, fs))
                    .collect();
                if let Some(widths) = values.as_deref().and_then(box_values) {
                    for (s, w) in self.border_sides_mut().into_iter().zip(widths) {
                        s.width = w;
                    }
                }
            }
            "border-style" => {
                let values: Option<Vec<bool>> =
                    val.split_whitespace().map(border_style_visible).collect();
                if let Some(styles) = values.as_deref().and_then(box_values) {
                    for (s, v) in self.border_sides_mut().into_iter().zip(styles) {
                        s.visible = v;
                    }
                }
            }
            "border-color" => {
                let current = self.color;
                let values: Option<Vec<Color>> = value_tokens(val)
                    .into_iter()
                    .map(|v| Color::parse(v, current))
                    .collect();
                if let Some(colors) = values.as_deref().and_then(box_values) {
                    for (s, c) in self.border_sides_mut().into_iter().zip(colors) {
                        s.color = Some(c);
                    }
                }
            }
            p if p.starts_with("border-") => {
                let rest = &p["border-".len()..];
                let (side_name, part) = rest.split_once('-').unwrap_or((rest, ""));
                let current = self.color;
                if let Some(side) = self.border_side_mut(side_name) {
                    match part {
                        "" => {
                            if let Some(parsed) = parse_border_shorthand(val, fs, current) {
                                *side = parsed;
                            }
                        }
                        "width" => {
                            if let Some(w) = border_width_value(val, fs) {
                                side.width = w;
                            }
                        }
                        "style" => {
                            if let Some(v) = border_style_visible(val) {
                                side.visible = v;
                            }
                        }
                        "color" => {
                            if let Some(c) = Color::parse(val, current) {
                                side.color = Some(c);
                            }
                        }
                        _ => {}
                    }
                }
            }
            "font-family" => {
                if let Some(f) = parse_font_family(value) {
                    self.font_family = f;
                }
            }
            "font-weight" => {
                if let Some(w) = parse_font_weight(val, parent.font_weight) {
                    self.font_weight = w;
                }
            }
            "font-style" => {
                self.font_style = match val {
                    "italic" | "oblique" => FontStyle::Italic,
                    _ => FontStyle::Normal,
                }
            }
            "font" => self.apply_font_shorthand(value, parent),
            "color" => {
                if let Some(c) = Color::parse(val, parent.color) {
                    self.color = c;
                }
            }
            "background-color" => {
                if let Some(c) = Color::parse(val, self.color) {
                    self.background_color = c;
                }
            }
            "background" => {
                let current = self.color;
                self.background_color = value_tokens(val)
                    .into_iter()
                    .find_map(|t| Color::parse(t, current))
                    .unwrap_or(Color::TRANSPARENT);
            }
            "text-align" => {
                self.text_align = match val {
                    "center" => TextAlign::Center,
                    "right" | "end" => TextAlign::Right,
                    "justify" => TextAlign::Justify,
                    _ => TextAlign::Left,
                }
            }
            "line-height" => {
                if let Some(lh) = parse_line_height(val, fs) {
                    self.line_height = lh;
                }
            }
            "text-decoration" | "text-decoration-line" => {
                let tokens: Vec<&str> = val.split_whitespace().collect();
                self.text_decoration = if tokens.contains(&"underline") {
                    TextDecoration::Underline
                } else if tokens.contains(&"line-through") {
                    TextDecoration::LineThrough
                } else {
                    TextDecoration::None
                };
            }
            "text-transform" => {
                self.text_transform = match val {
                    "uppercase" => TextTransform::Uppercase,
                    "lowercase" => TextTransform::Lowercase,
                    "capitalize" => TextTransform::Capitalize,
                    _ => TextTransform::None,
                }
            }
            "white-space" => {
                self.white_space = match val {
                    "pre" | "pre-wrap" | "break-spaces" => WhiteSpace::Pre,
                    "pre-line" => WhiteSpace::PreLine,
                    "nowrap" => WhiteSpace::NoWrap,
                    _ => WhiteSpace::Normal,
                }
            }
            "list-style-type" => {
                if let Some(t) = parse_list_style_type(val) {
                    self.list_style_type = t;
                }
            }
            "list-style" => {
                if let Some(t) = val.split_whitespace().find_map(parse_list_style_type) {
                    self.list_style_type = t;
                }
            }
            "page-break-before" | "break-before" => self.page_break_before = is_break(val),
            "page-break-after" | "break-after" => {
                self.page_break_after = is_break(val);
                self.page_break_after_avoid = val == "avoid" || val == "avoid-page";
            }
            "page-break-inside" | "break-inside" => {
                self.page_break_inside_avoid = val == "avoid" || val == "avoid-page";
            }
            _ => {}
        }
    }

    /// `font: [style] [weight] size[/line-height] family`
    fn apply_font_shorthand(&mut self, value: &str, parent: &ComputedStyle) {
        let lower = value.trim().to_ascii_lowercase();
        let tokens: Vec<&str> = lower.split_whitespace().collect();
        let Some(size_idx) = tokens.iter().position(|t| {
            let size_part = t.split('/').next().unwrap_or("");
            parse_font_size(size_part, parent.font_size).is_some()
                && !matches!(*t, "bold" | "normal" | "bolder" | "lighter")
                && t.parse::<u32>().is_err()
        }) else {
            return;
        };
        self.font_style = FontStyle::Normal;
        self.font_weight = FontWeight::Normal;
        for t in &tokens[..size_idx] {
            if matches!(*t, "italic" | "oblique") {
                self.font_style = FontStyle::Italic;
            } else if let Some(w) = parse_font_weight(t, parent.font_weight) {
                self.font_weight = w;
            }
        }
        let mut size_parts = tokens[size_idx].splitn(2, '/');
        if let Some(size) = size_parts
            .next()
            .and_then(|s| parse_font_size(s, parent.font_size))
        {
            self.font_size = size;
        }
        self.line_height = size_parts
            .next()
            .and_then(|lh| parse_line_height(lh, self.font_size))
            .unwrap_or(1.2);
        let families = tokens[size_idx + 1..].join(" ");
        if let Some(f) = parse_font_family(&families) {
            self.font_family = f;
        }
    }
}

// ---------------------------------------------------------------------------
// Cascade
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    UserAgent,
    Author,
}

/// The user-agent sheet plus every author sheet of a document.
#[derive(Debug, Clone)]
pub struct Cascade {
    sheets: Vec<(Origin, Stylesheet)>,
}

impl Cascade {
    pub fn new(author: Vec<Stylesheet>) -> Self {
        let ua = parse_stylesheet(USER_AGENT_CSS).unwrap_or_default();
        let mut sheets = vec![(Origin::UserAgent, ua)];
        sheets.extend(author.into_iter().map(|s| (Origin::Author, s)));
        Self { sheets }
    }

    /// `@page` declarations from all author sheets, in source order.
    pub fn page_declarations(&self) -> Vec<&Declaration> {
        self.sheets
            .iter()
            .filter(|(origin, _)| *origin == Origin::Author)
            .flat_map(|(_, sheet)| sheet.page.iter())
            .collect()
    }

    /// Declarations applying to the last element of `path`, sorted from
    /// lowest to highest precedence. `inline` is the element's own
    /// `style` attribute.
    fn matching<'s>(
        &'s self,
        path: &[PathEntry<'_>],
        inline: &'s [Declaration],
    ) -> Vec<&'s Declaration> {
        let mut matched: Vec<(u8, (u32, u32, u32), &Declaration)> = Vec::new();
        for (origin, sheet) in &self.sheets {
            for rule in &sheet.rules {
                let Some(specificity) = rule
                    .selectors
                    .iter()
                    .filter(|s| s.matches(path))
                    .map(|s| s.specificity())
                    .max()
                else {
                    continue;
                };
                for decl in &rule.declarations {
                    let level = match (origin, decl.important) {
                        (Origin::UserAgent, false) => 0,
                        (Origin::Author, false) => 1,
                        (Origin::Author, true) => 3,
                        (Origin::UserAgent, true) => 5,
                    };
                    matched.push((level, specificity, decl));
                }
            }
        }
        for decl in inline {
            let level = if decl.important { 4 } else { 2 };
            matched.push((level, (u32::MAX, 0, 0), decl));
        }
        // Stable: equal keys keep source order.
        matched.sort_by_key(|(level, specificity, _)| (*level, *specificity));
        matched.into_iter().map(|(_, _, d)| d).collect()
    }

    /// Compute the style of the last element in `path`.
    pub fn compute(&self, path: &[PathEntry<'_>], parent: &ComputedStyle) -> ComputedStyle {
        let Some(subject) = path.last() else {
            return ComputedStyle::inherit_from(parent);
        };
        let inline = subject
            .element
            .inline_style()
            .map(parse_declarations)
            .unwrap_or_default();
        let declarations = self.matching(path, &inline);

        let mut style = ComputedStyle::inherit_from(parent);
        for decl in &declarations {
            match decl.property.as_str() {
                "font-size" => {
                    let v = decl.value.trim().to_ascii_lowercase();
                    if v == "inherit" {
                        style.font_size = parent.font_size;
                    } else if v == "initial" {
                        style.font_size = ROOT_FONT_SIZE;
                    } else if let Some(size) = parse_font_size(&v, parent.font_size) {
                        style.font_size = size;
                    }
                }
                "font" => style.apply_font_shorthand(&decl.value, parent),
                _ => {}
            }
        }
        for decl in &declarations {
            if matches!(decl.property.as_str(), "font-size" | "font") {
                continue;
            }
            style.apply_declaration(&decl.property, &decl.value, parent);
        }
        style
    }
}

// ---------------------------------------------------------------------------
// Styled DOM tree
// ---------------------------------------------------------------------------

/// A DOM node annotated with its computed style.
#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        children: Vec<StyledNode>,
        /// Element attributes (`src`, `alt`, `start`, ...)
        attrs: HashMap<String, String>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

impl StyledNode {
    pub fn style(&self) -> &ComputedStyle {
        match self {
            StyledNode::Element { style, .. } | StyledNode::Text { style, .. } => style,
        }
    }
}

/// Build a styled tree from a DOM tree, resolving styles top-down.
pub fn build_styled_tree(nodes: &[DomNode], cascade: &Cascade) -> Vec<StyledNode> {
    let root = ComputedStyle::default();
    let mut out = Vec::new();
    style_children(nodes, cascade, &root, &[], &mut out);
    out
}

fn style_children(
    nodes: &[DomNode],
    cascade: &Cascade,
    parent_style: &ComputedStyle,
    parent_path: &[PathEntry<'_>],
    out: &mut Vec<StyledNode>,
) {
    let elements: Vec<&ElementNode> = nodes
        .iter()
        .filter_map(|n| match n {
            DomNode::Element(e) => Some(e),
            DomNode::Text(_) => None,
        })
        .collect();
    let mut index = 0;
    for node in nodes {
        match node {
            DomNode::Element(e) => {
                let mut path = parent_path.to_vec();
                path.push(PathEntry {
                    element: e,
                    preceding: &elements[..index],
                });
                index += 1;
                let style = cascade.compute(&path, parent_style);
                let mut children = Vec::new();
                if style.display != Display::None {
                    style_children(&e.children, cascade, &style, &path, &mut children);
                }
                out.push(StyledNode::Element {
                    tag: e.tag.clone(),
                    style,
                    children,
                    attrs: e.attributes.clone(),
                });
            }
            DomNode::Text(text) => {
                if !text.is_empty() {
                    out.push(StyledNode::Text {
                        text: text.clone(),
                        style: ComputedStyle::inherit_from(parent_style),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    /// Style the document and return the style of the first element with
    /// `tag`.
    fn style_of(html: &str, css: &str, tag: Tag) -> ComputedStyle {
        let nodes = parse_html(html).unwrap();
        let cascade = Cascade::new(vec![parse_stylesheet(css).unwrap()]);
        let tree = build_styled_tree(&nodes, &cascade);
        find(&tree, &tag).unwrap_or_else(|| panic!("no {tag:?}"))
    }

    fn find(nodes: &[StyledNode], tag: &Tag) -> Option<ComputedStyle> {
        nodes.iter().find_map(|n| match n {
            StyledNode::Element {
                tag: t,
                style,
                children,
                ..
            } => {
                if t == tag {
                    Some(style.clone())
                } else {
                    find(children, tag)
                }
            }
            StyledNode::Text { .. } => None,
        })
    }

    #[test]
    fn user_agent_sheet_parses() {
        let sheet = parse_stylesheet(USER_AGENT_CSS).unwrap();
        assert!(sheet.rules.len() > 20);
    }

    #[test]
    fn user_agent_heading_defaults() {
        let h1 = style_of("<h1>x</h1>", "", Tag::H1);
        assert_eq!(h1.display, Display::Block);
        assert!(h1.is_bold());
        assert!((h1.font_size - 24.0).abs() < 0.01);
        assert!((h1.margin_top.pt() - 0.67 * 24.0).abs() < 0.01);
    }

    #[test]
    fn author_overrides_user_agent_and_inherits() {
        let css = "body { font-size: 14px; color: #2d3748 } h1 { font-size: 32px; margin: 0 0 4px 0 }";
        let html = "<body><h1>T</h1><p>x</p></body>";
        let h1 = style_of(html, css, Tag::H1);
        assert!((h1.font_size - 24.0).abs() < 0.01);
        assert_eq!(h1.margin_top, Margin::Pt(0.0));
        assert!((h1.margin_bottom.pt() - 3.0).abs() < 0.01);
        let p = style_of(html, css, Tag::P);
        assert!((p.font_size - 10.5).abs() < 0.01);
        assert_eq!(p.color, Color::from_hex("#2d3748").unwrap());
    }

    #[test]
    fn em_margins_use_own_font_size() {
        let h2 = style_of("<h2>x</h2>", "h2 { font-size: 20pt; margin: 1em 0 }", Tag::H2);
        assert!((h2.margin_top.pt() - 20.0).abs() < 0.01);
    }

    #[test]
    fn specificity_and_importance() {
        let css = "p.lead { color: red } p { color: blue } div p { color: green !important }";
        let p = style_of("<div><p class=\"lead\">x</p></div>", css, Tag::P);
        assert_eq!(p.color, Color::rgb(0, 128, 0));
        let p = style_of("<p class=\"lead\">x</p>", css, Tag::P);
        assert_eq!(p.color, Color::rgb(255, 0, 0));
    }

    #[test]
    fn inline_style_beats_author_rules() {
        let th = style_of(
            "<table><tr><th style=\"text-align: right\">a</th></tr></table>",
            "th { text-align: left }",
            Tag::Th,
        );
        assert_eq!(th.text_align, TextAlign::Right);
    }

    #[test]
    fn adjacent_sibling_rule_applies() {
        let css = "h1 + p { text-align: center }";
        let html = "<div><h1>N</h1><p>first</p></div>";
        assert_eq!(style_of(html, css, Tag::P).text_align, TextAlign::Center);
        let html = "<div><p>first</p><h1>N</h1></div>";
        assert_eq!(style_of(html, css, Tag::P).text_align, TextAlign::Left);
    }

    #[test]
    fn border_shorthands() {
        let hr = style_of("<hr>", "hr { border: 0; border-top: 1px solid #cbd5e0 }", Tag::Hr);
        assert_eq!(hr.border_bottom.used_width(), 0.0);
        assert!((hr.border_top.used_width() - 0.75).abs() < 0.01);
        let p = style_of("<p>x</p>", "p { border-width: 2px }", Tag::P);
        assert!(!p.has_border());
    }

    #[test]
    fn auto_margins_and_max_width() {
        let div = style_of(
            "<div>x</div>",
            "div { max-width: 800px; margin: 40px auto }",
            Tag::Div,
        );
        assert!(div.margin_left.is_auto());
        assert_eq!(div.max_width, Dimension::Pt(600.0));
    }

    #[test]
    fn print_media_overrides_screen_values() {
        let css = ".c { padding: 48px } @media print { .c { padding: 0 } }";
        let div = style_of("<div class=\"c\">x</div>", css, Tag::Div);
        assert_eq!(div.padding_left, 0.0);
    }

    #[test]
    fn font_family_mapping() {
        assert_eq!(parse_font_family("Georgia, serif"), Some(FontFamily::Serif));
        assert_eq!(
            parse_font_family("\"SFMono-Regular\", Menlo, monospace"),
            Some(FontFamily::Mono)
        );
        assert_eq!(
            parse_font_family("\"Helvetica Neue\", Arial, sans-serif"),
            Some(FontFamily::Sans)
        );
        assert_eq!(parse_font_family("Wingdings"), None);
    }

    #[test]
    fn lengths_convert_to_points() {
        assert_eq!(parse_length("16px", 12.0), Some(12.0));
        assert_eq!(parse_length("1in", 12.0), Some(72.0));
        assert_eq!(parse_length("2em", 10.0), Some(20.0));
        assert!((parse_length("25.4mm", 12.0).unwrap() - 72.0).abs() < 0.01);
        assert_eq!(parse_length("12", 12.0), None);
    }

    #[test]
    fn colors() {
        let c = Color::from_hex("#ff8800").unwrap();
        assert!((c.r - 1.0).abs() < 0.01);
        assert!((c.g - 0.533).abs() < 0.01);
        let c = Color::parse("rgba(0, 0, 0, 0.08)", Color::BLACK).unwrap();
        assert!((c.a - 0.08).abs() < 0.001);
        assert_eq!(Color::parse("transparent", Color::BLACK), Some(Color::TRANSPARENT));
        assert_eq!(Color::parse("nope", Color::BLACK), None);
    }

    #[test]
    fn font_shorthand() {
        let p = style_of("<p>x</p>", "p { font: italic bold 12pt/2 Georgia, serif }", Tag::P);
        assert!(p.is_bold() && p.is_italic());
        assert_eq!(p.font_size, 12.0);
        assert_eq!(p.line_height, 2.0);
        assert_eq!(p.font_family, FontFamily::Serif);
    }

    #[test]
    fn nested_lists_change_marker() {
        let html = "<ul><li>a<ul><li>b</li></ul></li></ul>";
        let nodes = parse_html(html).unwrap();
        let tree = build_styled_tree(&nodes, &Cascade::new(vec![]));
        let StyledNode::Element { children, style, .. } = &tree[0] else { panic!() };
        assert_eq!(style.list_style_type, ListStyleType::Disc);
        let inner = find(children, &Tag::Ul).unwrap();
        assert_eq!(inner.list_style_type, ListStyleType::Circle);
        assert_eq!(inner.margin_top, Margin::ZERO);
    }
}
