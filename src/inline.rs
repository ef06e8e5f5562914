//! Inline formatting – breaks a sequence of styled text runs into line boxes.
//!
//! Whitespace follows CSS `white-space`: in `normal` mode runs of spaces and
//! newlines collapse to one space and vanish at line starts; in `pre` mode
//! they are kept and newlines force breaks. Words too wide for the line are
//! broken between characters so nothing overflows the page.

use crate::fonts::{FontKey, FontManager};
use crate::style::{Color, ComputedStyle, TextAlign, TextDecoration, TextTransform, WhiteSpace};

/// Styling shared by all characters of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunStyle {
    pub font: FontKey,
    pub size: f32,
    /// Multiple of `size`.
    pub line_height: f32,
    pub color: Color,
    pub decoration: TextDecoration,
    pub background: Option<Color>,
}

impl RunStyle {
    pub fn from_style(style: &ComputedStyle) -> Self {
        Self {
            font: FontKey::from_style(style),
            size: style.font_size,
            line_height: style.line_height,
            color: style.color,
            decoration: style.text_decoration,
            background: None,
        }
    }

    /// Space above the baseline this run needs in a line box.
    fn ascent(&self) -> f32 {
        let leading = self.size * self.line_height - self.size;
        self.size * 0.8 + leading / 2.0
    }

    fn line_box_height(&self) -> f32 {
        self.size * self.line_height
    }
}

/// One piece of inline content.
#[derive(Debug, Clone, PartialEq)]
pub enum InlineItem {
    Text { text: String, style: RunStyle },
    /// `<br>`
    Break,
}

/// A positioned piece of text within a line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFragment {
    pub text: String,
    /// Offset from the left edge of the containing box.
    pub x: f32,
    pub width: f32,
    pub style: RunStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineBox {
    /// Offset of the line top from the top of the text block.
    pub y: f32,
    pub height: f32,
    /// Offset of the baseline from the line top.
    pub baseline: f32,
    pub width: f32,
    pub fragments: Vec<LineFragment>,
}

/// Lines produced for one anonymous inline block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineLayout {
    pub lines: Vec<LineBox>,
    pub width: f32,
    pub height: f32,
}

/// Block-level parameters of an inline formatting context.
#[derive(Debug, Clone, Copy)]
pub struct BlockContext {
    pub align: TextAlign,
    pub white_space: WhiteSpace,
    /// The block's own font; every line is at least this tall.
    pub strut: RunStyle,
}

impl BlockContext {
    pub fn from_style(style: &ComputedStyle) -> Self {
        Self {
            align: style.text_align,
            white_space: style.white_space,
            strut: RunStyle::from_style(style),
        }
    }
}

/// Apply `text-transform` to a run of text.
pub fn transform_text(text: &str, transform: TextTransform, at_word_start: &mut bool) -> String {
    match transform {
        TextTransform::None => {
            *at_word_start = text.ends_with(char::is_whitespace);
            text.to_string()
        }
        TextTransform::Uppercase => text.to_uppercase(),
        TextTransform::Lowercase => text.to_lowercase(),
        TextTransform::Capitalize => {
            let mut out = String::with_capacity(text.len());
            for c in text.chars() {
                if c.is_whitespace() {
                    *at_word_start = true;
                    out.push(c);
                } else if *at_word_start {
                    out.extend(c.to_uppercase());
                    *at_word_start = false;
                } else {
                    out.push(c);
                }
            }
            out
        }
    }
}

/// True when the items would produce no visible line in `white_space` mode.
pub fn is_collapsible(items: &[InlineItem], white_space: WhiteSpace) -> bool {
    items.iter().all(|item| match item {
        InlineItem::Break => false,
        InlineItem::Text { text, .. } => match white_space {
            WhiteSpace::Pre => text.is_empty(),
            WhiteSpace::PreLine => text.chars().all(|c| c.is_whitespace() && c != '\n'),
            _ => text.chars().all(char::is_whitespace),
        },
    })
}

// ---------------------------------------------------------------------------
// Tokenizing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Token {
    /// Unbreakable text, possibly spanning several styles.
    Word(Vec<(String, RunStyle)>),
    /// Collapsible space (normal mode only).
    Space(RunStyle),
    Break,
}

fn push_char(word: &mut Vec<(String, RunStyle)>, c: char, style: RunStyle) {
    match word.last_mut() {
        Some((text, s)) if *s == style => text.push(c),
        _ => word.push((c.to_string(), style)),
    }
}

fn flush(word: &mut Vec<(String, RunStyle)>, tokens: &mut Vec<Token>) {
    if !word.is_empty() {
        tokens.push(Token::Word(std::mem::take(word)));
    }
}

fn tokenize(items: &[InlineItem], white_space: WhiteSpace) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word: Vec<(String, RunStyle)> = Vec::new();
    let mut space: Option<RunStyle> = None;

    for item in items {
        let (text, style) = match item {
            InlineItem::Break => {
                flush(&mut word, &mut tokens);
                space = None;
                tokens.push(Token::Break);
                continue;
            }
            InlineItem::Text { text, style } => (text, *style),
        };
        for c in text.chars() {
            match white_space {
                WhiteSpace::Pre => match c {
                    '\n' => {
                        flush(&mut word, &mut tokens);
                        tokens.push(Token::Break);
                    }
                    '\r' => {}
                    ' ' | '\t' => {
                        // Spaces are kept, each run its own breakable token.
                        if word.last().is_some_and(|(t, _)| !t.starts_with(' ')) {
                            flush(&mut word, &mut tokens);
                        }
                        let n = if c == '\t' { 4 } else { 1 };
                        for _ in 0..n {
                            push_char(&mut word, ' ', style);
                        }
                    }
                    c => {
                        if word.last().is_some_and(|(t, _)| t.starts_with(' ')) {
                            flush(&mut word, &mut tokens);
                        }
                        push_char(&mut word, c, style);
                    }
                },
                _ => {
                    if c == '\n' && white_space == WhiteSpace::PreLine {
                        flush(&mut word, &mut tokens);
                        space = None;
                        tokens.push(Token::Break);
                    } else if c.is_whitespace() && c != '\u{00A0}' {
                        flush(&mut word, &mut tokens);
                        space.get_or_insert(style);
                    } else {
                        if let Some(sp) = space.take() {
                            flush(&mut word, &mut tokens);
                            tokens.push(Token::Space(sp));
                        }
                        push_char(&mut word, c, style);
                    }
                }
            }
        }
    }
    flush(&mut word, &mut tokens);
    tokens
}

// ---------------------------------------------------------------------------
// Line breaking
// ---------------------------------------------------------------------------

struct PlacedPiece {
    text: String,
    x: f32,
    width: f32,
    style: RunStyle,
    /// Inter-word spaces before this piece on its line.
    spaces_before: usize,
}

struct LineBuilder<'a> {
    fonts: &'a FontManager,
    ctx: BlockContext,
    max_width: f32,
    wrap: bool,
    lines: Vec<LineBox>,
    /// Per finished line: was it ended by wrapping, and the inter-word
    /// space count before each fragment.
    line_info: Vec<(bool, Vec<usize>)>,
    current: Vec<PlacedPiece>,
    x: f32,
    spaces: usize,
    y: f32,
}

impl<'a> LineBuilder<'a> {
    fn width_of(&self, text: &str, style: &RunStyle) -> f32 {
        self.fonts.measure_text_width(text, style.size, &style.font)
    }

    fn finish_line(&mut self, by_wrap: bool) {
        let pieces = std::mem::take(&mut self.current);
        let mut baseline = self.ctx.strut.ascent();
        let mut below = self.ctx.strut.line_box_height() - baseline;
        for p in &pieces {
            baseline = baseline.max(p.style.ascent());
            below = below.max(p.style.line_box_height() - p.style.ascent());
        }
        let width = pieces.last().map_or(0.0, |p| p.x + p.width);
        let height = baseline + below;
        self.line_info
            .push((by_wrap, pieces.iter().map(|p| p.spaces_before).collect()));
        self.lines.push(LineBox {
            y: self.y,
            height,
            baseline,
            width,
            fragments: pieces
                .into_iter()
                .map(|p| LineFragment {
                    text: p.text,
                    x: p.x,
                    width: p.width,
                    style: p.style,
                })
                .collect(),
        });
        self.y += height;
        self.x = 0.0;
        self.spaces = 0;
    }

    fn place(&mut self, text: String, width: f32, style: RunStyle) {
        self.current.push(PlacedPiece {
            text,
            x: self.x,
            width,
            style,
            spaces_before: self.spaces,
        });
        self.x += width;
    }

    fn add_word(&mut self, pieces: Vec<(String, RunStyle)>, space: Option<RunStyle>) {
        let widths: Vec<f32> = pieces.iter().map(|(t, s)| self.width_of(t, s)).collect();
        let word_width: f32 = widths.iter().sum();
        let is_pre_space = self.ctx.white_space == WhiteSpace::Pre
            && pieces.iter().all(|(t, _)| t.chars().all(|c| c == ' '));

        let space_width = match (&space, self.current.is_empty()) {
            (Some(s), false) => self.width_of(" ", s),
            _ => 0.0,
        };

        if self.wrap && !self.current.is_empty() && self.x + space_width + word_width > self.max_width
        {
            self.finish_line(true);
            if is_pre_space {
                return;
            }
            return self.add_word(pieces, None);
        }

        if space_width > 0.0 {
            self.x += space_width;
            self.spaces += 1;
        }

        if self.wrap && self.current.is_empty() && word_width > self.max_width {
            // Break an overlong word between characters.
            for (text, style) in pieces {
                for c in text.chars() {
                    let cw = self.width_of(c.encode_utf8(&mut [0; 4]), &style);
                    if !self.current.is_empty() && self.x + cw > self.max_width {
                        self.finish_line(true);
                    }
                    self.place(c.to_string(), cw, style);
                }
            }
            return;
        }

        for ((text, style), w) in pieces.into_iter().zip(widths) {
            self.place(text, w, style);
        }
    }
}

/// Lay out `items` in lines no wider than `max_width`.
pub fn layout_inline(
    items: &[InlineItem],
    ctx: &BlockContext,
    max_width: f32,
    fonts: &FontManager,
) -> InlineLayout {
    let tokens = tokenize(items, ctx.white_space);
    let mut builder = LineBuilder {
        fonts,
        ctx: *ctx,
        max_width: max_width.max(1.0),
        wrap: ctx.white_space != WhiteSpace::NoWrap,
        lines: Vec::new(),
        line_info: Vec::new(),
        current: Vec::new(),
        x: 0.0,
        spaces: 0,
        y: 0.0,
    };

    let mut pending_space: Option<RunStyle> = None;
    for token in tokens {
        match token {
            Token::Space(style) => pending_space = Some(style),
            Token::Break => {
                builder.finish_line(false);
                pending_space = None;
            }
            Token::Word(pieces) => builder.add_word(pieces, pending_space.take()),
        }
    }
    if !builder.current.is_empty() {
        builder.finish_line(false);
    }

    let LineBuilder {
        mut lines,
        line_info,
        ..
    } = builder;
    let max_line = lines.iter().map(|l| l.width).fold(0.0f32, f32::max);

    for (line, (wrapped, spaces)) in lines.iter_mut().zip(&line_info) {
        let slack = (max_width - line.width).max(0.0);
        match ctx.align {
            TextAlign::Left => {}
            TextAlign::Center => shift(line, slack / 2.0),
            TextAlign::Right => shift(line, slack),
            TextAlign::Justify => {
                let total_spaces = spaces.last().copied().unwrap_or(0);
                if *wrapped && total_spaces > 0 {
                    let per_space = slack / total_spaces as f32;
                    for (frag, count) in line.fragments.iter_mut().zip(spaces) {
                        frag.x += per_space * *count as f32;
                    }
                    line.width = max_width;
                }
            }
        }
    }

    if ctx.align != TextAlign::Justify {
        for line in &mut lines {
            merge_fragments(line, fonts);
        }
    }

    let height = lines.last().map_or(0.0, |l| l.y + l.height);
    InlineLayout {
        lines,
        width: max_line,
        height,
    }
}

fn shift(line: &mut LineBox, dx: f32) {
    for frag in &mut line.fragments {
        frag.x += dx;
    }
}

/// Join neighbouring fragments of identical style into one text run,
/// re-inserting the spaces between them.
fn merge_fragments(line: &mut LineBox, fonts: &FontManager) {
    let mut merged: Vec<LineFragment> = Vec::with_capacity(line.fragments.len());
    for frag in line.fragments.drain(..) {
        if let Some(prev) = merged.last_mut() {
            if prev.style == frag.style {
                let gap = frag.x - (prev.x + prev.width);
                let space = fonts.measure_text_width(" ", frag.style.size, &frag.style.font);
                if gap.abs() < 0.01 {
                    prev.text.push_str(&frag.text);
                    prev.width = frag.x + frag.width - prev.x;
                    continue;
                }
                if space > 0.0 && (gap - space).abs() < 0.01 {
                    prev.text.push(' ');
                    prev.text.push_str(&frag.text);
                    prev.width = frag.x + frag.width - prev.x;
                    continue;
                }
            }
        }
        merged.push(frag);
    }
    line.fragments = merged;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::FontFamily;

    fn style(size: f32) -> RunStyle {
        RunStyle {
            font: FontKey {
                family: FontFamily::Sans,
                bold: false,
                italic: false,
            },
            size,
            line_height: 1.5,
            color: Color::BLACK,
            decoration: TextDecoration::None,
            background: None,
        }
    }

    fn ctx(align: TextAlign, white_space: WhiteSpace) -> BlockContext {
        BlockContext {
            align,
            white_space,
            strut: style(10.0),
        }
    }

    fn text(t: &str) -> InlineItem {
        InlineItem::Text {
            text: t.to_string(),
            style: style(10.0),
        }
    }

    fn line_texts(layout: &InlineLayout) -> Vec<String> {
        layout
            .lines
            .iter()
            .map(|l| l.fragments.iter().map(|f| f.text.as_str()).collect::<Vec<_>>().join("|"))
            .collect()
    }

    #[test]
    fn whitespace_collapses() {
        let fonts = FontManager::default();
        let layout = layout_inline(
            &[text("  Hello \n  world  ")],
            &ctx(TextAlign::Left, WhiteSpace::Normal),
            500.0,
            &fonts,
        );
        assert_eq!(line_texts(&layout), vec!["Hello world"]);
        assert_eq!(layout.lines[0].fragments[0].x, 0.0);
        assert!((layout.height - 15.0).abs() < 0.01);
    }

    #[test]
    fn wraps_at_spaces() {
        let fonts = FontManager::default();
        let layout = layout_inline(
            &[text("aaaa bbbb cccc dddd")],
            &ctx(TextAlign::Left, WhiteSpace::Normal),
            60.0,
            &fonts,
        );
        assert!(layout.lines.len() >= 2);
        for line in &layout.lines {
            assert!(line.width <= 60.0 + 0.01);
            assert!(!line.fragments[0].text.starts_with(' '));
        }
        assert!((layout.lines[1].y - 15.0).abs() < 0.01);
    }

    #[test]
    fn mixed_styles_stay_glued() {
        let fonts = FontManager::default();
        let mut bold = style(10.0);
        bold.font.bold = true;
        let items = vec![
            text("plain "),
            InlineItem::Text {
                text: "bold".into(),
                style: bold,
            },
            text("tail"),
        ];
        let layout = layout_inline(&items, &ctx(TextAlign::Left, WhiteSpace::Normal), 500.0, &fonts);
        assert_eq!(line_texts(&layout), vec!["plain|bold|tail"]);
        let frags = &layout.lines[0].fragments;
        assert!((frags[1].x + frags[1].width - frags[2].x).abs() < 0.01);
    }

    #[test]
    fn breaks_and_overlong_words() {
        let fonts = FontManager::default();
        let layout = layout_inline(
            &[text("a"), InlineItem::Break, text(" b")],
            &ctx(TextAlign::Left, WhiteSpace::Normal),
            500.0,
            &fonts,
        );
        assert_eq!(line_texts(&layout), vec!["a", "b"]);

        let layout = layout_inline(
            &[text("https://example.com/a/very/long/path")],
            &ctx(TextAlign::Left, WhiteSpace::Normal),
            40.0,
            &fonts,
        );
        assert!(layout.lines.len() > 2);
        assert!(layout.lines.iter().all(|l| l.width <= 40.0 + 0.01));
    }

    #[test]
    fn pre_keeps_spaces_and_newlines() {
        let fonts = FontManager::default();
        let layout = layout_inline(
            &[text("fn main() {\n    x\n}\n")],
            &ctx(TextAlign::Left, WhiteSpace::Pre),
            500.0,
            &fonts,
        );
        assert_eq!(line_texts(&layout), vec!["fn main() {", "    x", "}"]);
    }

    #[test]
    fn alignment_offsets() {
        let fonts = FontManager::default();
        let right = layout_inline(&[text("x")], &ctx(TextAlign::Right, WhiteSpace::Normal), 100.0, &fonts);
        let frag = &right.lines[0].fragments[0];
        assert!((frag.x + frag.width - 100.0).abs() < 0.01);
        let center =
            layout_inline(&[text("x")], &ctx(TextAlign::Center, WhiteSpace::Normal), 100.0, &fonts);
        let frag = &center.lines[0].fragments[0];
        assert!((frag.x * 2.0 + frag.width - 100.0).abs() < 0.01);
    }

    #[test]
    fn justify_fills_wrapped_lines_only() {
        let fonts = FontManager::default();
        let layout = layout_inline(
            &[text("aa bb cc dd ee ff gg hh")],
            &ctx(TextAlign::Justify, WhiteSpace::Normal),
            50.0,
            &fonts,
        );
        assert!(layout.lines.len() >= 2);
        let first = &layout.lines[0];
        let last_frag = first.fragments.last().unwrap();
        assert!((last_frag.x + last_frag.width - 50.0).abs() < 0.05);
        let last = layout.lines.last().unwrap();
        assert!(last.width < 50.0);
    }

    #[test]
    fn collapsible_detection() {
        assert!(is_collapsible(&[text(" \n ")], WhiteSpace::Normal));
        assert!(!is_collapsible(&[text(" \n ")], WhiteSpace::Pre));
        assert!(!is_collapsible(&[text(" x ")], WhiteSpace::Normal));
    }

    #[test]
    fn capitalize_transform() {
        let mut start = true;
        assert_eq!(
            transform_text("hello big world", TextTransform::Capitalize, &mut start),
            "Hello Big World"
        );
    }
}
