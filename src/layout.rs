//! Layout engine – uses Taffy to compute block / flex layout from a styled
//! DOM tree, then converts the result into positioned boxes.
//!
//! Inline content (text runs, `<br>`, inline elements) between block-level
//! siblings is gathered into an anonymous text leaf whose lines are broken
//! up front by [`crate::inline`] at the width the leaf will get. Taffy then
//! only ever sees boxes of known height.

use std::collections::HashMap;
use taffy::prelude::*;

use crate::dom::Tag;
use crate::error::RenderError;
use crate::fonts::FontManager;
use crate::inline::{
    is_collapsible, layout_inline, transform_text, BlockContext, InlineItem, InlineLayout,
    RunStyle,
};
use crate::render::parse_data_uri;
use crate::style::{self, Color, ComputedStyle, ListStyleType, Margin, StyledNode, PT_PER_PX};

// ---------------------------------------------------------------------------
// Intermediate layout tree (pre-pagination)
// ---------------------------------------------------------------------------

/// A positioned box in document coordinates (before page splitting).
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: ComputedStyle,
    pub content: BoxContent,
    pub marker: Option<ListMarker>,
    pub children: Vec<PositionedBox>,
}

impl PositionedBox {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone)]
pub enum BoxContent {
    None,
    Text(InlineLayout),
    Image { src: String },
}

/// Bullet or number drawn in the gutter left of a list item.
#[derive(Debug, Clone, PartialEq)]
pub struct ListMarker {
    pub text: String,
    /// Offset of the marker's left edge from the item's left edge.
    pub x_offset: f32,
    /// Offset of the marker's baseline from the item's top edge.
    pub baseline: f32,
    pub style: RunStyle,
}

/// Inline content waiting to become anonymous boxes.
enum Segment {
    Inline(Vec<InlineItem>),
    Image { src: String, style: ComputedStyle },
}

#[derive(Default)]
struct InlineCollector {
    segments: Vec<Segment>,
    at_word_start: bool,
}

impl InlineCollector {
    fn push_item(&mut self, item: InlineItem) {
        match self.segments.last_mut() {
            Some(Segment::Inline(items)) => items.push(item),
            _ => self.segments.push(Segment::Inline(vec![item])),
        }
    }
}

// ---------------------------------------------------------------------------
// Build Taffy tree from styled nodes
// ---------------------------------------------------------------------------

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    fonts: &'a FontManager,
    node_styles: HashMap<NodeId, ComputedStyle>,
    node_content: HashMap<NodeId, BoxContent>,
    node_markers: HashMap<NodeId, ListMarker>,
    /// Decoded pixel size per image source; `None` when unusable.
    image_sizes: HashMap<String, Option<(u32, u32)>>,
}

impl<'a> LayoutBuilder<'a> {
    fn new(fonts: &'a FontManager) -> Self {
        Self {
            taffy: TaffyTree::new(),
            fonts,
            node_styles: HashMap::new(),
            node_content: HashMap::new(),
            node_markers: HashMap::new(),
            image_sizes: HashMap::new(),
        }
    }

    /// Pixel size of an embeddable image, or `None` (with a warning the
    /// first time) if the source cannot be used.
    fn image_size(&mut self, src: &str) -> Option<(u32, u32)> {
        if let Some(size) = self.image_sizes.get(src) {
            return *size;
        }
        let size = match parse_data_uri(src) {
            Ok(bytes) => match ::image::load_from_memory(&bytes) {
                Ok(img) if img.width() > 0 && img.height() > 0 => Some((img.width(), img.height())),
                Ok(_) => {
                    log::warn!("skipping empty image; rendering its alt text");
                    None
                }
                Err(e) => {
                    log::warn!("skipping image ({e}); rendering its alt text");
                    None
                }
            },
            Err(e) => {
                log::warn!("skipping image ({e}); rendering its alt text");
                None
            }
        };
        self.image_sizes.insert(src.to_string(), size);
        size
    }

    /// Build the children of a block container, wrapping runs of inline
    /// content in anonymous text leaves.
    fn build_children(
        &mut self,
        children: &[StyledNode],
        parent: &ComputedStyle,
        parent_attrs: Option<&HashMap<String, String>>,
        inner_width: f32,
    ) -> Result<Vec<NodeId>, RenderError> {
        let block_children = children
            .iter()
            .filter(|c| matches!(c, StyledNode::Element { style, .. } if style.is_block_level()))
            .count()
            .max(1);
        let is_row = parent.display == style::Display::TableRow
            || (parent.display == style::Display::Flex
                && parent.flex_direction == style::FlexDirection::Row);
        // Estimate per-child width for rows so that text is wrapped to the
        // right column width at build time.
        let child_width = if is_row {
            let gap_total = parent.gap * block_children.saturating_sub(1) as f32;
            ((inner_width - gap_total) / block_children as f32).max(1.0)
        } else {
            inner_width
        };

        let mut counter: i64 = parent_attrs
            .and_then(|a| a.get("start"))
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1);

        let mut ids = Vec::new();
        let mut collector = InlineCollector {
            at_word_start: true,
            ..Default::default()
        };

        for child in children {
            match child {
                StyledNode::Element { style, .. } if style.is_block_level() => {
                    self.flush_inline(&mut collector, parent, inner_width, &mut ids)?;
                    let Some(id) = self.build_element(child, child_width)? else {
                        continue;
                    };
                    if style.display == style::Display::ListItem {
                        if let Some(marker) = self.list_marker(style, counter) {
                            self.node_markers.insert(id, marker);
                        }
                        counter += 1;
                    }
                    ids.push(id);
                }
                _ => self.collect_inline(child, None, &mut collector),
            }
        }
        self.flush_inline(&mut collector, parent, inner_width, &mut ids)?;
        Ok(ids)
    }

    /// Gather inline content into `collector`. `background` is the nearest
    /// inline ancestor's background colour.
    fn collect_inline(
        &mut self,
        node: &StyledNode,
        background: Option<Color>,
        collector: &mut InlineCollector,
    ) {
        match node {
            StyledNode::Text { text, style } => {
                let text = transform_text(text, style.text_transform, &mut collector.at_word_start);
                let mut run = RunStyle::from_style(style);
                run.background = background;
                collector.push_item(InlineItem::Text { text, style: run });
            }
            StyledNode::Element {
                tag,
                style,
                children,
                attrs,
            } => {
                if style.display == style::Display::None {
                    return;
                }
                match tag {
                    Tag::Br => collector.push_item(InlineItem::Break),
                    Tag::Img => {
                        let src = attrs.get("src").map(String::as_str).unwrap_or("");
                        if self.image_size(src).is_some() {
                            collector.segments.push(Segment::Image {
                                src: src.to_string(),
                                style: style.clone(),
                            });
                        } else if let Some(alt) = attrs.get("alt").filter(|a| !a.is_empty()) {
                            let mut run = RunStyle::from_style(style);
                            run.background = background;
                            collector.push_item(InlineItem::Text {
                                text: alt.clone(),
                                style: run,
                            });
                        }
                    }
                    _ => {
                        let bg = if style.background_color.is_transparent() {
                            background
                        } else {
                            Some(style.background_color)
                        };
                        for child in children {
                            self.collect_inline(child, bg, collector);
                        }
                    }
                }
            }
        }
    }

    fn flush_inline(
        &mut self,
        collector: &mut InlineCollector,
        block: &ComputedStyle,
        width: f32,
        ids: &mut Vec<NodeId>,
    ) -> Result<(), RenderError> {
        for segment in std::mem::take(&mut collector.segments) {
            match segment {
                Segment::Inline(items) => {
                    if is_collapsible(&items, block.white_space) {
                        continue;
                    }
                    ids.push(self.build_text_leaf(&items, block, width)?);
                }
                Segment::Image { src, style } => {
                    if let Some(id) = self.build_image(&src, &style, width)? {
                        ids.push(id);
                    }
                }
            }
        }
        collector.at_word_start = true;
        Ok(())
    }

    fn build_text_leaf(
        &mut self,
        items: &[InlineItem],
        block: &ComputedStyle,
        width: f32,
    ) -> Result<NodeId, RenderError> {
        let layout = layout_inline(items, &BlockContext::from_style(block), width, self.fonts);
        let taffy_style = Style {
            display: taffy::Display::Block,
            size: Size {
                width: taffy::Dimension::Length(width.max(0.0)),
                height: taffy::Dimension::Length(layout.height),
            },
            min_size: Size {
                width: taffy::Dimension::Length(0.0),
                height: taffy::Dimension::Auto,
            },
            flex_shrink: 1.0,
            ..Default::default()
        };
        let node = self.taffy.new_leaf(taffy_style)?;
        self.node_styles
            .insert(node, ComputedStyle::inherit_from(block));
        self.node_content.insert(node, BoxContent::Text(layout));
        Ok(node)
    }

    /// Image leaf sized from its intrinsic pixels (1px = 0.75pt), any
    /// specified width/height, and the available width.
    fn build_image(
        &mut self,
        src: &str,
        style: &ComputedStyle,
        available: f32,
    ) -> Result<Option<NodeId>, RenderError> {
        let Some((px_w, px_h)) = self.image_size(src) else {
            return Ok(None);
        };
        let aspect = px_w as f32 / px_h as f32;
        let known_w = match style.width {
            style::Dimension::Pt(w) => Some(w),
            style::Dimension::Percent(p) => Some(available * p / 100.0),
            style::Dimension::Auto => None,
        };
        let known_h = match style.height {
            style::Dimension::Pt(h) => Some(h),
            _ => None,
        };
        let (mut w, mut h) = match (known_w, known_h) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, w / aspect),
            (None, Some(h)) => (h * aspect, h),
            (None, None) => (px_w as f32 * PT_PER_PX, px_h as f32 * PT_PER_PX),
        };
        let max_w = match style.max_width {
            style::Dimension::Pt(m) => m.min(available),
            style::Dimension::Percent(p) => (available * p / 100.0).min(available),
            style::Dimension::Auto => available,
        };
        if w > max_w && max_w > 0.0 {
            h *= max_w / w;
            w = max_w;
        }

        let mut ts = self.computed_to_taffy(style);
        ts.display = taffy::Display::Block;
        ts.size = Size {
            width: taffy::Dimension::Length(w.max(1.0)),
            height: taffy::Dimension::Length(h.max(1.0)),
        };
        let node = self.taffy.new_leaf(ts)?;
        self.node_styles.insert(node, style.clone());
        self.node_content.insert(
            node,
            BoxContent::Image {
                src: src.to_string(),
            },
        );
        Ok(Some(node))
    }

    fn build_element(
        &mut self,
        node: &StyledNode,
        available: f32,
    ) -> Result<Option<NodeId>, RenderError> {
        let StyledNode::Element {
            tag,
            style,
            children,
            attrs,
        } = node
        else {
            return Ok(None);
        };
        if style.display == style::Display::None {
            return Ok(None);
        }

        if *tag == Tag::Img {
            let src = attrs.get("src").map(String::as_str).unwrap_or("");
            if let Some(id) = self.build_image(src, style, available)? {
                return Ok(Some(id));
            }
            let alt = attrs.get("alt").cloned().unwrap_or_default();
            if alt.is_empty() {
                return Ok(None);
            }
            let items = [InlineItem::Text {
                text: alt,
                style: RunStyle::from_style(style),
            }];
            return self.build_text_leaf(&items, style, available).map(Some);
        }

        let (outer_width, fixed_width) = outer_width(style, available);
        let inner_width = (outer_width
            - style.padding_left
            - style.padding_right
            - style.border_left.used_width()
            - style.border_right.used_width())
        .max(1.0);

        let child_ids = self.build_children(children, style, Some(attrs), inner_width)?;

        let mut ts = self.computed_to_taffy(style);
        if fixed_width {
            ts.size.width = taffy::Dimension::Length(outer_width);
        }
        let id = self.taffy.new_with_children(ts, &child_ids)?;
        self.node_styles.insert(id, style.clone());
        Ok(Some(id))
    }

    fn list_marker(&self, item: &ComputedStyle, ordinal: i64) -> Option<ListMarker> {
        let text = marker_text(item.list_style_type, ordinal)?;
        let run = RunStyle::from_style(item);
        let mut marker_font = run;
        marker_font.decoration = style::TextDecoration::None;
        marker_font.background = None;
        let width = self
            .fonts
            .measure_text_width(&text, run.size, &marker_font.font);
        let leading = run.size * run.line_height - run.size;
        Some(ListMarker {
            x_offset: -(width + 0.4 * run.size),
            baseline: leading / 2.0 + run.size * 0.8,
            text,
            style: marker_font,
        })
    }

    fn computed_to_taffy(&self, s: &ComputedStyle) -> Style {
        let mut ts = Style::default();

        match s.display {
            style::Display::Flex => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = match s.flex_direction {
                    style::FlexDirection::Row => taffy::FlexDirection::Row,
                    style::FlexDirection::Column => taffy::FlexDirection::Column,
                };
                ts.flex_wrap = match s.flex_wrap {
                    style::FlexWrap::NoWrap => taffy::FlexWrap::NoWrap,
                    style::FlexWrap::Wrap => taffy::FlexWrap::Wrap,
                };
                ts.justify_content = Some(match s.justify_content {
                    style::JustifyContent::Start => taffy::JustifyContent::Start,
                    style::JustifyContent::End => taffy::JustifyContent::End,
                    style::JustifyContent::Center => taffy::JustifyContent::Center,
                    style::JustifyContent::SpaceBetween => taffy::JustifyContent::SpaceBetween,
                    style::JustifyContent::SpaceAround => taffy::JustifyContent::SpaceAround,
                    style::JustifyContent::SpaceEvenly => taffy::JustifyContent::SpaceEvenly,
                });
                ts.align_items = Some(match s.align_items {
                    style::AlignItems::Start => taffy::AlignItems::Start,
                    style::AlignItems::End => taffy::AlignItems::End,
                    style::AlignItems::Center => taffy::AlignItems::Center,
                    style::AlignItems::Stretch => taffy::AlignItems::Stretch,
                });
                ts.gap = Size {
                    width: LengthPercentage::Length(s.gap),
                    height: LengthPercentage::Length(s.gap),
                };
            }
            // HTML table model: tables and row groups stack rows, rows lay
            // their cells out as equal-width columns.
            style::Display::Table | style::Display::TableRowGroup => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = taffy::FlexDirection::Column;
                ts.align_items = Some(taffy::AlignItems::Stretch);
            }
            style::Display::TableRow => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = taffy::FlexDirection::Row;
                ts.align_items = Some(taffy::AlignItems::Stretch);
            }
            style::Display::None => ts.display = taffy::Display::None,
            style::Display::Block
            | style::Display::ListItem
            | style::Display::TableCell
            | style::Display::Inline
            | style::Display::InlineBlock => ts.display = taffy::Display::Block,
        }

        // Sizing
        ts.size = Size {
            width: dim_to_taffy(s.width),
            height: dim_to_taffy(s.height),
        };
        ts.min_size = Size {
            width: if s.flex_shrink > 0.0 || s.flex_grow > 0.0 {
                taffy::Dimension::Length(0.0)
            } else {
                dim_to_taffy(s.min_width)
            },
            height: taffy::Dimension::Auto,
        };
        ts.max_size = Size {
            width: dim_to_taffy(s.max_width),
            height: taffy::Dimension::Auto,
        };

        ts.flex_grow = s.flex_grow;
        ts.flex_shrink = s.flex_shrink;

        match s.display {
            style::Display::TableCell => {
                ts.size.width = taffy::Dimension::Auto;
                ts.flex_grow = 1.0;
                ts.flex_shrink = 1.0;
                ts.flex_basis = taffy::Dimension::Length(0.0); // equal columns
                ts.min_size.width = taffy::Dimension::Length(0.0);
            }
            style::Display::TableRow => {
                ts.size.width = taffy::Dimension::Percent(1.0);
                ts.min_size.width = taffy::Dimension::Length(0.0);
            }
            _ => {}
        }

        ts.margin = Rect {
            top: margin_to_taffy(s.margin_top),
            right: margin_to_taffy(s.margin_right),
            bottom: margin_to_taffy(s.margin_bottom),
            left: margin_to_taffy(s.margin_left),
        };
        ts.padding = Rect {
            top: LengthPercentage::Length(s.padding_top),
            right: LengthPercentage::Length(s.padding_right),
            bottom: LengthPercentage::Length(s.padding_bottom),
            left: LengthPercentage::Length(s.padding_left),
        };
        ts.border = Rect {
            top: LengthPercentage::Length(s.border_top.used_width()),
            right: LengthPercentage::Length(s.border_right.used_width()),
            bottom: LengthPercentage::Length(s.border_bottom.used_width()),
            left: LengthPercentage::Length(s.border_left.used_width()),
        };

        ts
    }

    /// Extract positioned boxes after layout computation.
    fn extract(
        &self,
        node: NodeId,
        offset_x: f32,
        offset_y: f32,
    ) -> Result<PositionedBox, RenderError> {
        let layout = self.taffy.layout(node)?;
        let style = self.node_styles.get(&node).cloned().unwrap_or_default();
        let content = self
            .node_content
            .get(&node)
            .cloned()
            .unwrap_or(BoxContent::None);

        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;
        let (width, height) = (layout.size.width, layout.size.height);

        let children = self
            .taffy
            .children(node)?
            .into_iter()
            .map(|child| self.extract(child, x, y))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PositionedBox {
            x,
            y,
            width,
            height,
            style,
            content,
            marker: self.node_markers.get(&node).cloned(),
            children,
        })
    }
}

/// Border-box width an element will get, and whether it must be pinned
/// explicitly (auto width shrunk by `max-width` under auto margins).
fn outer_width(s: &ComputedStyle, available: f32) -> (f32, bool) {
    let margins = s.margin_left.pt() + s.margin_right.pt();
    let mut width = match s.width {
        style::Dimension::Pt(w) => w,
        style::Dimension::Percent(p) => available * p / 100.0,
        style::Dimension::Auto => available - margins,
    };
    let mut pinned = false;
    let max = match s.max_width {
        style::Dimension::Pt(m) => Some(m),
        style::Dimension::Percent(p) => Some(available * p / 100.0),
        style::Dimension::Auto => None,
    };
    if let Some(max) = max {
        if width > max {
            width = max;
            pinned = s.width == style::Dimension::Auto
                && (s.margin_left.is_auto() || s.margin_right.is_auto());
        }
    }
    (width.max(0.0), pinned)
}

fn dim_to_taffy(d: style::Dimension) -> taffy::Dimension {
    match d {
        style::Dimension::Auto => taffy::Dimension::Auto,
        style::Dimension::Pt(v) => taffy::Dimension::Length(v),
        style::Dimension::Percent(v) => taffy::Dimension::Percent(v / 100.0),
    }
}

fn margin_to_taffy(m: Margin) -> LengthPercentageAuto {
    match m {
        Margin::Pt(v) => LengthPercentageAuto::Length(v),
        Margin::Auto => LengthPercentageAuto::Auto,
    }
}

/// Marker text for the `ordinal`-th item, or `None` for `list-style: none`.
pub fn marker_text(kind: ListStyleType, ordinal: i64) -> Option<String> {
    Some(match kind {
        ListStyleType::None => return None,
        ListStyleType::Disc => "\u{2022}".to_string(),
        ListStyleType::Circle => "\u{25E6}".to_string(),
        ListStyleType::Square => "\u{25AA}".to_string(),
        ListStyleType::Decimal => format!("{ordinal}."),
        ListStyleType::LowerAlpha => format!("{}.", alphabetic(ordinal)),
        ListStyleType::UpperAlpha => format!("{}.", alphabetic(ordinal).to_uppercase()),
        ListStyleType::LowerRoman => format!("{}.", roman(ordinal)),
        ListStyleType::UpperRoman => format!("{}.", roman(ordinal).to_uppercase()),
    })
}

fn alphabetic(n: i64) -> String {
    if n < 1 {
        return n.to_string();
    }
    let mut n = n;
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push((b'a' + (n % 26) as u8) as char);
        n /= 26;
    }
    out.iter().rev().collect()
}

fn roman(n: i64) -> String {
    if !(1..4000).contains(&n) {
        return n.to_string();
    }
    const NUMERALS: [(i64, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut n = n;
    let mut out = String::new();
    for (value, numeral) in NUMERALS {
        while n >= value {
            out.push_str(numeral);
            n -= value;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute layout for a styled tree, returning the top-level positioned boxes
/// in document coordinates. `origin_x` is the left page margin.
pub fn compute_layout(
    styled_nodes: &[StyledNode],
    content_width: f32,
    origin_x: f32,
    fonts: &FontManager,
) -> Result<Vec<PositionedBox>, RenderError> {
    let mut builder = LayoutBuilder::new(fonts);
    let root_style = ComputedStyle {
        display: style::Display::Block,
        ..ComputedStyle::default()
    };
    let child_ids = builder.build_children(styled_nodes, &root_style, None, content_width)?;

    let root = builder.taffy.new_with_children(
        Style {
            display: taffy::Display::Block,
            size: Size {
                width: taffy::Dimension::Length(content_width),
                height: taffy::Dimension::Auto,
            },
            ..Default::default()
        },
        &child_ids,
    )?;

    builder.taffy.compute_layout(
        root,
        Size {
            width: AvailableSpace::Definite(content_width),
            height: AvailableSpace::MaxContent,
        },
    )?;

    Ok(builder.extract(root, origin_x, 0.0)?.children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::parse_stylesheet;
    use crate::dom::parse_html;
    use crate::style::{build_styled_tree, Cascade};

    fn layout(html: &str, css: &str) -> Vec<PositionedBox> {
        let dom = parse_html(html).unwrap();
        let cascade = Cascade::new(vec![parse_stylesheet(css).unwrap()]);
        let styled = build_styled_tree(&dom, &cascade);
        compute_layout(&styled, 500.0, 40.0, &FontManager::default()).unwrap()
    }

    fn text_boxes<'a>(b: &'a PositionedBox, out: &mut Vec<&'a PositionedBox>) {
        if matches!(b.content, BoxContent::Text(_)) {
            out.push(b);
        }
        for c in &b.children {
            text_boxes(c, out);
        }
    }

    fn line_strings(b: &PositionedBox) -> Vec<String> {
        match &b.content {
            BoxContent::Text(l) => l
                .lines
                .iter()
                .map(|line| line.fragments.iter().map(|f| f.text.clone()).collect::<Vec<_>>().join(""))
                .collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn layout_simple_paragraph() {
        let boxes = layout("<p>Hello world</p>", "");
        assert_eq!(boxes.len(), 1);
        let p = &boxes[0];
        assert!((p.x - 40.0).abs() < 0.01);
        assert!(p.width > 0.0 && p.height > 0.0);
        assert_eq!(p.children.len(), 1);
        assert_eq!(line_strings(&p.children[0]), vec!["Hello world"]);
    }

    #[test]
    fn whitespace_between_blocks_makes_no_boxes() {
        let boxes = layout("<div>\n<p>a</p>\n<p>b</p>\n</div>", "p { margin: 0 }");
        assert_eq!(boxes[0].children.len(), 2);
        assert!(boxes[0].children[1].y > boxes[0].children[0].y);
    }

    #[test]
    fn inline_children_share_one_leaf() {
        let boxes = layout("<p>Hello <strong>bold</strong> <em>world</em></p>", "");
        let mut texts = Vec::new();
        text_boxes(&boxes[0], &mut texts);
        assert_eq!(texts.len(), 1);
        assert_eq!(line_strings(texts[0]), vec!["Hello bold world"]);
    }

    #[test]
    fn centered_container_respects_max_width() {
        let boxes = layout(
            "<div class=\"c\"><p>x</p></div>",
            ".c { max-width: 400px; margin: 0 auto }",
        );
        let c = &boxes[0];
        assert!((c.width - 300.0).abs() < 0.5);
        assert!((c.x - (40.0 + 100.0)).abs() < 0.5);
    }

    #[test]
    fn table_columns_are_equal() {
        let boxes = layout(
            "<table><thead><tr><th>a</th><th>b</th></tr></thead>\
             <tbody><tr><td>1</td><td>2</td></tr></tbody></table>",
            "table { width: 100% }",
        );
        let table = &boxes[0];
        let body_row = &table.children[1].children[0];
        assert_eq!(body_row.children.len(), 2);
        let (c1, c2) = (&body_row.children[0], &body_row.children[1]);
        assert!((c1.width - c2.width).abs() < 0.01);
        assert!((c1.width + c2.width - table.width).abs() < 0.5);
        assert!(c2.x > c1.x);
    }

    #[test]
    fn list_items_get_markers() {
        let boxes = layout("<ol start=\"3\"><li>a</li><li>b</li></ol><ul><li>c</li></ul>", "");
        let ol = &boxes[0];
        let markers: Vec<String> = ol
            .children
            .iter()
            .filter_map(|li| li.marker.as_ref().map(|m| m.text.clone()))
            .collect();
        assert_eq!(markers, vec!["3.", "4."]);
        let ul_marker = boxes[1].children[0].marker.as_ref().unwrap();
        assert_eq!(ul_marker.text, "\u{2022}");
        assert!(ul_marker.x_offset < 0.0);
    }

    #[test]
    fn remote_images_fall_back_to_alt_text() {
        let boxes = layout("<p><img src=\"https://x.com/a.png\" alt=\"Logo\"></p>", "");
        let mut texts = Vec::new();
        text_boxes(&boxes[0], &mut texts);
        assert_eq!(line_strings(texts[0]), vec!["Logo"]);
    }

    #[test]
    fn pre_keeps_lines() {
        let boxes = layout("<pre><code>a\n  b\n</code></pre>", "");
        let mut texts = Vec::new();
        text_boxes(&boxes[0], &mut texts);
        assert_eq!(line_strings(texts[0]), vec!["a", "  b"]);
    }

    #[test]
    fn hidden_head_produces_nothing() {
        let boxes = layout(
            "<html><head><title>T</title><style>p{}</style></head><body><p>x</p></body></html>",
            "body { margin: 0 }",
        );
        let html = &boxes[0];
        assert_eq!(html.children.len(), 1);
    }

    #[test]
    fn marker_numbering_styles() {
        assert_eq!(marker_text(ListStyleType::LowerAlpha, 28).as_deref(), Some("ab."));
        assert_eq!(marker_text(ListStyleType::UpperRoman, 14).as_deref(), Some("XIV."));
        assert_eq!(marker_text(ListStyleType::None, 1), None);
    }
}
