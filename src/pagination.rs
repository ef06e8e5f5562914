//! Pagination – slices the laid-out document into pages.
//!
//! The document is laid out once as one tall strip. Pagination picks cut
//! positions along that strip and then copies every box intersecting a
//! slice onto its page, shifted up by the slice start.
//!
//! A cut never falls through:
//! - a line of text
//! - an image, or any box with `page-break-inside: avoid` that fits a page
//! - the gap between a heading (`page-break-after: avoid`) and its next line
//!
//! If no such position exists on a page, the cut is forced at the page
//! bottom. `page-break-before` / `page-break-after` force cuts.

use crate::inline::InlineLayout;
use crate::layout::{BoxContent, ListMarker, PositionedBox};
use crate::layout_config::*;

const EPSILON: f32 = 0.01;

/// Physical page size and margins, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
}

impl PageGeometry {
    pub fn content_width(&self) -> f32 {
        (self.width - self.margin_left - self.margin_right).max(1.0)
    }

    pub fn content_height(&self) -> f32 {
        (self.height - self.margin_top - self.margin_bottom).max(1.0)
    }
}

/// Break constraints gathered from the layout tree.
#[derive(Debug, Default)]
struct BreakPlan {
    /// `(top, bottom)` spans a cut must not fall inside.
    keep_together: Vec<(f32, f32)>,
    /// Positions where a new page must start.
    forced: Vec<f32>,
    end: f32,
}

impl BreakPlan {
    fn collect(boxes: &[PositionedBox], page_height: f32) -> Self {
        let mut plan = Self::default();
        for b in boxes {
            plan.visit(b, page_height);
        }
        plan.forced.sort_by(f32::total_cmp);
        plan
    }

    fn visit(&mut self, b: &PositionedBox, page_height: f32) {
        self.end = self.end.max(b.bottom());
        let style = &b.style;

        if style.page_break_before {
            self.forced.push(b.y);
        }
        if style.page_break_after {
            self.forced.push(b.bottom());
        }

        let mut keep = |top: f32, bottom: f32| {
            if bottom - top <= page_height {
                self.keep_together.push((top, bottom));
            }
        };
        match &b.content {
            BoxContent::Text(layout) => {
                for line in &layout.lines {
                    keep(b.y + line.y, b.y + line.y + line.height);
                }
            }
            BoxContent::Image { .. } => keep(b.y, b.bottom()),
            BoxContent::None => {}
        }
        if style.page_break_inside_avoid {
            keep(b.y, b.bottom());
        }
        if style.page_break_after_avoid {
            let next_line = style.margin_bottom.pt() + style.line_height_pt();
            keep(b.y, b.bottom() + next_line);
        }

        for child in &b.children {
            self.visit(child, page_height);
        }
    }

    /// Cut positions, starting with 0 and ending at the document end.
    fn cuts(&self, page_height: f32) -> Vec<f32> {
        let mut cuts = vec![0.0f32];
        let mut start = 0.0f32;
        loop {
            let limit = start + page_height;
            let forced = self
                .forced
                .iter()
                .copied()
                .find(|&f| f > start + EPSILON && f < self.end - EPSILON);
            if let Some(f) = forced.filter(|&f| f <= limit + EPSILON) {
                cuts.push(f);
                start = f;
                continue;
            }
            if limit >= self.end - EPSILON {
                break;
            }

            let mut cut = limit;
            loop {
                let inside = self
                    .keep_together
                    .iter()
                    .filter(|&&(top, bottom)| top > start + EPSILON && top < cut && cut < bottom)
                    .map(|&(top, _)| top)
                    .fold(f32::INFINITY, f32::min);
                if inside.is_finite() {
                    cut = inside;
                } else {
                    break;
                }
            }
            if cut <= start + EPSILON {
                log::debug!("no clean page break near y={limit:.1}; cutting through content");
                cut = limit;
            }
            cuts.push(cut);
            start = cut;
        }
        cuts.push(self.end.max(start));
        cuts
    }
}

/// Convert positioned boxes into a paginated LayoutConfig.
pub fn paginate(boxes: &[PositionedBox], page: &PageGeometry, title: &str) -> LayoutConfig {
    let plan = BreakPlan::collect(boxes, page.content_height());
    let cuts = plan.cuts(page.content_height());

    let mut config = LayoutConfig {
        title: title.to_string(),
        page_width_pt: page.width,
        page_height_pt: page.height,
        pages: Vec::new(),
    };

    for window in cuts.windows(2) {
        let slice = Slice {
            start: window[0],
            end: window[1],
            dy: page.margin_top - window[0],
        };
        config.pages.push(PageLayout {
            page_index: config.pages.len(),
            boxes: boxes.iter().filter_map(|b| slice.place(b)).collect(),
        });
    }
    if config.pages.is_empty() {
        config.pages.push(PageLayout {
            page_index: 0,
            boxes: Vec::new(),
        });
    }
    log::debug!("paginated into {} page(s)", config.pages.len());
    config
}

/// The part of the document strip `[start, end)` that goes on one page,
/// moved down by `dy`.
struct Slice {
    start: f32,
    end: f32,
    dy: f32,
}

impl Slice {
    fn contains(&self, y: f32) -> bool {
        y >= self.start - EPSILON && y < self.end - EPSILON
    }

    /// Page-absolute copy of the visible part of `pbox`, or `None` if
    /// nothing of it lands on this page.
    fn place(&self, pbox: &PositionedBox) -> Option<LayoutBox> {
        if pbox.y >= self.end - EPSILON || pbox.bottom() <= self.start + EPSILON {
            return None;
        }

        if let BoxContent::Image { src } = &pbox.content {
            if !self.contains(pbox.y) {
                return None;
            }
            let mut lb = LayoutBox::new(pbox.x, pbox.y + self.dy, pbox.width, pbox.height);
            lb.image = Some(ImageContent {
                src: src.clone(),
                width: pbox.width,
                height: pbox.height,
            });
            return Some(lb);
        }

        let top = pbox.y.max(self.start);
        let bottom = pbox.bottom().min(self.end);
        let mut lb = LayoutBox::new(pbox.x, top + self.dy, pbox.width, bottom - top);

        let style = &pbox.style;
        if !style.background_color.is_transparent() {
            lb.background_color = Some(style.background_color.to_array());
        }
        let border = self.borders(pbox);
        if !border.is_empty() {
            lb.border = Some(border);
        }

        if let BoxContent::Text(layout) = &pbox.content {
            lb.text = self.text(layout, pbox.y, top);
        }
        if let Some(marker) = pbox.marker.as_ref().filter(|_| self.contains(pbox.y)) {
            lb.marker = Some(marker_content(marker));
        }

        lb.children = pbox
            .children
            .iter()
            .filter_map(|c| self.place(c))
            .collect();

        let visible = lb.background_color.is_some()
            || lb.border.is_some()
            || lb.text.is_some()
            || lb.marker.is_some()
            || !lb.children.is_empty();
        visible.then_some(lb)
    }

    /// Sides cut off by a page edge are not drawn.
    fn borders(&self, pbox: &PositionedBox) -> BorderStyle {
        let style = &pbox.style;
        let edge = |side: &crate::style::BorderSide| {
            (side.used_width() > 0.0).then(|| BorderEdge {
                width: side.used_width(),
                color: style.border_color(side).to_array(),
            })
        };
        BorderStyle {
            top: edge(&style.border_top).filter(|_| pbox.y >= self.start - EPSILON),
            right: edge(&style.border_right),
            bottom: edge(&style.border_bottom).filter(|_| pbox.bottom() <= self.end + EPSILON),
            left: edge(&style.border_left),
        }
    }

    /// Lines whose top lies in this slice, re-based to `box_top`.
    fn text(&self, layout: &InlineLayout, text_y: f32, box_top: f32) -> Option<TextContent> {
        let lines: Vec<TextLine> = layout
            .lines
            .iter()
            .filter(|line| self.contains(text_y + line.y))
            .map(|line| TextLine {
                y_offset: text_y + line.y - box_top,
                height: line.height,
                baseline: line.baseline,
                fragments: line
                    .fragments
                    .iter()
                    .map(|f| TextFragment {
                        text: f.text.clone(),
                        x_offset: f.x,
                        width: f.width,
                        font: f.style.font.postscript_name().to_string(),
                        font_size: f.style.size,
                        color: f.style.color.to_array(),
                        underline: f.style.decoration == crate::style::TextDecoration::Underline,
                        line_through: f.style.decoration
                            == crate::style::TextDecoration::LineThrough,
                        background_color: f.style.background.map(|c| c.to_array()),
                    })
                    .collect(),
            })
            .collect();
        (!lines.is_empty()).then_some(TextContent { lines })
    }
}

fn marker_content(marker: &ListMarker) -> MarkerContent {
    MarkerContent {
        text: marker.text.clone(),
        x_offset: marker.x_offset,
        baseline: marker.baseline,
        font: marker.style.font.postscript_name().to_string(),
        font_size: marker.style.size,
        color: marker.style.color.to_array(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::parse_stylesheet;
    use crate::dom::parse_html;
    use crate::fonts::FontManager;
    use crate::layout::compute_layout;
    use crate::style::{build_styled_tree, Cascade, ComputedStyle};

    const A4: PageGeometry = PageGeometry {
        width: 595.28,
        height: 841.89,
        margin_top: 40.0,
        margin_right: 40.0,
        margin_bottom: 40.0,
        margin_left: 40.0,
    };

    fn paginate_html(html: &str, css: &str) -> LayoutConfig {
        let dom = parse_html(html).unwrap();
        let cascade = Cascade::new(vec![parse_stylesheet(css).unwrap()]);
        let styled = build_styled_tree(&dom, &cascade);
        let boxes = compute_layout(
            &styled,
            A4.content_width(),
            A4.margin_left,
            &FontManager::default(),
        )
        .unwrap();
        paginate(&boxes, &A4, "Test")
    }

    fn any_style(boxes: &[PositionedBox], pred: &dyn Fn(&ComputedStyle) -> bool) -> bool {
        boxes
            .iter()
            .any(|b| pred(&b.style) || any_style(&b.children, pred))
    }

    fn page_text(page: &PageLayout) -> Vec<String> {
        fn walk(b: &LayoutBox, out: &mut Vec<String>) {
            if let Some(t) = &b.text {
                for line in &t.lines {
                    out.push(line.fragments.iter().map(|f| f.text.as_str()).collect());
                }
            }
            for c in &b.children {
                walk(c, out);
            }
        }
        let mut out = Vec::new();
        for b in &page.boxes {
            walk(b, &mut out);
        }
        out
    }

    fn line_extents(page: &PageLayout) -> Vec<(f32, f32)> {
        fn walk(b: &LayoutBox, out: &mut Vec<(f32, f32)>) {
            if let Some(t) = &b.text {
                for line in &t.lines {
                    let top = b.y + line.y_offset;
                    out.push((top, top + line.height));
                }
            }
            for c in &b.children {
                walk(c, out);
            }
        }
        let mut out = Vec::new();
        for b in &page.boxes {
            walk(b, &mut out);
        }
        out
    }

    #[test]
    fn single_page() {
        let config = paginate_html("<p>Short text</p>", "");
        assert_eq!(config.pages.len(), 1);
        assert_eq!(config.title, "Test");
        assert_eq!(page_text(&config.pages[0]), vec!["Short text"]);
    }

    #[test]
    fn empty_document_has_one_page() {
        let config = paginate_html("", "");
        assert_eq!(config.pages.len(), 1);
        assert!(config.pages[0].boxes.is_empty());
    }

    #[test]
    fn multiple_pages_keep_every_line_once() {
        let mut html = String::new();
        for i in 0..80 {
            html.push_str(&format!("<p>Paragraph {i} with some text</p>"));
        }
        let config = paginate_html(&html, "");
        assert!(config.pages.len() > 1, "got {} pages", config.pages.len());

        let all: Vec<String> = config.pages.iter().flat_map(page_text).collect();
        assert_eq!(all.len(), 80);
        assert_eq!(all[79], "Paragraph 79 with some text");

        for page in &config.pages {
            for (top, bottom) in line_extents(page) {
                assert!(top >= A4.margin_top - 0.01);
                assert!(bottom <= A4.height - A4.margin_bottom + 0.01);
            }
        }
    }

    #[test]
    fn long_paragraph_splits_between_lines() {
        let words = "lorem ipsum dolor sit amet ".repeat(600);
        let config = paginate_html(
            &format!("<div style=\"border: 1px solid #000\"><p>{words}</p></div>"),
            "",
        );
        assert!(config.pages.len() >= 2);
        // The bordered container's top edge shows only on the first page.
        let first = &config.pages[0].boxes[0];
        let second = &config.pages[1].boxes[0];
        assert!(first.border.as_ref().unwrap().top.is_some());
        assert!(second.border.as_ref().unwrap().top.is_none());
        assert!(second.border.as_ref().unwrap().left.is_some());
    }

    #[test]
    fn forced_page_break() {
        let config = paginate_html(
            "<p>one</p><p style=\"page-break-before: always\">two</p>",
            "",
        );
        assert_eq!(config.pages.len(), 2);
        assert_eq!(page_text(&config.pages[1]), vec!["two"]);
    }

    #[test]
    fn heading_moves_with_following_text() {
        // Fill the first page so that a heading lands at its very bottom.
        let filler = "<p style=\"margin:0\">x</p>".repeat(200);
        let probe = paginate_html(&filler, "");
        let lines_on_first = page_text(&probe.pages[0]).len();

        let html = format!(
            "{}<h2 style=\"margin:0\">Heading</h2><p style=\"margin:0\">body</p>",
            "<p style=\"margin:0\">x</p>".repeat(lines_on_first - 1)
        );
        let config = paginate_html(&html, "");
        let second = page_text(&config.pages[1]);
        assert_eq!(second, vec!["Heading", "body"]);
    }

    #[test]
    fn markers_travel_with_list_items() {
        let config = paginate_html("<ul><li>a</li><li>b</li></ul>", "");
        let ul = &config.pages[0].boxes[0];
        let markers: Vec<&str> = ul
            .children
            .iter()
            .filter_map(|li| li.marker.as_ref().map(|m| m.text.as_str()))
            .collect();
        assert_eq!(markers, vec!["\u{2022}", "\u{2022}"]);
    }

    #[test]
    fn break_hints_are_seen() {
        let dom = parse_html("<h1>x</h1>").unwrap();
        let styled = build_styled_tree(&dom, &Cascade::new(Vec::new()));
        let boxes = compute_layout(&styled, 500.0, 40.0, &FontManager::default()).unwrap();
        assert!(any_style(&boxes, &|s| s.page_break_after_avoid));
    }
}
