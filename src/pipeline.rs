//! Pipeline – ties together parsing, styling, layout, pagination, and
//! rendering into a single function call.
//!
//! The page box comes from [`PipelineConfig`] unless the document's own
//! stylesheets carry an `@page` rule, whose `size` and `margin` win.

use std::panic::{self, AssertUnwindSafe};

use crate::css::parse_stylesheet;
use crate::dom::{document_title, parse_html, style_sheets};
use crate::error::RenderError;
use crate::fonts::FontManager;
use crate::layout::compute_layout;
use crate::layout_config::LayoutConfig;
use crate::pagination::{paginate, PageGeometry};
use crate::render::render_pdf;
use crate::style::{build_styled_tree, parse_length, Cascade, ROOT_FONT_SIZE};

/// Default page margin in points.
pub const PAGE_MARGIN_PT: f32 = 40.0;

/// Page orientation for the generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageOrientation {
    /// Portrait mode: height > width (default).
    #[default]
    Portrait,
    /// Landscape mode: width > height.
    Landscape,
}

/// Configuration for the PDF generation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Document title embedded in the PDF metadata. `None` uses the
    /// document's `<title>`.
    pub title: Option<String>,
    /// Page width in points (default: A4 = 595.28).
    pub page_width: f32,
    /// Page height in points (default: A4 = 841.89).
    pub page_height: f32,
    /// Page margin in points (default: 40).
    pub page_margin: f32,
    /// Page orientation; `Landscape` puts the long edge horizontally unless
    /// an `@page` size names its own orientation.
    pub orientation: PageOrientation,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            title: None,
            page_width: 595.28,
            page_height: 841.89,
            page_margin: PAGE_MARGIN_PT,
            orientation: PageOrientation::Portrait,
        }
    }
}

impl PipelineConfig {
    /// Create an A4 landscape config.
    pub fn a4_landscape() -> Self {
        Self {
            orientation: PageOrientation::Landscape,
            ..Self::default()
        }
    }

    /// Page box for a document whose `@page` rules are `page_rules`
    /// (`(property, value)` pairs in cascade order).
    pub fn page_geometry<'a>(
        &self,
        page_rules: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> PageGeometry {
        let mut width = self.page_width;
        let mut height = self.page_height;
        let mut explicit_orientation = None;
        let m = self.page_margin;
        let mut margins = [m, m, m, m];

        for (property, value) in page_rules {
            match property {
                "size" => {
                    if let Some((w, h, orientation)) = parse_page_size(value) {
                        width = w;
                        height = h;
                        explicit_orientation = orientation;
                    }
                }
                "margin" => {
                    if let Some(parsed) = parse_margin_shorthand(value) {
                        margins = parsed;
                    }
                }
                "margin-top" | "margin-right" | "margin-bottom" | "margin-left" => {
                    let index = match property {
                        "margin-top" => 0,
                        "margin-right" => 1,
                        "margin-bottom" => 2,
                        _ => 3,
                    };
                    if let Some(v) = parse_length(value, ROOT_FONT_SIZE) {
                        margins[index] = v.max(0.0);
                    }
                }
                _ => {}
            }
        }

        let orientation = explicit_orientation.unwrap_or(self.orientation);
        let (short, long) = (width.min(height), width.max(height));
        (width, height) = match orientation {
            PageOrientation::Portrait if explicit_orientation.is_none() => (width, height),
            PageOrientation::Portrait => (short, long),
            PageOrientation::Landscape => (long, short),
        };

        // Margins that leave no room for content are ignored.
        if margins[1] + margins[3] >= width || margins[0] + margins[2] >= height {
            log::warn!("@page margins exceed the page; using {m}pt");
            margins = [m, m, m, m];
        }

        PageGeometry {
            width,
            height,
            margin_top: margins[0],
            margin_right: margins[1],
            margin_bottom: margins[2],
            margin_left: margins[3],
        }
    }
}

/// `(width, height, orientation keyword)` from an `@page` `size` value.
fn parse_page_size(value: &str) -> Option<(f32, f32, Option<PageOrientation>)> {
    let mut named = None;
    let mut lengths = Vec::new();
    let mut orientation = None;
    for token in value.split_whitespace() {
        match token.to_ascii_lowercase().as_str() {
            "portrait" => orientation = Some(PageOrientation::Portrait),
            "landscape" => orientation = Some(PageOrientation::Landscape),
            "auto" => named = Some((595.28, 841.89)),
            "a3" => named = Some((841.89, 1190.55)),
            "a4" => named = Some((595.28, 841.89)),
            "a5" => named = Some((419.53, 595.28)),
            "b5" => named = Some((498.9, 708.66)),
            "letter" => named = Some((612.0, 792.0)),
            "legal" => named = Some((612.0, 1008.0)),
            "ledger" => named = Some((792.0, 1224.0)),
            other => lengths.push(parse_length(other, ROOT_FONT_SIZE)?),
        }
    }
    let (w, h) = match (named, lengths.as_slice()) {
        (Some(size), []) => size,
        (None, [side]) => (*side, *side),
        (None, [w, h]) => (*w, *h),
        (None, []) if orientation.is_some() => (595.28, 841.89),
        _ => return None,
    };
    (w > 0.0 && h > 0.0).then_some((w, h, orientation))
}

/// `[top, right, bottom, left]` from a 1–4 value `margin`.
fn parse_margin_shorthand(value: &str) -> Option<[f32; 4]> {
    let values = value
        .split_whitespace()
        .map(|v| parse_length(v, ROOT_FONT_SIZE).map(|l| l.max(0.0)))
        .collect::<Option<Vec<_>>>()?;
    Some(match values.as_slice() {
        [a] => [*a, *a, *a, *a],
        [v, h] => [*v, *h, *v, *h],
        [t, h, b] => [*t, *h, *b, *h],
        [t, r, b, l] => [*t, *r, *b, *l],
        _ => return None,
    })
}

/// Produces fixed-layout bytes from a composed HTML document.
///
/// Implementations must be usable from many threads at once; the pipeline
/// calls them once per request and never retries.
pub trait FixedLayoutRenderer: Send + Sync {
    fn render(&self, html: &str) -> Result<Vec<u8>, RenderError>;
}

/// The built-in HTML → PDF engine.
#[derive(Debug, Clone, Default)]
pub struct ForgeRenderer {
    config: PipelineConfig,
}

impl ForgeRenderer {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl FixedLayoutRenderer for ForgeRenderer {
    fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        // The engine keeps no state between calls.
        let result = panic::catch_unwind(AssertUnwindSafe(|| generate_pdf(html, &self.config)));
        match result {
            Ok(outcome) => outcome.map(|(bytes, _)| bytes),
            Err(payload) => {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(RenderError::Panicked(detail))
            }
        }
    }
}

/// Full pipeline: HTML string → PDF bytes, plus the layout they were
/// rendered from.
pub fn generate_pdf(
    html: &str,
    config: &PipelineConfig,
) -> Result<(Vec<u8>, LayoutConfig), RenderError> {
    let layout_config = compute_layout_config(html, config)?;
    let pdf_bytes = render_pdf(&layout_config)?;
    Ok((pdf_bytes, layout_config))
}

/// Convenience: generate PDF with default A4 config.
pub fn generate_pdf_from_html(html: &str) -> Result<Vec<u8>, RenderError> {
    let (bytes, _) = generate_pdf(html, &PipelineConfig::default())?;
    Ok(bytes)
}

/// Generate only the layout config (no PDF rendering).
pub fn compute_layout_config(
    html: &str,
    config: &PipelineConfig,
) -> Result<LayoutConfig, RenderError> {
    // 1. Parse HTML and its stylesheets
    let dom = parse_html(html)?;
    let sheets = style_sheets(&dom)
        .iter()
        .map(|css| parse_stylesheet(css))
        .collect::<Result<Vec<_>, _>>()?;
    let cascade = Cascade::new(sheets);

    let page = config.page_geometry(
        cascade
            .page_declarations()
            .into_iter()
            .map(|d| (d.property.as_str(), d.value.as_str())),
    );
    let title = config
        .title
        .clone()
        .or_else(|| document_title(&dom))
        .unwrap_or_else(LayoutConfig::default_title);

    // 2. Build styled tree
    let styled = build_styled_tree(&dom, &cascade);

    // 3. Compute layout
    let fonts = FontManager::default();
    let boxes = compute_layout(&styled, page.content_width(), page.margin_left, &fonts)?;

    // 4. Paginate
    Ok(paginate(&boxes, &page, &title))
}

/// Render a previously computed (possibly edited) layout.
pub fn render_from_layout(layout: &LayoutConfig) -> Result<Vec<u8>, RenderError> {
    render_pdf(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_basic() {
        let html = "<h1>Hello</h1><p>World</p>";
        let (bytes, config) = generate_pdf(html, &PipelineConfig::default()).unwrap();
        assert!(!bytes.is_empty());
        assert!(!config.pages.is_empty());
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn title_comes_from_document_unless_configured() {
        let html = "<html><head><title>My CV</title></head><body><p>x</p></body></html>";
        let config = compute_layout_config(html, &PipelineConfig::default()).unwrap();
        assert_eq!(config.title, "My CV");

        let named = PipelineConfig {
            title: Some("Other".into()),
            ..PipelineConfig::default()
        };
        assert_eq!(compute_layout_config(html, &named).unwrap().title, "Other");
        assert_eq!(
            compute_layout_config("<p>x</p>", &PipelineConfig::default())
                .unwrap()
                .title,
            "Document"
        );
    }

    #[test]
    fn page_rule_overrides_geometry() {
        let html = "<style>@page { size: letter; margin: 0.5in 1in }</style>\
                    <p style=\"margin:0\">x</p>";
        let config = compute_layout_config(html, &PipelineConfig::default()).unwrap();
        assert_eq!(config.page_width_pt, 612.0);
        assert_eq!(config.page_height_pt, 792.0);
        let first = &config.pages[0].boxes[0];
        assert!((first.x - 72.0).abs() < 0.01);
        assert!((first.y - 36.0).abs() < 0.01);
    }

    #[test]
    fn page_geometry_variants() {
        let config = PipelineConfig::default();
        let landscape = config.page_geometry([("size", "A4 landscape")]);
        assert!(landscape.width > landscape.height);

        let custom = config.page_geometry([("size", "100mm 50mm"), ("margin-left", "10pt")]);
        assert!((custom.width - 283.46).abs() < 0.1);
        assert_eq!(custom.margin_left, 10.0);
        assert_eq!(custom.margin_top, PAGE_MARGIN_PT);

        let swapped = PipelineConfig::a4_landscape().page_geometry([("size", "A4")]);
        assert!(swapped.width > swapped.height);

        let kept = config.page_geometry([("size", "bogus"), ("margin", "1 2 3 4 5")]);
        assert_eq!(kept.width, 595.28);
        assert_eq!(kept.margin_right, PAGE_MARGIN_PT);
    }

    #[test]
    fn malformed_markup_fails() {
        let err = generate_pdf("<p>ok</p><div class=\"x", &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, RenderError::Markup { .. }));
    }

    #[test]
    fn malformed_stylesheet_fails() {
        let err = ForgeRenderer::default()
            .render("<style>p { color: red </style><p>x</p>")
            .unwrap_err();
        assert!(matches!(err, RenderError::Stylesheet { .. }));
    }

    #[test]
    fn layout_json_renders_again() {
        let config = compute_layout_config("<p>round trip</p>", &PipelineConfig::default()).unwrap();
        let back = LayoutConfig::from_json(&config.to_json()).unwrap();
        let bytes = render_from_layout(&back).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }
}
