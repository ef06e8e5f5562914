//! Layout config – the intermediate representation between layout computation
//! and PDF rendering. This is the "frozen" structure that encodes exactly what
//! goes on each page; it can be dumped to JSON and rendered again later.

use serde::{Deserialize, Serialize};

/// A complete document layout ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Document title embedded in the PDF metadata.
    #[serde(default = "LayoutConfig::default_title")]
    pub title: String,
    /// Width of each page in PDF points (1 pt = 1/72 inch).
    pub page_width_pt: f32,
    /// Height of each page in PDF points.
    pub page_height_pt: f32,
    /// Ordered list of pages.
    pub pages: Vec<PageLayout>,
}

/// One page of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub boxes: Vec<LayoutBox>,
}

/// A positioned rectangle with optional content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutBox {
    /// Position relative to page top-left, in points.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    /// Visual styling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<[f32; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<BorderStyle>,

    /// Content (mutually exclusive in practice)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<MarkerContent>,

    /// Children (nested boxes)
    #[serde(default)]
    pub children: Vec<LayoutBox>,
}

/// Per-side borders; a missing side is not drawn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BorderStyle {
    pub top: Option<BorderEdge>,
    pub right: Option<BorderEdge>,
    pub bottom: Option<BorderEdge>,
    pub left: Option<BorderEdge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BorderEdge {
    pub width: f32,
    pub color: [f32; 4],
}

impl BorderStyle {
    pub fn is_empty(&self) -> bool {
        self.top.is_none() && self.right.is_none() && self.bottom.is_none() && self.left.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    /// Pre-wrapped lines of text.
    pub lines: Vec<TextLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextLine {
    /// Y offset of the line top from the top of the box.
    pub y_offset: f32,
    pub height: f32,
    /// Baseline offset from the line top.
    pub baseline: f32,
    pub fragments: Vec<TextFragment>,
}

/// A run of text in one font, positioned within its line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    pub x_offset: f32,
    pub width: f32,
    /// PostScript name of a base-14 font, e.g. `Helvetica-Bold`.
    pub font: String,
    pub font_size: f32,
    pub color: [f32; 4],
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub line_through: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<[f32; 4]>,
}

/// List bullet or number, drawn left of the list item box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerContent {
    pub text: String,
    pub x_offset: f32,
    /// Baseline offset from the top of the box.
    pub baseline: f32,
    pub font: String,
    pub font_size: f32,
    pub color: [f32; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageContent {
    pub src: String,
    pub width: f32,
    pub height: f32,
}

impl LayoutConfig {
    /// Create an A4 layout config.
    pub fn a4() -> Self {
        Self {
            title: Self::default_title(),
            // A4: 210mm × 297mm = 595.28 × 841.89 points
            page_width_pt: 595.28,
            page_height_pt: 841.89,
            pages: Vec::new(),
        }
    }

    pub(crate) fn default_title() -> String {
        "Document".to_string()
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Every text fragment on every page, in drawing order.
    pub fn text_fragments(&self) -> Vec<&TextFragment> {
        fn walk<'a>(b: &'a LayoutBox, out: &mut Vec<&'a TextFragment>) {
            if let Some(text) = &b.text {
                out.extend(text.lines.iter().flat_map(|l| l.fragments.iter()));
            }
            for child in &b.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        for page in &self.pages {
            for b in &page.boxes {
                walk(b, &mut out);
            }
        }
        out
    }
}

impl LayoutBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            background_color: None,
            border: None,
            text: None,
            image: None,
            marker: None,
            children: Vec::new(),
        }
    }
}
