//! PDF renderer – takes a [`LayoutConfig`] and produces PDF bytes using
//! `printpdf` (v0.8 ops-based API).
//!
//! Text is set in the base-14 fonts named by each fragment, so no font
//! files are embedded.

use std::collections::{HashMap, HashSet};

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use printpdf::*;

use crate::error::RenderError;
use crate::fonts::{win_ansi_byte, FontKey};
use crate::layout_config::{BorderStyle, LayoutBox, LayoutConfig, TextContent};
use crate::style::FontFamily;

/// A printpdf XObject together with the pixel dimensions of the source image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Render a LayoutConfig into PDF bytes.
///
/// `<img>` elements whose `src` is not a base64 data URI, or whose bytes
/// cannot be decoded, are skipped with a `log::warn`.
pub fn render_pdf(config: &LayoutConfig) -> Result<Vec<u8>, RenderError> {
    let page_w = Mm(config.page_width_pt * 0.352778); // pt → mm
    let page_h = Mm(config.page_height_pt * 0.352778);

    let mut doc = PdfDocument::new(&config.title);

    // ── Pre-register all images ────────────────────────────────────────────
    let mut all_srcs: HashSet<&str> = HashSet::new();
    for page_layout in &config.pages {
        for lbox in &page_layout.boxes {
            collect_image_srcs(lbox, &mut all_srcs);
        }
    }

    let mut image_resources: HashMap<String, ImageResource> = HashMap::new();
    let mut img_warnings: Vec<PdfWarnMsg> = Vec::new();

    for src in &all_srcs {
        let bytes = match parse_data_uri(src) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("skipping image: {e}");
                continue;
            }
        };
        let dyn_img = match ::image::load_from_memory(&bytes) {
            Ok(img) => img,
            Err(e) => {
                log::warn!("skipping image: decode error: {e}");
                continue;
            }
        };
        let raw = match RawImage::decode_from_bytes(&bytes, &mut img_warnings) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("skipping image: PDF encode error: {e}");
                continue;
            }
        };
        image_resources.insert(
            src.to_string(),
            ImageResource {
                xobj_id: doc.add_image(&raw),
                px_width: dyn_img.width(),
                px_height: dyn_img.height(),
            },
        );
    }

    // ── Render pages ──────────────────────────────────────────────────────
    let mut pages = Vec::new();
    for page_layout in &config.pages {
        let mut ops = Vec::new();
        for lbox in &page_layout.boxes {
            render_box(&mut ops, lbox, config.page_height_pt, &image_resources);
        }
        pages.push(PdfPage::new(page_w, page_h, ops));
    }
    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    doc.with_pages(pages);
    // Secure mode drops unknown operators, which would discard the text runs.
    let options = PdfSaveOptions {
        secure: false,
        ..PdfSaveOptions::default()
    };
    let bytes = doc.save(&options, &mut Vec::new());
    if !bytes.starts_with(b"%PDF-") {
        return Err(RenderError::Pdf("serializer produced no PDF header".into()));
    }
    log::debug!("rendered {} page(s), {} bytes", config.pages.len(), bytes.len());
    Ok(bytes)
}

/// Encode a UTF-8 string as WinAnsiEncoding bytes, one per glyph.
fn win_ansi_bytes(s: &str) -> Vec<u8> {
    s.chars().map(win_ansi_byte).collect()
}

/// Parse a `data:<mime>;base64,<data>` URI and return the raw decoded bytes.
///
/// Returns `Err` if `src` is not a data URI or does not use base64 encoding.
pub fn parse_data_uri(src: &str) -> Result<Vec<u8>, String> {
    let Some(rest) = src.strip_prefix("data:") else {
        let preview: String = src.chars().take(80).collect();
        return Err(format!(
            "image src must be a base64 data URI (e.g. `data:image/png;base64,...`), got {preview:?}"
        ));
    };
    let comma_pos = rest
        .find(',')
        .ok_or_else(|| "invalid data URI: missing `,` after the header".to_string())?;
    let header = &rest[..comma_pos];
    if !header.contains(";base64") {
        return Err("only base64-encoded data URIs are supported".to_string());
    }
    let b64_data: String = rest[comma_pos + 1..]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    BASE64_STD
        .decode(b64_data)
        .map_err(|e| format!("base64 decode error: {e}"))
}

/// Recursively collect all unique `image.src` strings from a [`LayoutBox`] tree.
fn collect_image_srcs<'a>(lbox: &'a LayoutBox, srcs: &mut HashSet<&'a str>) {
    if let Some(img) = &lbox.image {
        srcs.insert(img.src.as_str());
    }
    for child in &lbox.children {
        collect_image_srcs(child, srcs);
    }
}

fn builtin_font(postscript_name: &str) -> BuiltinFont {
    let key = FontKey::from_postscript_name(postscript_name).unwrap_or_else(|| {
        log::warn!("unknown font {postscript_name:?}; using Helvetica");
        FontKey {
            family: FontFamily::Sans,
            bold: false,
            italic: false,
        }
    });
    match (key.family, key.bold, key.italic) {
        (FontFamily::Sans, false, false) => BuiltinFont::Helvetica,
        (FontFamily::Sans, true, false) => BuiltinFont::HelveticaBold,
        (FontFamily::Sans, false, true) => BuiltinFont::HelveticaOblique,
        (FontFamily::Sans, true, true) => BuiltinFont::HelveticaBoldOblique,
        (FontFamily::Serif, false, false) => BuiltinFont::TimesRoman,
        (FontFamily::Serif, true, false) => BuiltinFont::TimesBold,
        (FontFamily::Serif, false, true) => BuiltinFont::TimesItalic,
        (FontFamily::Serif, true, true) => BuiltinFont::TimesBoldItalic,
        (FontFamily::Mono, false, false) => BuiltinFont::Courier,
        (FontFamily::Mono, true, false) => BuiltinFont::CourierBold,
        (FontFamily::Mono, false, true) => BuiltinFont::CourierOblique,
        (FontFamily::Mono, true, true) => BuiltinFont::CourierBoldOblique,
    }
}

fn rgb(c: [f32; 4]) -> Color {
    Color::Rgb(Rgb {
        r: c[0],
        g: c[1],
        b: c[2],
        icc_profile: None,
    })
}

/// Fill a rectangle given in top-left page coordinates.
fn fill_rect(ops: &mut Vec<Op>, x: f32, top: f32, w: f32, h: f32, page_height: f32, color: [f32; 4]) {
    if w <= 0.0 || h <= 0.0 {
        return;
    }
    let (x1, x2) = (x, x + w);
    let (y1, y2) = (page_height - top - h, page_height - top);
    let corner = |x: f32, y: f32| LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    };
    ops.push(Op::SetFillColor { col: rgb(color) });
    ops.push(Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: vec![corner(x1, y1), corner(x2, y1), corner(x2, y2), corner(x1, y2)],
            }],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        },
    });
}

/// Write `text` with its baseline at `baseline` (top-left page coordinates).
#[allow(clippy::too_many_arguments)]
fn write_text(
    ops: &mut Vec<Op>,
    text: &str,
    x: f32,
    baseline: f32,
    font_name: &str,
    size: f32,
    color: [f32; 4],
    page_height: f32,
) {
    let font = builtin_font(font_name);
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: Pt(x),
            y: Pt(page_height - baseline),
        },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(size),
        font,
    });
    ops.push(Op::SetFillColor { col: rgb(color) });
    // The empty run registers the font resource; the glyph bytes go out as
    // a raw `Tj` so 0x80-0xFF reach the stream unchanged.
    ops.push(Op::WriteTextBuiltinFont {
        items: Vec::new(),
        font,
    });
    ops.push(Op::Unknown {
        key: "Tj".into(),
        value: vec![DictItem::String {
            data: win_ansi_bytes(text),
            literal: true,
        }],
    });
    ops.push(Op::EndTextSection);
}

fn render_border(ops: &mut Vec<Op>, lbox: &LayoutBox, border: &BorderStyle, page_height: f32) {
    let (x, y, w, h) = (lbox.x, lbox.y, lbox.width, lbox.height);
    if let Some(e) = border.top {
        fill_rect(ops, x, y, w, e.width, page_height, e.color);
    }
    if let Some(e) = border.bottom {
        fill_rect(ops, x, y + h - e.width, w, e.width, page_height, e.color);
    }
    if let Some(e) = border.left {
        fill_rect(ops, x, y, e.width, h, page_height, e.color);
    }
    if let Some(e) = border.right {
        fill_rect(ops, x + w - e.width, y, e.width, h, page_height, e.color);
    }
}

fn render_text(ops: &mut Vec<Op>, lbox: &LayoutBox, text: &TextContent, page_height: f32) {
    for line in &text.lines {
        let line_top = lbox.y + line.y_offset;
        let baseline = line_top + line.baseline;
        for frag in &line.fragments {
            let x = lbox.x + frag.x_offset;
            if let Some(bg) = frag.background_color {
                fill_rect(ops, x, line_top, frag.width, line.height, page_height, bg);
            }
            if frag.text.trim().is_empty() {
                continue;
            }
            write_text(ops, &frag.text, x, baseline, &frag.font, frag.font_size, frag.color, page_height);

            let thickness = (frag.font_size / 18.0).max(0.5);
            if frag.underline {
                let y = baseline + frag.font_size * 0.1;
                fill_rect(ops, x, y, frag.width, thickness, page_height, frag.color);
            }
            if frag.line_through {
                let y = baseline - frag.font_size * 0.3;
                fill_rect(ops, x, y, frag.width, thickness, page_height, frag.color);
            }
        }
    }
}

/// Recursively render a LayoutBox and its children into PDF ops.
fn render_box(
    ops: &mut Vec<Op>,
    lbox: &LayoutBox,
    page_height: f32,
    images: &HashMap<String, ImageResource>,
) {
    if let Some(bg) = lbox.background_color {
        fill_rect(ops, lbox.x, lbox.y, lbox.width, lbox.height, page_height, bg);
    }
    if let Some(border) = &lbox.border {
        render_border(ops, lbox, border, page_height);
    }
    if let Some(marker) = &lbox.marker {
        write_text(
            ops,
            &marker.text,
            lbox.x + marker.x_offset,
            lbox.y + marker.baseline,
            &marker.font,
            marker.font_size,
            marker.color,
            page_height,
        );
    }
    if let Some(text) = &lbox.text {
        render_text(ops, lbox, text, page_height);
    }

    // Image – embed from pre-registered XObject
    if let Some(img) = &lbox.image {
        if let Some(res) = images.get(&img.src) {
            // translate_y = bottom edge of image in PDF coordinates.
            let img_bottom_y = page_height - lbox.y - img.height;
            // At dpi=72 printpdf renders 1 px = 1 pt, so
            // scale = desired_pt / px_dim.
            let scale_x = img.width / res.px_width.max(1) as f32;
            let scale_y = img.height / res.px_height.max(1) as f32;
            ops.push(Op::UseXobject {
                id: res.xobj_id.clone(),
                transform: XObjectTransform {
                    translate_x: Some(Pt(lbox.x)),
                    translate_y: Some(Pt(img_bottom_y)),
                    dpi: Some(72.0),
                    scale_x: Some(scale_x),
                    scale_y: Some(scale_y),
                    rotate: None,
                },
            });
        }
    }

    for child in &lbox.children {
        render_box(ops, child, page_height, images);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout_config::{ImageContent, PageLayout, TextFragment, TextLine};

    const PIXEL_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

    fn text_box(text: &str, font: &str) -> LayoutBox {
        let mut b = LayoutBox::new(40.0, 40.0, 200.0, 14.4);
        b.text = Some(TextContent {
            lines: vec![TextLine {
                y_offset: 0.0,
                height: 14.4,
                baseline: 11.4,
                fragments: vec![TextFragment {
                    text: text.into(),
                    x_offset: 0.0,
                    width: 50.0,
                    font: font.into(),
                    font_size: 12.0,
                    color: [0.0, 0.0, 0.0, 1.0],
                    underline: true,
                    line_through: false,
                    background_color: Some([1.0, 1.0, 0.0, 1.0]),
                }],
            }],
        });
        b
    }

    #[test]
    fn render_empty_page() {
        let config = LayoutConfig::a4();
        let bytes = render_pdf(&config).unwrap();
        assert!(bytes.len() > 100, "PDF should have content");
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn render_text_in_every_family() {
        let mut config = LayoutConfig::a4();
        config.pages.push(PageLayout {
            page_index: 0,
            boxes: vec![
                text_box("Café – “quoted”", "Helvetica-Bold"),
                text_box("serif", "Times-Italic"),
                text_box("mono", "Courier"),
            ],
        });
        let bytes = render_pdf(&config).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn data_uri_images_embed() {
        let mut config = LayoutConfig::a4();
        let mut b = LayoutBox::new(40.0, 40.0, 10.0, 10.0);
        b.image = Some(ImageContent {
            src: PIXEL_PNG.into(),
            width: 10.0,
            height: 10.0,
        });
        config.pages.push(PageLayout {
            page_index: 0,
            boxes: vec![b],
        });
        assert!(render_pdf(&config).unwrap().starts_with(b"%PDF-"));
    }

    #[test]
    fn data_uri_parsing() {
        assert!(parse_data_uri(PIXEL_PNG).unwrap().starts_with(b"\x89PNG"));
        assert!(parse_data_uri("https://example.com/a.png").is_err());
        assert!(parse_data_uri("data:image/png,abc").is_err());
        assert!(parse_data_uri("data:image/png;base64").is_err());
    }

    #[test]
    fn win_ansi_maps_typographic_characters() {
        assert_eq!(win_ansi_bytes("a"), b"a");
        assert_eq!(win_ansi_bytes("\u{2022}"), [0x95]);
        assert_eq!(win_ansi_bytes("\u{4E2D}"), b"?");
    }

    #[test]
    fn text_reaches_the_stream_as_win_ansi() {
        let mut config = LayoutConfig::a4();
        config.pages.push(PageLayout {
            page_index: 0,
            boxes: vec![text_box("Café – ok", "Helvetica")],
        });
        let bytes = render_pdf(&config).unwrap();
        assert!(bytes.windows(6).any(|w| w == b"Caf\xe9 \x96"));
        assert!(bytes.windows(9).any(|w| w == b"Helvetica"));
    }

    #[test]
    fn fonts_map_to_builtins() {
        assert!(matches!(builtin_font("Times-BoldItalic"), BuiltinFont::TimesBoldItalic));
        assert!(matches!(builtin_font("Courier-Oblique"), BuiltinFont::CourierOblique));
        assert!(matches!(builtin_font("Comic Sans"), BuiltinFont::Helvetica));
    }
}
