//! HTML renderer – walks a [`DocumentTree`] and emits the document body as
//! semantic HTML.
//!
//! Every piece of text and every attribute value taken from the source is
//! escaped. There is no raw-HTML passthrough: the parser keeps embedded HTML
//! as literal text, so it comes out here as visible, inert characters.

use crate::tree::{Alignment, Block, DocumentTree, Heading, Inline, List, ListKind, Table};

/// Render a document tree to an HTML fragment (no `<html>`/`<head>`).
///
/// Output is a pure function of the tree.
pub fn render(tree: &DocumentTree) -> String {
    let mut out = String::new();
    render_blocks(&tree.blocks, false, &mut out);
    out
}

fn render_blocks(blocks: &[Block], tight: bool, out: &mut String) {
    for block in blocks {
        render_block(block, tight, out);
    }
}

fn render_block(block: &Block, tight: bool, out: &mut String) {
    match block {
        Block::Paragraph(content) => {
            if tight {
                render_inlines(content, out);
                out.push('\n');
            } else {
                out.push_str("<p>");
                render_inlines(content, out);
                out.push_str("</p>\n");
            }
        }
        Block::Heading(heading) => render_heading(heading, out),
        Block::List(list) => render_list(list, out),
        Block::Table(table) => render_table(table, out),
        Block::CodeBlock { language, text } => {
            out.push_str("<pre><code");
            if let Some(lang) = language {
                out.push_str(" class=\"language-");
                escape_attr(lang, out);
                out.push('"');
            }
            out.push('>');
            escape_text(text, out);
            out.push_str("</code></pre>\n");
        }
        Block::ThematicBreak => out.push_str("<hr />\n"),
        Block::BlockQuote(blocks) => {
            out.push_str("<blockquote>\n");
            render_blocks(blocks, false, out);
            out.push_str("</blockquote>\n");
        }
    }
}

fn render_heading(heading: &Heading, out: &mut String) {
    let level = heading.level.clamp(1, 6);
    out.push_str(&format!("<h{level} id=\""));
    escape_attr(&heading.anchor, out);
    out.push_str("\">");
    render_inlines(&heading.content, out);
    out.push_str(&format!("</h{level}>\n"));
}

fn render_list(list: &List, out: &mut String) {
    let tag = match list.kind {
        ListKind::Unordered => {
            out.push_str("<ul>\n");
            "ul"
        }
        ListKind::Ordered { start: 1 } => {
            out.push_str("<ol>\n");
            "ol"
        }
        ListKind::Ordered { start } => {
            out.push_str(&format!("<ol start=\"{start}\">\n"));
            "ol"
        }
    };
    for item in &list.items {
        out.push_str("<li>");
        let leads_with_text =
            list.tight && matches!(item.blocks.first(), Some(Block::Paragraph(_)));
        if !leads_with_text && !item.blocks.is_empty() {
            out.push('\n');
        }
        render_blocks(&item.blocks, list.tight, out);
        // A tight item holding a single paragraph stays on one line.
        if leads_with_text && item.blocks.len() == 1 && out.ends_with('\n') {
            out.pop();
        }
        out.push_str("</li>\n");
    }
    out.push_str(&format!("</{tag}>\n"));
}

fn render_table(table: &Table, out: &mut String) {
    out.push_str("<table>\n<thead>\n<tr>\n");
    for (col, cell) in table.header.iter().enumerate() {
        render_cell("th", table.alignment(col), cell, out);
    }
    out.push_str("</tr>\n</thead>\n");
    if !table.rows.is_empty() {
        out.push_str("<tbody>\n");
        for row in &table.rows {
            out.push_str("<tr>\n");
            for (col, cell) in row.iter().enumerate() {
                render_cell("td", table.alignment(col), cell, out);
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</tbody>\n");
    }
    out.push_str("</table>\n");
}

fn render_cell(tag: &str, alignment: Alignment, content: &[Inline], out: &mut String) {
    out.push('<');
    out.push_str(tag);
    match alignment {
        Alignment::None => {}
        Alignment::Left => out.push_str(" style=\"text-align: left\""),
        Alignment::Center => out.push_str(" style=\"text-align: center\""),
        Alignment::Right => out.push_str(" style=\"text-align: right\""),
    }
    out.push('>');
    render_inlines(content, out);
    out.push_str(&format!("</{tag}>\n"));
}

fn render_inlines(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        render_inline(inline, out);
    }
}

fn render_inline(inline: &Inline, out: &mut String) {
    match inline {
        Inline::Text(text) => escape_text(text, out),
        Inline::Emphasis(c) => wrap("em", c, out),
        Inline::Strong(c) => wrap("strong", c, out),
        Inline::Strikethrough(c) => wrap("del", c, out),
        Inline::Code(code) => {
            out.push_str("<code>");
            escape_text(code, out);
            out.push_str("</code>");
        }
        Inline::Link {
            href,
            title,
            content,
        } => {
            out.push_str("<a href=\"");
            escape_attr(safe_href(href), out);
            out.push('"');
            if let Some(title) = title {
                out.push_str(" title=\"");
                escape_attr(title, out);
                out.push('"');
            }
            out.push('>');
            render_inlines(content, out);
            out.push_str("</a>");
        }
        Inline::Image { src, title, alt } => {
            out.push_str("<img src=\"");
            escape_attr(safe_src(src), out);
            out.push_str("\" alt=\"");
            escape_attr(alt, out);
            out.push('"');
            if let Some(title) = title {
                out.push_str(" title=\"");
                escape_attr(title, out);
                out.push('"');
            }
            out.push_str(" />");
        }
        Inline::SoftBreak => out.push('\n'),
        Inline::HardBreak => out.push_str("<br />\n"),
    }
}

fn wrap(tag: &str, content: &[Inline], out: &mut String) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    render_inlines(content, out);
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

// ---------------------------------------------------------------------------
// Escaping
// ---------------------------------------------------------------------------

/// Escape text content.
pub fn escape_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

/// Escape an attribute value (double-quoted).
pub fn escape_attr(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

/// Convenience wrapper returning an owned escaped string.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    escape_attr(s, &mut out);
    out
}

fn scheme_of(url: &str) -> Option<String> {
    let colon = url.find(':')?;
    let scheme = &url[..colon];
    if scheme.is_empty()
        || !scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        return None;
    }
    Some(scheme.to_ascii_lowercase())
}

/// Script-capable link targets are dropped.
fn safe_href(href: &str) -> &str {
    match scheme_of(href.trim()).as_deref() {
        Some("javascript") | Some("vbscript") | Some("data") => "",
        _ => href,
    }
}

/// Image sources may be `data:image/...` (the PDF engine embeds those); other
/// script-capable schemes are dropped.
fn safe_src(src: &str) -> &str {
    let trimmed = src.trim();
    match scheme_of(trimmed).as_deref() {
        Some("javascript") | Some("vbscript") => "",
        Some("data") if !trimmed["data:".len()..].to_ascii_lowercase().starts_with("image/") => "",
        _ => src,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::parse;

    fn md(src: &str) -> String {
        render(&parse(src))
    }

    #[test]
    fn heading_has_id() {
        assert_eq!(md("# Hi"), "<h1 id=\"hi\">Hi</h1>\n");
    }

    #[test]
    fn paragraph_link() {
        assert_eq!(
            md("See [site](https://x.com)."),
            "<p>See <a href=\"https://x.com\">site</a>.</p>\n"
        );
    }

    #[test]
    fn script_is_escaped() {
        let html = md("before <script>alert(1)</script> after");
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script"));
    }

    #[test]
    fn html_block_is_escaped() {
        let html = md("<script>\nalert(1)\n</script>\n");
        assert!(!html.contains("<script"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn attribute_values_are_escaped() {
        let html = md("[x](https://a.com/?q=\"><b) ![a\"b](p.png \"t'\")");
        assert!(!html.contains("\"><b"));
        assert!(html.contains("alt=\"a&quot;b\""));
        assert!(html.contains("title=\"t&#39;\""));
    }

    #[test]
    fn javascript_links_are_neutralised() {
        let html = md("[x](javascript:alert(1))");
        assert!(html.contains("<a href=\"\">x</a>"));
    }

    #[test]
    fn data_image_sources_survive() {
        let html = md("![dot](data:image/png;base64,AAAA)");
        assert!(html.contains("src=\"data:image/png;base64,AAAA\""));
    }

    #[test]
    fn tight_list() {
        assert_eq!(md("- a\n- b\n"), "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n");
    }

    #[test]
    fn loose_list_wraps_paragraphs() {
        assert_eq!(
            md("- a\n\n- b\n"),
            "<ul>\n<li>\n<p>a</p>\n</li>\n<li>\n<p>b</p>\n</li>\n</ul>\n"
        );
    }

    #[test]
    fn ordered_list_with_start() {
        assert!(md("7. x\n").starts_with("<ol start=\"7\">\n<li>x</li>"));
    }

    #[test]
    fn nested_list() {
        let html = md("- a\n  - b\n");
        assert_eq!(html, "<ul>\n<li>a\n<ul>\n<li>b</li>\n</ul>\n</li>\n</ul>\n");
    }

    #[test]
    fn code_block_language_class() {
        assert_eq!(
            md("```rust\nlet a = 1 < 2;\n```\n"),
            "<pre><code class=\"language-rust\">let a = 1 &lt; 2;\n</code></pre>\n"
        );
    }

    #[test]
    fn table_alignment_only_on_aligned_column() {
        let html = md("| a | b | c |\n|---|---|--:|\n| 1 | 2 | 3 |\n| 4 | 5 | 6 |\n");
        assert_eq!(html.matches("<th").count(), 3);
        assert_eq!(html.matches("<tr>").count(), 3);
        assert_eq!(html.matches("text-align: right").count(), 3);
        assert!(html.contains("<th style=\"text-align: right\">c</th>"));
        assert!(html.contains("<th>a</th>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn blockquote_and_rule() {
        assert_eq!(
            md("> q\n\n***\n"),
            "<blockquote>\n<p>q</p>\n</blockquote>\n<hr />\n"
        );
    }

    #[test]
    fn inline_styles() {
        assert_eq!(
            md("*a* **b** ~~c~~ `d`"),
            "<p><em>a</em> <strong>b</strong> <del>c</del> <code>d</code></p>\n"
        );
    }

    #[test]
    fn hard_break() {
        assert_eq!(md("a  \nb"), "<p>a<br />\nb</p>\n");
    }
}
