//! HTML parser – converts an HTML string into a simple DOM tree.
//!
//! The parser is tolerant the way browsers are about structure (unclosed
//! elements are closed by their ancestors, stray end tags are dropped) but it
//! refuses input it cannot tokenize at all: a start tag, comment or raw-text
//! element (`<style>`, `<script>`, `<title>`) still open at end of input.
//!
//! Nesting is capped at [`MAX_DEPTH`] open elements. Start tags past the cap
//! are dropped and their content joins the innermost element still open, so
//! every later stage walks a tree of bounded depth.

use std::collections::HashMap;

use crate::error::RenderError;

/// Deepest element nesting kept in the DOM.
pub const MAX_DEPTH: usize = 32;

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

/// The tag name of an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Html,
    Head,
    Body,
    Title,
    Meta,
    Link,
    Style,
    Script,
    Div,
    Span,
    P,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Ul,
    Ol,
    Li,
    Table,
    Thead,
    Tbody,
    Tfoot,
    Tr,
    Td,
    Th,
    Img,
    A,
    Strong,
    B,
    Em,
    I,
    U,
    S,
    Del,
    Code,
    Pre,
    Blockquote,
    Hr,
    Br,
    /// Any other element; styled purely by the stylesheet.
    Unknown(String),
}

impl Tag {
    pub fn from_name(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "html" => Tag::Html,
            "head" => Tag::Head,
            "body" => Tag::Body,
            "title" => Tag::Title,
            "meta" => Tag::Meta,
            "link" => Tag::Link,
            "style" => Tag::Style,
            "script" => Tag::Script,
            "div" => Tag::Div,
            "span" => Tag::Span,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "h4" => Tag::H4,
            "h5" => Tag::H5,
            "h6" => Tag::H6,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "table" => Tag::Table,
            "thead" => Tag::Thead,
            "tbody" => Tag::Tbody,
            "tfoot" => Tag::Tfoot,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "img" => Tag::Img,
            "a" => Tag::A,
            "strong" => Tag::Strong,
            "b" => Tag::B,
            "em" => Tag::Em,
            "i" => Tag::I,
            "u" => Tag::U,
            "s" => Tag::S,
            "del" => Tag::Del,
            "code" => Tag::Code,
            "pre" => Tag::Pre,
            "blockquote" => Tag::Blockquote,
            "hr" => Tag::Hr,
            "br" => Tag::Br,
            other => Tag::Unknown(other.to_string()),
        }
    }

    /// Lowercase element name, as matched by type selectors.
    pub fn name(&self) -> &str {
        match self {
            Tag::Html => "html",
            Tag::Head => "head",
            Tag::Body => "body",
            Tag::Title => "title",
            Tag::Meta => "meta",
            Tag::Link => "link",
            Tag::Style => "style",
            Tag::Script => "script",
            Tag::Div => "div",
            Tag::Span => "span",
            Tag::P => "p",
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::H3 => "h3",
            Tag::H4 => "h4",
            Tag::H5 => "h5",
            Tag::H6 => "h6",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::Table => "table",
            Tag::Thead => "thead",
            Tag::Tbody => "tbody",
            Tag::Tfoot => "tfoot",
            Tag::Tr => "tr",
            Tag::Td => "td",
            Tag::Th => "th",
            Tag::Img => "img",
            Tag::A => "a",
            Tag::Strong => "strong",
            Tag::B => "b",
            Tag::Em => "em",
            Tag::I => "i",
            Tag::U => "u",
            Tag::S => "s",
            Tag::Del => "del",
            Tag::Code => "code",
            Tag::Pre => "pre",
            Tag::Blockquote => "blockquote",
            Tag::Hr => "hr",
            Tag::Br => "br",
            Tag::Unknown(name) => name,
        }
    }

    /// Elements that never have children or an end tag.
    pub fn is_void(&self) -> bool {
        match self {
            Tag::Meta | Tag::Link | Tag::Img | Tag::Hr | Tag::Br => true,
            Tag::Unknown(name) => matches!(
                name.as_str(),
                "input" | "col" | "area" | "base" | "wbr" | "source" | "embed" | "track"
            ),
            _ => false,
        }
    }

    /// Elements whose content is raw text up to the matching end tag.
    pub fn is_raw_text(&self) -> bool {
        matches!(self, Tag::Style | Tag::Script | Tag::Title)
    }
}

/// A node in our DOM tree.
#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().contains(&class)
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attr("style")
    }

    pub fn src(&self) -> Option<&str> {
        self.attr("src")
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Element children only, in document order.
    pub fn element_children(&self) -> impl Iterator<Item = &ElementNode> {
        self.children.iter().filter_map(|c| match c {
            DomNode::Element(e) => Some(e),
            DomNode::Text(_) => None,
        })
    }
}

fn collect_text(nodes: &[DomNode], out: &mut String) {
    for node in nodes {
        match node {
            DomNode::Text(t) => out.push_str(t),
            DomNode::Element(e) => collect_text(&e.children, out),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser – recursive descent over HTML
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of top-level DOM nodes.
pub fn parse_html(html: &str) -> Result<Vec<DomNode>, RenderError> {
    let mut parser = Parser::new(html);
    let mut nodes = Vec::new();
    while !parser.eof() {
        if parser.at_end_tag() {
            // Stray end tag at top level.
            parser.skip_end_tag();
            continue;
        }
        if let Some(node) = parser.parse_node()? {
            nodes.push(node);
        }
    }
    Ok(nodes)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    /// Names of the currently open elements, outermost first.
    open: Vec<String>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            open: Vec::new(),
        }
    }

    fn error(&self, message: impl Into<String>) -> RenderError {
        RenderError::Markup {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn parse_children(&mut self) -> Result<Vec<DomNode>, RenderError> {
        let mut nodes = Vec::new();
        while !self.eof() {
            if self.at_end_tag() {
                let name = self.peek_end_tag_name();
                if self.open.iter().any(|open| *open == name) {
                    // Closes us or an ancestor; let the owner consume it.
                    break;
                }
                self.skip_end_tag();
                continue;
            }
            if let Some(node) = self.parse_node()? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    fn parse_node(&mut self) -> Result<Option<DomNode>, RenderError> {
        if self.starts_with("<!--") {
            self.skip_comment()?;
            return Ok(None);
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            // Doctype / processing instruction
            match self.input[self.pos..].find('>') {
                Some(end) => self.pos += end + 1,
                None => return Err(self.error("unterminated declaration")),
            }
            return Ok(None);
        }
        if self.at_start_tag() {
            return self.parse_element();
        }
        Ok(Some(self.parse_text()))
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        // A lone '<' that does not open markup is literal text.
        self.advance_char();
        while !self.eof()
            && !(self.at_start_tag()
                || self.at_end_tag()
                || self.starts_with("<!")
                || self.starts_with("<?"))
        {
            self.advance_char();
        }
        DomNode::Text(decode_entities(&self.input[start..self.pos]))
    }

    fn parse_element(&mut self) -> Result<Option<DomNode>, RenderError> {
        let tag_start = self.pos;
        self.pos += 1; // '<'
        let tag_name = self.parse_name();
        let tag = Tag::from_name(&tag_name);
        let mut elem = ElementNode::new(tag.clone());

        loop {
            self.skip_whitespace();
            if self.eof() {
                self.pos = tag_start;
                return Err(self.error(format!("unterminated start tag <{tag_name}>")));
            }
            if self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let before = self.pos;
            let (key, value) = self.parse_attribute()?;
            if self.pos == before {
                // Junk character inside the tag; skip it.
                self.advance_char();
                continue;
            }
            if !key.is_empty() {
                elem.attributes.entry(key).or_insert(value);
            }
        }

        if self.starts_with("/>") {
            self.pos += 2;
            return Ok(Some(DomNode::Element(elem)));
        }
        self.pos += 1; // '>'

        if tag.is_void() {
            return Ok(Some(DomNode::Element(elem)));
        }

        if tag.is_raw_text() {
            let close = format!("</{}", tag.name());
            let rest = &self.input[self.pos..];
            let Some(end) = find_ascii_case_insensitive(rest, &close) else {
                return Err(self.error(format!("<{}> is never closed", tag.name())));
            };
            let raw = &rest[..end];
            let text = if tag == Tag::Title {
                decode_entities(raw)
            } else {
                raw.to_string()
            };
            if !text.is_empty() {
                elem.children.push(DomNode::Text(text));
            }
            self.pos += end;
            self.skip_end_tag();
            return Ok(Some(DomNode::Element(elem)));
        }

        if self.open.len() >= MAX_DEPTH {
            log::debug!("dropping <{}> nested deeper than {MAX_DEPTH} elements", tag.name());
            return Ok(None);
        }

        self.open.push(tag.name().to_string());
        let children = self.parse_children();
        self.open.pop();
        elem.children = children?;

        // Consume our own end tag; an ancestor's end tag is left for it.
        if self.at_end_tag() && self.peek_end_tag_name() == tag.name() {
            self.skip_end_tag();
        }

        Ok(Some(DomNode::Element(elem)))
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.current_char() {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.advance_char();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_ascii_lowercase()
    }

    fn parse_attribute(&mut self) -> Result<(String, String), RenderError> {
        let key = self.parse_name();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return Ok((key, String::new()));
        }
        self.pos += 1; // '='
        self.skip_whitespace();
        let value = self.parse_attr_value()?;
        Ok((key, value))
    }

    fn parse_attr_value(&mut self) -> Result<String, RenderError> {
        if let Some(quote) = self.current_char().filter(|c| *c == '"' || *c == '\'') {
            let open = self.pos;
            self.pos += 1;
            let rest = &self.input[self.pos..];
            let Some(end) = rest.find(quote) else {
                self.pos = open;
                return Err(self.error("unterminated attribute value"));
            };
            let value = decode_entities(&rest[..end]);
            self.pos += end + 1;
            Ok(value)
        } else {
            let start = self.pos;
            while let Some(c) = self.current_char() {
                if c.is_whitespace() || c == '>' {
                    break;
                }
                if c == '/' && self.starts_with("/>") {
                    break;
                }
                self.advance_char();
            }
            Ok(decode_entities(&self.input[start..self.pos]))
        }
    }

    fn at_start_tag(&self) -> bool {
        let mut chars = self.input[self.pos..].chars();
        chars.next() == Some('<') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
    }

    fn at_end_tag(&self) -> bool {
        let mut chars = self.input[self.pos..].chars();
        chars.next() == Some('<')
            && chars.next() == Some('/')
            && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
    }

    fn peek_end_tag_name(&self) -> String {
        let rest = &self.input[self.pos + 2..];
        let end = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_' || c == ':'))
            .unwrap_or(rest.len());
        rest[..end].to_ascii_lowercase()
    }

    fn skip_end_tag(&mut self) {
        match self.input[self.pos..].find('>') {
            Some(end) => self.pos += end + 1,
            None => self.pos = self.input.len(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance_char();
        }
    }

    fn skip_comment(&mut self) -> Result<(), RenderError> {
        match self.input[self.pos + 4..].find("-->") {
            Some(end) => {
                self.pos += 4 + end + 3;
                Ok(())
            }
            None => Err(self.error("unterminated comment")),
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance_char(&mut self) {
        if let Some(c) = self.current_char() {
            self.pos += c.len_utf8();
        }
    }
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// Decode character references in one pass, so `&amp;lt;` yields `&lt;`.
/// Unknown references are kept verbatim.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest[1..]
            .find(';')
            .filter(|&semi| semi > 0 && semi <= 10)
            .and_then(|semi| decode_reference(&rest[1..1 + semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 2..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = if let Some(hex) = num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            num.parse::<u32>().ok()?
        };
        return char::from_u32(code).filter(|c| *c != '\0');
    }
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        "copy" => '\u{00A9}',
        "reg" => '\u{00AE}',
        "trade" => '\u{2122}',
        "euro" => '\u{20AC}',
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        "hellip" => '\u{2026}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "bull" => '\u{2022}',
        "middot" => '\u{00B7}',
        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

/// Depth-first search for the first element with `tag`.
pub fn find_element<'a>(nodes: &'a [DomNode], tag: &Tag) -> Option<&'a ElementNode> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == *tag {
                return Some(e);
            }
            if let Some(found) = find_element(&e.children, tag) {
                return Some(found);
            }
        }
    }
    None
}

/// Text of every `<style>` element, in document order.
pub fn style_sheets(nodes: &[DomNode]) -> Vec<String> {
    let mut sheets = Vec::new();
    collect_styles(nodes, &mut sheets);
    sheets
}

fn collect_styles(nodes: &[DomNode], out: &mut Vec<String>) {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Style {
                let media = e.attr("media").unwrap_or("all").to_ascii_lowercase();
                if media.contains("print") || media.contains("all") {
                    out.push(e.text_content());
                }
            } else {
                collect_styles(&e.children, out);
            }
        }
    }
}

/// Trimmed content of `<title>`, if present and non-empty.
pub fn document_title(nodes: &[DomNode]) -> Option<String> {
    find_element(nodes, &Tag::Title)
        .map(|t| t.text_content().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &DomNode) -> &ElementNode {
        match node {
            DomNode::Element(e) => e,
            DomNode::Text(t) => panic!("expected element, got text {t:?}"),
        }
    }

    #[test]
    fn parse_simple_div() {
        let html = r#"<div class="flex p-4"><p>Hello</p></div>"#;
        let nodes = parse_html(html).unwrap();
        assert_eq!(nodes.len(), 1);
        let e = element(&nodes[0]);
        assert_eq!(e.tag, Tag::Div);
        assert_eq!(e.classes(), vec!["flex", "p-4"]);
        assert_eq!(e.children.len(), 1);
    }

    #[test]
    fn parse_void_elements_without_slash() {
        let html = r#"<head><meta charset="UTF-8"><title>T</title></head><p>a<br>b</p>"#;
        let nodes = parse_html(html).unwrap();
        assert_eq!(nodes.len(), 2);
        let head = element(&nodes[0]);
        assert_eq!(head.children.len(), 2);
        let p = element(&nodes[1]);
        assert_eq!(p.children.len(), 3);
    }

    #[test]
    fn style_content_is_raw() {
        let html = "<style>ul > li { color: red }</style><p>x</p>";
        let nodes = parse_html(html).unwrap();
        assert_eq!(style_sheets(&nodes), vec!["ul > li { color: red }".to_string()]);
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn nested_inline_children() {
        let html = r#"<p>Hello <strong>world</strong>!</p>"#;
        let nodes = parse_html(html).unwrap();
        let p = element(&nodes[0]);
        assert_eq!(p.tag, Tag::P);
        assert_eq!(p.children.len(), 3); // "Hello ", <strong>, "!"
    }

    #[test]
    fn parse_table_with_sections() {
        let html = "<table><thead><tr><th>A</th></tr></thead><tbody><tr><td>1</td></tr><tr><td>2</td></tr></tbody></table>";
        let nodes = parse_html(html).unwrap();
        let table = element(&nodes[0]);
        assert_eq!(table.tag, Tag::Table);
        assert_eq!(table.children.len(), 2);
        let tbody = element(&table.children[1]);
        assert_eq!(tbody.element_children().count(), 2);
    }

    #[test]
    fn unclosed_elements_are_closed_by_ancestor() {
        let html = "<div><p>one<p>two</div><p>three</p>";
        let nodes = parse_html(html).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(element(&nodes[1]).text_content(), "three");
    }

    #[test]
    fn stray_end_tags_are_ignored() {
        let nodes = parse_html("</span><p>a</b>b</p>").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(element(&nodes[0]).text_content(), "ab");
    }

    #[test]
    fn entities_decode_once() {
        assert_eq!(decode_entities("a &amp;lt; b"), "a &lt; b");
        assert_eq!(decode_entities("&lt;script&gt;"), "<script>");
        assert_eq!(decode_entities("&#39;&#x41;&copy;"), "'A\u{00A9}");
        assert_eq!(decode_entities("AT&T &bogus; &"), "AT&T &bogus; &");
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        let nodes = parse_html("<p>1 < 2</p>").unwrap();
        assert_eq!(element(&nodes[0]).text_content(), "1 < 2");
    }

    #[test]
    fn title_is_extracted() {
        let nodes = parse_html("<html><head><title> My\n CV </title></head></html>").unwrap();
        assert_eq!(document_title(&nodes).as_deref(), Some("My CV"));
    }

    #[test]
    fn unterminated_constructs_fail() {
        assert!(matches!(
            parse_html("<div class=\"x"),
            Err(RenderError::Markup { .. })
        ));
        assert!(matches!(
            parse_html("<p>a</p><!-- open"),
            Err(RenderError::Markup { .. })
        ));
        assert!(matches!(
            parse_html("<style>p { color: red }"),
            Err(RenderError::Markup { .. })
        ));
    }

    fn depth(nodes: &[DomNode]) -> usize {
        nodes
            .iter()
            .map(|n| match n {
                DomNode::Element(e) => 1 + depth(&e.children),
                DomNode::Text(_) => 0,
            })
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn deep_nesting_is_flattened() {
        let html = format!(
            "{}deep{}<p>after</p>",
            "<blockquote>".repeat(2000),
            "</blockquote>".repeat(2000)
        );
        let nodes = parse_html(&html).unwrap();
        assert_eq!(depth(&nodes), MAX_DEPTH);
        assert_eq!(nodes.len(), 2);
        assert_eq!(element(&nodes[0]).text_content(), "deep");
        assert_eq!(element(&nodes[1]).text_content(), "after");
    }
}
