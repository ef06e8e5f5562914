//! Stylesheet parser and selector matching.
//!
//! Supported: type, class, id and universal selectors, compound selectors,
//! the descendant, child (`>`), next-sibling (`+`) and subsequent-sibling
//! (`~`) combinators, selector groups, `!important`, `@page` and
//! `@media print|all`. Selectors using anything else (attribute selectors,
//! pseudo-classes, pseudo-elements) are kept but never match. `@import` and
//! `@font-face` are ignored with a warning.

use crate::dom::ElementNode;
use crate::error::RenderError;

/// A parsed stylesheet.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
    /// Declarations collected from every `@page` block, in source order.
    pub page: Vec<Declaration>,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub selectors: Vec<Selector>,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

/// One compound selector plus the combinator joining it to the part on its
/// left (ignored for the leftmost part).
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub combinator: Combinator,
    pub compound: Compound,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    /// Uses a feature we do not evaluate; never matches.
    pub unsupported: bool,
}

/// A complex selector, parts ordered left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub parts: Vec<Part>,
}

/// `(ids, classes, types)`
pub type Specificity = (u32, u32, u32);

/// An element plus its preceding element siblings, as seen from selector
/// matching.
#[derive(Debug, Clone, Copy)]
pub struct PathEntry<'a> {
    pub element: &'a ElementNode,
    pub preceding: &'a [&'a ElementNode],
}

impl Compound {
    fn matches(&self, element: &ElementNode) -> bool {
        if self.unsupported {
            return false;
        }
        if let Some(tag) = &self.tag {
            if tag != element.tag.name() {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id() != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|c| element.has_class(c))
    }
}

impl Selector {
    pub fn specificity(&self) -> Specificity {
        self.parts.iter().fold((0, 0, 0), |(a, b, c), part| {
            let compound = &part.compound;
            (
                a + u32::from(compound.id.is_some()),
                b + compound.classes.len() as u32 + u32::from(compound.unsupported),
                c + u32::from(compound.tag.is_some()),
            )
        })
    }

    /// Does the selector match the last entry of `path`? `path` runs from
    /// the root element down to the subject.
    pub fn matches(&self, path: &[PathEntry<'_>]) -> bool {
        matches_parts(&self.parts, path)
    }
}

fn matches_parts(parts: &[Part], path: &[PathEntry<'_>]) -> bool {
    let (Some((last, rest)), Some((subject, ancestors))) = (parts.split_last(), path.split_last())
    else {
        return false;
    };
    if !last.compound.matches(subject.element) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }
    match last.combinator {
        Combinator::Child => !ancestors.is_empty() && matches_parts(rest, ancestors),
        Combinator::Descendant => {
            (1..=ancestors.len()).rev().any(|k| matches_parts(rest, &ancestors[..k]))
        }
        Combinator::NextSibling => match subject.preceding.split_last() {
            Some((prev, before)) => matches_parts(rest, &sibling_path(ancestors, prev, before)),
            None => false,
        },
        Combinator::SubsequentSibling => (0..subject.preceding.len()).rev().any(|i| {
            let prev = subject.preceding[i];
            matches_parts(rest, &sibling_path(ancestors, prev, &subject.preceding[..i]))
        }),
    }
}

fn sibling_path<'a>(
    ancestors: &[PathEntry<'a>],
    element: &'a ElementNode,
    preceding: &'a [&'a ElementNode],
) -> Vec<PathEntry<'a>> {
    let mut path = ancestors.to_vec();
    path.push(PathEntry { element, preceding });
    path
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a stylesheet. Fails on unbalanced braces, unterminated strings and
/// unterminated comments; anything merely unknown is skipped.
pub fn parse_stylesheet(css: &str) -> Result<Stylesheet, RenderError> {
    let mut sheet = Stylesheet::default();
    let mut parser = CssParser { input: css, pos: 0 };
    parser.parse_rules(&mut sheet, false)?;
    Ok(sheet)
}

/// Parse the body of a `style="..."` attribute.
pub fn parse_declarations(block: &str) -> Vec<Declaration> {
    split_top_level(block, ';')
        .into_iter()
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let mut value = value.trim().to_string();
            let mut important = false;
            if let Some(bang) = value.to_ascii_lowercase().rfind("!important") {
                important = true;
                value.truncate(bang);
                value = value.trim_end().to_string();
            }
            if property.is_empty() || value.is_empty() {
                return None;
            }
            Some(Declaration {
                property,
                value,
                important,
            })
        })
        .collect()
}

/// Parse a comma-separated selector list.
pub fn parse_selector_list(text: &str) -> Vec<Selector> {
    text.split(',')
        .filter_map(|s| parse_selector(s.trim()))
        .collect()
}

fn parse_selector(text: &str) -> Option<Selector> {
    if text.is_empty() {
        return None;
    }
    let mut parts: Vec<Part> = Vec::new();
    let mut pending: Option<Combinator> = None;
    let mut saw_space = false;
    let mut chars = text.char_indices().peekable();
    while let Some(&(_, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                saw_space = true;
                chars.next();
            }
            '>' | '+' | '~' => {
                if parts.is_empty() || pending.is_some() {
                    return None;
                }
                pending = Some(match c {
                    '>' => Combinator::Child,
                    '+' => Combinator::NextSibling,
                    _ => Combinator::SubsequentSibling,
                });
                saw_space = false;
                chars.next();
            }
            _ => {
                let start = chars.peek().map(|&(i, _)| i).unwrap_or(text.len());
                let mut end = text.len();
                let mut depth = 0i32;
                while let Some(&(i, ch)) = chars.peek() {
                    match ch {
                        '(' | '[' => depth += 1,
                        ')' | ']' => depth -= 1,
                        ch if depth == 0 && (ch.is_whitespace() || matches!(ch, '>' | '+' | '~')) => {
                            end = i;
                            break;
                        }
                        _ => {}
                    }
                    chars.next();
                }
                let combinator = match pending.take() {
                    Some(c) => c,
                    None if saw_space || parts.is_empty() => Combinator::Descendant,
                    None => return None,
                };
                saw_space = false;
                parts.push(Part {
                    combinator,
                    compound: parse_compound(&text[start..end]),
                });
            }
        }
    }
    if parts.is_empty() || pending.is_some() {
        return None;
    }
    Some(Selector { parts })
}

fn parse_compound(text: &str) -> Compound {
    let mut compound = Compound::default();
    let mut rest = text;
    if let Some(r) = rest.strip_prefix('*') {
        rest = r;
    } else {
        let end = rest
            .find(|c: char| !is_ident_char(c))
            .unwrap_or(rest.len());
        if end > 0 {
            compound.tag = Some(rest[..end].to_ascii_lowercase());
            rest = &rest[end..];
        }
    }
    while let Some(c) = rest.chars().next() {
        let after = &rest[c.len_utf8()..];
        let end = after
            .find(|c: char| !is_ident_char(c))
            .unwrap_or(after.len());
        let ident = &after[..end];
        match c {
            '.' if !ident.is_empty() => compound.classes.push(ident.to_string()),
            '#' if !ident.is_empty() => compound.id = Some(ident.to_string()),
            _ => {
                compound.unsupported = true;
                return compound;
            }
        }
        rest = &after[end..];
    }
    compound
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

struct CssParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> CssParser<'a> {
    fn error(&self, message: impl Into<String>) -> RenderError {
        RenderError::Stylesheet {
            offset: self.pos,
            message: message.into(),
        }
    }

    /// Parse rules until end of input, or until the `}` closing the current
    /// block when `nested`.
    fn parse_rules(&mut self, sheet: &mut Stylesheet, nested: bool) -> Result<(), RenderError> {
        loop {
            self.skip_whitespace_and_comments()?;
            if self.eof() {
                if nested {
                    return Err(self.error("unexpected end of stylesheet inside @media block"));
                }
                return Ok(());
            }
            if self.peek() == Some('}') {
                if nested {
                    self.pos += 1;
                    return Ok(());
                }
                return Err(self.error("unmatched '}'"));
            }
            if self.peek() == Some('@') {
                self.parse_at_rule(sheet)?;
                continue;
            }
            let prelude = self.read_prelude()?;
            if self.peek() != Some('{') {
                return Err(self.error(format!("expected '{{' after '{}'", prelude.trim())));
            }
            self.pos += 1;
            let body = self.read_block_body()?;
            let selectors = parse_selector_list(&prelude);
            if selectors.is_empty() {
                log::debug!("skipping rule with unparseable selector '{}'", prelude.trim());
                continue;
            }
            sheet.rules.push(Rule {
                selectors,
                declarations: parse_declarations(&body),
            });
        }
    }

    fn parse_at_rule(&mut self, sheet: &mut Stylesheet) -> Result<(), RenderError> {
        let prelude = self.read_prelude()?;
        let lower = prelude.trim().to_ascii_lowercase();
        let name = lower
            .trim_start_matches('@')
            .split(|c: char| c.is_whitespace() || c == ':' || c == '(' || c == '"')
            .next()
            .unwrap_or("")
            .to_string();

        if self.peek() == Some(';') {
            self.pos += 1;
            match name.as_str() {
                "import" => log::warn!("ignoring {} (external stylesheets are not loaded)", prelude.trim()),
                "charset" | "namespace" => {}
                other => log::debug!("ignoring @{other} statement"),
            }
            return Ok(());
        }
        if self.peek() != Some('{') {
            return Err(self.error(format!("expected '{{' or ';' after '{}'", prelude.trim())));
        }
        self.pos += 1;

        match name.as_str() {
            "media" => {
                let query = lower.trim_start_matches("@media").trim().to_string();
                if media_applies_to_print(&query) {
                    self.parse_rules(sheet, true)
                } else {
                    self.read_block_body().map(|_| ())
                }
            }
            "page" => {
                let body = self.read_block_body()?;
                let selector = lower.trim_start_matches("@page").trim();
                if selector.is_empty() {
                    sheet.page.extend(parse_declarations(&body));
                } else {
                    log::debug!("ignoring @page rule for '{selector}'");
                }
                Ok(())
            }
            "font-face" => {
                log::warn!("ignoring @font-face (only the base-14 PDF fonts are available)");
                self.read_block_body().map(|_| ())
            }
            other => {
                log::debug!("ignoring @{other} block");
                self.read_block_body().map(|_| ())
            }
        }
    }

    /// Read up to (not including) the next top-level `{`, `;` or `}`.
    fn read_prelude(&mut self) -> Result<String, RenderError> {
        let mut out = String::new();
        let mut parens = 0i32;
        while let Some(c) = self.peek() {
            match c {
                '{' | ';' | '}' if parens == 0 => break,
                '(' => parens += 1,
                ')' => parens -= 1,
                '"' | '\'' => {
                    let s = self.read_string()?;
                    out.push_str(&s);
                    continue;
                }
                '/' if self.rest().starts_with("/*") => {
                    self.skip_comment()?;
                    out.push(' ');
                    continue;
                }
                _ => {}
            }
            out.push(c);
            self.pos += c.len_utf8();
        }
        if self.eof() {
            return Err(self.error(format!("unexpected end of stylesheet after '{}'", out.trim())));
        }
        Ok(out)
    }

    /// Read a declaration block after its `{`, consuming the closing `}`.
    /// Comments are dropped; nested blocks are kept verbatim.
    fn read_block_body(&mut self) -> Result<String, RenderError> {
        let start = self.pos;
        let mut out = String::new();
        let mut depth = 0u32;
        while let Some(c) = self.peek() {
            match c {
                '{' => depth += 1,
                '}' if depth == 0 => {
                    self.pos += 1;
                    return Ok(out);
                }
                '}' => depth -= 1,
                '"' | '\'' => {
                    let s = self.read_string()?;
                    out.push_str(&s);
                    continue;
                }
                '/' if self.rest().starts_with("/*") => {
                    self.skip_comment()?;
                    continue;
                }
                _ => {}
            }
            out.push(c);
            self.pos += c.len_utf8();
        }
        self.pos = start;
        Err(self.error("unclosed '{' block"))
    }

    /// Read a quoted string including its quotes.
    fn read_string(&mut self) -> Result<String, RenderError> {
        let start = self.pos;
        let Some(quote) = self.peek() else {
            return Err(self.error("expected string"));
        };
        self.pos += 1;
        let mut escaped = false;
        while let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                return Ok(self.input[start..self.pos].to_string());
            } else if c == '\n' {
                break;
            }
        }
        self.pos = start;
        Err(self.error("unterminated string"))
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), RenderError> {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.pos += self.peek().map_or(1, char::len_utf8);
            }
            if self.rest().starts_with("/*") {
                self.skip_comment()?;
            } else if self.rest().starts_with("<!--") {
                self.pos += 4;
            } else if self.rest().starts_with("-->") {
                self.pos += 3;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_comment(&mut self) -> Result<(), RenderError> {
        match self.rest()[2..].find("*/") {
            Some(end) => {
                self.pos += 2 + end + 2;
                Ok(())
            }
            None => Err(self.error("unterminated comment")),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }
}

/// Is a media query list relevant when printing?
fn media_applies_to_print(query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    query.split(',').any(|q| {
        let q = q.trim();
        !q.starts_with("not")
            && !q.contains("screen")
            && !q.contains('(')
            && (q.contains("print") || q.contains("all"))
    })
}

/// Split on `sep` outside of parentheses and quotes.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' => depth += 1,
                ')' => depth -= 1,
                c if c == sep && depth == 0 => {
                    parts.push(&text[start..i]);
                    start = i + c.len_utf8();
                }
                _ => {}
            },
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse_html, DomNode, Tag};

    fn el(tag: &str, class: Option<&str>) -> ElementNode {
        let mut e = ElementNode::new(Tag::from_name(tag));
        if let Some(c) = class {
            e.attributes.insert("class".into(), c.into());
        }
        e
    }

    #[test]
    fn parses_rules_and_declarations() {
        let sheet = parse_stylesheet(
            "/* c */ h1, h2 { color: #111; margin: 0 0 4px 0 !important }\np{font-size:12px}",
        )
        .unwrap();
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[0].selectors.len(), 2);
        let decls = &sheet.rules[0].declarations;
        assert_eq!(decls[0].property, "color");
        assert_eq!(decls[1].value, "0 0 4px 0");
        assert!(decls[1].important);
    }

    #[test]
    fn page_and_media_blocks() {
        let sheet = parse_stylesheet(
            "@page { size: A4; margin: 0.75in }\n\
             @media print { body { color: black } }\n\
             @media screen { body { color: red } }\n\
             @media (max-width: 600px) { p { margin: 0 } }",
        )
        .unwrap();
        assert_eq!(sheet.page.len(), 2);
        assert_eq!(sheet.rules.len(), 1);
        assert_eq!(sheet.rules[0].declarations[0].value, "black");
    }

    #[test]
    fn ignores_imports_and_font_faces() {
        let sheet = parse_stylesheet(
            "@import url(\"x.css\");\n@font-face { font-family: X; src: url(x.woff) }\np { color: red }",
        )
        .unwrap();
        assert_eq!(sheet.rules.len(), 1);
    }

    #[test]
    fn malformed_sheets_fail() {
        assert!(parse_stylesheet("p { color: red").is_err());
        assert!(parse_stylesheet("p { color: red } }").is_err());
        assert!(parse_stylesheet("p { color: red } /* open").is_err());
        assert!(parse_stylesheet("p { content: \"x }").is_err());
        assert!(matches!(
            parse_stylesheet("@media print { p { color: red }"),
            Err(RenderError::Stylesheet { .. })
        ));
    }

    #[test]
    fn specificity_ordering() {
        let s = |t: &str| parse_selector(t).unwrap().specificity();
        assert_eq!(s("p"), (0, 0, 1));
        assert_eq!(s(".a.b"), (0, 2, 0));
        assert_eq!(s("#x li"), (1, 0, 1));
        assert_eq!(s("*"), (0, 0, 0));
    }

    #[test]
    fn descendant_and_child_matching() {
        let ul = el("ul", None);
        let li = el("li", Some("item"));
        let path = [
            PathEntry { element: &ul, preceding: &[] },
            PathEntry { element: &li, preceding: &[] },
        ];
        assert!(parse_selector("ul li").unwrap().matches(&path));
        assert!(parse_selector("ul > li.item").unwrap().matches(&path));
        assert!(parse_selector("li").unwrap().matches(&path));
        assert!(!parse_selector("ol li").unwrap().matches(&path));
        assert!(!parse_selector("ul > .other").unwrap().matches(&path));
        assert!(!parse_selector("li:first-child").unwrap().matches(&path));
    }

    #[test]
    fn sibling_matching() {
        let nodes = parse_html("<div><h1>a</h1><p>b</p><p>c</p></div>").unwrap();
        let DomNode::Element(div) = &nodes[0] else { panic!() };
        let kids: Vec<&ElementNode> = div.element_children().collect();
        let second_p = [
            PathEntry { element: div, preceding: &[] },
            PathEntry { element: kids[2], preceding: &kids[..2] },
        ];
        let first_p = [
            PathEntry { element: div, preceding: &[] },
            PathEntry { element: kids[1], preceding: &kids[..1] },
        ];
        let adjacent = parse_selector("h1 + p").unwrap();
        assert!(adjacent.matches(&first_p));
        assert!(!adjacent.matches(&second_p));
        assert!(parse_selector("h1 ~ p").unwrap().matches(&second_p));
        assert!(parse_selector("div > h1 + p").unwrap().matches(&first_p));
    }

    #[test]
    fn inline_declarations() {
        let decls = parse_declarations("text-align: right; background: url('a;b.png'); bogus");
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[1].value, "url('a;b.png')");
    }
}
