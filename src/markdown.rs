//! Markdown parser – folds the `pulldown-cmark` event stream into a
//! [`DocumentTree`].
//!
//! Parsing is total: any UTF-8 text yields a tree. Constructs the grammar
//! does not recognise degrade to literal text, and raw HTML (blocks or inline)
//! is kept as literal text so that the renderer escapes it.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};

use crate::slug::Slugger;
use crate::tree::{
    plain_text, Alignment, Block, DocumentTree, Heading, Inline, List, ListItem, ListKind, Table,
};

/// Parse Markdown source into a document tree.
pub fn parse(source: &str) -> DocumentTree {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut builder = TreeBuilder::new();
    for event in Parser::new_ext(source, options) {
        builder.event(event);
    }
    builder.finish()
}

// ---------------------------------------------------------------------------
// Tree builder
// ---------------------------------------------------------------------------

/// One open construct. Every `Start` event pushes exactly one frame and every
/// `End` event pops one, so the stack mirrors the event nesting.
enum Frame {
    Root(Vec<Block>),
    Paragraph(Vec<Inline>),
    Heading {
        level: u8,
        content: Vec<Inline>,
    },
    BlockQuote(Vec<Block>),
    List {
        kind: ListKind,
        tight: bool,
        items: Vec<ListItem>,
    },
    Item {
        blocks: Vec<Block>,
        /// Inline content not wrapped in a paragraph (tight list items).
        loose_inlines: Vec<Inline>,
        tight: bool,
    },
    CodeBlock {
        language: Option<String>,
        text: String,
    },
    HtmlBlock(String),
    Table {
        table: Table,
    },
    TableHead(Vec<Vec<Inline>>),
    TableRow(Vec<Vec<Inline>>),
    TableCell(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link {
        href: String,
        title: Option<String>,
        content: Vec<Inline>,
    },
    Image {
        src: String,
        title: Option<String>,
        alt: Vec<Inline>,
    },
    /// Constructs outside the supported feature set (footnote definitions,
    /// metadata blocks, ...). Their block content is spliced into the parent.
    Passthrough(Vec<Block>),
}

struct TreeBuilder {
    stack: Vec<Frame>,
    slugger: Slugger,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Frame::Root(Vec::new())],
            slugger: Slugger::new(),
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.end(),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.push_inline(Inline::Code(code.to_string())),
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html),
            Event::SoftBreak => self.push_inline(Inline::SoftBreak),
            Event::HardBreak => self.push_inline(Inline::HardBreak),
            Event::Rule => self.push_block(Block::ThematicBreak),
            Event::FootnoteReference(label) => self.text(&format!("[^{label}]")),
            Event::TaskListMarker(done) => self.text(if done { "[x] " } else { "[ ] " }),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let frame = match tag {
            Tag::Paragraph => Frame::Paragraph(Vec::new()),
            Tag::Heading { level, .. } => Frame::Heading {
                level: heading_level(level),
                content: Vec::new(),
            },
            Tag::BlockQuote { .. } => Frame::BlockQuote(Vec::new()),
            Tag::CodeBlock(kind) => Frame::CodeBlock {
                language: match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(|lang| lang.to_string()),
                    CodeBlockKind::Indented => None,
                },
                text: String::new(),
            },
            Tag::HtmlBlock => Frame::HtmlBlock(String::new()),
            Tag::List(start) => Frame::List {
                kind: match start {
                    Some(start) => ListKind::Ordered { start },
                    None => ListKind::Unordered,
                },
                tight: false,
                items: Vec::new(),
            },
            Tag::Item => Frame::Item {
                blocks: Vec::new(),
                loose_inlines: Vec::new(),
                tight: false,
            },
            Tag::Table(alignments) => Frame::Table {
                table: Table {
                    alignments: alignments.into_iter().map(convert_alignment).collect(),
                    header: Vec::new(),
                    rows: Vec::new(),
                },
            },
            Tag::TableHead => Frame::TableHead(Vec::new()),
            Tag::TableRow => Frame::TableRow(Vec::new()),
            Tag::TableCell => Frame::TableCell(Vec::new()),
            Tag::Emphasis => Frame::Emphasis(Vec::new()),
            Tag::Strong => Frame::Strong(Vec::new()),
            Tag::Strikethrough => Frame::Strikethrough(Vec::new()),
            Tag::Link {
                dest_url, title, ..
            } => Frame::Link {
                href: dest_url.to_string(),
                title: non_empty(&title),
                content: Vec::new(),
            },
            Tag::Image {
                dest_url, title, ..
            } => Frame::Image {
                src: dest_url.to_string(),
                title: non_empty(&title),
                alt: Vec::new(),
            },
            _ => Frame::Passthrough(Vec::new()),
        };
        self.stack.push(frame);
    }

    fn end(&mut self) {
        // The root frame is never popped by an End event.
        if self.stack.len() <= 1 {
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };
        match frame {
            Frame::Root(_) => {}
            Frame::Paragraph(content) => self.push_block(Block::Paragraph(content)),
            Frame::Heading { level, content } => {
                let anchor = self.slugger.unique(&plain_text(&content));
                self.push_block(Block::Heading(Heading {
                    level,
                    anchor,
                    content,
                }));
            }
            Frame::BlockQuote(blocks) => self.push_block(Block::BlockQuote(blocks)),
            Frame::List { kind, tight, items } => {
                self.push_block(Block::List(List { kind, tight, items }))
            }
            Frame::Item {
                mut blocks,
                loose_inlines,
                tight,
            } => {
                let tight = tight || !loose_inlines.is_empty();
                if !loose_inlines.is_empty() {
                    blocks.push(Block::Paragraph(loose_inlines));
                }
                if let Some(Frame::List {
                    items,
                    tight: list_tight,
                    ..
                }) = self.stack.last_mut()
                {
                    *list_tight |= tight;
                    items.push(ListItem { blocks });
                }
            }
            Frame::CodeBlock { language, text } => {
                self.push_block(Block::CodeBlock { language, text })
            }
            Frame::HtmlBlock(text) => {
                let text = text.trim_end_matches('\n').to_string();
                if !text.is_empty() {
                    self.push_block(Block::Paragraph(vec![Inline::Text(text)]));
                }
            }
            Frame::Table { table } => self.push_block(Block::Table(table)),
            Frame::TableHead(cells) => {
                if let Some(Frame::Table { table }) = self.stack.last_mut() {
                    table.header = cells;
                }
            }
            Frame::TableRow(cells) => {
                if let Some(Frame::Table { table }) = self.stack.last_mut() {
                    table.rows.push(cells);
                }
            }
            Frame::TableCell(content) => match self.stack.last_mut() {
                Some(Frame::TableHead(cells)) | Some(Frame::TableRow(cells)) => {
                    cells.push(content)
                }
                _ => self.push_inlines(content),
            },
            Frame::Emphasis(content) => self.push_inline(Inline::Emphasis(content)),
            Frame::Strong(content) => self.push_inline(Inline::Strong(content)),
            Frame::Strikethrough(content) => self.push_inline(Inline::Strikethrough(content)),
            Frame::Link {
                href,
                title,
                content,
            } => self.push_inline(Inline::Link {
                href,
                title,
                content,
            }),
            Frame::Image { src, title, alt } => self.push_inline(Inline::Image {
                src,
                title,
                alt: plain_text(&alt),
            }),
            Frame::Passthrough(blocks) => {
                for block in blocks {
                    self.push_block(block);
                }
            }
        }
    }

    fn text(&mut self, text: &str) {
        match self.stack.last_mut() {
            Some(Frame::CodeBlock { text: buf, .. }) | Some(Frame::HtmlBlock(buf)) => {
                buf.push_str(text)
            }
            _ => self.push_inline(Inline::Text(text.to_string())),
        }
    }

    fn push_inlines(&mut self, inlines: Vec<Inline>) {
        for inline in inlines {
            self.push_inline(inline);
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        match self.stack.last_mut() {
            Some(Frame::Paragraph(c))
            | Some(Frame::Heading { content: c, .. })
            | Some(Frame::TableCell(c))
            | Some(Frame::Emphasis(c))
            | Some(Frame::Strong(c))
            | Some(Frame::Strikethrough(c))
            | Some(Frame::Link { content: c, .. })
            | Some(Frame::Image { alt: c, .. }) => push_merging_text(c, inline),
            Some(Frame::Item { loose_inlines, .. }) => push_merging_text(loose_inlines, inline),
            Some(Frame::CodeBlock { text, .. }) | Some(Frame::HtmlBlock(text)) => {
                text.push_str(&plain_text(std::slice::from_ref(&inline)))
            }
            // Inline content directly inside a block container gets its own
            // paragraph.
            Some(Frame::Root(_)) | Some(Frame::BlockQuote(_)) | Some(Frame::Passthrough(_)) => {
                self.push_block(Block::Paragraph(vec![inline]))
            }
            _ => {}
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.stack.last_mut() {
            Some(Frame::Root(blocks))
            | Some(Frame::BlockQuote(blocks))
            | Some(Frame::Passthrough(blocks)) => blocks.push(block),
            Some(Frame::Item {
                blocks,
                loose_inlines,
                tight,
            }) => {
                if !loose_inlines.is_empty() {
                    *tight = true;
                    blocks.push(Block::Paragraph(std::mem::take(loose_inlines)));
                }
                blocks.push(block);
            }
            // A block inside inline context (cannot happen with well-formed
            // event streams); keep its text rather than dropping it.
            _ => {
                let text = block_text(&block);
                if !text.is_empty() {
                    self.push_inline(Inline::Text(text));
                }
            }
        }
    }

    fn finish(mut self) -> DocumentTree {
        // Close anything an unbalanced stream left open.
        while self.stack.len() > 1 {
            self.end();
        }
        match self.stack.pop() {
            Some(Frame::Root(blocks)) => DocumentTree { blocks },
            _ => DocumentTree::default(),
        }
    }
}

/// Adjacent text events (the tokenizer splits text at entity and escape
/// boundaries) are merged into one run.
fn push_merging_text(target: &mut Vec<Inline>, inline: Inline) {
    if let Inline::Text(new) = &inline {
        if let Some(Inline::Text(prev)) = target.last_mut() {
            prev.push_str(new);
            return;
        }
    }
    target.push(inline);
}

fn block_text(block: &Block) -> String {
    match block {
        Block::Paragraph(c) => plain_text(c),
        Block::Heading(h) => plain_text(&h.content),
        Block::CodeBlock { text, .. } => text.clone(),
        _ => String::new(),
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn convert_alignment(a: pulldown_cmark::Alignment) -> Alignment {
    match a {
        pulldown_cmark::Alignment::None => Alignment::None,
        pulldown_cmark::Alignment::Left => Alignment::Left,
        pulldown_cmark::Alignment::Center => Alignment::Center,
        pulldown_cmark::Alignment::Right => Alignment::Right,
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn headings_get_anchors() {
        let tree = parse("# Hello World\n\n## Hello World\n");
        let anchors: Vec<&str> = tree
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Heading(h) => Some(h.anchor.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(anchors, vec!["hello-world", "hello-world-1"]);
    }

    #[test]
    fn all_heading_levels() {
        let src = "# a\n## b\n### c\n#### d\n##### e\n###### f\n";
        let levels: Vec<u8> = parse(src)
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Heading(h) => Some(h.level),
                _ => None,
            })
            .collect();
        assert_eq!(levels, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn paragraph_with_emphasis_and_code() {
        let tree = parse("Some *em* and **strong** and `code`.");
        assert_eq!(
            tree.blocks,
            vec![Block::Paragraph(vec![
                text("Some "),
                Inline::Emphasis(vec![text("em")]),
                text(" and "),
                Inline::Strong(vec![text("strong")]),
                text(" and "),
                Inline::Code("code".into()),
                text("."),
            ])]
        );
    }

    #[test]
    fn tight_and_loose_lists() {
        let tight = parse("- a\n- b\n");
        match &tight.blocks[0] {
            Block::List(list) => {
                assert!(list.tight);
                assert_eq!(list.kind, ListKind::Unordered);
                assert_eq!(list.items.len(), 2);
            }
            other => panic!("expected list, got {other:?}"),
        }

        let loose = parse("1. a\n\n2. b\n");
        match &loose.blocks[0] {
            Block::List(list) => {
                assert!(!list.tight);
                assert_eq!(list.kind, ListKind::Ordered { start: 1 });
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn nested_list_stays_inside_item() {
        let tree = parse("- outer\n  - inner\n- next\n");
        let Block::List(list) = &tree.blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(list.items.len(), 2);
        let first = &list.items[0].blocks;
        assert_eq!(first[0], Block::Paragraph(vec![text("outer")]));
        assert!(matches!(first[1], Block::List(_)));
    }

    #[test]
    fn ordered_list_start() {
        let tree = parse("3. three\n4. four\n");
        let Block::List(list) = &tree.blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(list.kind, ListKind::Ordered { start: 3 });
    }

    #[test]
    fn table_with_alignment() {
        let src = "| a | b | c |\n|---|:-:|--:|\n| 1 | 2 | 3 |\n| 4 | 5 | 6 |\n";
        let tree = parse(src);
        let Block::Table(table) = &tree.blocks[0] else {
            panic!("expected table, got {:?}", tree.blocks);
        };
        assert_eq!(
            table.alignments,
            vec![Alignment::None, Alignment::Center, Alignment::Right]
        );
        assert_eq!(table.header.len(), 3);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][2], vec![text("6")]);
    }

    #[test]
    fn fenced_code_keeps_language_and_text() {
        let tree = parse("```rust extra\nfn main() {}\n```\n");
        assert_eq!(
            tree.blocks,
            vec![Block::CodeBlock {
                language: Some("rust".into()),
                text: "fn main() {}\n".into(),
            }]
        );
    }

    #[test]
    fn indented_code_block() {
        let tree = parse("    let x = 1;\n");
        assert!(matches!(
            &tree.blocks[0],
            Block::CodeBlock { language: None, text } if text == "let x = 1;\n"
        ));
    }

    #[test]
    fn blockquote_and_rule() {
        let tree = parse("> quoted\n\n---\n");
        assert_eq!(
            tree.blocks,
            vec![
                Block::BlockQuote(vec![Block::Paragraph(vec![text("quoted")])]),
                Block::ThematicBreak,
            ]
        );
    }

    #[test]
    fn links_and_images() {
        let tree = parse("[site](https://x.com \"X\") ![logo *pic*](a.png)");
        let Block::Paragraph(inlines) = &tree.blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(
            inlines[0],
            Inline::Link {
                href: "https://x.com".into(),
                title: Some("X".into()),
                content: vec![text("site")],
            }
        );
        assert_eq!(
            inlines[2],
            Inline::Image {
                src: "a.png".into(),
                title: None,
                alt: "logo pic".into(),
            }
        );
    }

    #[test]
    fn inline_html_is_literal_text() {
        let tree = parse("Hi <script>alert(1)</script> there");
        assert_eq!(
            tree.blocks,
            vec![Block::Paragraph(vec![text(
                "Hi <script>alert(1)</script> there"
            )])]
        );
    }

    #[test]
    fn html_block_is_literal_text() {
        let tree = parse("<div>\nraw\n</div>\n");
        assert_eq!(
            tree.blocks,
            vec![Block::Paragraph(vec![text("<div>\nraw\n</div>")])]
        );
    }

    #[test]
    fn malformed_constructs_degrade_to_text() {
        let tree = parse("**unclosed and [link](");
        assert_eq!(
            tree.blocks,
            vec![Block::Paragraph(vec![text("**unclosed and [link](")])]
        );
    }

    #[test]
    fn empty_input_gives_empty_tree() {
        assert!(parse("").blocks.is_empty());
        assert!(parse("\n\n   \n").blocks.is_empty());
    }
}
