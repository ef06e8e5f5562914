//! Document tree – the structural representation of a Markdown document.
//!
//! Block order mirrors the source exactly. The only merging is what the
//! grammar itself mandates (consecutive items of one list kind form a single
//! list block).

/// A parsed Markdown document: an ordered sequence of blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentTree {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    Heading(Heading),
    List(List),
    Table(Table),
    CodeBlock {
        /// First word of a fenced block's info string (`rust` in ```` ```rust ````).
        language: Option<String>,
        text: String,
    },
    ThematicBreak,
    BlockQuote(Vec<Block>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// 1 through 6.
    pub level: u8,
    /// Unique within the document; see [`crate::slug::Slugger`].
    pub anchor: String,
    pub content: Vec<Inline>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    pub kind: ListKind,
    /// Tight lists render their item paragraphs without `<p>` wrappers.
    pub tight: bool,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Unordered,
    Ordered { start: u64 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListItem {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    None,
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// One entry per column.
    pub alignments: Vec<Alignment>,
    pub header: Vec<Vec<Inline>>,
    pub rows: Vec<Vec<Vec<Inline>>>,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.alignments.len().max(self.header.len())
    }

    pub fn alignment(&self, column: usize) -> Alignment {
        self.alignments
            .get(column)
            .copied()
            .unwrap_or(Alignment::None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Code(String),
    Link {
        href: String,
        title: Option<String>,
        content: Vec<Inline>,
    },
    Image {
        src: String,
        title: Option<String>,
        alt: String,
    },
    SoftBreak,
    HardBreak,
}

/// Concatenate the visible text of a run of inlines (used for heading
/// anchors and image alt text).
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    collect_plain_text(inlines, &mut out);
    out
}

fn collect_plain_text(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(t) | Inline::Code(t) => out.push_str(t),
            Inline::Emphasis(c) | Inline::Strong(c) | Inline::Strikethrough(c) => {
                collect_plain_text(c, out)
            }
            Inline::Link { content, .. } => collect_plain_text(content, out),
            Inline::Image { alt, .. } => out.push_str(alt),
            Inline::SoftBreak | Inline::HardBreak => out.push(' '),
        }
    }
}
