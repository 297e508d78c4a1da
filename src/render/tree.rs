//! Document tree shared by every render stage

use pulldown_cmark::Alignment;

/// A node of the parsed document.
///
/// The set of kinds is closed: the HTML writer matches on every variant, so
/// adding one is a compile error until it is handled there.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Document(Vec<Node>),
    Paragraph(Vec<Node>),
    Heading(Heading),
    BlockQuote(Vec<Node>),
    List {
        /// Start number for ordered lists
        start: Option<u64>,
        items: Vec<Node>,
    },
    Item(Vec<Node>),
    TaskMarker(bool),
    CodeBlock(CodeBlock),
    Table {
        alignments: Vec<Alignment>,
        head: Vec<Node>,
        rows: Vec<Node>,
    },
    TableRow(Vec<Node>),
    TableCell(Vec<Node>),
    Emphasis(Vec<Node>),
    Strong(Vec<Node>),
    Strikethrough(Vec<Node>),
    Link {
        url: String,
        title: String,
        children: Vec<Node>,
    },
    Image {
        url: String,
        title: String,
        alt: String,
    },
    Text(String),
    InlineCode(String),
    /// Raw HTML block
    Html(String),
    InlineHtml(String),
    SoftBreak,
    HardBreak,
    Rule,
    FootnoteReference(String),
    FootnoteDefinition {
        label: String,
        children: Vec<Node>,
    },
    ImageCarousel(Vec<CarouselImage>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    pub level: u8,
    /// Anchor id, explicit (`{#id}`) or assigned by the slugging stage
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarouselImage {
    pub src: String,
    pub alt: String,
}

/// A fenced or indented code block
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    /// Full info string after the opening fence
    pub info: String,
    /// Literal code as written, notation comments included
    pub code: String,
    /// Filled in by the highlighting stage
    pub annotated: Option<AnnotatedCode>,
}

/// Highlighted code with per-line annotations
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedCode {
    pub language: String,
    pub title: Option<String>,
    pub line_numbers: bool,
    pub lines: Vec<CodeLine>,
    /// Code as displayed, notation comments removed
    pub copy_text: String,
}

impl AnnotatedCode {
    pub fn has_diff(&self) -> bool {
        self.lines.iter().any(|l| l.diff.is_some())
    }

    pub fn has_highlighted(&self) -> bool {
        self.lines.iter().any(|l| l.highlighted)
    }

    pub fn has_focused(&self) -> bool {
        self.lines.iter().any(|l| l.focused)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diff {
    Add,
    Remove,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeLine {
    pub tokens: Vec<Token>,
    pub diff: Option<Diff>,
    pub highlighted: bool,
    pub focused: bool,
}

/// A run of text with one colour per theme
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub light: String,
    pub dark: String,
    /// Part of a `[!code word:...]` match
    pub word: bool,
}

impl Node {
    /// Child nodes, for the variants that have them
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Document(c)
            | Node::Paragraph(c)
            | Node::BlockQuote(c)
            | Node::Item(c)
            | Node::TableRow(c)
            | Node::TableCell(c)
            | Node::Emphasis(c)
            | Node::Strong(c)
            | Node::Strikethrough(c) => c,
            Node::Heading(h) => &h.children,
            Node::List { items, .. } => items,
            Node::Link { children, .. } | Node::FootnoteDefinition { children, .. } => children,
            _ => &[],
        }
    }

    /// Concatenated text content, as a reader would see it
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(t) | Node::InlineCode(t) => out.push_str(t),
            Node::SoftBreak | Node::HardBreak => out.push(' '),
            Node::Image { alt, .. } => out.push_str(alt),
            Node::Table { head, rows, .. } => {
                for child in head.iter().chain(rows) {
                    child.collect_text(out);
                }
            }
            _ => {
                for child in self.children() {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Rebuild this node with `f` applied to its child list.
    pub fn map_children<F>(self, f: &mut F) -> Self
    where
        F: FnMut(Vec<Node>) -> Vec<Node>,
    {
        match self {
            Node::Document(c) => Node::Document(f(c)),
            Node::Paragraph(c) => Node::Paragraph(f(c)),
            Node::BlockQuote(c) => Node::BlockQuote(f(c)),
            Node::Item(c) => Node::Item(f(c)),
            Node::TableRow(c) => Node::TableRow(f(c)),
            Node::TableCell(c) => Node::TableCell(f(c)),
            Node::Emphasis(c) => Node::Emphasis(f(c)),
            Node::Strong(c) => Node::Strong(f(c)),
            Node::Strikethrough(c) => Node::Strikethrough(f(c)),
            Node::Heading(mut h) => {
                h.children = f(h.children);
                Node::Heading(h)
            }
            Node::List { start, items } => Node::List {
                start,
                items: f(items),
            },
            Node::Table {
                alignments,
                head,
                rows,
            } => Node::Table {
                alignments,
                head: f(head),
                rows: f(rows),
            },
            Node::Link {
                url,
                title,
                children,
            } => Node::Link {
                url,
                title,
                children: f(children),
            },
            Node::FootnoteDefinition { label, children } => Node::FootnoteDefinition {
                label,
                children: f(children),
            },
            leaf => leaf,
        }
    }
}
