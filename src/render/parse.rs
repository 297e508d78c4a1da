//! Markdown/MDX source to [`Node`] tree

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

use super::tree::{CarouselImage, CodeBlock, Heading, Node};
use super::RenderError;

const CAROUSEL_TAG: &str = "<ImageCarousel";
const PLACEHOLDER_PREFIX: &str = "<!-- image-carousel:";

/// Parse a post body into a document tree
pub fn parse(source: &str) -> Result<Node, RenderError> {
    let (markdown, carousels) = extract_components(source)?;

    // Autolinks are a tree stage; YAML blocks were stripped by the reader
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES;

    let mut builder = TreeBuilder::new(carousels);
    for event in Parser::new_ext(&markdown, options) {
        builder.event(event);
    }
    Ok(builder.finish())
}

enum Open {
    Document,
    Paragraph,
    Heading {
        level: u8,
        id: Option<String>,
        classes: Vec<String>,
    },
    BlockQuote,
    CodeBlock(String),
    HtmlBlock,
    List(Option<u64>),
    Item,
    FootnoteDefinition(String),
    Table(Vec<pulldown_cmark::Alignment>),
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Strikethrough,
    Link { url: String, title: String },
    Image { url: String, title: String },
    /// Tags without a node of their own; children go to the parent
    Transparent,
}

struct Frame {
    open: Open,
    children: Vec<Node>,
}

struct TreeBuilder {
    stack: Vec<Frame>,
    carousels: Vec<Vec<CarouselImage>>,
}

impl TreeBuilder {
    fn new(carousels: Vec<Vec<CarouselImage>>) -> Self {
        Self {
            stack: vec![Frame {
                open: Open::Document,
                children: Vec::new(),
            }],
            carousels,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => {
                let open = match tag {
                    Tag::Paragraph => Open::Paragraph,
                    Tag::Heading {
                        level, id, classes, ..
                    } => Open::Heading {
                        level: level as u8,
                        id: id.map(|s| s.to_string()),
                        classes: classes.into_iter().map(|c| c.to_string()).collect(),
                    },
                    Tag::BlockQuote(_) => Open::BlockQuote,
                    Tag::CodeBlock(CodeBlockKind::Fenced(info)) => Open::CodeBlock(info.to_string()),
                    Tag::CodeBlock(CodeBlockKind::Indented) => Open::CodeBlock(String::new()),
                    Tag::HtmlBlock => Open::HtmlBlock,
                    Tag::List(start) => Open::List(start),
                    Tag::Item => Open::Item,
                    Tag::FootnoteDefinition(label) => Open::FootnoteDefinition(label.to_string()),
                    Tag::Table(alignments) => Open::Table(alignments),
                    Tag::TableHead => Open::TableHead,
                    Tag::TableRow => Open::TableRow,
                    Tag::TableCell => Open::TableCell,
                    Tag::Emphasis => Open::Emphasis,
                    Tag::Strong => Open::Strong,
                    Tag::Strikethrough => Open::Strikethrough,
                    Tag::Link {
                        dest_url, title, ..
                    } => Open::Link {
                        url: dest_url.to_string(),
                        title: title.to_string(),
                    },
                    Tag::Image {
                        dest_url, title, ..
                    } => Open::Image {
                        url: dest_url.to_string(),
                        title: title.to_string(),
                    },
                    _ => Open::Transparent,
                };
                self.stack.push(Frame {
                    open,
                    children: Vec::new(),
                });
            }
            Event::End(_) => self.close(),
            Event::Text(text) => self.push(Node::Text(text.to_string())),
            Event::Code(code) => self.push(Node::InlineCode(code.to_string())),
            Event::Html(html) => self.push(Node::Html(html.to_string())),
            Event::InlineHtml(html) => self.push(Node::InlineHtml(html.to_string())),
            Event::FootnoteReference(label) => self.push(Node::FootnoteReference(label.to_string())),
            Event::SoftBreak => self.push(Node::SoftBreak),
            Event::HardBreak => self.push(Node::HardBreak),
            Event::Rule => self.push(Node::Rule),
            Event::TaskListMarker(checked) => self.push(Node::TaskMarker(checked)),
            _ => {}
        }
    }

    fn push(&mut self, node: Node) {
        let Some(frame) = self.stack.last_mut() else {
            return;
        };
        push_merged(&mut frame.children, node);
    }

    fn close(&mut self) {
        if self.stack.len() < 2 {
            return;
        }
        let Some(Frame { open, children }) = self.stack.pop() else {
            return;
        };

        let node = match open {
            Open::Document => Node::Document(children),
            Open::Paragraph => Node::Paragraph(children),
            Open::Heading {
                level,
                id,
                classes,
            } => Node::Heading(Heading {
                level,
                id,
                classes,
                children,
            }),
            Open::BlockQuote => Node::BlockQuote(children),
            Open::CodeBlock(info) => Node::CodeBlock(CodeBlock {
                info,
                code: concat_raw(&children),
                annotated: None,
            }),
            Open::HtmlBlock => {
                let html = concat_raw(&children);
                match self.carousel_for(&html) {
                    Some(images) => Node::ImageCarousel(images),
                    None => Node::Html(html),
                }
            }
            Open::List(start) => Node::List {
                start,
                items: children,
            },
            Open::Item => Node::Item(children),
            Open::FootnoteDefinition(label) => Node::FootnoteDefinition { label, children },
            Open::Table(alignments) => {
                let mut head = Vec::new();
                let mut rows = Vec::new();
                for child in children {
                    match child {
                        // Head cells arrive wrapped in a row by `TableHead`
                        Node::TableRow(cells) if head.is_empty() && rows.is_empty() => head = cells,
                        row => rows.push(row),
                    }
                }
                Node::Table {
                    alignments,
                    head,
                    rows,
                }
            }
            Open::TableHead | Open::TableRow => Node::TableRow(children),
            Open::TableCell => Node::TableCell(children),
            Open::Emphasis => Node::Emphasis(children),
            Open::Strong => Node::Strong(children),
            Open::Strikethrough => Node::Strikethrough(children),
            Open::Link { url, title } => Node::Link {
                url,
                title,
                children,
            },
            Open::Image { url, title } => Node::Image {
                url,
                title,
                alt: Node::Document(children).text_content(),
            },
            Open::Transparent => {
                for child in children {
                    self.push(child);
                }
                return;
            }
        };

        self.push(node);
    }

    fn carousel_for(&mut self, html: &str) -> Option<Vec<CarouselImage>> {
        let index: usize = html
            .trim()
            .strip_prefix(PLACEHOLDER_PREFIX)?
            .strip_suffix("-->")?
            .trim()
            .parse()
            .ok()?;
        self.carousels.get_mut(index).map(std::mem::take)
    }

    fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            self.close();
        }
        match self.stack.pop() {
            Some(frame) => Node::Document(frame.children),
            None => Node::Document(Vec::new()),
        }
    }
}

/// Append a node, joining it to a preceding text node
fn push_merged(children: &mut Vec<Node>, node: Node) {
    if let (Some(Node::Text(last)), Node::Text(text)) = (children.last_mut(), &node) {
        last.push_str(text);
        return;
    }
    children.push(node);
}

fn concat_raw(children: &[Node]) -> String {
    children
        .iter()
        .map(|c| match c {
            Node::Text(t) | Node::Html(t) => t.as_str(),
            _ => "",
        })
        .collect()
}

/// Replace `<ImageCarousel ... />` components with placeholders.
///
/// Components are recognised at the start of a line outside code fences and
/// may span several lines until the closing `/>`.
fn extract_components(source: &str) -> Result<(String, Vec<Vec<CarouselImage>>), RenderError> {
    let mut out = String::with_capacity(source.len());
    let mut carousels = Vec::new();
    let mut fence: Option<(char, usize)> = None;
    let mut lines = source.lines().enumerate();

    while let Some((index, line)) = lines.next() {
        let trimmed = line.trim_start();

        if let Some(marker) = fence_marker(trimmed) {
            match fence {
                None => fence = Some(marker),
                Some((ch, len)) if marker.0 == ch && marker.1 >= len => {
                    if trimmed.trim_start_matches(ch).trim().is_empty() {
                        fence = None;
                    }
                }
                Some(_) => {}
            }
        }

        if fence.is_some() || !trimmed.starts_with(CAROUSEL_TAG) {
            out.push_str(line);
            out.push('\n');
            continue;
        }

        let start_line = index + 1;
        let mut component = trimmed.to_string();
        while !component.contains("/>") {
            match lines.next() {
                Some((_, next)) => {
                    component.push('\n');
                    component.push_str(next);
                }
                None => {
                    return Err(RenderError::Syntax {
                        line: start_line,
                        message: "unterminated <ImageCarousel> component".to_string(),
                    })
                }
            }
        }

        let images = parse_carousel(&component).map_err(|message| RenderError::Syntax {
            line: start_line,
            message,
        })?;

        out.push('\n');
        out.push_str(&format!("{}{} -->\n\n", PLACEHOLDER_PREFIX, carousels.len()));
        carousels.push(images);

        // Text after the closing `/>` continues as ordinary content
        if let Some(close) = component.find("/>") {
            let rest = component[close + 2..].trim();
            if !rest.is_empty() {
                out.push_str(rest);
                out.push('\n');
            }
        }
    }

    Ok((out, carousels))
}

fn fence_marker(line: &str) -> Option<(char, usize)> {
    let ch = line.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let len = line.chars().take_while(|c| *c == ch).count();
    (len >= 3).then_some((ch, len))
}

/// Parse the `images={[...]}` prop of a carousel component
fn parse_carousel(component: &str) -> Result<Vec<CarouselImage>, String> {
    let end = component.find("/>").unwrap_or(component.len());
    let body = &component[CAROUSEL_TAG.len()..end];

    let prop = body
        .find("images")
        .map(|pos| body[pos + "images".len()..].trim_start())
        .ok_or("<ImageCarousel> requires an images prop")?;
    let value = prop
        .strip_prefix('=')
        .map(str::trim_start)
        .and_then(|v| v.strip_prefix('{'))
        .ok_or("images prop must be a {...} expression")?;
    let value = value
        .trim_end()
        .strip_suffix('}')
        .ok_or("images prop is missing its closing brace")?;

    let mut cursor = Cursor::new(value);
    let images = cursor.image_list()?;
    cursor.skip_ws();
    if !cursor.at_end() {
        return Err("unexpected text after images list".to_string());
    }
    if images.is_empty() {
        return Err("images list is empty".to_string());
    }
    Ok(images)
}

/// Minimal reader for the JS array-of-objects literal used in the prop
struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(format!("expected '{}' in images list", expected))
        }
    }

    fn image_list(&mut self) -> Result<Vec<CarouselImage>, String> {
        self.expect('[')?;
        let mut images = Vec::new();
        loop {
            if self.eat(']') {
                return Ok(images);
            }
            images.push(self.image()?);
            if !self.eat(',') {
                self.expect(']')?;
                return Ok(images);
            }
        }
    }

    fn image(&mut self) -> Result<CarouselImage, String> {
        self.expect('{')?;
        let mut src = None;
        let mut alt = None;
        loop {
            if self.eat('}') {
                break;
            }
            let key = self.key()?;
            self.expect(':')?;
            let value = self.string()?;
            match key.as_str() {
                "src" => src = Some(value),
                "alt" => alt = Some(value),
                _ => {}
            }
            if !self.eat(',') {
                self.expect('}')?;
                break;
            }
        }
        Ok(CarouselImage {
            src: src.ok_or("carousel image is missing src")?,
            alt: alt.unwrap_or_default(),
        })
    }

    fn key(&mut self) -> Result<String, String> {
        self.skip_ws();
        match self.peek() {
            Some('"') | Some('\'') => self.string(),
            _ => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if !(c.is_alphanumeric() || c == '_' || c == '$') {
                        break;
                    }
                    self.pos += c.len_utf8();
                }
                if start == self.pos {
                    return Err("expected a property name".to_string());
                }
                Ok(self.src[start..self.pos].to_string())
            }
        }
    }

    fn string(&mut self) -> Result<String, String> {
        self.skip_ws();
        let quote = match self.peek() {
            Some(q @ ('"' | '\'' | '`')) => q,
            _ => return Err("expected a string value".to_string()),
        };
        self.pos += 1;

        let mut value = String::new();
        while let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            match c {
                '\\' => {
                    let escaped = self.peek().ok_or("unterminated string")?;
                    self.pos += escaped.len_utf8();
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                }
                c if c == quote => return Ok(value),
                c => value.push(c),
            }
        }
        Err("unterminated string".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(source: &str) -> Vec<Node> {
        match parse(source).unwrap() {
            Node::Document(children) => children,
            other => panic!("expected document, got {:?}", other),
        }
    }

    #[test]
    fn test_basic_structure() {
        let nodes = blocks("# Title\n\nSome *text* here.\n\n> quoted\n");
        assert!(matches!(&nodes[0], Node::Heading(h) if h.level == 1 && h.id.is_none()));
        assert!(matches!(&nodes[1], Node::Paragraph(c) if c.len() == 3));
        assert!(matches!(&nodes[2], Node::BlockQuote(_)));
    }

    #[test]
    fn test_explicit_heading_id() {
        let nodes = blocks("## Setup {#install}\n");
        match &nodes[0] {
            Node::Heading(h) => {
                assert_eq!(h.id.as_deref(), Some("install"));
                assert_eq!(Node::Heading(h.clone()).text_content(), "Setup");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_code_block_keeps_literal_text() {
        let nodes = blocks("```rust title=\"main.rs\"\nfn main() {\n    println!(\"<hi>\");\n}\n```\n");
        match &nodes[0] {
            Node::CodeBlock(block) => {
                assert_eq!(block.info, "rust title=\"main.rs\"");
                assert_eq!(block.code, "fn main() {\n    println!(\"<hi>\");\n}\n");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_table_head_and_rows() {
        let nodes = blocks("| a | b |\n|---|:-:|\n| 1 | 2 |\n| 3 | 4 |\n");
        match &nodes[0] {
            Node::Table {
                alignments,
                head,
                rows,
            } => {
                assert_eq!(alignments.len(), 2);
                assert_eq!(head.len(), 2);
                assert_eq!(rows.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_image_alt_text() {
        let nodes = blocks("![A *wide* shot|wide](/a.png \"Caption\")\n");
        match &nodes[0] {
            Node::Paragraph(children) => match &children[0] {
                Node::Image { url, title, alt } => {
                    assert_eq!(url, "/a.png");
                    assert_eq!(title, "Caption");
                    assert_eq!(alt, "A wide shot|wide");
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_image_carousel() {
        let source = r#"Intro

<ImageCarousel images={[
  { src: "/one.png", alt: "First" },
  { src: '/two.png', alt: "Second" },
]} />

Outro
"#;
        let nodes = blocks(source);
        let carousel = nodes
            .iter()
            .find_map(|n| match n {
                Node::ImageCarousel(images) => Some(images),
                _ => None,
            })
            .unwrap();
        assert_eq!(carousel.len(), 2);
        assert_eq!(carousel[1].src, "/two.png");
        assert_eq!(carousel[0].alt, "First");
        assert!(matches!(nodes.last(), Some(Node::Paragraph(_))));
    }

    #[test]
    fn test_text_after_carousel_is_kept() {
        let nodes = blocks("<ImageCarousel images={[{ src: \"/a.png\" }]} /> more text\n");
        assert!(matches!(&nodes[0], Node::ImageCarousel(images) if images.len() == 1));
        match &nodes[1] {
            Node::Paragraph(children) => {
                assert_eq!(Node::Document(children.clone()).text_content(), "more text")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_carousel_inside_fence_is_code() {
        let source = "```mdx\n<ImageCarousel images={[{ src: \"/a.png\" }]} />\n```\n";
        let nodes = blocks(source);
        assert!(matches!(&nodes[0], Node::CodeBlock(b) if b.code.contains("ImageCarousel")));
    }

    #[test]
    fn test_unterminated_carousel_is_error() {
        let err = parse("Text\n\n<ImageCarousel images={[\n  { src: \"/a.png\" }\n").unwrap_err();
        assert!(matches!(err, RenderError::Syntax { line: 3, .. }));
    }

    #[test]
    fn test_carousel_without_src_is_error() {
        let err = parse("<ImageCarousel images={[{ alt: \"x\" }]} />\n").unwrap_err();
        match err {
            RenderError::Syntax { line, message } => {
                assert_eq!(line, 1);
                assert!(message.contains("src"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_empty_carousel_is_error() {
        assert!(parse("<ImageCarousel images={[]} />\n").is_err());
    }

    #[test]
    fn test_adjacent_text_is_merged() {
        let nodes = blocks("see https://example.com/a_b_c for more\n");
        match &nodes[0] {
            Node::Paragraph(children) => assert_eq!(children.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }
}
