//! Substitution table: maps every node kind to its HTML

use pulldown_cmark::Alignment;
use std::collections::HashMap;
use std::fmt::Write;

use super::tree::{CarouselImage, CodeBlock, CodeLine, Diff, Heading, Node};
use crate::helpers::html_escape;

const WIDE_MARKER: &str = "|wide";

const FILE_ICON: &str = r#"<svg class="code-title-icon" viewBox="0 0 16 16" width="14" height="14" aria-hidden="true"><path fill="currentColor" d="M3.75 1.5a.25.25 0 0 0-.25.25v12.5c0 .14.11.25.25.25h8.5a.25.25 0 0 0 .25-.25V6H9.75A1.75 1.75 0 0 1 8 4.25V1.5H3.75Zm5.75.56v2.19c0 .14.11.25.25.25h2.19L9.5 2.06ZM2 1.75C2 .78 2.78 0 3.75 0h5.09c.46 0 .91.18 1.23.51l3.42 3.42c.33.32.51.77.51 1.23v9.09A1.75 1.75 0 0 1 12.25 16h-8.5A1.75 1.75 0 0 1 2 14.25V1.75Z"/></svg>"#;

/// Presentation rules for each node kind.
///
/// The class names are the configurable part; which elements get produced
/// for which node is fixed by [`SubstitutionTable::render`].
#[derive(Debug, Clone)]
pub struct SubstitutionTable {
    /// Classes for heading levels 1 to 3
    pub heading_classes: [String; 3],
    pub heading_link_class: String,
    pub link_class: String,
    pub blockquote_class: String,
    pub code_block_class: String,
    pub code_header_class: String,
    pub copy_button_class: String,
    pub pre_class: String,
    pub image_class: String,
    pub wide_image_class: String,
    pub figure_class: String,
    pub caption_class: String,
    pub table_wrapper_class: String,
    pub table_class: String,
    pub thead_class: String,
    pub tbody_class: String,
    pub row_class: String,
    pub header_cell_class: String,
    pub body_cell_class: String,
    pub carousel_class: String,
}

impl Default for SubstitutionTable {
    fn default() -> Self {
        Self {
            heading_classes: [
                "heading heading-1".to_string(),
                "heading heading-2".to_string(),
                "heading heading-3".to_string(),
            ],
            heading_link_class: "heading-link".to_string(),
            link_class: "link underline underline-offset-4".to_string(),
            blockquote_class: "blockquote border-l-4 pl-4".to_string(),
            code_block_class: "code-block".to_string(),
            code_header_class: "code-header".to_string(),
            copy_button_class: "copy-button".to_string(),
            pre_class: "code-pre".to_string(),
            image_class: "image".to_string(),
            wide_image_class: "image-wide".to_string(),
            figure_class: "figure".to_string(),
            caption_class: "figure-caption".to_string(),
            table_wrapper_class: "table-wrapper".to_string(),
            table_class: "table border".to_string(),
            thead_class: "table-head".to_string(),
            tbody_class: "table-body".to_string(),
            row_class: "table-row border-b".to_string(),
            header_cell_class: "table-header-cell border px-4 py-2".to_string(),
            body_cell_class: "table-cell border px-4 py-2".to_string(),
            carousel_class: "carousel".to_string(),
        }
    }
}

impl SubstitutionTable {
    /// Render a document tree to HTML
    pub fn render(&self, node: &Node) -> String {
        let mut writer = HtmlWriter {
            table: self,
            out: String::new(),
            footnotes: HashMap::new(),
        };
        writer.node(node);
        writer.out
    }
}

struct HtmlWriter<'a> {
    table: &'a SubstitutionTable,
    out: String,
    /// Footnote label to display number, in order of first use
    footnotes: HashMap<String, usize>,
}

impl HtmlWriter<'_> {
    fn nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.node(node);
        }
    }

    fn wrap(&mut self, open: &str, children: &[Node], close: &str) {
        self.out.push_str(open);
        self.nodes(children);
        self.out.push_str(close);
    }

    fn node(&mut self, node: &Node) {
        match node {
            Node::Document(children) => self.nodes(children),
            Node::Paragraph(children) => self.wrap("<p>", children, "</p>\n"),
            Node::Heading(heading) => self.heading(heading),
            Node::BlockQuote(children) => {
                let open = format!(r#"<blockquote class="{}">"#, self.table.blockquote_class);
                self.wrap(&open, children, "</blockquote>\n");
            }
            Node::List { start, items } => match start {
                Some(1) => self.wrap("<ol>\n", items, "</ol>\n"),
                Some(n) => self.wrap(&format!(r#"<ol start="{}">"#, n), items, "</ol>\n"),
                None => self.wrap("<ul>\n", items, "</ul>\n"),
            },
            Node::Item(children) => {
                if matches!(children.first(), Some(Node::TaskMarker(_))) {
                    self.wrap(r#"<li class="task-list-item">"#, children, "</li>\n");
                } else {
                    self.wrap("<li>", children, "</li>\n");
                }
            }
            Node::TaskMarker(checked) => {
                let checked = if *checked { " checked" } else { "" };
                let _ = write!(self.out, r#"<input type="checkbox" disabled{}> "#, checked);
            }
            Node::CodeBlock(block) => self.code_block(block),
            Node::Table {
                alignments,
                head,
                rows,
            } => self.table(alignments, head, rows),
            Node::TableRow(cells) => self.row(cells, &[], false),
            Node::TableCell(children) => {
                let open = format!(r#"<td class="{}">"#, self.table.body_cell_class);
                self.wrap(&open, children, "</td>");
            }
            Node::Emphasis(children) => self.wrap("<em>", children, "</em>"),
            Node::Strong(children) => self.wrap("<strong>", children, "</strong>"),
            Node::Strikethrough(children) => self.wrap("<del>", children, "</del>"),
            Node::Link {
                url,
                title,
                children,
            } => {
                let mut open = format!(
                    r#"<a href="{}" class="{}""#,
                    html_escape(url),
                    self.table.link_class
                );
                if !title.is_empty() {
                    let _ = write!(open, r#" title="{}""#, html_escape(title));
                }
                open.push('>');
                self.wrap(&open, children, "</a>");
            }
            Node::Image { url, title, alt } => self.image(url, title, alt),
            Node::Text(text) => self.out.push_str(&html_escape(text)),
            Node::InlineCode(code) => {
                let _ = write!(self.out, "<code>{}</code>", html_escape(code));
            }
            Node::Html(html) | Node::InlineHtml(html) => self.out.push_str(html),
            Node::SoftBreak => self.out.push('\n'),
            Node::HardBreak => self.out.push_str("<br>\n"),
            Node::Rule => self.out.push_str("<hr>\n"),
            Node::FootnoteReference(label) => {
                let number = self.footnote_number(label);
                let _ = write!(
                    self.out,
                    r##"<sup class="footnote-reference"><a href="#fn-{}">{}</a></sup>"##,
                    html_escape(label),
                    number
                );
            }
            Node::FootnoteDefinition { label, children } => {
                let number = self.footnote_number(label);
                let open = format!(
                    r#"<div class="footnote-definition" id="fn-{}"><sup class="footnote-definition-label">{}</sup>"#,
                    html_escape(label),
                    number
                );
                self.wrap(&open, children, "</div>\n");
            }
            Node::ImageCarousel(images) => self.carousel(images),
        }
    }

    fn footnote_number(&mut self, label: &str) -> usize {
        let next = self.footnotes.len() + 1;
        *self.footnotes.entry(label.to_string()).or_insert(next)
    }

    fn heading(&mut self, heading: &Heading) {
        let level = heading.level.clamp(1, 6);
        let id = heading.id.as_deref().map(html_escape);
        let id_attr = id
            .as_ref()
            .map(|id| format!(r#" id="{}""#, id))
            .unwrap_or_default();

        let mut classes = Vec::new();
        if level <= 3 {
            classes.push(self.table.heading_classes[usize::from(level) - 1].as_str());
        }
        classes.extend(heading.classes.iter().map(String::as_str));
        let class_attr = if classes.is_empty() {
            String::new()
        } else {
            format!(r#" class="{}""#, html_escape(&classes.join(" ")))
        };

        let _ = write!(self.out, "<h{}{}{}>", level, id_attr, class_attr);
        self.nodes(&heading.children);
        if let (true, Some(id)) = (level <= 3, id) {
            let _ = write!(
                self.out,
                r##"<button type="button" class="{}" data-copy-link="#{}" aria-label="Copy link to section">#</button>"##,
                self.table.heading_link_class, id
            );
        }
        let _ = writeln!(self.out, "</h{}>", level);
    }

    fn code_block(&mut self, block: &CodeBlock) {
        let Some(code) = &block.annotated else {
            let _ = writeln!(
                self.out,
                r#"<div class="{}"><button type="button" class="{}" data-code="{}" aria-label="Copy code">Copy</button><pre class="{}"><code>{}</code></pre></div>"#,
                self.table.code_block_class,
                self.table.copy_button_class,
                html_escape(&block.code),
                self.table.pre_class,
                html_escape(&block.code)
            );
            return;
        };

        let _ = write!(self.out, r#"<div class="{}">"#, self.table.code_block_class);
        if let Some(title) = &code.title {
            let _ = write!(
                self.out,
                r#"<div class="{}">{}<span class="code-title">{}</span></div>"#,
                self.table.code_header_class,
                FILE_ICON,
                html_escape(title)
            );
        }
        let _ = write!(
            self.out,
            r#"<button type="button" class="{}" data-code="{}" aria-label="Copy code">Copy</button>"#,
            self.table.copy_button_class,
            html_escape(&code.copy_text)
        );

        let _ = write!(self.out, r#"<pre class="{}"#, self.table.pre_class);
        for (flag, class) in [
            (code.has_diff(), "has-diff"),
            (code.has_highlighted(), "has-highlighted"),
            (code.has_focused(), "has-focused"),
        ] {
            if flag {
                let _ = write!(self.out, " {}", class);
            }
        }
        let _ = write!(
            self.out,
            r#"" data-language="{}""#,
            html_escape(&code.language)
        );
        if let Some(title) = &code.title {
            let _ = write!(self.out, r#" data-title="{}""#, html_escape(title));
        }
        if code.line_numbers {
            self.out.push_str(" data-line-numbers");
        }
        self.out.push_str("><code>");

        for (i, line) in code.lines.iter().enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            self.code_line(i + 1, line);
        }
        self.out.push_str("</code></pre></div>\n");
    }

    fn code_line(&mut self, number: usize, line: &CodeLine) {
        self.out.push_str(r#"<span class="line"#);
        match line.diff {
            Some(Diff::Add) => self.out.push_str(" diff add"),
            Some(Diff::Remove) => self.out.push_str(" diff remove"),
            None => {}
        }
        if line.highlighted {
            self.out.push_str(" highlighted");
        }
        if line.focused {
            self.out.push_str(" focused");
        }
        let _ = write!(self.out, r#"" data-line="{}">"#, number);

        for token in &line.tokens {
            let word = if token.word {
                r#" class="highlighted-word""#
            } else {
                ""
            };
            let _ = write!(
                self.out,
                r#"<span{} style="--code-light:{};--code-dark:{}">{}</span>"#,
                word,
                token.light,
                token.dark,
                html_escape(&token.text)
            );
        }
        self.out.push_str("</span>");
    }

    fn image(&mut self, url: &str, title: &str, alt: &str) {
        let wide = alt.contains(WIDE_MARKER);
        let alt = if wide {
            alt.replacen(WIDE_MARKER, "", 1).trim().to_string()
        } else {
            alt.to_string()
        };

        let mut class = self.table.image_class.clone();
        if wide {
            class.push(' ');
            class.push_str(&self.table.wide_image_class);
        }
        let img = format!(
            r#"<img src="{}" alt="{}" class="{}" loading="lazy">"#,
            html_escape(url),
            html_escape(&alt),
            class
        );

        if title.is_empty() {
            self.out.push_str(&img);
            return;
        }

        let mut figure_class = self.table.figure_class.clone();
        if wide {
            figure_class.push(' ');
            figure_class.push_str(&self.table.wide_image_class);
        }
        let _ = writeln!(
            self.out,
            r#"<figure class="{}">{}<figcaption class="{}">▶ {}</figcaption></figure>"#,
            figure_class,
            img,
            self.table.caption_class,
            html_escape(title)
        );
    }

    fn table(&mut self, alignments: &[Alignment], head: &[Node], rows: &[Node]) {
        let _ = write!(
            self.out,
            r#"<div class="{}"><table class="{}"><thead class="{}">"#,
            self.table.table_wrapper_class, self.table.table_class, self.table.thead_class
        );
        self.row(head, alignments, true);
        let _ = write!(self.out, r#"</thead><tbody class="{}">"#, self.table.tbody_class);
        for row in rows {
            match row {
                Node::TableRow(cells) => self.row(cells, alignments, false),
                other => self.node(other),
            }
        }
        self.out.push_str("</tbody></table></div>\n");
    }

    fn row(&mut self, cells: &[Node], alignments: &[Alignment], header: bool) {
        let _ = write!(self.out, r#"<tr class="{}">"#, self.table.row_class);
        for (i, cell) in cells.iter().enumerate() {
            let (tag, class) = if header {
                ("th", &self.table.header_cell_class)
            } else {
                ("td", &self.table.body_cell_class)
            };
            let style = match alignments.get(i) {
                Some(Alignment::Left) => r#" style="text-align:left""#,
                Some(Alignment::Center) => r#" style="text-align:center""#,
                Some(Alignment::Right) => r#" style="text-align:right""#,
                _ => "",
            };
            let open = format!(r#"<{} class="{}"{}>"#, tag, class, style);
            let close = format!("</{}>", tag);
            self.wrap(&open, cell.children(), &close);
        }
        self.out.push_str("</tr>");
    }

    fn carousel(&mut self, images: &[CarouselImage]) {
        let _ = write!(
            self.out,
            r#"<div class="{}" data-carousel><div class="carousel-viewport"><div class="carousel-track">"#,
            self.table.carousel_class
        );
        for (i, image) in images.iter().enumerate() {
            let current = if i == 0 { " is-current" } else { "" };
            let _ = write!(
                self.out,
                r#"<figure class="carousel-slide{}" data-index="{}" aria-hidden="{}"><img src="{}" alt="{}" loading="lazy"></figure>"#,
                current,
                i,
                i != 0,
                html_escape(&image.src),
                html_escape(&image.alt)
            );
        }
        self.out.push_str(
            r#"</div><button type="button" class="carousel-prev" data-carousel-prev aria-label="Previous image">&#8249;</button><button type="button" class="carousel-next" data-carousel-next aria-label="Next image">&#8250;</button></div><div class="carousel-thumbs">"#,
        );
        for (i, image) in images.iter().enumerate() {
            let current = if i == 0 { " is-current" } else { "" };
            let _ = write!(
                self.out,
                r#"<button type="button" class="carousel-thumb{}" data-carousel-thumb="{}" aria-label="Show image {}"><img src="{}" alt="{}" loading="lazy"></button>"#,
                current,
                i,
                i + 1,
                html_escape(&image.src),
                html_escape(&image.alt)
            );
        }
        self.out.push_str("</div></div>\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::tree::{AnnotatedCode, Token};

    fn render(node: Node) -> String {
        SubstitutionTable::default().render(&node)
    }

    fn heading(level: u8, id: Option<&str>, text: &str) -> Node {
        Node::Heading(Heading {
            level,
            id: id.map(str::to_string),
            classes: vec![],
            children: vec![Node::Text(text.to_string())],
        })
    }

    #[test]
    fn test_heading_copy_link() {
        let html = render(heading(2, Some("setup"), "Setup"));
        assert!(html.starts_with(r#"<h2 id="setup" class="heading heading-2">Setup"#));
        assert!(html.contains(r##"data-copy-link="#setup""##));

        let html = render(heading(4, Some("deep"), "Deep"));
        assert_eq!(html, "<h4 id=\"deep\">Deep</h4>\n");
    }

    #[test]
    fn test_link_and_blockquote_classes() {
        let html = render(Node::Link {
            url: "https://example.com?a=1&b=2".into(),
            title: String::new(),
            children: vec![Node::Text("x".into())],
        });
        assert_eq!(
            html,
            r#"<a href="https://example.com?a=1&amp;b=2" class="link underline underline-offset-4">x</a>"#
        );

        let html = render(Node::BlockQuote(vec![Node::Paragraph(vec![Node::Text("q".into())])]));
        assert!(html.starts_with(r#"<blockquote class="blockquote border-l-4 pl-4">"#));
    }

    #[test]
    fn test_wide_image() {
        let wide = render(Node::Image {
            url: "/a.png".into(),
            title: String::new(),
            alt: "Panorama |wide".into(),
        });
        assert!(wide.contains(r#"alt="Panorama""#));
        assert!(wide.contains("image-wide"));
        assert!(!wide.contains("|wide"));

        let normal = render(Node::Image {
            url: "/a.png".into(),
            title: String::new(),
            alt: "Panorama".into(),
        });
        assert!(normal.contains(r#"alt="Panorama""#));
        assert!(!normal.contains("image-wide"));
    }

    #[test]
    fn test_image_caption() {
        let html = render(Node::Image {
            url: "/a.png".into(),
            title: "Sunset".into(),
            alt: "sky".into(),
        });
        assert!(html.starts_with(r#"<figure class="figure">"#));
        assert!(html.contains("<figcaption class=\"figure-caption\">▶ Sunset</figcaption>"));
    }

    #[test]
    fn test_code_block_markup() {
        let block = CodeBlock {
            info: "rust".into(),
            code: "a <b>\n".into(),
            annotated: Some(AnnotatedCode {
                language: "rust".into(),
                title: Some("main.rs".into()),
                line_numbers: true,
                lines: vec![CodeLine {
                    tokens: vec![Token {
                        text: "a <b>".into(),
                        light: "#000000".into(),
                        dark: "#ffffff".into(),
                        word: false,
                    }],
                    diff: Some(Diff::Add),
                    highlighted: false,
                    focused: false,
                }],
                copy_text: "a <b>\n".into(),
            }),
        };
        let html = render(Node::CodeBlock(block));
        assert!(html.contains(r#"<span class="code-title">main.rs</span>"#));
        assert!(html.contains("data-code=\"a &lt;b&gt;\n\""));
        assert!(html.contains(r#"<pre class="code-pre has-diff" data-language="rust" data-title="main.rs" data-line-numbers>"#));
        assert!(html.contains(r#"<span class="line diff add" data-line="1">"#));
        assert!(html.contains("--code-light:#000000;--code-dark:#ffffff"));
    }

    #[test]
    fn test_table_structure() {
        let html = render(Node::Table {
            alignments: vec![Alignment::None, Alignment::Right],
            head: vec![
                Node::TableCell(vec![Node::Text("a".into())]),
                Node::TableCell(vec![Node::Text("b".into())]),
            ],
            rows: vec![Node::TableRow(vec![
                Node::TableCell(vec![Node::Text("1".into())]),
                Node::TableCell(vec![Node::Text("2".into())]),
            ])],
        });
        assert!(html.starts_with(r#"<div class="table-wrapper"><table class="table border"><thead class="table-head">"#));
        assert!(html.contains(r#"<th class="table-header-cell border px-4 py-2">a</th>"#));
        assert!(html.contains(r#"<td class="table-cell border px-4 py-2" style="text-align:right">2</td>"#));
    }

    #[test]
    fn test_carousel_first_slide_current() {
        let html = render(Node::ImageCarousel(vec![
            CarouselImage {
                src: "/1.png".into(),
                alt: "one".into(),
            },
            CarouselImage {
                src: "/2.png".into(),
                alt: "two".into(),
            },
        ]));
        assert_eq!(html.matches("carousel-slide").count(), 2);
        assert_eq!(html.matches("is-current").count(), 2);
        assert!(html.contains(r#"data-index="0" aria-hidden="false""#));
        assert!(html.contains(r#"data-carousel-thumb="1""#));
        assert!(html.contains("data-carousel-prev"));
    }

    #[test]
    fn test_footnotes_numbered_by_first_use() {
        let html = render(Node::Document(vec![
            Node::Paragraph(vec![
                Node::FootnoteReference("b".into()),
                Node::FootnoteReference("a".into()),
            ]),
            Node::FootnoteDefinition {
                label: "a".into(),
                children: vec![],
            },
        ]));
        assert!(html.contains(r##"<a href="#fn-b">1</a>"##));
        assert!(html.contains(r#"id="fn-a"><sup class="footnote-definition-label">2</sup>"#));
    }
}
