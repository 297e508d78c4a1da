//! Render pipeline: post body to HTML
//!
//! A render runs in three steps: [`parse`] builds a [`Node`] tree, the
//! [`STAGES`] transform it in a fixed order, and the [`SubstitutionTable`]
//! turns the final tree into HTML.

mod components;
mod highlight;
mod parse;
mod slug;
mod stages;
mod tree;

use serde::Serialize;
use thiserror::Error;

pub use components::SubstitutionTable;
pub use highlight::{
    is_known_language, theme_names, FenceMeta, DEFAULT_DARK_THEME, DEFAULT_LIGHT_THEME,
};
pub use parse::parse;
pub use slug::{slugify, Slugger};
pub use stages::{StageContext, StageFn, STAGES};
pub use tree::{AnnotatedCode, CarouselImage, CodeBlock, CodeLine, Diff, Heading, Node, Token};

use crate::config::HighlightConfig;
use highlight::{resolve_theme, CodeHighlighter};

/// Errors raised while rendering a post body
#[derive(Debug, Error)]
pub enum RenderError {
    /// Markup the parser cannot make sense of
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("highlighting failed: {0}")]
    Highlight(String),
}

/// Table of contents entry (levels 2 and 3)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub id: String,
    pub text: String,
    pub level: u8,
}

/// A code block as the reader would copy it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeBlockSummary {
    pub title: Option<String>,
    pub language: String,
    pub copy_text: String,
}

/// Output of a render
#[derive(Debug, Clone, Serialize)]
pub struct RenderedDocument {
    pub html: String,
    pub toc: Vec<TocEntry>,
    pub code_blocks: Vec<CodeBlockSummary>,
    pub has_carousel: bool,
}

/// The render pipeline, configured once and reused for every post
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    table: SubstitutionTable,
    highlight: HighlightConfig,
}

impl Pipeline {
    pub fn new(highlight: HighlightConfig) -> Self {
        Self {
            table: SubstitutionTable::default(),
            highlight,
        }
    }

    /// Use a different substitution table
    pub fn with_table(mut self, table: SubstitutionTable) -> Self {
        self.table = table;
        self
    }

    /// Render a raw post body.
    ///
    /// Any stage failure aborts the render; no partial document is returned.
    pub fn render(&self, body: &str) -> Result<RenderedDocument, RenderError> {
        let ctx = StageContext {
            highlighter: CodeHighlighter::new(
                resolve_theme(&self.highlight.light_theme, DEFAULT_LIGHT_THEME)?,
                resolve_theme(&self.highlight.dark_theme, DEFAULT_DARK_THEME)?,
            ),
        };

        let mut tree = parse(body)?;
        for (name, stage) in STAGES {
            tracing::trace!("Running render stage {}", name);
            tree = stage(tree, &ctx)?;
        }

        let mut doc = RenderedDocument {
            html: self.table.render(&tree),
            toc: Vec::new(),
            code_blocks: Vec::new(),
            has_carousel: false,
        };
        collect(&tree, &mut doc);
        Ok(doc)
    }
}

fn collect(node: &Node, doc: &mut RenderedDocument) {
    match node {
        Node::Heading(heading) => {
            if let (2 | 3, Some(id)) = (heading.level, &heading.id) {
                doc.toc.push(TocEntry {
                    id: id.clone(),
                    text: node.text_content().trim().to_string(),
                    level: heading.level,
                });
            }
        }
        Node::CodeBlock(block) => {
            if let Some(code) = &block.annotated {
                doc.code_blocks.push(CodeBlockSummary {
                    title: code.title.clone(),
                    language: code.language.clone(),
                    copy_text: code.copy_text.clone(),
                });
            }
        }
        Node::ImageCarousel(_) => doc.has_carousel = true,
        Node::Table { head, rows, .. } => {
            for child in head.iter().chain(rows) {
                collect(child, doc);
            }
        }
        _ => {
            for child in node.children() {
                collect(child, doc);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(body: &str) -> RenderedDocument {
        Pipeline::default().render(body).unwrap()
    }

    /// Undo the attribute escaping a browser would undo
    fn unescape(s: &str) -> String {
        s.replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&")
    }

    fn data_code(html: &str) -> String {
        let start = html.find("data-code=\"").unwrap() + "data-code=\"".len();
        let end = start + html[start..].find('"').unwrap();
        unescape(&html[start..end])
    }

    #[test]
    fn test_render_basic_markdown() {
        let doc = render("# Hello World\n\nThis is a **test**.");
        assert!(doc.html.contains(r#"<h1 id="hello-world" class="heading heading-1">Hello World"#));
        assert!(doc.html.contains("<p>This is a <strong>test</strong>.</p>"));
        assert!(doc.toc.is_empty());
    }

    #[test]
    fn test_duplicate_headings_get_distinct_ids() {
        let doc = render("## Usage\n\ntext\n\n## Usage\n\n### Details\n");
        let ids: Vec<_> = doc.toc.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["usage", "usage-1", "details"]);
        assert_eq!(doc.toc[2].level, 3);
        assert!(doc.html.contains(r##"data-copy-link="#usage-1""##));
    }

    #[test]
    fn test_render_is_deterministic() {
        let body = "## A\n\n```rust\nfn a() {}\n```\n\n## A\n";
        assert_eq!(render(body).html, render(body).html);
    }

    #[test]
    fn test_titled_code_block_copies_literal_code() {
        let code = "fn main() {\n    println!(\"<Hello> & 'bye'\");\n}\n";
        let body = format!("```rust title=\"main.rs\"\n{}```\n", code);
        let doc = render(&body);

        assert!(doc.html.contains(r#"<span class="code-title">main.rs</span>"#));
        assert!(doc.html.contains(r#"data-title="main.rs""#));
        assert_eq!(data_code(&doc.html), code);
        assert_eq!(
            doc.code_blocks,
            vec![CodeBlockSummary {
                title: Some("main.rs".to_string()),
                language: "rust".to_string(),
                copy_text: code.to_string(),
            }]
        );
    }

    #[test]
    fn test_copy_text_has_no_markup() {
        let doc = render("```js\nconst a = 1; // [!code ++]\n```\n");
        let copied = data_code(&doc.html);
        assert_eq!(copied, "const a = 1;\n");
        assert!(!copied.contains("span"));
        assert!(doc.html.contains("has-diff"));
    }

    #[test]
    fn test_zero_word_range_renders() {
        let doc = render("```js\n// [!code word:count:0]\nlet count = 1;\n```\n");
        assert!(!doc.html.contains("highlighted-word"));
        assert_eq!(doc.code_blocks[0].copy_text, "// [!code word:count:0]\nlet count = 1;\n");
    }

    #[test]
    fn test_wide_image_paragraph() {
        let doc = render("![A mountain|wide](/m.png \"Alps\")\n\n![A mountain](/m.png)\n");
        assert!(!doc.html.contains("<p><figure"));
        assert!(!doc.html.contains("|wide"));
        assert_eq!(doc.html.matches("image-wide").count(), 2);
        assert!(doc.html.contains("<figcaption class=\"figure-caption\">▶ Alps</figcaption>"));
    }

    #[test]
    fn test_table_render() {
        let doc = render("| Name | Value |\n|------|-------|\n| a | 1 |\n");
        assert!(doc.html.contains("<thead"));
        assert!(doc.html.contains("<th class=\"table-header-cell border px-4 py-2\">Name</th>"));
        assert!(doc.html.contains("<td class=\"table-cell border px-4 py-2\">1</td>"));
    }

    #[test]
    fn test_carousel_document() {
        let doc = render("<ImageCarousel images={[{ src: \"/a.png\", alt: \"A\" }]} />\n");
        assert!(doc.has_carousel);
        assert!(doc.html.contains("data-carousel"));
        assert!(!doc.html.contains("image-carousel:"));
    }

    #[test]
    fn test_syntax_error_is_fatal() {
        let err = Pipeline::default()
            .render("# Title\n\n<ImageCarousel images={[\n")
            .unwrap_err();
        assert!(matches!(err, RenderError::Syntax { line: 3, .. }));
        assert!(err.to_string().starts_with("syntax error on line 3"));
    }

    #[test]
    fn test_custom_table() {
        let table = SubstitutionTable {
            link_class: "fancy".to_string(),
            ..Default::default()
        };
        let doc = Pipeline::default()
            .with_table(table)
            .render("See https://example.com\n")
            .unwrap();
        assert!(doc
            .html
            .contains(r#"<a href="https://example.com" class="fancy">https://example.com</a>"#));
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let pipeline = Pipeline::new(HighlightConfig {
            light_theme: "nope".to_string(),
            dark_theme: "also-nope".to_string(),
        });
        assert!(pipeline.render("```rust\nfn a() {}\n```\n").is_ok());
    }
}
