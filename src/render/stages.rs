//! Tree transformation stages, applied in order by the pipeline

use lazy_static::lazy_static;
use regex::Regex;

use super::highlight::CodeHighlighter;
use super::slug::Slugger;
use super::tree::Node;
use super::RenderError;

/// Read-only inputs shared by the stages of one render
pub struct StageContext<'a> {
    pub highlighter: CodeHighlighter<'a>,
}

pub type StageFn = fn(Node, &StageContext) -> Result<Node, RenderError>;

/// Stages in the order they run
pub const STAGES: &[(&str, StageFn)] = &[
    ("autolink", autolink),
    ("unwrap_images", unwrap_images),
    ("slug_headings", slug_headings),
    ("highlight_code", highlight_code),
];

lazy_static! {
    static ref URL_RE: Regex = Regex::new(r"(?i)\b(?:https?://|www\.)[^\s<]+").unwrap();
}

/// Turn bare URLs in text into links
pub fn autolink(node: Node, _ctx: &StageContext) -> Result<Node, RenderError> {
    Ok(link_urls(node))
}

fn link_urls(node: Node) -> Node {
    match node {
        // Already linked, or literal
        Node::Link { .. } | Node::CodeBlock(_) | Node::InlineCode(_) => node,
        other => other.map_children(&mut |children| {
            children
                .into_iter()
                .flat_map(|child| match child {
                    Node::Text(text) => split_urls(&text),
                    child => vec![link_urls(child)],
                })
                .collect()
        }),
    }
}

fn split_urls(text: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut last = 0;

    for m in URL_RE.find_iter(text) {
        let url = trim_url(m.as_str());
        if url.is_empty() || !url.contains('.') {
            continue;
        }
        let end = m.start() + url.len();
        if m.start() > last {
            nodes.push(Node::Text(text[last..m.start()].to_string()));
        }
        let href = if url.to_ascii_lowercase().starts_with("www.") {
            format!("http://{}", url)
        } else {
            url.to_string()
        };
        nodes.push(Node::Link {
            url: href,
            title: String::new(),
            children: vec![Node::Text(url.to_string())],
        });
        last = end;
    }

    if last < text.len() {
        nodes.push(Node::Text(text[last..].to_string()));
    }
    nodes
}

/// Drop trailing punctuation and unbalanced closing parentheses
fn trim_url(url: &str) -> &str {
    let mut url = url;
    loop {
        let trimmed = url.trim_end_matches(['.', ',', ':', ';', '!', '?', '*', '_', '~', '"', '\'']);
        let trimmed = if trimmed.ends_with(')')
            && trimmed.matches(')').count() > trimmed.matches('(').count()
        {
            &trimmed[..trimmed.len() - 1]
        } else {
            trimmed
        };
        if trimmed.len() == url.len() {
            return url;
        }
        url = trimmed;
    }
}

/// Lift images out of paragraphs that contain nothing else
pub fn unwrap_images(node: Node, _ctx: &StageContext) -> Result<Node, RenderError> {
    Ok(lift_images(node))
}

fn lift_images(node: Node) -> Node {
    node.map_children(&mut |children| {
        children
            .into_iter()
            .flat_map(|child| match child {
                Node::Paragraph(inner) if is_image_only(&inner) => inner
                    .into_iter()
                    .filter(|n| !is_blank(n))
                    .collect::<Vec<_>>(),
                child => vec![lift_images(child)],
            })
            .collect()
    })
}

fn is_image_only(children: &[Node]) -> bool {
    let mut images = 0;
    for child in children {
        match child {
            Node::Image { .. } => images += 1,
            Node::Link { children, .. }
                if !children.is_empty()
                    && children
                        .iter()
                        .all(|c| matches!(c, Node::Image { .. }) || is_blank(c)) =>
            {
                images += 1
            }
            other if is_blank(other) => {}
            _ => return false,
        }
    }
    images > 0
}

fn is_blank(node: &Node) -> bool {
    match node {
        Node::Text(t) => t.trim().is_empty(),
        Node::SoftBreak | Node::HardBreak => true,
        _ => false,
    }
}

/// Give every heading a unique id
pub fn slug_headings(node: Node, _ctx: &StageContext) -> Result<Node, RenderError> {
    let mut slugger = Slugger::new();
    reserve_explicit_ids(&node, &mut slugger);
    Ok(assign_ids(node, &mut slugger))
}

fn reserve_explicit_ids(node: &Node, slugger: &mut Slugger) {
    if let Node::Heading(heading) = node {
        if let Some(id) = &heading.id {
            slugger.reserve(id);
        }
    }
    for child in node.children() {
        reserve_explicit_ids(child, slugger);
    }
}

fn assign_ids(node: Node, slugger: &mut Slugger) -> Node {
    match node {
        Node::Heading(mut heading) => {
            if heading.id.is_none() {
                let text = Node::Document(heading.children.clone()).text_content();
                heading.id = Some(slugger.slug(&text));
            }
            Node::Heading(heading)
        }
        other => other.map_children(&mut |children| {
            children
                .into_iter()
                .map(|child| assign_ids(child, slugger))
                .collect()
        }),
    }
}

/// Annotate code blocks with highlighting and line notations
pub fn highlight_code(node: Node, ctx: &StageContext) -> Result<Node, RenderError> {
    let mut error = None;
    let node = annotate_blocks(node, ctx, &mut error);
    match error {
        Some(e) => Err(e),
        None => Ok(node),
    }
}

fn annotate_blocks(node: Node, ctx: &StageContext, error: &mut Option<RenderError>) -> Node {
    match node {
        Node::CodeBlock(mut block) => {
            if error.is_none() {
                match ctx.highlighter.annotate(&block.info, &block.code) {
                    Ok(annotated) => block.annotated = Some(annotated),
                    Err(e) => *error = Some(e),
                }
            }
            Node::CodeBlock(block)
        }
        other => other.map_children(&mut |children| {
            children
                .into_iter()
                .map(|child| annotate_blocks(child, ctx, error))
                .collect()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::highlight::{resolve_theme, DEFAULT_DARK_THEME, DEFAULT_LIGHT_THEME};
    use crate::render::parse::parse;

    fn ctx() -> StageContext<'static> {
        StageContext {
            highlighter: CodeHighlighter::new(
                resolve_theme(DEFAULT_LIGHT_THEME, DEFAULT_LIGHT_THEME).unwrap(),
                resolve_theme(DEFAULT_DARK_THEME, DEFAULT_DARK_THEME).unwrap(),
            ),
        }
    }

    fn run(stage: StageFn, source: &str) -> Vec<Node> {
        match stage(parse(source).unwrap(), &ctx()).unwrap() {
            Node::Document(children) => children,
            other => panic!("expected document, got {:?}", other),
        }
    }

    fn heading_ids(nodes: &[Node]) -> Vec<String> {
        nodes
            .iter()
            .filter_map(|n| match n {
                Node::Heading(h) => h.id.clone(),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_stage_order() {
        let names: Vec<_> = STAGES.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec!["autolink", "unwrap_images", "slug_headings", "highlight_code"]
        );
    }

    #[test]
    fn test_autolink_bare_urls() {
        let nodes = run(autolink, "Visit https://example.com/docs. Or www.rust-lang.org!\n");
        let Node::Paragraph(children) = &nodes[0] else {
            panic!("expected paragraph");
        };
        let links: Vec<_> = children
            .iter()
            .filter_map(|n| match n {
                Node::Link { url, .. } => Some(url.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(links, vec!["https://example.com/docs", "http://www.rust-lang.org"]);
        assert_eq!(nodes[0].text_content(), "Visit https://example.com/docs. Or www.rust-lang.org!");
    }

    #[test]
    fn test_autolink_skips_links_and_code() {
        let nodes = run(
            autolink,
            "[https://a.com](https://a.com) and `https://b.com`\n\n```\nhttps://c.com\n```\n",
        );
        let Node::Paragraph(children) = &nodes[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(
            children.iter().filter(|n| matches!(n, Node::Link { .. })).count(),
            1
        );
        assert!(matches!(&nodes[1], Node::CodeBlock(_)));
    }

    #[test]
    fn test_trim_url_parentheses() {
        assert_eq!(trim_url("https://en.wikipedia.org/wiki/Rust_(language))"), "https://en.wikipedia.org/wiki/Rust_(language)");
        assert_eq!(trim_url("https://a.com/x)."), "https://a.com/x");
    }

    #[test]
    fn test_unwrap_image_paragraphs() {
        let nodes = run(
            unwrap_images,
            "![one](/1.png)\n\n[![two](/2.png)](/big.png)\n\nText ![three](/3.png)\n",
        );
        assert!(matches!(&nodes[0], Node::Image { .. }));
        assert!(matches!(&nodes[1], Node::Link { .. }));
        assert!(matches!(&nodes[2], Node::Paragraph(_)));
    }

    #[test]
    fn test_unwrap_inside_blockquote() {
        let nodes = run(unwrap_images, "> ![q](/q.png)\n");
        let Node::BlockQuote(children) = &nodes[0] else {
            panic!("expected blockquote");
        };
        assert!(matches!(&children[0], Node::Image { .. }));
    }

    #[test]
    fn test_heading_ids_are_unique_and_deterministic() {
        let source = "## Setup\n\n## Setup\n\n### Notes {#setup-1}\n\n## Setup\n";
        let first = heading_ids(&run(slug_headings, source));
        let second = heading_ids(&run(slug_headings, source));
        assert_eq!(first, vec!["setup", "setup-2", "setup-1", "setup-3"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_highlight_annotates_every_block() {
        let nodes = run(highlight_code, "```rust\nfn a() {}\n```\n\n> ```\n> plain\n> ```\n");
        let Node::CodeBlock(block) = &nodes[0] else {
            panic!("expected code block");
        };
        assert_eq!(block.annotated.as_ref().map(|a| a.language.as_str()), Some("rust"));

        let Node::BlockQuote(inner) = &nodes[1] else {
            panic!("expected blockquote");
        };
        assert!(matches!(&inner[0], Node::CodeBlock(b) if b.annotated.is_some()));
    }
}
