//! Built-in site templates using the Tera template engine
//!
//! Page templates, the stylesheet and the client script are embedded
//! directly in the binary.

use anyhow::Result;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::helpers::{format_date_str, DateStyle};

/// Stylesheet and client script, served under `/assets/`
const ASSETS: &[(&str, &str, &str)] = &[
    ("site.css", include_str!("assets/site.css"), "text/css; charset=utf-8"),
    (
        "site.js",
        include_str!("assets/site.js"),
        "text/javascript; charset=utf-8",
    ),
];

/// Look up an embedded asset by file name, returning its body and mime type
pub fn asset(name: &str) -> Option<(&'static str, &'static str)> {
    ASSETS
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, body, mime)| (*body, *mime))
}

/// Names of all embedded assets
pub fn asset_names() -> impl Iterator<Item = &'static str> {
    ASSETS.iter().map(|(n, _, _)| *n)
}

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Rendered post bodies are HTML; templates escape front matter explicitly
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("home.html", include_str!("site/home.html")),
            ("blog.html", include_str!("site/blog.html")),
            ("post.html", include_str!("site/post.html")),
            ("404.html", include_str!("site/404.html")),
        ])?;

        tera.register_filter("truncate_chars", truncate_chars_filter);
        tera.register_filter("date_style", date_style_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };

    if s.chars().count() <= length {
        Ok(tera::Value::String(s))
    } else {
        let truncated: String = s.chars().take(length).collect();
        Ok(tera::Value::String(format!(
            "{}{}",
            truncated.trim_end(),
            omission
        )))
    }
}

/// Tera filter: format a front-matter date string.
///
/// `style` is one of `short`, `long`, `iso`, `compact`, `month`.
/// Unparseable dates yield null so templates can skip them.
fn date_style_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("date_style", "value", String, value);
    let name = match args.get("style") {
        Some(val) => tera::try_get_value!("date_style", "style", String, val),
        None => "short".to_string(),
    };
    let style = DateStyle::from_name(&name)
        .ok_or_else(|| tera::Error::msg(format!("unknown date style `{}`", name)))?;

    Ok(format_date_str(&s, style)
        .map(tera::Value::String)
        .unwrap_or(tera::Value::Null))
}
