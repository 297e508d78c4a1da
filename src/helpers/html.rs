//! HTML helper functions

use super::url::url_for;
use crate::config::SiteConfig;

/// Generate a CSS link tag for a bundled asset
///
/// # Examples
/// ```ignore
/// css(&config, "site") // -> <link rel="stylesheet" href="/assets/site.css">
/// ```
pub fn css(config: &SiteConfig, name: &str) -> String {
    let name = name.trim_end_matches(".css");
    format!(
        r#"<link rel="stylesheet" href="{}">"#,
        url_for(config, &format!("assets/{}.css", name))
    )
}

/// Generate a deferred script tag for a bundled asset
pub fn js(config: &SiteConfig, name: &str) -> String {
    let name = name.trim_end_matches(".js");
    format!(
        r#"<script src="{}" defer></script>"#,
        url_for(config, &format!("assets/{}.js", name))
    )
}

/// Generate Open Graph meta tags
pub fn open_graph(
    title: &str,
    description: &str,
    url: &str,
    image: Option<&str>,
    site_name: &str,
) -> String {
    let mut tags = vec![
        format!(r#"<meta property="og:type" content="article">"#),
        format!(
            r#"<meta property="og:title" content="{}">"#,
            html_escape(title)
        ),
        format!(r#"<meta property="og:url" content="{}">"#, html_escape(url)),
        format!(
            r#"<meta property="og:site_name" content="{}">"#,
            html_escape(site_name)
        ),
    ];

    if !description.is_empty() {
        tags.push(format!(
            r#"<meta property="og:description" content="{}">"#,
            html_escape(description)
        ));
    }

    if let Some(img) = image {
        tags.push(format!(
            r#"<meta property="og:image" content="{}">"#,
            html_escape(img)
        ));
    }

    tags.join("\n")
}

/// Generate meta generator tag
pub fn meta_generator() -> String {
    format!(
        r#"<meta name="generator" content="quire {}">"#,
        env!("CARGO_PKG_VERSION")
    )
}

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_tags() {
        let config = SiteConfig::default();
        assert_eq!(
            css(&config, "site.css"),
            r#"<link rel="stylesheet" href="/assets/site.css">"#
        );
        assert_eq!(js(&config, "site"), r#"<script src="/assets/site.js" defer></script>"#);
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_open_graph() {
        let tags = open_graph("A <b>", "", "https://x.dev/blog/a", Some("/a.png"), "x");
        assert!(tags.contains(r#"content="A &lt;b&gt;""#));
        assert!(tags.contains("og:image"));
        assert!(!tags.contains("og:description"));
    }
}
