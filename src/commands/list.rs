//! List posts

use anyhow::Result;
use serde::Serialize;

use crate::helpers::{format_date, post_url, DateStyle};
use crate::Site;

/// A listing row as printed by `quire list --json`
#[derive(Debug, Serialize)]
struct Row<'a> {
    slug: &'a str,
    title: &'a str,
    date: Option<String>,
    url: String,
    source: String,
}

/// Print the post listing in display order
pub fn run(site: &Site, json: bool) -> Result<()> {
    let repo = site.repository();
    let posts = repo.list_posts()?;

    let rows: Vec<Row> = posts
        .iter()
        .map(|post| Row {
            slug: &post.slug,
            title: &post.title,
            date: post.parsed_date().map(|d| format_date(&d, DateStyle::Iso)),
            url: post_url(&site.config, &post.slug),
            source: post.source.display().to_string(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Posts ({}) in {:?}:", rows.len(), repo.dir());
    for row in rows {
        println!(
            "  {:<10} {} [{}]",
            row.date.as_deref().unwrap_or("undated"),
            row.title,
            row.slug
        );
    }

    Ok(())
}
