//! View models handed to the page templates

mod timeline;

use serde::Serialize;

pub use timeline::{Point, Tick, Timeline};

use crate::config::SiteConfig;
use crate::content::PostMeta;
use crate::helpers::{format_date, post_url, DateStyle};

/// One post as shown in the list view or on a rolodex card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub slug: String,
    pub url: String,
    pub title: String,
    pub subtitle: Option<String>,
    /// Subtitle, else description
    pub summary: Option<String>,
    pub image: Option<String>,
    /// `Jun 1, 2024`
    pub short_date: Option<String>,
    /// `June 1, 2024`
    pub long_date: Option<String>,
    /// `2024-06-01`, for `<time datetime>`
    pub iso_date: Option<String>,
}

impl PostSummary {
    pub fn new(config: &SiteConfig, post: &PostMeta) -> Self {
        let date = post.parsed_date();
        let styled = |style| date.as_ref().map(|d| format_date(d, style));

        Self {
            slug: post.slug.clone(),
            url: post_url(config, &post.slug),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            summary: post.summary().map(str::to_string),
            image: post.image.clone(),
            short_date: styled(DateStyle::Short),
            long_date: styled(DateStyle::Long),
            iso_date: styled(DateStyle::Iso),
        }
    }
}

/// Everything the blog index needs: both views share one listing
#[derive(Debug, Clone, Serialize)]
pub struct BlogIndex {
    pub posts: Vec<PostSummary>,
    pub timeline: Timeline,
}

impl BlogIndex {
    pub fn build(config: &SiteConfig, posts: &[PostMeta]) -> Self {
        Self {
            posts: posts.iter().map(|p| PostSummary::new(config, p)).collect(),
            timeline: Timeline::build(posts),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}
