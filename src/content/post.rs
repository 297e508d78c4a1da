//! Post models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::frontmatter::{parse_date, FrontMatter};

/// Metadata of a blog post, as listed on index pages.
///
/// Never carries the body; see [`Post`] for that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMeta {
    /// Effective slug: front-matter override, else the file stem
    pub slug: String,

    /// Display title, falls back to the slug
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,

    /// Raw date string as written in the front-matter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// File the post was read from
    #[serde(skip)]
    pub source: PathBuf,
}

impl PostMeta {
    /// Build metadata from parsed front-matter and the file it came from
    pub fn from_front_matter(fm: FrontMatter, path: &Path) -> Self {
        let slug = effective_slug(&fm, path);
        let title = fm.title().map(str::to_string).unwrap_or_else(|| slug.clone());

        Self {
            slug,
            title,
            subtitle: fm.subtitle,
            date: fm.date,
            description: fm.description,
            image: fm.image,
            source: path.to_path_buf(),
        }
    }

    /// The date as a timestamp, when present and parseable
    pub fn parsed_date(&self) -> Option<NaiveDateTime> {
        self.date.as_deref().and_then(parse_date)
    }

    /// Subtitle, or the description when there is no subtitle
    pub fn summary(&self) -> Option<&str> {
        self.subtitle.as_deref().or(self.description.as_deref())
    }
}

/// A full blog post: metadata plus the raw MDX body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(flatten)]
    pub meta: PostMeta,

    /// Raw body text, without the front-matter block
    pub content: String,
}

impl std::ops::Deref for Post {
    type Target = PostMeta;

    fn deref(&self) -> &PostMeta {
        &self.meta
    }
}

/// Slug a file resolves to: front-matter override, else its file stem
pub fn effective_slug(fm: &FrontMatter, path: &Path) -> String {
    match fm.slug_override() {
        Some(slug) => slug.to_string(),
        None => file_slug(path),
    }
}

/// Slug derived from the file name alone
pub fn file_slug(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
