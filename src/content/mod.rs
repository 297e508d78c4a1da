//! Content module - posts, front-matter, and the content repository

mod frontmatter;
mod post;
pub mod repository;

use std::path::PathBuf;
use thiserror::Error;

pub use frontmatter::{parse_date, FrontMatter};
pub use post::{effective_slug, file_slug, Post, PostMeta};
pub use repository::{ContentRepository, SlugCollision};

/// Errors raised while reading the content store
#[derive(Debug, Error)]
pub enum ContentError {
    /// A file or directory could not be read
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Several files resolve to the same effective slug
    #[error("slug {slug:?} is claimed by {} files: {files:?}", files.len())]
    DuplicateSlug { slug: String, files: Vec<PathBuf> },
}
