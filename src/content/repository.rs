//! Content repository - reads posts from the content directory
//!
//! Every call performs a fresh scan of the directory. Nothing is cached
//! between calls, so edits on disk are visible immediately.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{ContentError, FrontMatter, Post, PostMeta};
use super::post::effective_slug;

/// Two or more files resolving to the same effective slug
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugCollision {
    pub slug: String,
    /// Files claiming the slug, in scan order
    pub files: Vec<PathBuf>,
}

/// Reads posts from a directory of content files
#[derive(Debug, Clone)]
pub struct ContentRepository {
    dir: PathBuf,
    extension: String,
}

impl ContentRepository {
    /// Create a repository over `dir`, recognising files with `extension`
    pub fn new<P: AsRef<Path>>(dir: P, extension: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Directory this repository reads from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List all posts (metadata only), newest first.
    ///
    /// A missing directory is an empty listing, not an error.
    pub fn list_posts(&self) -> Result<Vec<PostMeta>, ContentError> {
        let mut posts = Vec::new();

        for path in self.scan()? {
            let text = read_file(&path)?;
            let (fm, _) = FrontMatter::parse(&text);
            posts.push(PostMeta::from_front_matter(fm, &path));
        }

        sort_newest_first(&mut posts);
        tracing::debug!("Listed {} posts from {:?}", posts.len(), self.dir);

        Ok(posts)
    }

    /// Fetch a single post, body included, by its effective slug.
    ///
    /// Files are checked in scan order and the first match wins.
    pub fn get_post(&self, slug: &str) -> Result<Option<Post>, ContentError> {
        for path in self.scan()? {
            let text = read_file(&path)?;
            let (fm, body) = FrontMatter::parse(&text);

            if effective_slug(&fm, &path) != slug {
                continue;
            }

            let content = body.to_string();
            let meta = PostMeta::from_front_matter(fm, &path);
            tracing::debug!("Resolved slug {:?} to {:?}", slug, path);
            return Ok(Some(Post { meta, content }));
        }

        Ok(None)
    }

    /// Find effective slugs claimed by more than one file
    pub fn duplicate_slugs(&self) -> Result<Vec<SlugCollision>, ContentError> {
        let mut order: Vec<String> = Vec::new();
        let mut claims: HashMap<String, Vec<PathBuf>> = HashMap::new();

        for path in self.scan()? {
            let text = read_file(&path)?;
            let (fm, _) = FrontMatter::parse(&text);
            let slug = effective_slug(&fm, &path);
            let files = claims.entry(slug.clone()).or_default();
            if files.is_empty() {
                order.push(slug);
            }
            files.push(path);
        }

        Ok(order
            .into_iter()
            .filter_map(|slug| {
                let files = claims.remove(&slug)?;
                (files.len() > 1).then_some(SlugCollision { slug, files })
            })
            .collect())
    }

    /// Content files in scan order (lexicographic by file name)
    fn scan(&self) -> Result<Vec<PathBuf>, ContentError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.dir).to_path_buf();
                ContentError::Io {
                    path,
                    source: e.into_io_error().unwrap_or_else(|| {
                        io::Error::new(io::ErrorKind::Other, "filesystem loop")
                    }),
                }
            })?;

            let path = entry.path();
            if entry.file_type().is_file() && self.is_content_file(path) {
                files.push(path.to_path_buf());
            }
        }

        Ok(files)
    }

    fn is_content_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e == self.extension)
            .unwrap_or(false)
    }
}

fn read_file(path: &Path) -> Result<String, ContentError> {
    fs::read_to_string(path).map_err(|source| ContentError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Sort posts newest first without moving undated posts.
///
/// A post without a usable date never trades places with anything, so it
/// acts as a fixed barrier: only the runs of dated posts between barriers
/// are sorted (stably) among themselves.
pub fn sort_newest_first(posts: &mut [PostMeta]) {
    let keys: Vec<_> = posts.iter().map(PostMeta::parsed_date).collect();

    let mut start = 0;
    while start < posts.len() {
        if keys[start].is_none() {
            start += 1;
            continue;
        }
        let mut end = start;
        while end < posts.len() && keys[end].is_some() {
            end += 1;
        }

        let mut run: Vec<_> = posts[start..end]
            .iter()
            .cloned()
            .zip(keys[start..end].iter().copied())
            .collect();
        run.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(Ordering::Equal));
        for (slot, (post, _)) in posts[start..end].iter_mut().zip(run) {
            *slot = post;
        }

        start = end;
    }
}
