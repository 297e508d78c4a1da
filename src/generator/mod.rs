//! Generator module - writes the whole site as static HTML files

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::content::ContentError;
use crate::templates;
use crate::Site;

/// What a generation run wrote
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GenerateStats {
    pub posts: usize,
    pub skipped: usize,
    pub static_files: usize,
}

/// Static site generator
pub struct Generator {
    site: Site,
}

impl Generator {
    pub fn new(site: &Site) -> Self {
        Self { site: site.clone() }
    }

    /// Generate the entire site into the public directory.
    ///
    /// Fails before writing anything when two posts claim the same slug.
    pub fn generate(&self) -> Result<GenerateStats> {
        let repo = self.site.repository();
        if let Some(collision) = repo.duplicate_slugs()?.into_iter().next() {
            return Err(ContentError::DuplicateSlug {
                slug: collision.slug,
                files: collision.files,
            }
            .into());
        }

        let public_dir = &self.site.public_dir;
        fs::create_dir_all(public_dir)?;

        let mut stats = GenerateStats::default();

        write_page(&public_dir.join("index.html"), &self.site.render_home()?)?;

        let blog_dir = public_dir.join(self.site.config.blog_dir.trim_matches('/'));
        write_page(&blog_dir.join("index.html"), &self.site.render_index()?)?;

        for meta in repo.list_posts()? {
            let Some(dir) = post_dir(&blog_dir, &meta.slug) else {
                tracing::warn!(
                    "Skipping {:?}: slug {:?} cannot be used as a path",
                    meta.source,
                    meta.slug
                );
                stats.skipped += 1;
                continue;
            };
            let Some(post) = repo.get_post(&meta.slug)? else {
                continue;
            };
            let html = self.site.render_loaded_post(&post)?;
            write_page(&dir.join("index.html"), &html)?;
            tracing::debug!("Generated post: {:?}", dir);
            stats.posts += 1;
        }

        write_page(
            &public_dir.join("404.html"),
            &self.site.render_not_found(None)?,
        )?;

        self.write_assets()?;
        stats.static_files = self.copy_static_files()?;

        Ok(stats)
    }

    /// Write the embedded stylesheet and script
    fn write_assets(&self) -> Result<()> {
        let assets_dir = self.site.public_dir.join("assets");
        fs::create_dir_all(&assets_dir)?;
        for name in templates::asset_names() {
            if let Some((body, _)) = templates::asset(name) {
                fs::write(assets_dir.join(name), body)?;
            }
        }
        Ok(())
    }

    /// Copy the static directory (images, etc.) into the public directory
    fn copy_static_files(&self) -> Result<usize> {
        let static_dir = &self.site.static_dir;
        if !static_dir.is_dir() {
            return Ok(0);
        }

        let mut copied = 0;
        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(static_dir)?;
            let dest = self.site.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
            copied += 1;
        }

        Ok(copied)
    }
}

/// Output directory for a post, `None` for slugs that would escape the blog directory
fn post_dir(blog_dir: &Path, slug: &str) -> Option<PathBuf> {
    if slug.is_empty() || slug == "." || slug == ".." || slug.contains(['/', '\\']) {
        return None;
    }
    Some(blog_dir.join(slug))
}

fn write_page(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
    }
    fs::write(path, html).map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site(posts: &[(&str, &str)]) -> (TempDir, Site) {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content/blog");
        fs::create_dir_all(&content).unwrap();
        for (name, body) in posts {
            fs::write(content.join(name), body).unwrap();
        }
        let site = Site::new(dir.path()).unwrap();
        (dir, site)
    }

    #[test]
    fn test_generate_layout() {
        let (dir, site) = site(&[
            ("hello.mdx", "---\ntitle: Hello\ndate: 2024-06-01\n---\n# Hi\n"),
            ("other.mdx", "---\ntitle: Other\nslug: renamed\n---\ntext\n"),
        ]);
        fs::create_dir_all(dir.path().join("static/images")).unwrap();
        fs::write(dir.path().join("static/images/a.png"), b"png").unwrap();

        let stats = Generator::new(&site).generate().unwrap();
        assert_eq!(stats.posts, 2);
        assert_eq!(stats.static_files, 1);

        let public = dir.path().join("public");
        assert!(public.join("index.html").is_file());
        assert!(public.join("blog/index.html").is_file());
        assert!(public.join("blog/hello/index.html").is_file());
        assert!(public.join("blog/renamed/index.html").is_file());
        assert!(!public.join("blog/other").exists());
        assert!(public.join("404.html").is_file());
        assert!(public.join("assets/site.css").is_file());
        assert!(public.join("assets/site.js").is_file());
        assert!(public.join("images/a.png").is_file());
    }

    #[test]
    fn test_generate_empty_site() {
        let (dir, site) = site(&[]);
        let stats = Generator::new(&site).generate().unwrap();
        assert_eq!(stats.posts, 0);
        let index = fs::read_to_string(dir.path().join("public/blog/index.html")).unwrap();
        assert!(index.contains("No posts yet."));
    }

    #[test]
    fn test_duplicate_slugs_fail() {
        let (dir, site) = site(&[
            ("a.mdx", "---\ntitle: A\nslug: same\n---\n"),
            ("same.mdx", "---\ntitle: B\n---\n"),
        ]);
        let err = Generator::new(&site).generate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ContentError>(),
            Some(ContentError::DuplicateSlug { slug, .. }) if slug == "same"
        ));
        assert!(!dir.path().join("public").exists());
    }

    #[test]
    fn test_unsafe_slug_skipped() {
        let (dir, site) = site(&[("a.mdx", "---\ntitle: A\nslug: ../escape\n---\n")]);
        let stats = Generator::new(&site).generate().unwrap();
        assert_eq!(stats.skipped, 1);
        assert!(!dir.path().join("public/escape").exists());
    }

    #[test]
    fn test_post_dir() {
        let base = Path::new("/out/blog");
        assert_eq!(post_dir(base, "hello"), Some(base.join("hello")));
        assert_eq!(post_dir(base, ".."), None);
        assert_eq!(post_dir(base, "a/b"), None);
        assert_eq!(post_dir(base, ""), None);
    }
}
