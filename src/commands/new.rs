//! Create a new post

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use crate::Site;

/// Create a new post file named after its slug, returning its path
pub fn create_post(site: &Site, title: &str, slug: Option<&str>) -> Result<PathBuf> {
    let now = chrono::Local::now();

    let slug = match slug {
        Some(s) => s.to_string(),
        None => slug::slugify(title),
    };
    if slug.is_empty() {
        anyhow::bail!("Cannot derive a file name from title {:?}; pass --slug", title);
    }

    let file_path = site
        .content_dir
        .join(format!("{}.{}", slug, site.config.extension.trim_start_matches('.')));

    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let existing = site.repository().list_posts()?;
    if let Some(other) = existing.iter().find(|p| p.slug == slug) {
        anyhow::bail!("Slug {:?} is already used by {:?}", slug, other.source);
    }

    let content = format!(
        "---\ntitle: {}\ndate: {}\ndescription: ''\n---\n\n",
        yaml_string(title),
        now.format("%Y-%m-%d")
    );

    fs::create_dir_all(&site.content_dir)?;
    fs::write(&file_path, content)?;

    println!("Created: {:?}", file_path);

    Ok(file_path)
}

/// Quote a scalar for YAML
fn yaml_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_post_is_listed() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();

        let path = create_post(&site, "It's: a Title", None).unwrap();
        assert!(path.ends_with("content/blog/it-s-a-title.mdx"));

        let posts = site.repository().list_posts().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "It's: a Title");
        assert!(posts[0].parsed_date().is_some());
    }

    #[test]
    fn test_explicit_slug_and_collisions() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();

        create_post(&site, "First", Some("custom")).unwrap();
        assert!(create_post(&site, "Again", Some("custom")).is_err());

        fs::write(
            site.content_dir.join("other.mdx"),
            "---\ntitle: Other\nslug: taken\n---\n",
        )
        .unwrap();
        assert!(create_post(&site, "Taken", None).is_err());
    }

    #[test]
    fn test_unsluggable_title() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();
        assert!(create_post(&site, "!!!", None).is_err());
    }
}
