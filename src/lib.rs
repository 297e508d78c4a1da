//! quire: a personal blog built from a directory of MDX posts
//!
//! Posts are read by the [`content::ContentRepository`], rendered to HTML
//! by the [`render::Pipeline`] and laid out by embedded Tera templates,
//! either into static files or served on demand.

pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod render;
pub mod server;
pub mod templates;
pub mod views;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tera::Context;

use crate::content::{ContentRepository, Post};
use crate::helpers::{
    blog_url, css, full_url_for, js, meta_generator, open_graph, post_url, url_for,
};
use crate::render::Pipeline;
use crate::templates::TemplateRenderer;
use crate::views::BlogIndex;

/// The site: configuration, resolved directories and templates
#[derive(Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Directory holding the posts
    pub content_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Files copied verbatim into the output
    pub static_dir: PathBuf,
    /// Inject the live reload client into every page
    pub live_reload: bool,
    templates: Arc<TemplateRenderer>,
}

impl Site {
    /// Create a new site from a directory, reading `_config.yml` if present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        Self::with_config(base_dir, config)
    }

    /// Create a site with an explicit configuration
    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Result<Self> {
        let content_dir = base_dir.join(&config.content_dir);
        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);

        Ok(Self {
            config,
            base_dir,
            content_dir,
            public_dir,
            static_dir,
            live_reload: false,
            templates: Arc::new(TemplateRenderer::new()?),
        })
    }

    pub fn repository(&self) -> ContentRepository {
        ContentRepository::new(&self.content_dir, &self.config.extension)
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.config.highlight.clone())
    }

    /// Render the home page
    pub fn render_home(&self) -> Result<String> {
        let context = self.base_context(
            &self.config.title,
            &self.config.description,
            &url_for(&self.config, ""),
            None,
        );
        self.templates.render("home.html", &context)
    }

    /// Render the blog index with both the rolodex and list views
    pub fn render_index(&self) -> Result<String> {
        let posts = self.repository().list_posts()?;
        let index = BlogIndex::build(&self.config, &posts);
        tracing::debug!("Rendering index with {} posts", index.posts.len());

        let mut context = self.base_context(
            &self.config.title,
            &self.config.description,
            &blog_url(&self.config),
            None,
        );
        context.insert("index", &index);
        context.insert("has_posts", &!index.is_empty());
        context.insert("show_timeline", &!index.timeline.is_empty());
        context.insert("timeline_json", &timeline_json(&index)?);
        self.templates.render("blog.html", &context)
    }

    /// Render one post page, `None` when no post has this slug
    pub fn render_post(&self, slug: &str) -> Result<Option<String>> {
        let Some(post) = self.repository().get_post(slug)? else {
            return Ok(None);
        };
        self.render_loaded_post(&post).map(Some)
    }

    /// Render a post that has already been read
    pub fn render_loaded_post(&self, post: &Post) -> Result<String> {
        let document = self
            .pipeline()
            .render(&post.content)
            .map_err(|e| anyhow::anyhow!("Failed to render {:?}: {}", post.source, e))?;

        let description = post.summary().unwrap_or(&self.config.description).to_string();
        let mut context = self.base_context(
            &post.title,
            &description,
            &post_url(&self.config, &post.slug),
            post.image.as_deref(),
        );
        context.insert("post", post);
        context.insert("document", &document);
        self.templates.render("post.html", &context)
    }

    /// Render the not-found page, optionally naming the missing slug
    pub fn render_not_found(&self, slug: Option<&str>) -> Result<String> {
        let mut context = self.base_context(
            &self.config.title,
            &self.config.description,
            &blog_url(&self.config),
            None,
        );
        context.insert("slug", &slug);
        self.templates.render("404.html", &context)
    }

    /// Context shared by every page
    fn base_context(
        &self,
        title: &str,
        description: &str,
        path: &str,
        image: Option<&str>,
    ) -> Context {
        let config = &self.config;
        let head = [
            meta_generator(),
            open_graph(
                title,
                description,
                &full_url_for(config, path),
                image,
                &config.title,
            ),
            css(config, "site"),
            js(config, "site"),
        ]
        .join("\n");

        let mut context = Context::new();
        context.insert("config", config);
        context.insert("nav", &config.nav);
        context.insert("head", &head);
        context.insert("home_url", &url_for(config, ""));
        context.insert("blog_url", &blog_url(config));
        context.insert("description", description);
        context.insert("live_reload", &self.live_reload);
        context
    }
}

/// Timeline data for the client script, safe inside a `<script>` element
fn timeline_json(index: &BlogIndex) -> Result<String> {
    Ok(serde_json::to_string(&index.timeline)?.replace("</", "<\\/"))
}
