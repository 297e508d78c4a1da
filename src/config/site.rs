//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,

    // URL
    pub url: String,
    pub root: String,
    pub blog_dir: String,

    // Directory
    pub content_dir: String,
    pub extension: String,
    pub public_dir: String,
    pub static_dir: String,

    // Pages
    #[serde(default)]
    pub home: HomeConfig,
    #[serde(default)]
    pub nav: Vec<NavItem>,

    // Writing
    #[serde(default)]
    pub highlight: HighlightConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "quire".to_string(),
            description: String::new(),
            author: "Jane Doe".to_string(),
            language: "en".to_string(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),
            blog_dir: "blog".to_string(),

            content_dir: "content/blog".to_string(),
            extension: "mdx".to_string(),
            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            home: HomeConfig::default(),
            nav: vec![
                NavItem {
                    name: "Home".to_string(),
                    path: "/".to_string(),
                },
                NavItem {
                    name: "Blog".to_string(),
                    path: "/blog".to_string(),
                },
            ],

            highlight: HighlightConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }
}

/// Home page copy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeConfig {
    pub heading: String,
    pub intro: Vec<String>,
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            heading: "Hey, welcome".to_string(),
            intro: vec![
                "Welcome to my personal website. I write about web development, technology, and other things I find interesting.".to_string(),
            ],
        }
    }
}

/// Header navigation entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavItem {
    pub name: String,
    pub path: String,
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// syntect theme used for light mode colours
    pub light_theme: String,
    /// syntect theme used for dark mode colours
    pub dark_theme: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            light_theme: "InspiredGitHub".to_string(),
            dark_theme: "base16-ocean.dark".to_string(),
        }
    }
}
