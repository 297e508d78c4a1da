//! Validate the content directory without writing anything

use anyhow::Result;
use std::fmt;
use std::path::PathBuf;

use crate::render::{is_known_language, theme_names};
use crate::Site;

/// A problem found by `quire check`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    /// Several files claim one slug; only the first is reachable
    DuplicateSlug { slug: String, files: Vec<PathBuf> },
    /// The post body fails to render
    RenderFailed { source: PathBuf, message: String },
    /// Missing or unparseable date; the post has no place on the timeline
    Undated { source: PathBuf },
    /// Configured highlight theme that syntect does not ship
    UnknownTheme { name: String },
    /// Code block in a language with no grammar; shown as plain text
    UnknownLanguage {
        source: PathBuf,
        language: String,
        title: Option<String>,
    },
}

impl Issue {
    /// Errors make the check fail; the rest are warnings
    pub fn is_error(&self) -> bool {
        matches!(self, Issue::DuplicateSlug { .. } | Issue::RenderFailed { .. })
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::DuplicateSlug { slug, files } => {
                write!(f, "slug {:?} is claimed by {:?}", slug, files)
            }
            Issue::RenderFailed { source, message } => write!(f, "{:?}: {}", source, message),
            Issue::Undated { source } => write!(f, "{:?} has no usable date", source),
            Issue::UnknownTheme { name } => {
                write!(f, "unknown highlight theme {:?}, using the default", name)
            }
            Issue::UnknownLanguage {
                source,
                language,
                title,
            } => {
                write!(f, "{:?}: no highlighting for {:?}", source, language)?;
                match title {
                    Some(title) => write!(f, " (block {:?})", title),
                    None => Ok(()),
                }
            }
        }
    }
}

/// Collect every issue in the site
pub fn collect(site: &Site) -> Result<Vec<Issue>> {
    let mut issues = Vec::new();

    let known = theme_names();
    let highlight = &site.config.highlight;
    for name in [&highlight.light_theme, &highlight.dark_theme] {
        if !known.contains(&name.as_str()) {
            issues.push(Issue::UnknownTheme { name: name.clone() });
        }
    }

    let repo = site.repository();
    for collision in repo.duplicate_slugs()? {
        issues.push(Issue::DuplicateSlug {
            slug: collision.slug,
            files: collision.files,
        });
    }

    let pipeline = site.pipeline();
    for meta in repo.list_posts()? {
        if meta.parsed_date().is_none() {
            issues.push(Issue::Undated {
                source: meta.source.clone(),
            });
        }

        let Some(post) = repo.get_post(&meta.slug)? else {
            continue;
        };
        match pipeline.render(&post.content) {
            Ok(document) => {
                for block in document.code_blocks {
                    if !is_known_language(&block.language) {
                        issues.push(Issue::UnknownLanguage {
                            source: meta.source.clone(),
                            language: block.language,
                            title: block.title,
                        });
                    }
                }
            }
            Err(e) => issues.push(Issue::RenderFailed {
                source: meta.source.clone(),
                message: e.to_string(),
            }),
        }
    }

    Ok(issues)
}

/// Print every issue; fail when any of them is an error
pub fn run(site: &Site) -> Result<()> {
    let issues = collect(site)?;

    for issue in &issues {
        if issue.is_error() {
            println!("error: {}", issue);
        } else {
            println!("warning: {}", issue);
        }
    }

    let errors = issues.iter().filter(|i| i.is_error()).count();
    if errors > 0 {
        anyhow::bail!("{} error(s) found", errors);
    }

    println!("No errors ({} warning(s))", issues.len());
    Ok(())
}
