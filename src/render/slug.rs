//! Heading anchor slugs

use std::collections::{HashMap, HashSet};

/// Generates unique heading ids within one document.
///
/// Follows GitHub's anchor rules: lowercase, strip punctuation, spaces to
/// hyphens, and `-1`, `-2`, ... suffixes for repeats.
#[derive(Debug, Default)]
pub struct Slugger {
    occurrences: HashMap<String, usize>,
    reserved: HashSet<String>,
}

impl Slugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an id as taken without counting it as a generated slug
    pub fn reserve(&mut self, id: &str) {
        self.reserved.insert(id.to_string());
    }

    /// Slug for `text`, unique among everything this slugger has seen
    pub fn slug(&mut self, text: &str) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base = "section".to_string();
        }

        let mut slug = base.clone();
        while self.is_taken(&slug) {
            let count = self.occurrences.entry(base.clone()).or_insert(0);
            *count += 1;
            slug = format!("{}-{}", base, count);
        }
        self.occurrences.insert(slug.clone(), 0);
        slug
    }

    fn is_taken(&self, slug: &str) -> bool {
        self.occurrences.contains_key(slug) || self.reserved.contains(slug)
    }
}

/// Lowercase `text`, keep letters, digits, `-`, `_` and spaces, then turn
/// each space into a hyphen.
pub fn slugify(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_' || *c == ' ')
        .map(|c| if c == ' ' { '-' } else { c })
        .collect()
}
