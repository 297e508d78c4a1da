//! Initialize a new site

use anyhow::Result;
use std::fs;
use std::path::Path;

const CONFIG: &str = r#"# Site
title: My Blog
description: ''
author: Jane Doe
language: en

# URL
url: http://localhost:4000
root: /
blog_dir: blog

# Directory
content_dir: content/blog
extension: mdx
public_dir: public
static_dir: static

# Home page
home:
  heading: Hey, welcome
  intro:
    - Welcome to my personal website. I write about web development, technology, and other things I find interesting.

# Header links
nav:
  - name: Home
    path: /
  - name: Blog
    path: /blog

# Code highlighting (syntect theme names, see `quire check`)
highlight:
  light_theme: InspiredGitHub
  dark_theme: base16-ocean.dark
"#;

const HELLO_POST: &str = r#"---
title: Hello World
subtitle: The first post
date: DATE
description: A tour of what a post can contain.
---

Welcome! This post lives in `content/blog/hello-world.mdx`.

## Code

```rust title="src/main.rs" showLineNumbers
fn main() {
    println!("hello"); // [!code ++]
}
```

## Images

![A wide picture|wide](/images/placeholder.png "Captions come from the title")
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir.join("content/blog"))?;
    fs::create_dir_all(target_dir.join("static/images"))?;

    write_if_missing(&target_dir.join("_config.yml"), CONFIG)?;

    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    write_if_missing(
        &target_dir.join("content/blog/hello-world.mdx"),
        &HELLO_POST.replace("DATE", &today),
    )?;

    write_if_missing(&target_dir.join(".gitignore"), "public/\n")?;

    Ok(())
}

/// Existing files are left alone so `init` is safe to re-run
fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        tracing::debug!("Keeping existing {:?}", path);
        return Ok(());
    }
    fs::write(path, content)?;
    tracing::info!("Created: {:?}", path);
    Ok(())
}
