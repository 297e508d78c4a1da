//! Generate static files

use anyhow::Result;
use notify::Watcher;
use std::sync::mpsc::channel;
use std::time::Duration;

use crate::generator::{GenerateStats, Generator};
use crate::Site;

/// Generate the static site
pub fn run(site: &Site) -> Result<GenerateStats> {
    let start = std::time::Instant::now();

    let stats = Generator::new(site).generate()?;

    if stats.skipped > 0 {
        tracing::warn!("Skipped {} posts", stats.skipped);
    }
    tracing::info!(
        "Generated {} posts and copied {} static files in {:.2}s",
        stats.posts,
        stats.static_files,
        start.elapsed().as_secs_f64()
    );

    Ok(stats)
}

/// Watch for file changes and regenerate
pub async fn watch(site: &Site) -> Result<()> {
    let (tx, rx) = channel();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })?;

    for dir in [&site.content_dir, &site.static_dir] {
        if dir.exists() {
            watcher.watch(dir, notify::RecursiveMode::Recursive)?;
        }
    }

    let config_path = site.base_dir.join("_config.yml");
    if config_path.exists() {
        watcher.watch(&config_path, notify::RecursiveMode::NonRecursive)?;
    }

    tracing::info!("Watching for changes. Press Ctrl+C to stop.");

    let mut site = site.clone();
    let mut last_rebuild = std::time::Instant::now();

    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                // Debounce: only rebuild if more than 500ms since last rebuild
                if last_rebuild.elapsed() <= Duration::from_millis(500) {
                    continue;
                }

                if event.paths.iter().any(|p| p.ends_with("_config.yml")) {
                    match Site::new(&site.base_dir) {
                        Ok(fresh) => site = fresh,
                        Err(e) => tracing::error!("Keeping previous configuration: {:#}", e),
                    }
                }

                tracing::info!("File changed, regenerating...");
                if let Err(e) = run(&site) {
                    tracing::error!("Generation failed: {:#}", e);
                }
                last_rebuild = std::time::Instant::now();
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}
