//! Clean the public directory

use anyhow::Result;
use std::fs;

use crate::Site;

/// Remove the generated output
pub fn run(site: &Site) -> Result<()> {
    if site.public_dir.exists() {
        fs::remove_dir_all(&site.public_dir)?;
        tracing::info!("Deleted: {:?}", site.public_dir);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::generate;
    use tempfile::TempDir;

    #[test]
    fn test_clean_after_generate() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();
        generate::run(&site).unwrap();
        assert!(site.public_dir.join("index.html").exists());

        run(&site).unwrap();
        assert!(!site.public_dir.exists());
        // Nothing to clean is not an error
        run(&site).unwrap();
    }
}
