//! The on-disk list of watched calendar URLs.

use std::path::Path;

use crate::error::IcsWatchResult;

/// Newline-delimited calendar URLs.
pub struct UrlList;

impl UrlList {
    /// Read one URL per line. Blank lines and `#` comments are skipped; a
    /// missing file is an empty list.
    pub fn load(path: &Path) -> IcsWatchResult<Vec<String>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(path)?;

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect())
    }

    pub fn save(path: &Path, urls: &[String]) -> IcsWatchResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut content = urls.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}
