//! File-backed cache of the last known-good query string.
//!
//! The scrape that discovers the token is fragile (the portal sometimes
//! serves its landing page without the redirect script), but the token
//! itself rarely changes, so a stale value is usually still accepted.
//! There is only ever one writer (the monitor's worker task), so no
//! locking is needed.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct QueryStringCache {
    path: PathBuf,
}

impl QueryStringCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Persist a token, creating the containing directory if needed.
    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create cache directory {dir:?}"))?;
            }
        }
        fs::write(&self.path, token)
            .with_context(|| format!("Failed to write query string cache {:?}", self.path))
    }

    /// A missing or unreadable cache is not an error, just an empty
    /// fallback tier.
    pub fn load(&self) -> String {
        if !self.path.exists() {
            return String::new();
        }
        match fs::read_to_string(&self.path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                tracing::warn!("Failed to read query string cache {:?}: {}", self.path, e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = QueryStringCache::new(dir.path().join("query_string.txt"));
        cache.save("abc123").unwrap();
        assert_eq!(cache.load(), "abc123");
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = QueryStringCache::new(dir.path().join("nope.txt"));
        assert_eq!(cache.load(), "");
    }

    #[test]
    fn save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cache = QueryStringCache::new(dir.path().join("nested").join("qs.txt"));
        cache.save("token").unwrap();
        assert_eq!(cache.load(), "token");
    }

    #[test]
    fn load_trims_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qs.txt");
        std::fs::write(&path, "  token \n").unwrap();
        assert_eq!(QueryStringCache::new(path).load(), "token");
    }
}
