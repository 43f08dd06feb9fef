//! Replay source for recorded page snapshots
//!
//! Snapshots are indexed by scroll count: snapshot `n` is what the page looked
//! like after `n` scroll actions. Scrolling past the last recorded snapshot
//! keeps returning the last one, which is how a page with no more content
//! behaves.

use crate::accessor::html::HtmlSource;
use crate::accessor::traits::{AccessorError, AccessorResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

/// [`HtmlSource`] that replays recorded HTML snapshots
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    pages: HashMap<String, Vec<String>>,
    fallback: Vec<String>,
    renders: u64,
}

impl ReplaySource {
    /// Creates a source that serves the same snapshots for every URL
    pub fn new(snapshots: Vec<String>) -> Self {
        Self {
            pages: HashMap::new(),
            fallback: snapshots,
            renders: 0,
        }
    }

    /// Registers snapshots for one exact URL
    pub fn with_page(mut self, url: impl Into<String>, snapshots: Vec<String>) -> Self {
        self.pages.insert(url.into(), snapshots);
        self
    }

    /// Loads every `*.html` file of a directory, in file name order, as
    /// fallback snapshots
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory holding `0000.html`, `0001.html`, ...
    ///
    /// # Returns
    ///
    /// * `Ok(ReplaySource)` - Source serving the loaded snapshots
    /// * `Err(AccessorError)` - The directory could not be read or held no snapshots
    pub fn from_dir(dir: &Path) -> AccessorResult<Self> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("html") {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(AccessorError::Fixture(format!(
                "no *.html snapshots in {}",
                dir.display()
            )));
        }

        let snapshots = files
            .iter()
            .map(std::fs::read_to_string)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            "Loaded {} replay snapshots from {}",
            snapshots.len(),
            dir.display()
        );
        Ok(Self::new(snapshots))
    }

    /// Number of renders served so far
    pub fn renders(&self) -> u64 {
        self.renders
    }
}

#[async_trait]
impl HtmlSource for ReplaySource {
    async fn render(&mut self, url: &str, scrolls: u32) -> AccessorResult<String> {
        let snapshots = self.pages.get(url).unwrap_or(&self.fallback);
        let last = snapshots.len().checked_sub(1).ok_or_else(|| {
            AccessorError::Fixture(format!("no recorded snapshots for {}", url))
        })?;

        self.renders += 1;
        Ok(snapshots[(scrolls as usize).min(last)].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_scrolls_clamp_to_last_snapshot() {
        let mut source = ReplaySource::new(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(source.render("u", 0).await.unwrap(), "a");
        assert_eq!(source.render("u", 1).await.unwrap(), "b");
        assert_eq!(source.render("u", 7).await.unwrap(), "b");
        assert_eq!(source.renders(), 3);
    }

    #[tokio::test]
    async fn test_per_url_pages() {
        let mut source = ReplaySource::new(vec!["fallback".to_string()])
            .with_page("https://x.com/alice/followers", vec!["followers".to_string()]);

        assert_eq!(
            source
                .render("https://x.com/alice/followers", 0)
                .await
                .unwrap(),
            "followers"
        );
        assert_eq!(
            source.render("https://x.com/other", 0).await.unwrap(),
            "fallback"
        );
    }

    #[tokio::test]
    async fn test_missing_snapshots_is_fixture_error() {
        let mut source = ReplaySource::default();
        let err = source.render("https://x.com", 0).await.unwrap_err();
        assert!(matches!(err, AccessorError::Fixture(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_from_dir_sorts_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("0001.html"), "second").unwrap();
        std::fs::write(dir.path().join("0000.html"), "first").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = ReplaySource::from_dir(dir.path()).unwrap();
        assert_eq!(source.fallback, vec!["first", "second"]);
    }

    #[test]
    fn test_from_empty_dir_fails() {
        let dir = TempDir::new().unwrap();
        assert!(ReplaySource::from_dir(dir.path()).is_err());
    }
}
