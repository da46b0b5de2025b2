//! Destinations for rendered feed pages.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::opds::FeedPage;

/// Receives each page once, in page order
#[async_trait]
pub trait FeedSink: Send + Sync {
    /// Persist one page. A failure aborts feed generation.
    async fn write_page(&self, page_number: usize, page: &FeedPage) -> Result<()>;
}

/// Writes each page to `<dir>/<base_name>_<page>.json`
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
    base_name: String,
}

impl FileSink {
    /// Create a new file sink
    pub fn new(dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
        }
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a page is written to
    pub fn page_path(&self, page_number: usize) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", self.base_name, page_number))
    }
}

#[async_trait]
impl FeedSink for FileSink {
    async fn write_page(&self, page_number: usize, page: &FeedPage) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create output directory: {}", self.dir.display()))?;

        let path = self.page_path(page_number);
        let json = serde_json::to_string_pretty(page).context("Failed to serialize feed page")?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write feed page: {}", path.display()))?;

        debug!(page = page_number, path = %path.display(), "Wrote feed page");
        Ok(())
    }
}
