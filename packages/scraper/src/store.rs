//! The local page cache: a flat directory of mirrored `.htm` files.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tokio::io::AsyncWriteExt as _;

use crate::ScrapeError;
use crate::freshness::local_freshness;

/// Final path segment of a remote link, used as the local filename.
#[must_use]
pub fn filename_for(remote_path: &str) -> &str {
    remote_path
        .rsplit('/')
        .next()
        .unwrap_or(remote_path)
}

/// Directory holding the mirrored pages.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Newest modification date among cached files matching `pattern`.
    ///
    /// # Errors
    ///
    /// See [`local_freshness`].
    pub fn freshness(&self, pattern: &str) -> Result<NaiveDate, ScrapeError> {
        local_freshness(&self.root, pattern)
    }

    /// Writes a page under `filename`, replacing any previous copy.
    ///
    /// The body goes to a hidden temp file first and is renamed into place,
    /// so a crash never leaves a truncated page with a fresh timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Io`] if the directory or file cannot be
    /// written.
    pub async fn write_page(&self, filename: &str, body: &[u8]) -> Result<PathBuf, ScrapeError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ScrapeError::io(&self.root, e))?;

        let dest = self.root.join(filename);
        let temp = self.root.join(format!(".{filename}.part"));

        let mut file = tokio::fs::File::create(&temp)
            .await
            .map_err(|e| ScrapeError::io(&temp, e))?;
        file.write_all(body)
            .await
            .map_err(|e| ScrapeError::io(&temp, e))?;
        file.flush().await.map_err(|e| ScrapeError::io(&temp, e))?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&temp, &dest).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(ScrapeError::io(&dest, e));
        }

        Ok(dest)
    }

    /// Cached `.htm` pages, sorted by filename.
    ///
    /// A missing directory yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Io`] if the directory cannot be listed.
    pub fn cached_pages(&self) -> Result<Vec<PathBuf>, ScrapeError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.root).map_err(|e| ScrapeError::io(&self.root, e))?;
        let mut pages = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ScrapeError::io(&self.root, e))?;
            let path = entry.path();
            let visible = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('.'));
            if visible && path.is_file() && path.extension().is_some_and(|ext| ext == "htm") {
                pages.push(path);
            }
        }
        pages.sort();
        Ok(pages)
    }
}
