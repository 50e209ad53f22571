//! The incremental crawl over root → state → region pages.
//!
//! Only the root index fetch can abort a crawl. Every other failure (a bad
//! cell, a failed page fetch, a write error) is recorded in the
//! [`CrawlReport`] and the walk moves on to the next sibling.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::ScrapeError;
use crate::cell::{CellEntry, CellOutcome, parse_cells};
use crate::fetch::{PageSource, join_url};
use crate::freshness::is_stale;
use crate::progress::{ProgressCallback, null_progress};
use crate::store::{LocalStore, filename_for};

/// A remote page and how to find its cached copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    /// Path relative to the site's base URL.
    pub remote_path: String,
    /// Glob matched against cached filenames to compute freshness.
    pub local_filename_pattern: String,
    /// Update date advertised by the parent page.
    pub remote_last_modified: NaiveDate,
}

impl CrawlTarget {
    /// A state listed on the root index (`CA/Airfields_CA.htm`).
    ///
    /// The pattern also covers the state's regional pages
    /// (`Airfields_CA*.htm`), so a state counts as fresh when any of its
    /// pages is.
    #[must_use]
    pub fn state(entry: &CellEntry) -> Self {
        let filename = filename_for(&entry.link);
        let pattern = filename.strip_suffix(".htm").map_or_else(
            || filename.to_owned(),
            |stem| format!("{stem}*.htm"),
        );
        Self {
            remote_path: entry.link.clone(),
            local_filename_pattern: pattern,
            remote_last_modified: entry.last_modified,
        }
    }

    /// A region listed on a state page; `state_dir` is the directory part of
    /// the state's own link.
    #[must_use]
    pub fn region(state_dir: &str, entry: &CellEntry) -> Self {
        let remote_path = if state_dir.is_empty() {
            entry.link.clone()
        } else {
            format!("{state_dir}/{}", entry.link)
        };
        Self {
            local_filename_pattern: filename_for(&entry.link).to_owned(),
            remote_path,
            remote_last_modified: entry.last_modified,
        }
    }

    /// Filename the page is stored under.
    #[must_use]
    pub fn filename(&self) -> &str {
        filename_for(&self.remote_path)
    }

    /// Directory part of the remote path (`CA` for `CA/Airfields_CA.htm`).
    #[must_use]
    pub fn directory(&self) -> &str {
        self.remote_path
            .rsplit_once('/')
            .map_or("", |(dir, _)| dir)
    }
}

/// Level of the hierarchy a cell or page belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlLevel {
    Root,
    State,
    Region,
}

/// A cell that was passed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCell {
    pub level: CrawlLevel,
    /// Link in the cell, if any.
    pub link: Option<String>,
    pub reason: String,
}

/// A page that could not be fetched or stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub url: String,
    pub error: String,
}

/// Everything a crawl did, returned instead of kept in shared state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Pages written to the cache, in crawl order.
    pub written: Vec<PathBuf>,
    /// Targets whose cached copy was already current.
    pub up_to_date: usize,
    pub skipped: Vec<SkippedCell>,
    pub failures: Vec<FetchFailure>,
    /// Bytes downloaded, including index pages.
    pub bytes_downloaded: u64,
}

impl CrawlReport {
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn megabytes(&self) -> f64 {
        self.bytes_downloaded as f64 / 1_048_576.0
    }
}

/// Walks the site and refreshes stale pages in a [`LocalStore`].
pub struct Crawler<'a, S: PageSource> {
    base_url: String,
    source: &'a S,
    store: &'a LocalStore,
    progress: Arc<dyn ProgressCallback>,
}

impl<'a, S: PageSource> Crawler<'a, S> {
    #[must_use]
    pub fn new(base_url: &str, source: &'a S, store: &'a LocalStore) -> Self {
        Self {
            base_url: base_url.to_owned(),
            source,
            store,
            progress: null_progress(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Runs one full crawl.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] only if the root index cannot be fetched.
    pub async fn crawl(&self) -> Result<CrawlReport, ScrapeError> {
        let mut report = CrawlReport::default();

        log::info!("Fetching index {}", self.base_url);
        let index = self.source.fetch_page(&self.base_url).await?;
        report.bytes_downloaded += index.len() as u64;

        let cells = parse_cells(&String::from_utf8_lossy(&index));
        let states: Vec<CrawlTarget> = cells
            .into_iter()
            .filter_map(|cell| match cell {
                CellOutcome::Entry(entry) => Some(CrawlTarget::state(&entry)),
                CellOutcome::NoLink => {
                    log::debug!("Index cell has no link, skipping");
                    report.skipped.push(SkippedCell {
                        level: CrawlLevel::Root,
                        link: None,
                        reason: "no link".to_owned(),
                    });
                    None
                }
                CellOutcome::NoDate { link, reason } => {
                    log::warn!("Index cell {link} has no usable date, skipping: {reason}");
                    report.skipped.push(SkippedCell {
                        level: CrawlLevel::Root,
                        link: Some(link),
                        reason,
                    });
                    None
                }
            })
            .collect();

        log::info!("Index lists {} state page(s)", states.len());
        self.progress.set_total(states.len() as u64);

        for state in &states {
            self.progress.set_message(state.remote_path.clone());
            self.visit_state(state, &mut report).await;
            self.progress.inc(1);
        }

        let mb = report.megabytes();
        self.progress.finish(format!("Crawl complete: {mb:.2} MB"));
        log::info!(
            "Crawl complete: {} page(s) written, {} up to date, {} skipped, {} failed",
            report.written.len(),
            report.up_to_date,
            report.skipped.len(),
            report.failures.len()
        );
        log::info!(
            "Downloaded {mb:.2} MB, please donate at {} to help with bandwidth costs!",
            self.base_url
        );

        Ok(report)
    }

    async fn visit_state(&self, state: &CrawlTarget, report: &mut CrawlReport) {
        let Some(body) = self.fetch_if_stale(state, report).await else {
            return;
        };

        let cells = parse_cells(&String::from_utf8_lossy(&body));
        if !cells.iter().any(CellOutcome::has_link) {
            log::info!("{} has no regional pages, storing as leaf", state.remote_path);
            self.persist(state, &body, report).await;
            return;
        }

        for cell in cells {
            match cell {
                CellOutcome::Entry(entry) => {
                    let region = CrawlTarget::region(state.directory(), &entry);
                    if let Some(body) = self.fetch_if_stale(&region, report).await {
                        self.persist(&region, &body, report).await;
                    }
                }
                CellOutcome::NoLink => {
                    log::debug!("No link in this cell of {}, skipping", state.remote_path);
                }
                CellOutcome::NoDate { link, reason } => {
                    log::warn!("Region cell {link} has no usable date, skipping: {reason}");
                    report.skipped.push(SkippedCell {
                        level: CrawlLevel::Region,
                        link: Some(link),
                        reason,
                    });
                }
            }
        }
    }

    /// Fetches `target` if its cache is stale. `None` means up to date or
    /// failed (recorded in `report`).
    async fn fetch_if_stale(
        &self,
        target: &CrawlTarget,
        report: &mut CrawlReport,
    ) -> Option<Vec<u8>> {
        let local = match self.store.freshness(&target.local_filename_pattern) {
            Ok(date) => date,
            Err(e) => {
                log::warn!("Cannot check cache for {}: {e}", target.remote_path);
                report.failures.push(FetchFailure {
                    url: target.remote_path.clone(),
                    error: e.to_string(),
                });
                return None;
            }
        };

        log::info!(
            "{} last updated {}, local version updated {local}",
            target.remote_path,
            target.remote_last_modified
        );

        if !is_stale(target.remote_last_modified, local) {
            report.up_to_date += 1;
            return None;
        }

        let url = join_url(&self.base_url, &target.remote_path);
        match self.source.fetch_page(&url).await {
            Ok(body) => {
                report.bytes_downloaded += body.len() as u64;
                Some(body)
            }
            Err(e) => {
                log::error!("Failed to fetch {url}: {e}");
                report.failures.push(FetchFailure {
                    url,
                    error: e.to_string(),
                });
                None
            }
        }
    }

    async fn persist(&self, target: &CrawlTarget, body: &[u8], report: &mut CrawlReport) {
        match self.store.write_page(target.filename(), body).await {
            Ok(path) => {
                log::debug!("Wrote {}", path.display());
                report.written.push(path);
            }
            Err(e) => {
                log::error!("Failed to store {}: {e}", target.remote_path);
                report.failures.push(FetchFailure {
                    url: target.remote_path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
}
