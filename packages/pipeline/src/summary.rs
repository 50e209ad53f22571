//! Run summary, written as `summary.json` and logged at the end of a run.

use std::path::{Path, PathBuf};

use airfield_recon_airfield_models::{MatchMode, ReconciliationResult, RecordSet, RecordSource};
use airfield_recon_scraper::crawl::CrawlReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output filename for the summary.
pub const OUTPUT_SUMMARY: &str = "summary.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlSummary {
    pub pages_written: usize,
    pub up_to_date: usize,
    pub skipped_cells: usize,
    pub failed_fetches: usize,
    pub bytes_downloaded: u64,
}

impl From<&CrawlReport> for CrawlSummary {
    fn from(report: &CrawlReport) -> Self {
        Self {
            pages_written: report.written.len(),
            up_to_date: report.up_to_date,
            skipped_cells: report.skipped.len(),
            failed_fetches: report.failures.len(),
            bytes_downloaded: report.bytes_downloaded,
        }
    }
}

/// Parsed and invalid counts for one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCount {
    pub source: RecordSource,
    pub parsed: usize,
    pub invalid: usize,
}

impl From<&RecordSet> for SourceCount {
    fn from(set: &RecordSet) -> Self {
        Self {
            source: set.source,
            parsed: set.valid_count(),
            invalid: set.invalid_count(),
        }
    }
}

/// Counts for one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSummary {
    pub candidates: usize,
    /// Candidates removed by the match mode before the pass.
    pub filtered_out: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub skipped: usize,
    pub skipped_reference: usize,
    pub threshold_km: f64,
}

impl StageSummary {
    #[must_use]
    pub fn new(candidates: usize, filtered_out: usize, result: &ReconciliationResult) -> Self {
        Self {
            candidates,
            filtered_out,
            matched: result.matched_count,
            unmatched: result.unmatched.len(),
            skipped: result.skipped.len(),
            skipped_reference: result.skipped_reference,
            threshold_km: result.threshold_km,
        }
    }
}

/// Everything one pipeline run did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub match_mode: MatchMode,
    /// `None` when the crawl was skipped or failed.
    pub crawl: Option<CrawlSummary>,
    /// Why the crawl did not complete, if it failed.
    pub crawl_error: Option<String>,
    pub sources: Vec<SourceCount>,
    /// Candidates vs. NFDC. `None` when either dataset is not configured.
    pub stage1: Option<StageSummary>,
    /// Provisional set vs. site records.
    pub stage2: Option<StageSummary>,
    pub outputs: Vec<PathBuf>,
}

impl PipelineSummary {
    #[must_use]
    pub fn start(match_mode: MatchMode) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            match_mode,
            crawl: None,
            crawl_error: None,
            sources: Vec::new(),
            stage1: None,
            stage2: None,
            outputs: Vec::new(),
        }
    }

    /// Logs per-source counts so mass drops are visible.
    pub fn log(&self) {
        if let Some(crawl) = &self.crawl {
            log::info!(
                "Crawl: {} written, {} up to date, {} skipped cell(s), {} failed fetch(es)",
                crawl.pages_written,
                crawl.up_to_date,
                crawl.skipped_cells,
                crawl.failed_fetches
            );
        }
        for count in &self.sources {
            log::info!(
                "{}: {} parsed, {} invalid",
                count.source,
                count.parsed,
                count.invalid
            );
        }
        for (label, stage) in [("Stage 1", &self.stage1), ("Stage 2", &self.stage2)] {
            if let Some(stage) = stage {
                log::info!(
                    "{label}: {} candidate(s), {} unmatched, {} matched, {} skipped",
                    stage.candidates,
                    stage.unmatched,
                    stage.matched,
                    stage.skipped
                );
            }
        }
    }

    /// Writes the summary as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PipelineError`] if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<(), crate::PipelineError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| {
            crate::PipelineError::Summary {
                path: path.display().to_string(),
                source,
            }
        })?;
        std::fs::write(path, json).map_err(|source| crate::PipelineError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
