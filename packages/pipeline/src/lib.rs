#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The airfield-recon pipeline.
//!
//! A run goes through these stages in order:
//!
//! 1. load the BTS and NFDC datasets, if both are configured,
//! 2. crawl the site into the page cache (skipped when offline),
//! 3. extract site records from the cache and write the site outputs,
//! 4. reconcile BTS candidates against NFDC facilities (stage 1),
//! 5. reconcile the stage 1 leftovers against the site records (stage 2),
//! 6. write `summary.json`.
//!
//! Each stage is also callable on its own. Stage results are returned as
//! values; nothing is accumulated in shared state.

pub mod config;
pub mod summary;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use airfield_recon_airfield_models::{ReconciliationResult, RecordSet};
use airfield_recon_generate::{
    GenerateError, OUTPUT_MISSING_CSV, OUTPUT_STAGE1_CSV, tabular, write_site_outputs,
};
use airfield_recon_reconcile::{ReconcileError, filter_by_mode, reconcile};
use airfield_recon_scraper::ScrapeError;
use airfield_recon_scraper::crawl::{CrawlReport, Crawler};
use airfield_recon_scraper::fetch::{HttpPageSource, PageSource};
use airfield_recon_scraper::progress::ProgressCallback;
use airfield_recon_scraper::store::LocalStore;
use airfield_recon_source::SourceError;
use airfield_recon_source::bts::load_bts;
use airfield_recon_source::nfdc::load_nfdc;
use airfield_recon_source::site::extract_site;
use chrono::Utc;

use crate::config::{ConfigError, PipelineConfig};
use crate::summary::{CrawlSummary, OUTPUT_SUMMARY, PipelineSummary, SourceCount, StageSummary};

/// Errors that can stop a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    /// The summary could not be serialized.
    #[error("Failed to serialize summary {path}: {source}")]
    Summary {
        path: String,
        source: serde_json::Error,
    },

    /// A filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Builds the HTTP page source described by `config`.
///
/// # Errors
///
/// Returns [`PipelineError::Scrape`] if the client cannot be built.
pub fn http_source(config: &PipelineConfig) -> Result<HttpPageSource, PipelineError> {
    Ok(HttpPageSource::new(&config.http_config())?)
}

/// Refreshes the page cache from the site.
///
/// # Errors
///
/// Returns [`PipelineError::Scrape`] if the root index cannot be fetched.
pub async fn scrape<S: PageSource>(
    config: &PipelineConfig,
    source: &S,
    progress: Arc<dyn ProgressCallback>,
) -> Result<CrawlReport, PipelineError> {
    let store = LocalStore::new(&config.cache_dir);
    let report = Crawler::new(&config.base_url, source, &store)
        .with_progress(progress)
        .crawl()
        .await?;
    Ok(report)
}

/// Extracts site records from the page cache.
///
/// # Errors
///
/// Returns [`PipelineError::Source`] if the cache cannot be read.
pub fn extract(config: &PipelineConfig) -> Result<RecordSet, PipelineError> {
    let store = LocalStore::new(&config.cache_dir);
    Ok(extract_site(&store, &config.base_url)?)
}

/// Writes the CSV, KML and Leaflet outputs for the site records.
///
/// # Errors
///
/// Returns [`PipelineError::Generate`] if an output cannot be written.
pub fn write_site(config: &PipelineConfig, site: &RecordSet) -> Result<Vec<PathBuf>, PipelineError> {
    Ok(write_site_outputs(&config.output_dir, &site.valid_records())?)
}

/// The BTS and NFDC datasets, loaded before anything else runs.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub bts: RecordSet,
    pub nfdc: RecordSet,
}

/// Loads both configured datasets.
///
/// Returns `None` when the BTS or NFDC path is not configured.
///
/// # Errors
///
/// Returns [`PipelineError::Source`] naming the path of a configured
/// dataset that cannot be read or does not fit its layout.
pub fn load_datasets(config: &PipelineConfig) -> Result<Option<Datasets>, PipelineError> {
    let (Some(bts_path), Some(nfdc_path)) = (&config.bts_path, &config.nfdc_path) else {
        log::warn!("BTS and NFDC paths are both required for reconciliation, skipping it");
        return Ok(None);
    };

    Ok(Some(Datasets {
        bts: load_bts(bts_path, &config.bts_columns, &config.country)?,
        nfdc: load_nfdc(nfdc_path, &config.nfdc_layout)?,
    }))
}

/// Both reconciliation passes and what went into them.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub sources: Vec<SourceCount>,
    pub stage1: ReconciliationResult,
    pub stage1_summary: StageSummary,
    pub stage2: ReconciliationResult,
    pub stage2_summary: StageSummary,
    pub outputs: Vec<PathBuf>,
}

/// Runs both reconciliation passes and writes their tables.
///
/// # Errors
///
/// Returns [`PipelineError`] if an output cannot be written.
pub fn reconcile_datasets(
    config: &PipelineConfig,
    datasets: Datasets,
    site: &RecordSet,
) -> Result<Reconciliation, PipelineError> {
    let Datasets { bts, nfdc } = datasets;
    let sources = vec![SourceCount::from(&bts), SourceCount::from(&nfdc)];

    let candidate_count = bts.len();
    let filtered = filter_by_mode(bts.entries, config.match_mode);

    log::info!("Stage 1: BTS candidates against NFDC facilities");
    let stage1 = reconcile(&nfdc.valid_records(), &filtered.admitted, config.threshold_km)?;
    let stage1_summary = StageSummary::new(candidate_count, filtered.filtered_out, &stage1);

    let provisional = stage1.clone().into_candidates();

    log::info!("Stage 2: provisional set against site records");
    let stage2 = reconcile(&site.valid_records(), &provisional, config.threshold_km)?;
    let stage2_summary = StageSummary::new(provisional.len(), 0, &stage2);

    let dir = &config.output_dir;
    std::fs::create_dir_all(dir).map_err(|source| PipelineError::Io {
        path: dir.display().to_string(),
        source,
    })?;
    let stage1_path = dir.join(OUTPUT_STAGE1_CSV);
    tabular::write_scored_csv(&stage1_path, &stage1.unmatched)?;
    let missing_path = dir.join(OUTPUT_MISSING_CSV);
    tabular::write_scored_csv(&missing_path, &stage2.unmatched)?;

    Ok(Reconciliation {
        sources,
        stage1,
        stage1_summary,
        stage2,
        stage2_summary,
        outputs: vec![stage1_path, missing_path],
    })
}

/// Runs every stage and writes `summary.json` into the output directory.
///
/// Configured datasets are loaded before the crawl, so an unreadable one
/// stops the run before any page is fetched. A failed crawl is logged and
/// the run continues with whatever the cache holds.
///
/// # Errors
///
/// Returns [`PipelineError`] if a configured dataset, the cache listing, or
/// an output fails.
pub async fn run<S: PageSource>(
    config: &PipelineConfig,
    source: &S,
    progress: Arc<dyn ProgressCallback>,
) -> Result<PipelineSummary, PipelineError> {
    let mut summary = PipelineSummary::start(config.match_mode);
    let datasets = load_datasets(config)?;

    if config.offline {
        log::info!("Offline: using cached pages in {}", config.cache_dir.display());
    } else {
        match scrape(config, source, progress).await {
            Ok(report) => summary.crawl = Some(CrawlSummary::from(&report)),
            Err(e) => {
                log::error!("Crawl failed, continuing with cached pages: {e}");
                summary.crawl_error = Some(e.to_string());
            }
        }
    }

    let site = extract(config)?;
    summary.sources.push(SourceCount::from(&site));
    summary.outputs.extend(write_site(config, &site)?);

    if let Some(datasets) = datasets {
        let reconciliation = reconcile_datasets(config, datasets, &site)?;
        summary.sources.extend(reconciliation.sources);
        summary.stage1 = Some(reconciliation.stage1_summary);
        summary.stage2 = Some(reconciliation.stage2_summary);
        summary.outputs.extend(reconciliation.outputs);
    }

    let summary_path = config.output_dir.join(OUTPUT_SUMMARY);
    summary.outputs.push(summary_path.clone());
    summary.finished_at = Some(Utc::now());
    summary.write(&summary_path)?;
    summary.log();

    Ok(summary)
}

/// Returns `true` if `dir` holds any cached page.
///
/// # Errors
///
/// Returns [`PipelineError::Scrape`] if the directory cannot be listed.
pub fn has_cached_pages(dir: &Path) -> Result<bool, PipelineError> {
    Ok(!LocalStore::new(dir).cached_pages()?.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use airfield_recon_airfield_models::MatchMode;
    use airfield_recon_scraper::progress::null_progress;
    use airfield_recon_source::nfdc::{FieldSpan, NfdcLayout};

    use super::*;

    const BASE: &str = "http://airfields.test/";

    struct FakeSite {
        pages: BTreeMap<String, Vec<u8>>,
        fetches: AtomicUsize,
    }

    impl FakeSite {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| ((*url).to_string(), body.as_bytes().to_vec()))
                    .collect(),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    impl PageSource for FakeSite {
        async fn fetch_page(&self, url: &str) -> Result<Vec<u8>, ScrapeError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| ScrapeError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    fn compact_layout() -> NfdcLayout {
        NfdcLayout {
            site_number: FieldSpan::new(4, 6),
            facility_type: FieldSpan::new(10, 8),
            location_id: FieldSpan::new(18, 4),
            effective_date: FieldSpan::new(22, 10),
            state_code: FieldSpan::new(32, 2),
            city: FieldSpan::new(34, 10),
            facility_name: FieldSpan::new(44, 12),
            latitude_seconds: FieldSpan::new(56, 12),
            longitude_seconds: FieldSpan::new(68, 12),
            status_code: FieldSpan::new(80, 2),
        }
    }

    fn apt_line(id: &str, name: &str, lat: &str, lon: &str) -> String {
        format!(
            "APT{:<6}{:<8}{:<4}{:<10}{:<2}{:<10}{:<12}{:>12}{:>12}{:<2}",
            "1.A", "AIRPORT", id, "01/01/2020", "PA", "TOWN", name, lat, lon, "O"
        )
    }

    /// Config rooted in `dir` with both datasets written.
    fn fixture(dir: &Path) -> PipelineConfig {
        let bts = dir.join("bts.csv");
        std::fs::write(
            &bts,
            "COUNTRY,STATE,CITY,NAME,ID,START,THRU,CLOSED,LATEST,LAT,LON\n\
             US,DE,Dover,Old Field Municipal,OFM,,,1,1,38.5,-75.5\n\
             US,PA,Erie,Known Field,KNF,,,0,1,40.0,-80.0\n\
             US,SD,Pierre,Forgotten Field,FGF,,2001-05-01,1,1,45.0,-100.0\n\
             US,SD,Pierre,Broken Row,BRK,,,1,1,45.0,abc\n",
        )
        .unwrap();

        let nfdc = dir.join("APT.txt");
        std::fs::write(
            &nfdc,
            format!(
                "{}\n",
                apt_line("KNF", "KNOWN FIELD", "144000.0000N", "288000.0000W")
            ),
        )
        .unwrap();

        PipelineConfig {
            base_url: BASE.to_owned(),
            cache_dir: dir.join("pages"),
            output_dir: dir.join("out"),
            bts_path: Some(bts),
            nfdc_path: Some(nfdc),
            nfdc_layout: compact_layout(),
            ..PipelineConfig::default()
        }
    }

    fn site_pages() -> FakeSite {
        FakeSite::new(&[
            (
                BASE,
                r#"<table><tr><td><a href="DE/Airfields_DE.htm">Delaware</a> 1/1/20</td></tr></table>"#,
            ),
            (
                "http://airfields.test/DE/Airfields_DE.htm",
                "<html><body><p>__ Old Field 38.5, -75.5</p><p>__ Lost Strip 39.0, -75.0</p></body></html>",
            ),
        ])
    }

    #[tokio::test]
    async fn full_run_narrows_to_facilities_missing_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path());

        let summary = run(&config, &site_pages(), null_progress()).await.unwrap();

        assert_eq!(summary.crawl.as_ref().unwrap().pages_written, 1);
        assert_eq!(summary.sources[0].parsed, 2);
        assert_eq!(summary.sources[1].parsed, 3);
        assert_eq!(summary.sources[1].invalid, 1);
        assert_eq!(summary.sources[2].parsed, 1);

        let stage1 = summary.stage1.as_ref().unwrap();
        assert_eq!(stage1.matched, 1);
        assert_eq!(stage1.unmatched, 2);
        assert_eq!(stage1.skipped, 1);

        let stage2 = summary.stage2.as_ref().unwrap();
        assert_eq!(stage2.candidates, 2);
        assert_eq!(stage2.unmatched, 1);

        let out = dir.path().join("out");
        let missing = std::fs::read_to_string(out.join("missing_airports.csv")).unwrap();
        assert_eq!(missing.lines().count(), 2);
        assert!(missing.contains("Forgotten Field"));

        let site_csv = std::fs::read_to_string(out.join("abandoned_airports.csv")).unwrap();
        assert!(site_csv.contains("\"Lost Strip\""));
        assert!(out.join("abandoned_airports_DE.kml").is_file());
        assert!(out.join("leaflet_code.txt").is_file());

        let json = std::fs::read_to_string(out.join("summary.json")).unwrap();
        let parsed: PipelineSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.stage2, summary.stage2);
    }

    #[tokio::test]
    async fn failed_crawl_falls_back_to_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path());
        std::fs::create_dir_all(&config.cache_dir).unwrap();
        std::fs::write(
            config.cache_dir.join("Airfields_DE.htm"),
            "<p>__ Old Field 38.5, -75.5</p>",
        )
        .unwrap();

        let summary = run(&config, &FakeSite::new(&[]), null_progress())
            .await
            .unwrap();

        assert!(summary.crawl.is_none());
        assert!(summary.crawl_error.is_some());
        assert_eq!(summary.sources[0].parsed, 1);
    }

    #[tokio::test]
    async fn offline_run_never_fetches() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            offline: true,
            bts_path: None,
            ..fixture(dir.path())
        };

        let summary = run(&config, &FakeSite::new(&[]), null_progress())
            .await
            .unwrap();

        assert!(summary.crawl.is_none());
        assert!(summary.crawl_error.is_none());
        assert!(summary.stage1.is_none());
        assert!(dir.path().join("out/summary.json").is_file());
    }

    #[test]
    fn closed_mode_drops_open_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            match_mode: MatchMode::Closed,
            ..fixture(dir.path())
        };

        let site = RecordSet::new(airfield_recon_airfield_models::RecordSource::Site);
        let datasets = load_datasets(&config).unwrap().unwrap();
        let reconciliation = reconcile_datasets(&config, datasets, &site).unwrap();

        assert_eq!(reconciliation.stage1_summary.filtered_out, 1);
        assert_eq!(reconciliation.stage1.matched_count, 0);
        assert_eq!(reconciliation.stage2.unmatched.len(), 2);
    }

    #[test]
    fn unreadable_dataset_is_fatal_and_named() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            nfdc_path: Some(dir.path().join("missing_APT.txt")),
            ..fixture(dir.path())
        };

        let err = load_datasets(&config).unwrap_err();
        assert!(err.to_string().contains("missing_APT.txt"));
    }

    #[tokio::test]
    async fn unreadable_dataset_stops_the_run_before_any_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            bts_path: Some(dir.path().join("missing_bts.csv")),
            ..fixture(dir.path())
        };
        let site = site_pages();

        let err = run(&config, &site, null_progress()).await.unwrap_err();

        assert!(err.to_string().contains("missing_bts.csv"));
        assert_eq!(site.fetches.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join("out/abandoned_airports.csv").exists());
    }

    #[test]
    fn datasets_are_optional_until_both_are_set() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            nfdc_path: None,
            ..fixture(dir.path())
        };
        assert!(load_datasets(&config).unwrap().is_none());
    }

    #[test]
    fn cache_is_empty_until_a_page_lands() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("pages");
        assert!(!has_cached_pages(&cache).unwrap());

        std::fs::create_dir_all(&cache).unwrap();
        std::fs::write(cache.join("notes.txt"), "x").unwrap();
        assert!(!has_cached_pages(&cache).unwrap());

        std::fs::write(cache.join("Airfields_DE.htm"), "<p></p>").unwrap();
        assert!(has_cached_pages(&cache).unwrap());
    }
}
