#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the airfield reconciliation pipeline.
//!
//! Each stage can be run on its own (`scrape`, `extract`, `reconcile`) or
//! all together (`run`). With no subcommand an interactive menu asks what
//! to do.
//!
//! Uses `indicatif-log-bridge` (via [`airfield_recon_cli_utils::init_logger`])
//! so that log lines and the crawl progress bar share the terminal.

mod interactive;

use std::path::PathBuf;

use airfield_recon_airfield_models::MatchMode;
use airfield_recon_cli_utils::{IndicatifProgress, MultiProgress};
use airfield_recon_pipeline::config::{ConfigOverrides, PipelineConfig};
use clap::{Args, Parser, Subcommand};

const LONG_ABOUT: &str = "\
Mirrors an abandoned-airfields website, extracts the airfields it lists, and \
reconciles BTS airport coordinates against the NFDC facility file and the \
site to find airports that neither source knows about.

Only one run may use a given cache directory at a time. Concurrent runs \
against the same cache are not supported.";

#[derive(Parser)]
#[command(name = "airfield_recon", about = "Abandoned airfield reconciliation", long_about = LONG_ABOUT)]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Values that replace those from the config file.
#[derive(Args)]
struct SettingsArgs {
    /// Config file (falls back to `$AIRFIELD_RECON_CONFIG`, then
    /// `airfield_recon.toml` when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root URL of the abandoned-airfields site
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Directory of mirrored pages
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Directory for output files
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// BTS master coordinate CSV
    #[arg(long = "bts", global = true)]
    bts_path: Option<PathBuf>,

    /// NFDC facility file
    #[arg(long = "nfdc", global = true)]
    nfdc_path: Option<PathBuf>,

    /// Country code kept from the BTS list
    #[arg(long, global = true)]
    country: Option<String>,

    /// Distance in kilometers within which two records are the same airfield
    #[arg(long = "threshold", global = true)]
    threshold_km: Option<f64>,

    /// Which BTS candidates take part: all, closed, or open
    #[arg(long, global = true)]
    match_mode: Option<MatchMode>,

    /// Skip the crawl and use cached pages
    #[arg(long, global = true)]
    offline: bool,
}

impl SettingsArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_url: self.base_url.clone(),
            cache_dir: self.cache_dir.clone(),
            output_dir: self.output_dir.clone(),
            bts_path: self.bts_path.clone(),
            nfdc_path: self.nfdc_path.clone(),
            country: self.country.clone(),
            threshold_km: self.threshold_km,
            match_mode: self.match_mode,
            offline: self.offline,
        }
    }
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Crawl, extract, reconcile, and write every output
    Run,

    /// Refresh the page cache from the site
    Scrape,

    /// Extract airfields from cached pages and write CSV, KML, and map files
    Extract,

    /// Reconcile BTS, NFDC, and cached site records without crawling
    Reconcile,

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = airfield_recon_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = PipelineConfig::load(cli.settings.config.as_deref())?;
    cli.settings.overrides().apply(&mut config)?;

    let command = match cli.command {
        Some(command) => command,
        None => interactive::choose(&mut config)?,
    };

    match command {
        Commands::Run => run(&config, &multi).await?,
        Commands::Scrape => scrape(&config, &multi).await?,
        Commands::Extract => extract(&config)?,
        Commands::Reconcile => reconcile(&config)?,
        Commands::Config => print!("{}", config.to_toml_string()?),
    }

    Ok(())
}

async fn run(
    config: &PipelineConfig,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = airfield_recon_pipeline::http_source(config)?;
    let progress = IndicatifProgress::pages_bar(multi, "Reading state index...");
    let summary = airfield_recon_pipeline::run(config, &source, progress).await?;

    println!();
    for path in &summary.outputs {
        println!("  {}", path.display());
    }
    if let Some(error) = &summary.crawl_error {
        println!("Crawl failed ({error}); outputs were built from cached pages.");
    }
    Ok(())
}

async fn scrape(
    config: &PipelineConfig,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = airfield_recon_pipeline::http_source(config)?;
    let progress = IndicatifProgress::pages_bar(multi, "Reading state index...");
    let report = airfield_recon_pipeline::scrape(config, &source, progress).await?;

    log::info!(
        "Scrape complete: {} page(s) written, {} up to date, {:.2} MB downloaded",
        report.written.len(),
        report.up_to_date,
        report.megabytes()
    );
    for skipped in &report.skipped {
        log::warn!(
            "Skipped {:?} cell ({}): {}",
            skipped.level,
            skipped.link.as_deref().unwrap_or("no link"),
            skipped.reason
        );
    }
    for failure in &report.failures {
        log::warn!("Failed to fetch {}: {}", failure.url, failure.error);
    }
    Ok(())
}

fn extract(config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let site = airfield_recon_pipeline::extract(config)?;
    log::info!(
        "Extracted {} airfield(s), {} invalid",
        site.valid_count(),
        site.invalid_count()
    );
    for path in airfield_recon_pipeline::write_site(config, &site)? {
        println!("  {}", path.display());
    }
    Ok(())
}

fn reconcile(config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let Some(datasets) = airfield_recon_pipeline::load_datasets(config)? else {
        return Err("set both --bts and --nfdc (or bts_path and nfdc_path in the config)".into());
    };
    let site = airfield_recon_pipeline::extract(config)?;
    let reconciliation = airfield_recon_pipeline::reconcile_datasets(config, datasets, &site)?;

    let stage1 = &reconciliation.stage1_summary;
    let stage2 = &reconciliation.stage2_summary;
    log::info!(
        "Stage 1: {} of {} candidate(s) unmatched ({} filtered out by match mode)",
        stage1.unmatched,
        stage1.candidates,
        stage1.filtered_out
    );
    log::info!(
        "Stage 2: {} of {} provisional airport(s) not on the site",
        stage2.unmatched,
        stage2.candidates
    );
    for path in &reconciliation.outputs {
        println!("  {}", path.display());
    }
    Ok(())
}
