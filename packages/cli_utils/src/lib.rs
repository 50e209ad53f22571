#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `airfield_recon` binary: a logger that stays
//! out of the way of progress bars, and a crawl bar behind
//! [`ProgressCallback`].

use std::sync::Arc;
use std::time::Duration;

use airfield_recon_scraper::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";
const STATES_TEMPLATE: &str =
    "  [{elapsed_precise}] {bar:40.green/white} {pos:>3}/{len:3} states  {msg}";

/// Crawl progress drawn as an `indicatif` bar.
///
/// Starts as a spinner; [`ProgressCallback::set_total`] turns it into a
/// bar counting states once the index has been read.
pub struct IndicatifProgress {
    bar: ProgressBar,
    counted: ProgressStyle,
}

impl IndicatifProgress {
    #[must_use]
    pub fn pages_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let spinner = ProgressStyle::with_template(SPINNER_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let counted = ProgressStyle::with_template(STATES_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");

        let bar = multi.add(ProgressBar::new_spinner().with_style(spinner));
        bar.set_message(message.to_owned());
        bar.enable_steady_tick(Duration::from_millis(120));

        Arc::new(Self { bar, counted })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_style(self.counted.clone());
        self.bar.set_length(total);
        self.bar.reset();
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs the global logger behind `indicatif-log-bridge`, so log lines
/// are printed above any live bar instead of through it.
///
/// `RUST_LOG` picks the filter; without it everything at `info` and above
/// is shown. Bars must be added to the returned [`MultiProgress`].
#[must_use]
pub fn init_logger() -> MultiProgress {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned());
    let logger = pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .build();
    let max_level = logger.filter();

    let multi = MultiProgress::new();
    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(max_level);
    }
    multi
}
