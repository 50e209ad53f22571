#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incremental mirror of the abandoned-airfields site.
//!
//! The site is a two-level hierarchy: a root index whose table cells link to
//! one page per state, and state pages whose cells link to regional pages.
//! Every cell carries a "last updated" date. [`crawl::Crawler`] walks the
//! hierarchy and downloads a page only when that date is newer than the
//! newest local copy ([`freshness`]), persisting pages through
//! [`store::LocalStore`].
//!
//! The crawl mutates a plain directory with no locking, so only one crawl
//! may run against a given cache directory at a time.

pub mod cell;
pub mod crawl;
pub mod fetch;
pub mod freshness;
pub mod progress;
pub mod retry;
pub mod store;

/// Errors that can occur while mirroring the site.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// An HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// An HTML fragment had no usable link or date.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A filesystem operation on the local cache failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A cache filename pattern was not a valid glob.
    #[error("Invalid filename pattern {pattern:?}: {source}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Underlying glob error.
        source: glob::PatternError,
    },
}

impl ScrapeError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
