#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Decoders that turn each input into a [`RecordSet`].
//!
//! - [`site`] scans the mirrored pages for `__ Name lat, lon` entries.
//! - [`bts`] reads the BTS master coordinate list (delimited text).
//! - [`nfdc`] reads the NFDC facility file (fixed-width text).
//!
//! Rows that cannot be decoded become [`InvalidRecord`] entries in the set.
//! Only an unreadable file or a layout that does not fit the file is an
//! error.
//!
//! [`RecordSet`]: airfield_recon_airfield_models::RecordSet
//! [`InvalidRecord`]: airfield_recon_airfield_models::InvalidRecord

pub mod bts;
pub mod nfdc;
pub mod parsing;
pub mod site;

use std::path::Path;

use airfield_recon_scraper::ScrapeError;

/// Errors that can occur while loading a source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The input file could not be opened or read.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// Path of the failing file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The delimited reader failed.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Path of the failing file.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// The configured column layout does not fit the file.
    #[error("Layout mismatch in {path}: {message}")]
    Layout {
        /// Path of the failing file.
        path: String,
        /// What did not fit.
        message: String,
    },

    /// The page cache could not be listed.
    #[error(transparent)]
    Cache(#[from] ScrapeError),
}

impl SourceError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn layout(path: &Path, message: impl Into<String>) -> Self {
        Self::Layout {
            path: path.display().to_string(),
            message: message.into(),
        }
    }
}
