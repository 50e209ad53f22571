#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Output artifacts for airfield record sets.
//!
//! Site records become a CSV table, a combined KML document with one folder
//! per state, one KML document per state, and a Leaflet marker snippet.
//! Reconciliation results become CSV tables annotated with distances.
//!
//! Every writer keeps input order.

pub mod kml;
pub mod leaflet;
pub mod tabular;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use airfield_recon_airfield_models::AirfieldRecord;

/// Output filename for the site record table.
pub const OUTPUT_SITE_CSV: &str = "abandoned_airports.csv";

/// Output filename for the combined KML document.
pub const OUTPUT_SITE_KML: &str = "abandoned_airports.kml";

/// Output filename for the Leaflet marker snippet.
pub const OUTPUT_LEAFLET: &str = "leaflet_code.txt";

/// Output filename for the first reconciliation pass.
pub const OUTPUT_STAGE1_CSV: &str = "missing_stage1.csv";

/// Output filename for the final reconciliation pass.
pub const OUTPUT_MISSING_CSV: &str = "missing_airports.csv";

/// Per-state KML filename (`abandoned_airports_CA.kml`).
#[must_use]
pub fn state_kml_filename(state: &str) -> String {
    format!("abandoned_airports_{state}.kml")
}

/// Errors that can occur while writing outputs.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// A file could not be created or written.
    #[error("I/O error writing {path}: {source}")]
    Io {
        /// Path of the failing file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The CSV writer failed.
    #[error("CSV error writing {path}: {source}")]
    Csv {
        /// Path of the failing file.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },
}

impl GenerateError {
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
}

/// Creates `path` for buffered writing.
pub(crate) fn create(path: &Path) -> Result<BufWriter<File>, GenerateError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| GenerateError::io(path, e))
}

/// Writes every site artifact into `dir` and returns the paths written.
///
/// # Errors
///
/// Returns [`GenerateError`] if `dir` cannot be created or any file cannot
/// be written.
pub fn write_site_outputs(
    dir: &Path,
    records: &[AirfieldRecord],
) -> Result<Vec<PathBuf>, GenerateError> {
    std::fs::create_dir_all(dir).map_err(|e| GenerateError::io(dir, e))?;

    let mut written = Vec::new();

    let csv_path = dir.join(OUTPUT_SITE_CSV);
    tabular::write_records_csv(&csv_path, records)?;
    written.push(csv_path);

    let kml_path = dir.join(OUTPUT_SITE_KML);
    kml::write_combined(&kml_path, records)?;
    written.push(kml_path);

    for group in kml::group_by_state(records) {
        let path = dir.join(state_kml_filename(group.state));
        kml::write_state(&path, &group)?;
        written.push(path);
    }

    let leaflet_path = dir.join(OUTPUT_LEAFLET);
    leaflet::write_markers(&leaflet_path, records)?;
    written.push(leaflet_path);

    log::info!(
        "Wrote {} site output file(s) for {} record(s) to {}",
        written.len(),
        records.len(),
        dir.display()
    );

    Ok(written)
}

#[cfg(test)]
mod tests {
    use airfield_recon_airfield_models::RecordSource;

    use super::*;

    #[test]
    fn writes_every_site_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let records = [
            AirfieldRecord::new(RecordSource::Site, "Mesa", "AZ", 35.0, -111.5, "l1"),
            AirfieldRecord::new(RecordSource::Site, "Stead", "NV", 39.6, -119.8, "l2"),
        ];

        let written = write_site_outputs(&out, &records).unwrap();

        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            [
                "abandoned_airports.csv",
                "abandoned_airports.kml",
                "abandoned_airports_AZ.kml",
                "abandoned_airports_NV.kml",
                "leaflet_code.txt",
            ]
        );
        assert!(written.iter().all(|p| p.is_file()));
    }
}
