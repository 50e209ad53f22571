//! CSV tables.

use std::io::Write;
use std::path::Path;

use airfield_recon_airfield_models::{AirfieldRecord, ScoredRecord};
use csv::{QuoteStyle, WriterBuilder};

use crate::{GenerateError, create};

pub const RECORD_HEADER: [&str; 5] = ["State", "Airport", "Lat", "Lon", "Link"];

pub const SCORED_HEADER: [&str; 8] = [
    "State",
    "Airport",
    "Lat",
    "Lon",
    "Link",
    "DistanceKm",
    "SourceId",
    "Status",
];

fn record_fields(record: &AirfieldRecord) -> [String; 5] {
    [
        record.state.clone(),
        record.name.clone(),
        record.latitude.to_string(),
        record.longitude.to_string(),
        record.source_link.clone(),
    ]
}

/// Writes `State,Airport,Lat,Lon,Link` rows. Text fields are quoted.
///
/// # Errors
///
/// Returns [`csv::Error`] if a row cannot be written.
pub fn write_records<W: Write>(writer: W, records: &[AirfieldRecord]) -> Result<(), csv::Error> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::NonNumeric)
        .from_writer(writer);
    wtr.write_record(RECORD_HEADER)?;
    for record in records {
        wtr.write_record(record_fields(record))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes reconciliation rows: the record columns plus distance, source
/// id and status. A missing distance (empty reference set) is blank.
///
/// # Errors
///
/// Returns [`csv::Error`] if a row cannot be written.
pub fn write_scored<W: Write>(writer: W, scored: &[ScoredRecord]) -> Result<(), csv::Error> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::NonNumeric)
        .from_writer(writer);
    wtr.write_record(SCORED_HEADER)?;
    for entry in scored {
        let record = &entry.record;
        let [state, name, lat, lon, link] = record_fields(record);
        wtr.write_record([
            state,
            name,
            lat,
            lon,
            link,
            entry
                .distance_km
                .map(|d| format!("{d:.3}"))
                .unwrap_or_default(),
            record.source_id.clone().unwrap_or_default(),
            record
                .status
                .map(|s| s.to_string())
                .unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the site record table to `path`.
///
/// # Errors
///
/// Returns [`GenerateError`] if the file cannot be written.
pub fn write_records_csv(path: &Path, records: &[AirfieldRecord]) -> Result<(), GenerateError> {
    write_records(create(path)?, records).map_err(|e| GenerateError::csv(path, e))
}

/// Writes a reconciliation table to `path`.
///
/// # Errors
///
/// Returns [`GenerateError`] if the file cannot be written.
pub fn write_scored_csv(path: &Path, scored: &[ScoredRecord]) -> Result<(), GenerateError> {
    write_scored(create(path)?, scored).map_err(|e| GenerateError::csv(path, e))?;
    log::info!("Wrote {} row(s) to {}", scored.len(), path.display());
    Ok(())
}
