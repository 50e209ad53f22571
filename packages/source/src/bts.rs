//! Decoder for the BTS master coordinate list (reference dataset A).
//!
//! The file is comma-separated with a header row. Columns are addressed by
//! position through [`BtsColumns`], which is checked against the header
//! before any row is read.

use std::io::Read;
use std::path::Path;

use airfield_recon_airfield_models::{
    AirfieldRecord, FacilityStatus, InvalidReason, InvalidRecord, RecordEntry, RecordSet,
    RecordSource, parse_coordinates,
};
use serde::{Deserialize, Serialize};

use crate::SourceError;
use crate::parsing::{non_empty, parse_date, parse_flag};

/// Zero-based column positions within a BTS row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BtsColumns {
    pub country: usize,
    pub state: usize,
    pub city: usize,
    pub name: usize,
    pub id: usize,
    pub start_date: usize,
    pub through_date: usize,
    pub closed: usize,
    pub current: usize,
    pub latitude: usize,
    pub longitude: usize,
}

impl Default for BtsColumns {
    fn default() -> Self {
        Self {
            country: 0,
            state: 1,
            city: 2,
            name: 3,
            id: 4,
            start_date: 5,
            through_date: 6,
            closed: 7,
            current: 8,
            latitude: 9,
            longitude: 10,
        }
    }
}

impl BtsColumns {
    /// Number of columns a row needs to hold every configured field.
    #[must_use]
    pub fn width(&self) -> usize {
        [
            self.country,
            self.state,
            self.city,
            self.name,
            self.id,
            self.start_date,
            self.through_date,
            self.closed,
            self.current,
            self.latitude,
            self.longitude,
        ]
        .into_iter()
        .max()
        .unwrap_or_default()
            + 1
    }
}

/// Loads the rows of `path` that are current and in `country`.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read or its header is
/// narrower than `columns` requires.
pub fn load_bts(path: &Path, columns: &BtsColumns, country: &str) -> Result<RecordSet, SourceError> {
    log::info!("Loading BTS coordinates from {}", path.display());
    let file = std::fs::File::open(path).map_err(|e| SourceError::io(path, e))?;
    let set = decode_bts(file, path, columns, country)?;
    log::info!(
        "BTS: {} current {country} airport(s), {} invalid",
        set.valid_count(),
        set.invalid_count()
    );
    Ok(set)
}

/// Decodes BTS rows from any reader. `path` is only used for provenance
/// and error messages.
///
/// # Errors
///
/// See [`load_bts`].
pub fn decode_bts<R: Read>(
    reader: R,
    path: &Path,
    columns: &BtsColumns,
    country: &str,
) -> Result<RecordSet, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let header_width = reader
        .byte_headers()
        .map_err(|e| SourceError::csv(path, e))?
        .len();
    let width = columns.width();
    if header_width < width {
        return Err(SourceError::layout(
            path,
            format!("header has {header_width} column(s), layout needs {width}"),
        ));
    }

    let link = path.display().to_string();
    let mut set = RecordSet::new(RecordSource::Bts);
    let mut filtered = 0usize;

    for (index, row) in reader.byte_records().enumerate() {
        let row = row.map_err(|e| SourceError::csv(path, e))?;
        let position = row
            .position()
            .and_then(|p| usize::try_from(p.line()).ok())
            .unwrap_or(index + 2);
        let fields: Vec<String> = row
            .iter()
            .map(|f| String::from_utf8_lossy(f).trim().to_owned())
            .collect();

        match decode_row(&fields, columns, country, &link, position) {
            Some(entry) => set.push(entry),
            None => filtered += 1,
        }
    }

    log::debug!("BTS: {filtered} row(s) not current or outside {country}");
    Ok(set)
}

/// Decodes one row. `None` means the row is filtered out (not current, or
/// another country).
fn decode_row(
    fields: &[String],
    columns: &BtsColumns,
    country: &str,
    link: &str,
    position: usize,
) -> Option<RecordEntry> {
    let field = |i: usize| fields.get(i).map_or("", String::as_str);

    let width = columns.width();
    if fields.len() < width {
        return Some(Err(InvalidRecord::new(
            RecordSource::Bts,
            position,
            non_empty(field(columns.name)).map(str::to_owned),
            InvalidReason::Truncated {
                expected: width,
                actual: fields.len(),
            },
        )));
    }

    if parse_flag(field(columns.current)) != Some(true)
        || !field(columns.country).eq_ignore_ascii_case(country)
    {
        return None;
    }

    let name = field(columns.name);
    let entry = parse_coordinates(
        Some(field(columns.latitude)),
        Some(field(columns.longitude)),
    )
    .map(|(lat, lon)| {
        let status = parse_flag(field(columns.closed)).map(|closed| {
            if closed {
                FacilityStatus::Closed
            } else {
                FacilityStatus::Open
            }
        });
        let display = if name.is_empty() {
            field(columns.city)
        } else {
            name
        };
        AirfieldRecord::new(
            RecordSource::Bts,
            display,
            field(columns.state),
            lat,
            lon,
            link,
        )
        .with_status(status)
        .with_effective_date(parse_date(field(columns.start_date)))
        .with_decommission_date(parse_date(field(columns.through_date)))
        .with_source_id(field(columns.id))
        .with_position(position)
    })
    .map_err(|reason| {
        InvalidRecord::new(
            RecordSource::Bts,
            position,
            non_empty(name).map(str::to_owned),
            reason,
        )
    });

    Some(entry)
}
