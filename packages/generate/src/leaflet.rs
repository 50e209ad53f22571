//! Leaflet marker snippet, one marker per record.

use std::io::Write;
use std::path::Path;

use airfield_recon_airfield_models::AirfieldRecord;

use crate::{GenerateError, create};

/// Escapes text for a single-quoted JavaScript string.
fn js_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Writes one `L.marker` statement per record.
///
/// # Errors
///
/// Returns any error from `out`.
pub fn render<W: Write>(out: &mut W, records: &[AirfieldRecord]) -> std::io::Result<()> {
    for record in records {
        write!(
            out,
            "L.marker([{}, {}]).addTo(map)\n    .bindPopup('<a href=\"{}\">{}</a>')\n    .openPopup();\n",
            record.latitude,
            record.longitude,
            js_escape(&record.source_link),
            js_escape(&record.name)
        )?;
    }
    out.flush()
}

/// Writes the marker snippet to `path`.
///
/// # Errors
///
/// Returns [`GenerateError`] if the file cannot be written.
pub fn write_markers(path: &Path, records: &[AirfieldRecord]) -> Result<(), GenerateError> {
    let mut out = create(path)?;
    render(&mut out, records).map_err(|e| GenerateError::io(path, e))
}
