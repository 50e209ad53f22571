//! KML documents with one folder per state.

use std::io::Write;
use std::path::Path;

use airfield_recon_airfield_models::AirfieldRecord;

use crate::{GenerateError, create};

const KML_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8"?><kml xmlns="http://www.opengis.net/kml/2.2" xmlns:gx="http://www.google.com/kml/ext/2.2" xmlns:kml="http://www.opengis.net/kml/2.2" xmlns:atom="http://www.w3.org/2005/Atom">"#;

const AIRPORT_ICON: &str = "http://maps.google.com/mapfiles/kml/shapes/airports.png";

/// Records of one state, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct StateGroup<'a> {
    pub state: &'a str,
    pub records: Vec<&'a AirfieldRecord>,
}

/// Groups records by state, ordering groups by first appearance.
#[must_use]
pub fn group_by_state(records: &[AirfieldRecord]) -> Vec<StateGroup<'_>> {
    let mut groups: Vec<StateGroup<'_>> = Vec::new();
    for record in records {
        match groups.iter_mut().find(|g| g.state == record.state) {
            Some(group) => group.records.push(record),
            None => groups.push(StateGroup {
                state: &record.state,
                records: vec![record],
            }),
        }
    }
    groups
}

/// Escapes text for XML character data.
fn escape(text: &str) -> String {
    text.replace('&', " and ")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn write_head<W: Write>(out: &mut W, document_name: &str) -> std::io::Result<()> {
    writeln!(out, "{KML_OPEN}")?;
    writeln!(out, "<Document><name>{}</name>", escape(document_name))?;
    for (id, scale) in [("sh_airports", "1.4"), ("sn_airports", "1.2")] {
        writeln!(
            out,
            "\t<Style id=\"{id}\"><IconStyle><scale>{scale}</scale><Icon><href>{AIRPORT_ICON}</href></Icon><hotSpot x=\"0.5\" y=\"0\" xunits=\"fraction\" yunits=\"fraction\"/></IconStyle><ListStyle></ListStyle></Style>"
        )?;
    }
    writeln!(
        out,
        "\t<StyleMap id=\"msn_airports\"><Pair><key>normal</key><styleUrl>#sn_airports</styleUrl></Pair><Pair><key>highlight</key><styleUrl>#sh_airports</styleUrl></Pair></StyleMap>"
    )
}

fn write_folder<W: Write>(out: &mut W, group: &StateGroup<'_>) -> std::io::Result<()> {
    writeln!(out, "<Folder><name>{}</name><open>0</open>", escape(group.state))?;
    for record in &group.records {
        writeln!(
            out,
            "<Placemark><name>{}</name><description><![CDATA[<a href=\"{}\">Link</a>]]></description><styleUrl>#msn_airports</styleUrl><Point><gx:drawOrder>1</gx:drawOrder><coordinates>{},{},0</coordinates></Point></Placemark>",
            escape(&record.name),
            record.source_link,
            record.longitude,
            record.latitude
        )?;
    }
    writeln!(out, "</Folder>")
}

fn write_tail<W: Write>(out: &mut W) -> std::io::Result<()> {
    write!(out, "</Document></kml>")?;
    out.flush()
}

/// Renders a document holding a folder for each group.
///
/// # Errors
///
/// Returns any error from `out`.
pub fn render<W: Write>(
    out: &mut W,
    document_name: &str,
    groups: &[StateGroup<'_>],
) -> std::io::Result<()> {
    write_head(out, document_name)?;
    for group in groups {
        write_folder(out, group)?;
    }
    write_tail(out)
}

/// Writes every record to one document, a folder per state.
///
/// # Errors
///
/// Returns [`GenerateError`] if the file cannot be written.
pub fn write_combined(path: &Path, records: &[AirfieldRecord]) -> Result<(), GenerateError> {
    let mut out = create(path)?;
    render(&mut out, &document_name(path), &group_by_state(records))
        .map_err(|e| GenerateError::io(path, e))
}

/// Writes a single state's document.
///
/// # Errors
///
/// Returns [`GenerateError`] if the file cannot be written.
pub fn write_state(path: &Path, group: &StateGroup<'_>) -> Result<(), GenerateError> {
    let mut out = create(path)?;
    render(&mut out, &document_name(path), std::slice::from_ref(group))
        .map_err(|e| GenerateError::io(path, e))
}

fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
