//! Record extraction from mirrored site pages.
//!
//! Each airfield on a page is introduced by a `__` marker followed by its
//! name and a decimal coordinate pair, e.g. `__ Boyd Field 38.5, -75.5`.

use std::path::Path;
use std::sync::LazyLock;

use airfield_recon_airfield_models::{
    AirfieldRecord, InvalidReason, InvalidRecord, RecordEntry, RecordSet, RecordSource,
    parse_coordinates,
};
use airfield_recon_scraper::fetch::join_url;
use airfield_recon_scraper::store::LocalStore;
use regex::Regex;
use scraper::Html;

use crate::SourceError;

static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"__\s+([^(_]+?)\s+(-?\d+\.\d+),\s*(-?\d+\.\d+)").expect("valid regex")
});

static STATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Airfields_([A-Z]+)(?:_|\.htm)").expect("valid regex"));

/// State code carried by a cached filename (`Airfields_CA_SF.htm` → `CA`).
#[must_use]
pub fn state_from_filename(filename: &str) -> Option<&str> {
    STATE_RE
        .captures(filename)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Visible text of an HTML page with runs of whitespace collapsed.
#[must_use]
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let text: String = document.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts every entry from one page's text.
///
/// `first_position` numbers the first match; the rest follow in page order.
#[must_use]
pub fn extract_entries(
    text: &str,
    state: &str,
    link: &str,
    first_position: usize,
) -> Vec<RecordEntry> {
    ENTRY_RE
        .captures_iter(text)
        .enumerate()
        .map(|(i, caps)| {
            let name = caps[1].trim().to_owned();
            match parse_coordinates(Some(&caps[2]), Some(&caps[3])) {
                Ok((lat, lon)) => Ok(AirfieldRecord::new(
                    RecordSource::Site,
                    name,
                    state,
                    lat,
                    lon,
                    link,
                )
                .with_position(first_position + i)),
                Err(reason) => Err(InvalidRecord::new(
                    RecordSource::Site,
                    first_position + i,
                    Some(name),
                    reason,
                )),
            }
        })
        .collect()
}

/// Extracts records from every cached page, in filename order.
///
/// Pages whose filename carries no state are skipped with a warning. A
/// page that cannot be read is logged and recorded as one invalid entry
/// named after the file.
///
/// # Errors
///
/// Returns [`SourceError`] if the cache directory cannot be listed.
pub fn extract_site(store: &LocalStore, base_url: &str) -> Result<RecordSet, SourceError> {
    let pages = store.cached_pages()?;
    log::info!(
        "Extracting airfields from {} cached page(s) in {}",
        pages.len(),
        store.root().display()
    );

    let mut set = RecordSet::new(RecordSource::Site);
    for path in &pages {
        let position = set.len() + 1;
        match extract_file(path, base_url, position) {
            Ok(page) => set.extend(page),
            Err(e) => {
                log::warn!("Skipping unreadable page: {e}");
                let filename = path.file_name().map(|n| n.to_string_lossy().into_owned());
                set.push(Err(InvalidRecord::new(
                    RecordSource::Site,
                    position,
                    filename,
                    InvalidReason::Unreadable {
                        message: e.to_string(),
                    },
                )));
            }
        }
    }

    log::info!(
        "Site pages: {} airfield(s), {} invalid",
        set.valid_count(),
        set.invalid_count()
    );
    Ok(set)
}

fn extract_file(
    path: &Path,
    base_url: &str,
    first_position: usize,
) -> Result<RecordSet, SourceError> {
    let empty = || Ok(RecordSet::new(RecordSource::Site));
    let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
        return empty();
    };
    let Some(state) = state_from_filename(filename) else {
        log::warn!("No state in filename {filename}, skipping");
        return empty();
    };

    let bytes = std::fs::read(path).map_err(|e| SourceError::io(path, e))?;
    let text = page_text(&String::from_utf8_lossy(&bytes));
    let link = join_url(base_url, &format!("{state}/{filename}"));

    let entries = extract_entries(&text, state, &link, first_position);
    log::debug!("{filename}: {} entr(ies)", entries.len());
    Ok(RecordSet::from_entries(RecordSource::Site, entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_comes_from_filename() {
        assert_eq!(state_from_filename("Airfields_CA_SF.htm"), Some("CA"));
        assert_eq!(state_from_filename("Airfields_DE.htm"), Some("DE"));
        assert_eq!(state_from_filename("index.htm"), None);
        assert_eq!(state_from_filename("Airfields_ca.htm"), None);
    }

    #[test]
    fn text_drops_tags_and_collapses_whitespace() {
        let html = "<html><body><p>__\n  <b>Boyd</b>   Field</p>\n<p>38.5, -75.5</p></body></html>";
        assert_eq!(page_text(html), "__ Boyd Field 38.5, -75.5");
    }

    #[test]
    fn extracts_entries_in_page_order() {
        let text = "Intro. __ Boyd Field 38.51, -75.52 Some history. \
                    __ Smith Airstrip (revised) 39.0, -76.0 \
                    __ Jones Strip 39.25,-75.75";
        let entries = extract_entries(text, "DE", "http://x/DE/Airfields_DE.htm", 1);

        let names: Vec<_> = entries
            .iter()
            .map(|e| e.as_ref().unwrap().name.as_str())
            .collect();
        assert_eq!(names, ["Boyd Field", "Jones Strip"]);

        let first = entries[0].as_ref().unwrap();
        assert!((first.latitude - 38.51).abs() < 1e-9);
        assert!((first.longitude + 75.52).abs() < 1e-9);
        assert_eq!(first.state, "DE");
        assert_eq!(first.source_link, "http://x/DE/Airfields_DE.htm");
        assert_eq!(first.position, Some(1));
        assert_eq!(entries[1].as_ref().unwrap().position, Some(2));
    }

    #[test]
    fn out_of_range_latitude_is_invalid() {
        let entries = extract_entries("__ Nowhere 95.0, -75.0", "DE", "", 7);
        let invalid = entries[0].as_ref().unwrap_err();
        assert_eq!(invalid.position, 7);
        assert_eq!(invalid.name.as_deref(), Some("Nowhere"));
    }

    #[test]
    fn extracts_cached_pages_in_filename_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Airfields_NV.htm"),
            "<p>__ Desert Strip 36.1, -115.2</p>",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("Airfields_AZ_N.htm"),
            "<p>__ Mesa Field 35.0, -111.5</p><p>__ Lost Field 34.0, -112.0</p>",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("links.htm"),
            "<p>__ Stray Entry 10.0, 10.0</p>",
        )
        .unwrap();

        let store = LocalStore::new(dir.path());
        let set = extract_site(&store, "http://airfields.test/").unwrap();

        let rows: Vec<_> = set
            .valid()
            .map(|r| (r.state.as_str(), r.name.as_str()))
            .collect();
        assert_eq!(
            rows,
            [("AZ", "Mesa Field"), ("AZ", "Lost Field"), ("NV", "Desert Strip")]
        );
        assert_eq!(
            set.valid().next().unwrap().source_link,
            "http://airfields.test/AZ/Airfields_AZ_N.htm"
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn unreadable_page_is_recorded_and_the_rest_extracted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Airfields_AZ.htm"),
            "<p>__ Mesa Field 35.0, -111.5</p>",
        )
        .unwrap();
        // Reading offset zero of this file fails with EIO.
        std::os::unix::fs::symlink("/proc/self/mem", dir.path().join("Airfields_NV.htm")).unwrap();

        let store = LocalStore::new(dir.path());
        let set = extract_site(&store, "http://airfields.test/").unwrap();

        assert_eq!(set.valid_count(), 1);
        assert_eq!(set.valid().next().unwrap().name, "Mesa Field");
        let invalid = set.invalid().next().unwrap();
        assert_eq!(invalid.position, 2);
        assert_eq!(invalid.name.as_deref(), Some("Airfields_NV.htm"));
        assert!(matches!(invalid.reason, InvalidReason::Unreadable { .. }));
    }

    #[test]
    fn empty_cache_yields_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("missing"));
        assert!(extract_site(&store, "http://airfields.test/").unwrap().is_empty());
    }
}
