//! Table-cell parsing for index pages.
//!
//! Both the root index and the state pages list their children as `<td>`
//! cells holding one `href="...htm"` link and one `M/D/YY` update date.
//! Parsing a cell never fails: the outcome says what was found and the
//! walker decides whether to skip.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{Html, Selector};

use crate::ScrapeError;
use crate::freshness::remote_last_modified;

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)href\s*=\s*"([^".]+\.htm)""#).expect("valid regex"));

static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("valid selector"));

/// A cell that yielded both a link and a date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellEntry {
    /// Link target relative to the page it was found on.
    pub link: String,
    /// Date the site says the linked page was last updated.
    pub last_modified: NaiveDate,
}

/// What a single table cell contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellOutcome {
    Entry(CellEntry),
    /// No `.htm` link; usually a layout or caption cell.
    NoLink,
    /// A link with no parseable date next to it.
    NoDate {
        link: String,
        reason: String,
    },
}

impl CellOutcome {
    /// Whether the cell carried a link at all.
    #[must_use]
    pub const fn has_link(&self) -> bool {
        !matches!(self, Self::NoLink)
    }
}

/// Extracts the first `href="...htm"` target from an HTML fragment.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] if the fragment has no such link.
pub fn extract_link(fragment: &str) -> Result<String, ScrapeError> {
    LINK_RE
        .captures(fragment)
        .map(|caps| caps[1].to_owned())
        .ok_or_else(|| ScrapeError::Parse("no .htm link in fragment".to_owned()))
}

/// Classifies one cell's HTML.
#[must_use]
pub fn parse_cell(fragment: &str) -> CellOutcome {
    let Ok(link) = extract_link(fragment) else {
        return CellOutcome::NoLink;
    };
    match remote_last_modified(fragment) {
        Ok(last_modified) => CellOutcome::Entry(CellEntry {
            link,
            last_modified,
        }),
        Err(e) => CellOutcome::NoDate {
            link,
            reason: e.to_string(),
        },
    }
}

/// Outer HTML of every `<td>` in a document, in document order.
#[must_use]
pub fn table_cells(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&CELL_SELECTOR)
        .map(|el| el.html())
        .collect()
}

/// Parses every table cell of a document.
#[must_use]
pub fn parse_cells(html: &str) -> Vec<CellOutcome> {
    table_cells(html).iter().map(|c| parse_cell(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_link() {
        let html = r#"<td><a href="CA/Airfields_CA.htm">CA</a> <a href="x/other.htm">x</a></td>"#;
        assert_eq!(extract_link(html).unwrap(), "CA/Airfields_CA.htm");
    }

    #[test]
    fn link_attribute_is_case_insensitive() {
        let html = r#"<TD><A HREF="NV/Airfields_NV.htm">Nevada</A></TD>"#;
        assert_eq!(extract_link(html).unwrap(), "NV/Airfields_NV.htm");
    }

    #[test]
    fn ignores_non_htm_links() {
        assert!(extract_link(r#"<a href="pic.jpg">x</a>"#).is_err());
    }

    #[test]
    fn cell_with_link_and_date_is_entry() {
        let outcome = parse_cell(r#"<td><a href="Airfields_CA_SF.htm">SF</a> 7/14/19</td>"#);
        assert_eq!(
            outcome,
            CellOutcome::Entry(CellEntry {
                link: "Airfields_CA_SF.htm".to_string(),
                last_modified: NaiveDate::from_ymd_opt(2019, 7, 14).unwrap(),
            })
        );
    }

    #[test]
    fn cell_without_link() {
        assert_eq!(parse_cell("<td>Legend 1/1/20</td>"), CellOutcome::NoLink);
        assert!(!CellOutcome::NoLink.has_link());
    }

    #[test]
    fn cell_with_link_but_no_date() {
        let outcome = parse_cell(r#"<td><a href="Airfields_WY.htm">WY</a></td>"#);
        assert!(matches!(outcome, CellOutcome::NoDate { ref link, .. } if link == "Airfields_WY.htm"));
        assert!(outcome.has_link());
    }

    #[test]
    fn enumerates_cells_in_document_order() {
        let html = r#"<html><body><table>
            <tr><td><a href="AK/Airfields_AK.htm">AK</a> 2/3/21</td>
                <td><a href="AL/Airfields_AL.htm">AL</a> 4/5/18</td></tr>
            <tr><td>spacer</td></tr>
        </table></body></html>"#;

        let cells = parse_cells(html);
        assert_eq!(cells.len(), 3);
        assert!(matches!(&cells[0], CellOutcome::Entry(e) if e.link == "AK/Airfields_AK.htm"));
        assert!(matches!(&cells[1], CellOutcome::Entry(e) if e.link == "AL/Airfields_AL.htm"));
        assert_eq!(cells[2], CellOutcome::NoLink);
    }

    #[test]
    fn page_without_cells_is_empty() {
        assert!(parse_cells("<html><body><p>No table</p></body></html>").is_empty());
    }
}
