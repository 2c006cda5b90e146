use serde::Deserialize;

use pbtrim_types::error::{PbtrimError, Result};
use pbtrim_types::page_range::PageRange;

#[derive(Debug, Deserialize)]
struct PageListXml {
    #[serde(rename = "PageRange", default)]
    page_ranges: Vec<RangeXml>,
    #[serde(rename = "NextMarker", default)]
    next_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RangeXml {
    #[serde(rename = "Start")]
    start: u64,
    #[serde(rename = "End")]
    end: u64,
}

/// One page of a `comp=pagelist` response.
#[derive(Debug)]
pub(crate) struct PageListPage {
    pub ranges: Vec<PageRange>,
    pub next_marker: Option<String>,
}

/// Parse a `Get Page Ranges` XML body. Inclusive `<End>` positions are
/// converted into lengths; `<ClearRange>` elements are ignored.
pub(crate) fn parse_page_list(body: &str, blob: &str) -> Result<PageListPage> {
    let body = body.trim_start_matches('\u{feff}');
    let parsed: PageListXml = quick_xml::de::from_str(body).map_err(|e| {
        PbtrimError::Backend(format!("page list for '{blob}': malformed XML: {e}"))
    })?;

    let ranges = parsed
        .page_ranges
        .iter()
        .map(|r| {
            PageRange::from_inclusive(r.start, r.end).ok_or_else(|| {
                PbtrimError::Backend(format!(
                    "page list for '{blob}': range end {} precedes start {}",
                    r.end, r.start
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let next_marker = parsed
        .next_marker
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());

    Ok(PageListPage {
        ranges,
        next_marker,
    })
}
