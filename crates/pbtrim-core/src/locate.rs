use pbtrim_types::error::{PbtrimError, Result};
use pbtrim_types::page_range::PageRange;

use crate::inspect::RangeSet;

/// Where the trailer is now and where genuine data is assumed to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailerLocation {
    /// Second-to-last range: assumed to be the last genuine data.
    pub data_range: PageRange,
    /// Last range: assumed to be the appended trailer.
    pub trailer_range: PageRange,
    /// First byte past the data range.
    pub boundary_offset: u64,
}

/// Pick the trailer and the data/trailer boundary.
///
/// This is a heuristic: the last reported range is *assumed* to be an
/// appended trailer. Nothing here verifies that.
pub fn locate(ranges: &RangeSet, blob: &str) -> Result<TrailerLocation> {
    let [.., data_range, trailer_range] = ranges.ranges() else {
        return Err(PbtrimError::InsufficientRanges {
            blob: blob.to_string(),
            found: ranges.len(),
        });
    };

    let boundary_offset = data_range
        .end()
        .ok_or_else(|| PbtrimError::InvalidRangeLayout {
            blob: blob.to_string(),
            detail: format!("data range {data_range} overflows u64"),
        })?;

    Ok(TrailerLocation {
        data_range: *data_range,
        trailer_range: *trailer_range,
        boundary_offset,
    })
}
