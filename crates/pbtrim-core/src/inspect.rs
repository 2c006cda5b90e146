use tracing::{debug, warn};

use pbtrim_storage::PageBlobBackend;
use pbtrim_types::error::{PbtrimError, Result};
use pbtrim_types::page_range::PageRange;

/// A blob's allocated page ranges at one point in time.
///
/// Ranges are non-empty, ascending and non-overlapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<PageRange>,
}

impl RangeSet {
    /// Validate a raw listing. Zero-length entries are dropped so they can
    /// never be mistaken for the trailer or the last data range.
    pub fn new(blob: &str, raw: Vec<PageRange>) -> Result<Self> {
        let mut ranges: Vec<PageRange> = Vec::with_capacity(raw.len());
        for range in raw {
            if range.is_empty() {
                warn!(blob, offset = range.offset, "dropping zero-length page range");
                continue;
            }
            if range.end().is_none() {
                return Err(PbtrimError::InvalidRangeLayout {
                    blob: blob.to_string(),
                    detail: format!(
                        "range at offset {} with length {} overflows u64",
                        range.offset, range.length
                    ),
                });
            }
            if let Some(prev) = ranges.last() {
                // `prev.end()` was checked when it was pushed.
                let prev_end = prev.offset + prev.length;
                if range.offset < prev_end {
                    return Err(PbtrimError::InvalidRangeLayout {
                        blob: blob.to_string(),
                        detail: format!("range {range} overlaps or precedes range {prev}"),
                    });
                }
            }
            ranges.push(range);
        }
        Ok(Self { ranges })
    }

    pub fn ranges(&self) -> &[PageRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Sum of all range lengths. Cannot overflow: the ranges are disjoint
    /// and each ends within u64.
    pub fn total_allocated_bytes(&self) -> u64 {
        self.ranges.iter().map(|r| r.length).sum()
    }
}

/// Fetch the current page-range map for `blob`.
pub fn inspect(backend: &dyn PageBlobBackend, blob: &str) -> Result<RangeSet> {
    let listing = backend.list_page_ranges(blob)?;
    debug!(
        blob,
        ranges = listing.ranges.len(),
        "listed page ranges at {}",
        listing.ack
    );
    RangeSet::new(blob, listing.ranges)
}
