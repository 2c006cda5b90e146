use pbtrim_storage::PageBlobBackend;
use pbtrim_types::error::{PbtrimError, Result};

use crate::inspect::RangeSet;
use crate::locate::TrailerLocation;

/// Bytes of the trailer shown verbatim in the report.
const PREVIEW_LIMIT: usize = 512;

const GIB: f64 = (1u64 << 30) as f64;

/// What the mutation will do. Consumed by the executor or dropped on decline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailerPlan {
    /// New trailer offset, and first byte past genuine data.
    pub boundary_offset: u64,
    pub trailer_bytes: Vec<u8>,
    /// `boundary_offset + trailer_bytes.len()`.
    pub target_size: u64,
}

/// Backend limits a plan must respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    pub max_blob_size: u64,
    /// The trailer is rewritten in a single call, so it must fit in one.
    pub max_write_size: u64,
}

impl PlanLimits {
    pub fn of(backend: &dyn PageBlobBackend) -> Self {
        Self {
            max_blob_size: backend.max_blob_size(),
            max_write_size: backend.max_write_size(),
        }
    }
}

/// Compute the target size. Fails when the trailer cannot be written in one
/// call or the result would not fit in the backend.
pub fn plan(boundary_offset: u64, trailer_bytes: Vec<u8>, limits: PlanLimits) -> Result<TrailerPlan> {
    let PlanLimits {
        max_blob_size,
        max_write_size,
    } = limits;
    if trailer_bytes.len() as u64 > max_write_size {
        return Err(PbtrimError::TrailerTooLarge {
            bytes: trailer_bytes.len() as u64,
            limit: max_write_size,
        });
    }
    let requested = boundary_offset as u128 + trailer_bytes.len() as u128;
    if requested > max_blob_size as u128 {
        return Err(PbtrimError::SizeLimitExceeded {
            requested,
            limit: max_blob_size,
        });
    }
    Ok(TrailerPlan {
        boundary_offset,
        target_size: requested as u64,
        trailer_bytes,
    })
}

/// Render the operator report that precedes the confirmation prompts.
///
/// Every line here is required output: it is the only evidence the operator
/// gets before an irreversible write.
pub fn render_report(ranges: &RangeSet, location: &TrailerLocation, plan: &TrailerPlan) -> Vec<String> {
    let last_data_byte = plan.boundary_offset.saturating_sub(1);
    vec![
        format!("Trailer range: {}", trailer_preview(&plan.trailer_bytes)),
        format!(
            "Trailer is the last reported range {}; last data range is {}",
            location.trailer_range, location.data_range
        ),
        format!("ASSUMPTION: Last data byte is at position {last_data_byte}"),
        "⚠️  IF THIS IS WRONG, STOP NOW!! ⚠️".to_string(),
        String::new(),
        format!(
            "[Total size of all pages: {} GiB]",
            format_gib(ranges.total_allocated_bytes())
        ),
        String::new(),
        "=======================".to_string(),
        String::new(),
        format!(
            "Will resize to {}, rewriting trailer to {}-{} are you SURE?",
            plan.target_size, plan.boundary_offset, plan.target_size
        ),
        "ℹ️  If you haven't yet, you should probably create a snapshot BEFORE you do this!"
            .to_string(),
        "This will CLEAR any pages after this offset!!!".to_string(),
    ]
}

pub fn format_gib(bytes: u64) -> String {
    format!("{:.3}", bytes as f64 / GIB)
}

/// Printable rendering of the trailer: text stays, everything else is a dot.
fn trailer_preview(bytes: &[u8]) -> String {
    let shown = &bytes[..bytes.len().min(PREVIEW_LIMIT)];
    let mut preview: String = String::from_utf8_lossy(shown)
        .chars()
        .map(|c| if c.is_control() || c == '\u{fffd}' { '.' } else { c })
        .collect();
    if bytes.len() > PREVIEW_LIMIT {
        preview.push_str(&format!(" ... ({} more bytes)", bytes.len() - PREVIEW_LIMIT));
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbtrim_types::page_range::PageRange;

    fn limits(max_blob_size: u64) -> PlanLimits {
        PlanLimits {
            max_blob_size,
            max_write_size: u64::MAX,
        }
    }

    #[test]
    fn target_is_boundary_plus_trailer_length() {
        let p = plan(1500, vec![0u8; 10], limits(u64::MAX)).unwrap();
        assert_eq!(p.boundary_offset, 1500);
        assert_eq!(p.target_size, 1510);
    }

    #[test]
    fn target_at_limit_is_allowed() {
        let p = plan(1024, vec![0u8; 512], limits(1536)).unwrap();
        assert_eq!(p.target_size, 1536);
    }

    #[test]
    fn target_over_limit_is_rejected() {
        let err = plan(1024, vec![0u8; 512], limits(1535)).unwrap_err();
        assert!(matches!(
            err,
            PbtrimError::SizeLimitExceeded { requested: 1536, limit: 1535 }
        ));
    }

    #[test]
    fn overflowing_target_is_rejected() {
        let err = plan(u64::MAX, vec![0u8; 1], limits(u64::MAX)).unwrap_err();
        assert!(matches!(err, PbtrimError::SizeLimitExceeded { .. }));
    }

    #[test]
    fn trailer_over_write_limit_is_rejected() {
        let limits = PlanLimits {
            max_blob_size: u64::MAX,
            max_write_size: 1024,
        };
        assert!(plan(0, vec![0u8; 1024], limits).is_ok());
        let err = plan(0, vec![0u8; 1536], limits).unwrap_err();
        assert!(matches!(
            err,
            PbtrimError::TrailerTooLarge { bytes: 1536, limit: 1024 }
        ));
    }

    #[test]
    fn report_contains_assumption_and_sizes() {
        let ranges = RangeSet::new(
            "b",
            vec![PageRange::new(0, 1000), PageRange::new(1000, 500), PageRange::new(1500, 10)],
        )
        .unwrap();
        let location = crate::locate::locate(&ranges, "b").unwrap();
        let p = plan(location.boundary_offset, b"conectix\0\0".to_vec(), limits(u64::MAX)).unwrap();
        let report = render_report(&ranges, &location, &p).join("\n");

        assert!(report.contains("Trailer range: conectix.."), "{report}");
        assert!(report.contains("ASSUMPTION: Last data byte is at position 1499"));
        assert!(report.contains("IF THIS IS WRONG, STOP NOW"));
        assert!(report.contains("[Total size of all pages: 0.000 GiB]"));
        assert!(report.contains("Will resize to 1510, rewriting trailer to 1500-1510"));
        assert!(report.contains("CLEAR any pages after this offset"));
    }

    #[test]
    fn preview_is_truncated() {
        let preview = trailer_preview(&vec![b'a'; PREVIEW_LIMIT + 20]);
        assert!(preview.ends_with(" ... (20 more bytes)"));
    }

    #[test]
    fn gib_formatting() {
        assert_eq!(format_gib(1 << 30), "1.000");
        assert_eq!(format_gib(3 << 29), "1.500");
    }
}
