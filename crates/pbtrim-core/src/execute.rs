use tracing::{error, info};

use pbtrim_storage::{BackendAck, PageBlobBackend};
use pbtrim_types::error::{PbtrimError, Result};

use crate::console::Console;
use crate::gate::Approval;
use crate::plan::TrailerPlan;

/// What the mutation did, with the service's confirmations.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub boundary_offset: u64,
    pub target_size: u64,
    pub trailer_written: BackendAck,
    pub resized: BackendAck,
}

/// Relocate the trailer and shrink the blob.
///
/// Two phases, never reordered:
/// 1. write the trailer at the boundary. A failure here leaves the blob as
///    it was and is reported as a plain backend error;
/// 2. resize to the target size. A failure after phase 1 leaves the trailer
///    duplicated and the blob unshrunk, reported as
///    [`PbtrimError::PartialMutation`].
///
/// The resize clears every page past the target size.
pub fn execute(
    backend: &dyn PageBlobBackend,
    blob: &str,
    plan: TrailerPlan,
    _approval: Approval,
    console: &mut dyn Console,
) -> Result<ExecutionReport> {
    let TrailerPlan {
        boundary_offset,
        trailer_bytes,
        target_size,
    } = plan;

    console.line(&format!("Writing trailer to {boundary_offset}... "))?;
    let trailer_written = backend.write_range(blob, boundary_offset, &trailer_bytes)?;
    info!(
        blob,
        boundary_offset,
        bytes = trailer_bytes.len(),
        "trailer rewritten"
    );

    // From here on the blob is mid-mutation; every failure is partial.
    let resized = console
        .line(&format!(
            "Rewrote trailer successfully on {trailer_written}. \
             Proceeding with resize to {target_size} bytes... "
        ))
        .map_err(PbtrimError::from)
        .and_then(|()| backend.resize(blob, target_size))
        .map_err(|source| {
            error!(blob, boundary_offset, target_size, "resize failed after trailer rewrite");
            PbtrimError::PartialMutation {
                blob: blob.to_string(),
                boundary: boundary_offset,
                target_size,
                source: Box::new(source),
            }
        })?;
    info!(blob, target_size, "blob resized");
    console.line(&format!("Resize successful on {resized}."))?;

    Ok(ExecutionReport {
        boundary_offset,
        target_size,
        trailer_written,
        resized,
    })
}
