use tracing::{info, warn};

use pbtrim_storage::{PageBlobBackend, backend_from_config};
use pbtrim_types::error::{PbtrimError, Result};

use crate::config::TrimConfig;
use crate::console::{Console, Response};
use crate::execute::{ExecutionReport, execute};
use crate::fetch::fetch_trailer;
use crate::gate::{ConfirmationGate, GateOutcome, Stage};
use crate::inspect::inspect;
use crate::locate::locate;
use crate::plan::{PlanLimits, plan, render_report};

/// How one blob's run ended without error.
#[derive(Debug)]
pub enum BlobOutcome {
    Resized(ExecutionReport),
    /// The operator declined; nothing was written.
    Declined { stage: Stage, response: Response },
}

/// Per-blob results of a run, in processing order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub results: Vec<(String, Result<BlobOutcome>)>,
}

impl RunSummary {
    pub fn resized(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, r)| matches!(r, Ok(BlobOutcome::Resized(_))))
            .count()
    }

    pub fn declined(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, r)| matches!(r, Ok(BlobOutcome::Declined { .. })))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_err()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// First failure, for callers that want a single error.
    pub fn first_error(&self) -> Option<(&str, &PbtrimError)> {
        self.results
            .iter()
            .find_map(|(blob, r)| r.as_ref().err().map(|e| (blob.as_str(), e)))
    }
}

/// inspect → locate → fetch → plan → confirm → execute, for one blob.
///
/// Re-running against an already corrected blob computes the same plan and
/// prompts again; there is no "already done" detection.
pub fn process_blob(
    backend: &dyn PageBlobBackend,
    blob: &str,
    console: &mut dyn Console,
) -> Result<BlobOutcome> {
    console.line(&format!("Blob: {blob}"))?;

    console.line("Requesting pages...")?;
    let ranges = inspect(backend, blob)?;
    for range in ranges.ranges() {
        console.line(&format!("\t{range}"))?;
    }
    info!(
        blob,
        ranges = ranges.len(),
        allocated = ranges.total_allocated_bytes(),
        "inspected page ranges"
    );

    let location = locate(&ranges, blob)?;
    info!(
        blob,
        boundary = location.boundary_offset,
        trailer_offset = location.trailer_range.offset,
        trailer_len = location.trailer_range.length,
        "located trailer"
    );

    console.line(&format!(
        "Downloading trailer page of {} bytes...",
        location.trailer_range.length
    ))?;
    let trailer = fetch_trailer(backend, blob, location.trailer_range)?;

    let plan = plan(location.boundary_offset, trailer, PlanLimits::of(backend))?;
    let report = render_report(&ranges, &location, &plan);

    match ConfirmationGate::new().run(console, &report)? {
        GateOutcome::Aborted { stage, response } => {
            let msg = match response {
                Response::Key(_) => format!("{response} was pressed, skipping..."),
                Response::EndOfInput => "No response (end of input), skipping...".to_string(),
            };
            console.line(&msg)?;
            Ok(BlobOutcome::Declined { stage, response })
        }
        GateOutcome::Approved(approval) => {
            let report = execute(backend, blob, plan, approval, console)?;
            console.line(&format!("Done with blob: {blob}"))?;
            Ok(BlobOutcome::Resized(report))
        }
    }
}

/// Process every blob in order. A failure is reported and the run moves on
/// to the next blob; nothing is retried.
pub fn run_blobs(
    backend: &dyn PageBlobBackend,
    blobs: &[String],
    console: &mut dyn Console,
) -> RunSummary {
    let mut summary = RunSummary::default();
    for blob in blobs {
        let result = process_blob(backend, blob, console);
        if let Err(e) = &result {
            warn!(blob = %blob, "blob processing failed: {e}");
            if let Err(io) = console.error(&format!("failed to process blob '{blob}': {e}")) {
                warn!("failed to report error to console: {io}");
            }
        }
        summary.results.push((blob.clone(), result));
    }
    summary
}

/// Connect to the configured container and process its blobs.
pub fn run(config: &TrimConfig, console: &mut dyn Console) -> Result<RunSummary> {
    let backend = backend_from_config(&config.storage)?;
    info!(
        container = %config.storage.container,
        blobs = config.blobs.len(),
        "starting trailer relocation run"
    );
    Ok(run_blobs(backend.as_ref(), &config.blobs, console))
}
