use tracing::debug;

use pbtrim_storage::PageBlobBackend;
use pbtrim_types::error::{PbtrimError, Result};
use pbtrim_types::page_range::PageRange;

/// Download the trailer range. The buffer is exactly `trailer.length` bytes;
/// anything else would corrupt the rewrite.
pub fn fetch_trailer(
    backend: &dyn PageBlobBackend,
    blob: &str,
    trailer: PageRange,
) -> Result<Vec<u8>> {
    let read = backend.read_range(blob, trailer.offset, trailer.length)?;
    let actual = read.data.len() as u64;
    if actual != trailer.length {
        return Err(PbtrimError::IncompleteRead {
            blob: blob.to_string(),
            offset: trailer.offset,
            expected: trailer.length,
            actual,
        });
    }
    debug!(blob, bytes = actual, "downloaded trailer at {}", read.ack);
    Ok(read.data)
}
