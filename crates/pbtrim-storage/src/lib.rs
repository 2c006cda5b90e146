pub mod azure_backend;
pub mod connection;
mod http_util;
mod page_list;
mod shared_key;

use std::fmt;

use chrono::{DateTime, Utc};

use pbtrim_types::error::Result;
use pbtrim_types::page_range::PageRange;

pub use azure_backend::AzurePageBlobBackend;
pub use connection::{ConnectionString, Credential};

/// Page size of the page-blob service; writes and resizes must align to it.
pub const PAGE_SIZE: u64 = 512;
/// Largest page blob the service allows (8 TiB).
pub const MAX_PAGE_BLOB_SIZE: u64 = 8 * 1024 * 1024 * 1024 * 1024;
/// Largest body accepted by a single Put Page call (4 MiB).
pub const MAX_PAGE_WRITE_SIZE: u64 = 4 * 1024 * 1024;

/// Service-side confirmation of a completed call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendAck {
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

impl fmt::Display for BackendAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.last_modified {
            Some(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S UTC"))?,
            None => f.write_str("<no timestamp reported>")?,
        }
        if let Some(etag) = &self.etag {
            write!(f, " (etag {etag})")?;
        }
        Ok(())
    }
}

/// Result of listing a blob's allocated page ranges.
#[derive(Debug, Clone)]
pub struct PageRangeListing {
    /// Ranges in the order the service reported them.
    pub ranges: Vec<PageRange>,
    pub ack: BackendAck,
}

/// Bytes returned by a ranged read. `data` may be shorter than requested.
#[derive(Debug, Clone)]
pub struct RangeRead {
    pub data: Vec<u8>,
    pub ack: BackendAck,
}

/// Page-addressable remote blob store.
///
/// Every call is a single blocking remote operation. Implementations never
/// retry; a failure is reported as [`PbtrimError::Backend`].
///
/// [`PbtrimError::Backend`]: pbtrim_types::error::PbtrimError::Backend
pub trait PageBlobBackend: Send + Sync {
    fn list_page_ranges(&self, blob: &str) -> Result<PageRangeListing>;

    fn read_range(&self, blob: &str, offset: u64, length: u64) -> Result<RangeRead>;

    /// Write `data` at `offset` in one call. Either every byte lands or
    /// nothing does.
    fn write_range(&self, blob: &str, offset: u64, data: &[u8]) -> Result<BackendAck>;

    fn resize(&self, blob: &str, size: u64) -> Result<BackendAck>;

    /// Largest blob size the backend accepts.
    fn max_blob_size(&self) -> u64 {
        MAX_PAGE_BLOB_SIZE
    }

    /// Largest body a single `write_range` call accepts.
    fn max_write_size(&self) -> u64 {
        MAX_PAGE_WRITE_SIZE
    }
}

/// Everything needed to reach one container.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub connection: ConnectionString,
    pub container: String,
}

/// Build the page-blob backend for a container.
pub fn backend_from_config(cfg: &StorageConfig) -> Result<Box<dyn PageBlobBackend>> {
    Ok(Box::new(AzurePageBlobBackend::new(
        &cfg.connection,
        &cfg.container,
    )?))
}
