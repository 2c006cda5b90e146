use thiserror::Error;

pub type Result<T> = std::result::Result<T, PbtrimError>;

#[derive(Debug, Error)]
pub enum PbtrimError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error(
        "blob '{blob}' has {found} non-empty page range(s); \
         at least 2 (last data range + trailer) are required"
    )]
    InsufficientRanges { blob: String, found: usize },

    #[error("blob '{blob}' reported an invalid page-range layout: {detail}")]
    InvalidRangeLayout { blob: String, detail: String },

    #[error(
        "incomplete trailer read on '{blob}' at offset {offset}: \
         expected {expected} bytes, got {actual}"
    )]
    IncompleteRead {
        blob: String,
        offset: u64,
        expected: u64,
        actual: u64,
    },

    #[error("target size {requested} bytes exceeds the backend limit of {limit} bytes")]
    SizeLimitExceeded { requested: u128, limit: u64 },

    #[error("trailer of {bytes} bytes exceeds the backend's single-write limit of {limit} bytes")]
    TrailerTooLarge { bytes: u64, limit: u64 },

    /// The trailer was rewritten but the resize did not happen. The trailer
    /// now exists twice and the blob still has its old length.
    #[error(
        "PARTIAL MUTATION on '{blob}': trailer was rewritten at offset {boundary} \
         but resizing to {target_size} bytes failed: {source}. \
         The trailer now exists at both its old and new location and the blob was NOT shrunk; \
         verify the blob manually before re-running"
    )]
    PartialMutation {
        blob: String,
        boundary: u64,
        target_size: u64,
        #[source]
        source: Box<PbtrimError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
