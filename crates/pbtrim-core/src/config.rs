use pbtrim_storage::{ConnectionString, StorageConfig};
use pbtrim_types::error::{PbtrimError, Result};

pub const CONNECTION_STRING_ENV: &str = "AZURE_STORAGE_CONNECTION_STRING";
pub const CONTAINER_ENV: &str = "AZURE_STORAGE_CONTAINER_NAME";
pub const BLOB_NAMES_ENV: &str = "AZURE_STORAGE_BLOB_NAME";

/// Immutable run configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct TrimConfig {
    pub storage: StorageConfig,
    /// Blobs to process, in order.
    pub blobs: Vec<String>,
}

impl TrimConfig {
    /// Validate the three raw inputs. Missing or blank values are rejected
    /// before anything touches the network.
    pub fn from_inputs(
        connection_string: Option<&str>,
        container: Option<&str>,
        blob_names: Option<&str>,
    ) -> Result<Self> {
        let connection_string = required(connection_string, CONNECTION_STRING_ENV)?;
        let container = required(container, CONTAINER_ENV)?;
        let blob_names = required(blob_names, BLOB_NAMES_ENV)?;

        let blobs = parse_blob_list(blob_names);
        if blobs.is_empty() {
            return Err(PbtrimError::Config(format!(
                "`{BLOB_NAMES_ENV}` contains no blob names"
            )));
        }

        let connection = ConnectionString::parse(connection_string)?;

        Ok(Self {
            storage: StorageConfig {
                connection,
                container: container.trim().to_string(),
            },
            blobs,
        })
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(PbtrimError::Config(format!(
            "a non-blank value for `{name}` is required"
        ))),
    }
}

/// Split a comma-separated list, trimming whitespace and dropping empty entries.
pub fn parse_blob_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
