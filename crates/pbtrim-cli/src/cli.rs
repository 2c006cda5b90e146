use clap::Parser;

#[derive(Parser)]
#[command(
    name = "pbtrim",
    version,
    about = "Relocate a page blob's trailer to the end of its real data and shrink the blob",
    after_help = "\
Every input can be given as a flag or through its environment variable:
  AZURE_STORAGE_CONNECTION_STRING   Storage account connection string
  AZURE_STORAGE_CONTAINER_NAME      Container holding the blobs
  AZURE_STORAGE_BLOB_NAME           Comma-separated blob names, processed in order

Each blob is inspected, a plan is printed, and nothing is written until you
confirm twice. Take a snapshot of the blob first: pages past the new size are
cleared permanently."
)]
pub(crate) struct Cli {
    /// Storage account connection string
    #[arg(long, env = "AZURE_STORAGE_CONNECTION_STRING", hide_env_values = true)]
    pub connection_string: Option<String>,

    /// Container holding the blobs
    #[arg(long, env = "AZURE_STORAGE_CONTAINER_NAME")]
    pub container: Option<String>,

    /// Comma-separated blob names
    #[arg(long, env = "AZURE_STORAGE_BLOB_NAME")]
    pub blobs: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
