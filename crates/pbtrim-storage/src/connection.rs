use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;
use url::Url;

use pbtrim_types::error::{PbtrimError, Result};

/// Well-known Azurite account used by `UseDevelopmentStorage=true`.
pub const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";
pub const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// How requests against the blob endpoint are authorized.
#[derive(Clone)]
pub enum Credential {
    SharedKey { account: String, key: Vec<u8> },
    Sas(String),
    Anonymous,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::SharedKey { account, .. } => f
                .debug_struct("SharedKey")
                .field("account", account)
                .field("key", &"<redacted>")
                .finish(),
            Credential::Sas(_) => f.write_str("Sas(<redacted>)"),
            Credential::Anonymous => f.write_str("Anonymous"),
        }
    }
}

/// A parsed storage-account connection string.
#[derive(Debug, Clone)]
pub struct ConnectionString {
    pub blob_endpoint: Url,
    pub credential: Credential,
}

impl ConnectionString {
    /// Parse a `Key=Value;Key=Value` connection string.
    ///
    /// Recognized keys (case-insensitive): `DefaultEndpointsProtocol`,
    /// `AccountName`, `AccountKey`, `EndpointSuffix`, `BlobEndpoint`,
    /// `SharedAccessSignature` and `UseDevelopmentStorage`. Other keys
    /// (queue/table endpoints and the like) are ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut protocol = None;
        let mut account_name = None;
        let mut account_key = None;
        let mut suffix = None;
        let mut blob_endpoint = None;
        let mut sas = None;
        let mut dev_storage = false;

        for segment in raw.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            // Values may contain '=' (base64 padding, SAS query strings).
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                PbtrimError::Config(format!(
                    "malformed connection string segment '{}': expected Key=Value",
                    redact_segment(segment)
                ))
            })?;
            let value = value.trim().to_string();
            match key.trim().to_ascii_lowercase().as_str() {
                "defaultendpointsprotocol" => protocol = Some(value),
                "accountname" => account_name = Some(value),
                "accountkey" => account_key = Some(value),
                "endpointsuffix" => suffix = Some(value),
                "blobendpoint" => blob_endpoint = Some(value),
                "sharedaccesssignature" => sas = Some(value),
                "usedevelopmentstorage" => dev_storage = value.eq_ignore_ascii_case("true"),
                other => debug!("ignoring connection string key '{other}'"),
            }
        }

        if dev_storage {
            account_name.get_or_insert_with(|| DEV_ACCOUNT_NAME.to_string());
            account_key.get_or_insert_with(|| DEV_ACCOUNT_KEY.to_string());
            blob_endpoint.get_or_insert_with(|| DEV_BLOB_ENDPOINT.to_string());
        }

        let endpoint = match blob_endpoint {
            Some(ep) => ep,
            None => {
                let account = account_name.as_deref().ok_or_else(|| {
                    PbtrimError::Config(
                        "connection string needs either BlobEndpoint or AccountName".into(),
                    )
                })?;
                format!(
                    "{}://{account}.blob.{}",
                    protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL),
                    suffix.as_deref().unwrap_or(DEFAULT_ENDPOINT_SUFFIX),
                )
            }
        };
        let blob_endpoint = parse_endpoint(&endpoint)?;

        let credential = match (account_key, sas) {
            (Some(key), _) => {
                let account = account_name.ok_or_else(|| {
                    PbtrimError::Config("connection string has AccountKey but no AccountName".into())
                })?;
                let key = STANDARD.decode(key.as_bytes()).map_err(|e| {
                    PbtrimError::Config(format!("AccountKey is not valid base64: {e}"))
                })?;
                Credential::SharedKey { account, key }
            }
            (None, Some(sas)) => Credential::Sas(sas.trim_start_matches('?').to_string()),
            (None, None) => Credential::Anonymous,
        };

        Ok(Self {
            blob_endpoint,
            credential,
        })
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint).map_err(|e| {
        PbtrimError::Config(format!("invalid blob endpoint URL '{endpoint}': {e}"))
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(PbtrimError::Config(format!(
            "blob endpoint '{endpoint}' must be an http(s) URL"
        )));
    }
    Ok(url)
}

/// Keep secrets out of error messages.
fn redact_segment(segment: &str) -> String {
    if segment.chars().count() > 16 {
        format!("{}...", segment.chars().take(16).collect::<String>())
    } else {
        segment.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_account_connection_string() {
        let cs = ConnectionString::parse(&format!(
            "DefaultEndpointsProtocol=https;AccountName=myacct;AccountKey={DEV_ACCOUNT_KEY};EndpointSuffix=core.windows.net"
        ))
        .unwrap();
        assert_eq!(
            cs.blob_endpoint.as_str(),
            "https://myacct.blob.core.windows.net/"
        );
        match cs.credential {
            Credential::SharedKey { account, key } => {
                assert_eq!(account, "myacct");
                assert_eq!(key.len(), 64);
            }
            other => panic!("expected shared key, got {other:?}"),
        }
    }

    #[test]
    fn explicit_blob_endpoint_wins() {
        let cs = ConnectionString::parse(
            "BlobEndpoint=http://localhost:9999/acct;SharedAccessSignature=?sv=2021&sig=abc%3D",
        )
        .unwrap();
        assert_eq!(cs.blob_endpoint.as_str(), "http://localhost:9999/acct");
        assert!(matches!(cs.credential, Credential::Sas(ref s) if s == "sv=2021&sig=abc%3D"));
    }

    #[test]
    fn development_storage_shorthand() {
        let cs = ConnectionString::parse("UseDevelopmentStorage=true").unwrap();
        assert_eq!(
            cs.blob_endpoint.as_str(),
            "http://127.0.0.1:10000/devstoreaccount1"
        );
        assert!(matches!(
            cs.credential,
            Credential::SharedKey { ref account, .. } if account == DEV_ACCOUNT_NAME
        ));
    }

    #[test]
    fn keys_are_case_insensitive_and_trailing_semicolon_ok() {
        let cs = ConnectionString::parse("accountname=a1;ENDPOINTSUFFIX=example.net;").unwrap();
        assert_eq!(cs.blob_endpoint.as_str(), "https://a1.blob.example.net/");
        assert!(matches!(cs.credential, Credential::Anonymous));
    }

    #[test]
    fn rejects_missing_account_and_endpoint() {
        let err = ConnectionString::parse("DefaultEndpointsProtocol=https")
            .unwrap_err()
            .to_string();
        assert!(err.contains("BlobEndpoint or AccountName"), "got: {err}");
    }

    #[test]
    fn rejects_invalid_account_key() {
        let err = ConnectionString::parse("AccountName=a;AccountKey=not*base64")
            .unwrap_err()
            .to_string();
        assert!(err.contains("not valid base64"), "got: {err}");
    }

    #[test]
    fn rejects_segment_without_equals() {
        let err = ConnectionString::parse("AccountName=a;garbage")
            .unwrap_err()
            .to_string();
        assert!(err.contains("expected Key=Value"), "got: {err}");
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let err = ConnectionString::parse("BlobEndpoint=ftp://host/x")
            .unwrap_err()
            .to_string();
        assert!(err.contains("must be an http(s) URL"), "got: {err}");
    }

    #[test]
    fn debug_output_redacts_key() {
        let cs = ConnectionString::parse("UseDevelopmentStorage=true").unwrap();
        let dbg = format!("{cs:?}");
        assert!(!dbg.contains(DEV_ACCOUNT_KEY));
        assert!(dbg.contains("<redacted>"));
    }
}
