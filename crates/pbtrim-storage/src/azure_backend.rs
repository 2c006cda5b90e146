use std::io::Read;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;
use url::Url;

use pbtrim_types::error::{PbtrimError, Result};

use crate::connection::{ConnectionString, Credential};
use crate::http_util::{ack_from_response, describe_error, format_http_date};
use crate::page_list::parse_page_list;
use crate::shared_key::{SignableRequest, authorization};
use crate::{
    BackendAck, MAX_PAGE_WRITE_SIZE, PAGE_SIZE, PageBlobBackend, PageRangeListing, RangeRead,
};

const API_VERSION: &str = "2021-08-06";

/// Page-blob backend speaking the Azure Blob Storage REST API.
pub struct AzurePageBlobBackend {
    agent: ureq::Agent,
    endpoint: Url,
    container: String,
    credential: Credential,
}

impl AzurePageBlobBackend {
    pub fn new(connection: &ConnectionString, container: &str) -> Result<Self> {
        let container = container.trim().trim_matches('/');
        if container.is_empty() {
            return Err(PbtrimError::Config("container name must not be empty".into()));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(30))
            .timeout_read(Duration::from_secs(300))
            .timeout_write(Duration::from_secs(300))
            .build();

        Ok(Self {
            agent,
            endpoint: connection.blob_endpoint.clone(),
            container: container.to_string(),
            credential: connection.credential.clone(),
        })
    }

    /// `{endpoint}/{container}/{blob}?{query}`, with each path segment encoded.
    fn blob_url(&self, blob: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                PbtrimError::Config(format!("blob endpoint '{}' cannot take a path", self.endpoint))
            })?;
            segments.pop_if_empty();
            segments.push(&self.container);
            segments.extend(blob.split('/'));
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Build an authorized request. `ms_headers` are the operation-specific
    /// `x-ms-*` headers; date and version are added here.
    fn request(
        &self,
        method: &str,
        mut url: Url,
        mut ms_headers: Vec<(String, String)>,
        content_length: u64,
    ) -> ureq::Request {
        ms_headers.push(("x-ms-date".into(), format_http_date(Utc::now())));
        ms_headers.push(("x-ms-version".into(), API_VERSION.into()));

        let auth = match &self.credential {
            Credential::SharedKey { account, key } => Some(authorization(
                account,
                key,
                &SignableRequest {
                    method,
                    url: &url,
                    content_length,
                    ms_headers: &ms_headers,
                },
            )),
            Credential::Sas(sas) => {
                let query = match url.query() {
                    Some(q) if !q.is_empty() => format!("{q}&{sas}"),
                    _ => sas.clone(),
                };
                url.set_query(Some(&query));
                None
            }
            Credential::Anonymous => None,
        };

        let mut req = self.agent.request_url(method, &url);
        for (name, value) in &ms_headers {
            req = req.set(name, value);
        }
        if let Some(auth) = auth {
            req = req.set("Authorization", &auth);
        }
        req
    }

    fn check_aligned(blob: &str, what: &str, value: u64) -> Result<()> {
        if value % PAGE_SIZE != 0 {
            return Err(PbtrimError::Backend(format!(
                "{blob}: {what} {value} is not a multiple of the {PAGE_SIZE}-byte page size"
            )));
        }
        Ok(())
    }

    /// Check that a 206 answered the requested span:
    /// `bytes {start}-{end}/{total}` with `start == offset` and
    /// `end - start + 1 == length`.
    fn validate_content_range(
        header: Option<&str>,
        offset: u64,
        length: u64,
        blob: &str,
    ) -> Result<()> {
        let header = header.ok_or_else(|| {
            PbtrimError::Backend(format!("GET_RANGE {blob}: 206 response without Content-Range"))
        })?;
        let malformed = || {
            PbtrimError::Backend(format!(
                "GET_RANGE {blob}: malformed Content-Range header: {header}"
            ))
        };
        let (range_part, _total) = header
            .trim()
            .strip_prefix("bytes ")
            .and_then(|rest| rest.split_once('/'))
            .ok_or_else(malformed)?;
        let (start, end) = range_part.split_once('-').ok_or_else(malformed)?;
        let start: u64 = start.trim().parse().map_err(|_| malformed())?;
        let end: u64 = end.trim().parse().map_err(|_| malformed())?;
        let range_len = end
            .checked_sub(start)
            .and_then(|d| d.checked_add(1))
            .ok_or_else(malformed)?;
        if start != offset || range_len != length {
            return Err(PbtrimError::Backend(format!(
                "GET_RANGE {blob}: Content-Range mismatch: expected {length} bytes \
                 at offset {offset}, got {header}"
            )));
        }
        Ok(())
    }

    fn put_page(&self, blob: &str, offset: u64, data: &[u8]) -> Result<BackendAck> {
        let length = data.len() as u64;
        let end = offset
            .checked_add(length - 1)
            .ok_or_else(|| {
                PbtrimError::Backend(format!(
                    "PUT_PAGE {blob}: offset {offset} + length {length} overflows u64"
                ))
            })?;
        let url = self.blob_url(blob, &[("comp", "page")])?;
        let headers = vec![
            ("x-ms-page-write".to_string(), "update".to_string()),
            ("x-ms-range".to_string(), format!("bytes={offset}-{end}")),
        ];
        debug!(blob, offset, length, "PUT page");
        let resp = self
            .request("PUT", url, headers, length)
            .send_bytes(data)
            .map_err(|e| {
                PbtrimError::Backend(format!(
                    "PUT_PAGE {blob} bytes={offset}-{end}: {}",
                    describe_error(e)
                ))
            })?;
        if resp.status() != 201 {
            return Err(PbtrimError::Backend(format!(
                "PUT_PAGE {blob}: unexpected status {}",
                resp.status()
            )));
        }
        Ok(ack_from_response(&resp))
    }
}

impl PageBlobBackend for AzurePageBlobBackend {
    fn list_page_ranges(&self, blob: &str) -> Result<PageRangeListing> {
        let mut ranges = Vec::new();
        let mut marker: Option<String> = None;
        let mut ack = BackendAck::default();

        loop {
            let mut query = vec![("comp", "pagelist")];
            if let Some(m) = marker.as_deref() {
                query.push(("marker", m));
            }
            let url = self.blob_url(blob, &query)?;
            debug!(blob, marker = marker.as_deref().unwrap_or(""), "GET page ranges");

            let resp = self
                .request("GET", url, Vec::new(), 0)
                .call()
                .map_err(|e| {
                    PbtrimError::Backend(format!("LIST_PAGES {blob}: {}", describe_error(e)))
                })?;
            ack = ack_from_response(&resp);
            // Heavily fragmented disks produce listings larger than
            // `into_string` allows.
            let mut body = String::new();
            resp.into_reader().read_to_string(&mut body).map_err(|e| {
                PbtrimError::Backend(format!("LIST_PAGES {blob}: body read error: {e}"))
            })?;

            let page = parse_page_list(&body, blob)?;
            ranges.extend(page.ranges);
            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(PageRangeListing { ranges, ack })
    }

    fn read_range(&self, blob: &str, offset: u64, length: u64) -> Result<RangeRead> {
        if length == 0 {
            return Err(PbtrimError::Backend(format!(
                "GET_RANGE {blob}: zero-length read requested"
            )));
        }
        let end = offset
            .checked_add(length)
            .and_then(|n| n.checked_sub(1))
            .ok_or_else(|| {
                PbtrimError::Backend(format!(
                    "GET_RANGE {blob}: offset {offset} + length {length} overflows u64"
                ))
            })?;
        let cap = usize::try_from(length).map_err(|_| {
            PbtrimError::Backend(format!(
                "GET_RANGE {blob}: length {length} exceeds platform usize"
            ))
        })?;

        let url = self.blob_url(blob, &[])?;
        let headers = vec![("x-ms-range".to_string(), format!("bytes={offset}-{end}"))];
        debug!(blob, offset, length, "GET range");

        let resp = self
            .request("GET", url, headers, 0)
            .call()
            .map_err(|e| PbtrimError::Backend(format!("GET_RANGE {blob}: {}", describe_error(e))))?;

        let status = resp.status();
        if status == 200 {
            return Err(PbtrimError::Backend(format!(
                "GET_RANGE {blob}: server returned 200 instead of 206 (range header ignored)"
            )));
        }
        if status != 206 {
            return Err(PbtrimError::Backend(format!(
                "GET_RANGE {blob}: unexpected status {status}"
            )));
        }

        Self::validate_content_range(resp.header("Content-Range"), offset, length, blob)?;

        let ack = ack_from_response(&resp);
        // Short bodies are passed through; the caller decides whether the
        // read is complete.
        let mut data = Vec::with_capacity(cap);
        resp.into_reader()
            .take(length)
            .read_to_end(&mut data)
            .map_err(|e| PbtrimError::Backend(format!("GET_RANGE {blob}: body read error: {e}")))?;

        Ok(RangeRead { data, ack })
    }

    fn write_range(&self, blob: &str, offset: u64, data: &[u8]) -> Result<BackendAck> {
        if data.is_empty() {
            return Err(PbtrimError::Backend(format!(
                "PUT_PAGE {blob}: zero-length write requested"
            )));
        }
        Self::check_aligned(blob, "write offset", offset)?;
        Self::check_aligned(blob, "write length", data.len() as u64)?;
        // A split write could fail halfway and leave pages half rewritten.
        if data.len() as u64 > MAX_PAGE_WRITE_SIZE {
            return Err(PbtrimError::Backend(format!(
                "PUT_PAGE {blob}: {} bytes exceeds the {MAX_PAGE_WRITE_SIZE}-byte single-write limit",
                data.len()
            )));
        }
        self.put_page(blob, offset, data)
    }

    fn resize(&self, blob: &str, size: u64) -> Result<BackendAck> {
        Self::check_aligned(blob, "blob size", size)?;
        let url = self.blob_url(blob, &[("comp", "properties")])?;
        let headers = vec![("x-ms-blob-content-length".to_string(), size.to_string())];
        debug!(blob, size, "PUT properties (resize)");

        let resp = self
            .request("PUT", url, headers, 0)
            .send_bytes(&[])
            .map_err(|e| PbtrimError::Backend(format!("RESIZE {blob}: {}", describe_error(e))))?;
        if resp.status() != 200 {
            return Err(PbtrimError::Backend(format!(
                "RESIZE {blob}: unexpected status {}",
                resp.status()
            )));
        }
        Ok(ack_from_response(&resp))
    }
}
