use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// The parts of an outgoing request covered by a Shared Key signature.
pub(crate) struct SignableRequest<'a> {
    pub method: &'a str,
    pub url: &'a Url,
    pub content_length: u64,
    /// All `x-ms-*` headers that will be sent.
    pub ms_headers: &'a [(String, String)],
}

/// Compute the `Authorization` header value for a Shared Key request.
pub(crate) fn authorization(account: &str, key: &[u8], req: &SignableRequest<'_>) -> String {
    let to_sign = string_to_sign(account, req);
    // HMAC accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(to_sign.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());
    format!("SharedKey {account}:{signature}")
}

fn string_to_sign(account: &str, req: &SignableRequest<'_>) -> String {
    // Empty when zero, per service versions 2015-02-21 and later.
    let content_length = if req.content_length == 0 {
        String::new()
    } else {
        req.content_length.to_string()
    };

    let mut out = String::new();
    out.push_str(req.method);
    out.push('\n');
    // Content-Encoding, Content-Language
    out.push_str("\n\n");
    out.push_str(&content_length);
    out.push('\n');
    // Content-MD5, Content-Type, Date, If-Modified-Since, If-Match,
    // If-None-Match, If-Unmodified-Since, Range
    out.push_str("\n\n\n\n\n\n\n\n");

    let mut headers: Vec<(String, &str)> = req
        .ms_headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim()))
        .collect();
    headers.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, value) in headers {
        out.push_str(&name);
        out.push(':');
        out.push_str(value);
        out.push('\n');
    }

    out.push('/');
    out.push_str(account);
    out.push_str(req.url.path());

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in req.url.query_pairs() {
        params
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into_owned());
    }
    for (name, mut values) in params {
        values.sort();
        out.push('\n');
        out.push_str(&name);
        out.push(':');
        out.push_str(&values.join(","));
    }
    out
}
