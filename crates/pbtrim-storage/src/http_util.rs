use chrono::{DateTime, Utc};

use crate::BackendAck;

/// Collect the service's acknowledgement headers from a successful response.
pub(crate) fn ack_from_response(resp: &ureq::Response) -> BackendAck {
    BackendAck {
        last_modified: resp.header("Last-Modified").and_then(parse_http_date),
        etag: resp.header("ETag").map(|s| s.to_string()),
    }
}

/// Parse an RFC 1123 HTTP date (`Mon, 27 Jul 2009 12:28:53 GMT`).
pub(crate) fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a timestamp for the `x-ms-date` header.
pub(crate) fn format_http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Render a ureq error with the service's error code, when present.
pub(crate) fn describe_error(err: ureq::Error) -> String {
    match err {
        ureq::Error::Status(code, resp) => {
            let error_code = resp
                .header("x-ms-error-code")
                .map(|c| format!(" ({c})"))
                .unwrap_or_default();
            format!("HTTP {code}{error_code}")
        }
        ureq::Error::Transport(t) => format!("transport error: {t}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn http_date_round_trips() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let s = format_http_date(ts);
        assert_eq!(s, "Mon, 01 Jan 2024 00:00:00 GMT");
        assert_eq!(parse_http_date(&s), Some(ts));
    }

    #[test]
    fn invalid_http_date_is_none() {
        assert_eq!(parse_http_date("yesterday"), None);
    }
}
