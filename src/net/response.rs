//! Buffered HTTP response model.
//!
//! A driver hands [`Response::from_raw`] the bytes it received (header block
//! and body, as they came off the wire) together with the [`TransferInfo`] it
//! collected. Everything is parsed once, at construction; a `Response` never
//! looks at the raw buffer again.
//!
//! ## Redirect chains
//! Transports that follow redirects may leave every intermediate response in
//! the same buffer:
//!
//! ```text
//! HTTP/1.1 302 Found\r\nLocation: /b\r\n\r\nHTTP/1.1 200 OK\r\n...\r\n\r\nbody
//! ```
//!
//! Only the last `HTTP/` section is kept, so headers and body always belong to
//! the final response.
use std::borrow::Cow;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::net::headers::{parse_headers, HeaderValue, Headers};

const SECTION_BREAK: &[u8] = b"\r\n\r\n";
const CHAINED_RESPONSE: &[u8] = b"\r\n\r\nHTTP/";

/// Status code reported when the transport did not provide one.
pub const DEFAULT_STATUS: u16 = 200;

/// Transfer metadata reported by a driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferInfo {
    /// Status code of the final response.
    pub http_code: Option<u16>,
    /// Total duration of the transfer in seconds.
    pub total_time: f64,
    /// URL of the final response, after redirects.
    pub effective_url: Option<String>,
    /// Number of redirects followed, when the transport reports it.
    pub redirect_count: Option<u32>,
}

/// Simple structure for HTTP responses.
#[derive(Debug, Clone)]
pub struct Response {
    url: String,
    status: u16,
    headers: Headers,
    body: Option<Vec<u8>>,
    info: TransferInfo,
    parse_time: Duration,
}

#[derive(Serialize)]
struct ResponseJson<'a> {
    url: &'a str,
    code: u16,
    headers: &'a Headers,
    body: Option<Cow<'a, str>>,
    query_time: f64,
    parse_time: f64,
}

impl Response {
    /// Parses `raw` (header block, blank line, body) into a response for `url`.
    pub fn from_raw(url: impl Into<String>, raw: &[u8], info: TransferInfo) -> Self {
        let (header_block, body) = split_final_response(raw);

        let start = Instant::now();
        let headers = parse_headers(&String::from_utf8_lossy(header_block));
        let parse_time = start.elapsed();

        Self {
            url: url.into(),
            status: info.http_code.unwrap_or(DEFAULT_STATUS),
            headers,
            body: body.map(<[u8]>::to_vec),
            info,
            parse_time,
        }
    }

    /// URL the request was sent to.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn code(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Looks up a header by name in any casing.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(&crate::net::headers::canonical_name(name))
    }

    /// Raw body bytes, `None` when the response had no body section.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Body decoded as UTF-8 (lossy), or `default` when there is no body.
    pub fn body_or<'a>(&'a self, default: &'a str) -> Cow<'a, str> {
        match &self.body {
            Some(body) => String::from_utf8_lossy(body),
            None => Cow::Borrowed(default),
        }
    }

    pub fn info(&self) -> &TransferInfo {
        &self.info
    }

    /// Time the transport spent on the request.
    pub fn query_time(&self) -> Duration {
        Duration::try_from_secs_f64(self.info.total_time).unwrap_or_default()
    }

    /// Time spent parsing the header block. Diagnostic only.
    pub fn parse_time(&self) -> Duration {
        self.parse_time
    }

    pub fn to_json(&self) -> String {
        let view = ResponseJson {
            url: &self.url,
            code: self.status,
            headers: &self.headers,
            body: self.body.as_deref().map(String::from_utf8_lossy),
            query_time: self.info.total_time,
            parse_time: self.parse_time.as_secs_f64(),
        };
        serde_json::to_string(&view).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Returns the header block and body of the last response in `raw`.
fn split_final_response(raw: &[u8]) -> (&[u8], Option<&[u8]>) {
    // Skip the CRLF CRLF so the section starts at "HTTP/"
    let last = match rfind(raw, CHAINED_RESPONSE) {
        Some(pos) => &raw[pos + SECTION_BREAK.len()..],
        None => raw,
    };

    match find(last, SECTION_BREAK) {
        Some(pos) => (&last[..pos], Some(&last[pos + SECTION_BREAK.len()..])),
        None => (last, None),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn info(code: u16) -> TransferInfo {
        TransferInfo {
            http_code: Some(code),
            total_time: 0.25,
            ..Default::default()
        }
    }

    #[test]
    fn splits_headers_from_body() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nX-Foo: a\r\nX-Foo: b\r\n\r\nhello\r\n\r\nworld";
        let resp = Response::from_raw("http://h/p", raw, info(200));

        assert_eq!(resp.code(), 200);
        assert_eq!(resp.body_or(""), "hello\r\n\r\nworld");
        assert_eq!(resp.headers()["Content-Type"].first(), "text/plain");
        assert_eq!(resp.headers()["X-Foo"].len(), 2);
        assert_eq!(resp.header("x-foo").map(|v| v.to_string()).as_deref(), Some("a, b"));
        assert_eq!(resp.url(), "http://h/p");
    }

    #[test]
    fn keeps_only_the_last_response_of_a_redirect_chain() {
        let raw = b"HTTP/1.1 301 Moved Permanently\r\nLocation: /next\r\nX-Hop: first\r\n\r\n\
HTTP/1.1 200 OK\r\nX-Hop: last\r\n\r\nfinal body";
        let resp = Response::from_raw("http://h/p", raw, info(200));

        assert_eq!(resp.body_or(""), "final body");
        assert_eq!(resp.headers()["X-Hop"], HeaderValue::from("last"));
        assert!(resp.header("Location").is_none());
    }

    #[test]
    fn missing_body_section_falls_back_to_default() {
        let resp = Response::from_raw("http://h/p", b"HTTP/1.1 204 No Content\r\nServer: x", info(204));
        assert_eq!(resp.body(), None);
        assert_eq!(resp.body_or("nothing"), "nothing");
        assert_eq!(resp.code(), 204);
        assert_eq!(resp.headers()["Server"].first(), "x");
    }

    #[test]
    fn empty_body_is_present_but_empty() {
        let resp = Response::from_raw("http://h/p", b"HTTP/1.1 200 OK\r\n\r\n", info(200));
        assert_eq!(resp.body(), Some(&b""[..]));
        assert_eq!(resp.body_or("default"), "");
    }

    #[test]
    fn status_defaults_to_200() {
        let resp = Response::from_raw("http://h/p", b"", TransferInfo::default());
        assert_eq!(resp.code(), DEFAULT_STATUS);
        assert!(resp.headers().is_empty());
        assert_eq!(resp.body(), None);
    }

    #[test]
    fn binary_bodies_are_kept_byte_for_byte() {
        let mut raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\n\r\n".to_vec();
        raw.extend_from_slice(&[0, 159, 146, 150, 255]);
        let resp = Response::from_raw("http://h/bin", &raw, info(200));
        assert_eq!(resp.body(), Some(&[0u8, 159, 146, 150, 255][..]));
    }

    #[test]
    fn timings_come_from_transfer_info() {
        let resp = Response::from_raw("http://h/p", b"HTTP/1.1 200 OK\r\n\r\n", info(200));
        assert_eq!(resp.query_time(), Duration::from_millis(250));
        assert!(resp.parse_time() < Duration::from_secs(1));

        let mut bad = info(200);
        bad.total_time = -1.0;
        let resp = Response::from_raw("http://h/p", b"", bad);
        assert_eq!(resp.query_time(), Duration::ZERO);
    }

    #[test]
    fn serializes_to_json() {
        let raw = b"HTTP/1.1 404 Not Found\r\nX-Foo: a\r\nX-Foo: b\r\n\r\nmissing";
        let resp = Response::from_raw("http://h/p", raw, info(404));
        let value: Value = serde_json::from_str(&resp.to_json()).unwrap();

        assert_eq!(value["code"], json!(404));
        assert_eq!(value["url"], json!("http://h/p"));
        assert_eq!(value["body"], json!("missing"));
        assert_eq!(value["headers"]["X-Foo"], json!(["a", "b"]));
        assert_eq!(value["query_time"], json!(0.25));
    }
}
