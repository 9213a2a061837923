//! Header blocks in both directions.
//!
//! [`parse_headers`] turns the raw header block of a response into a map keyed
//! by canonical header name (`content-type` becomes `Content-Type`). A header
//! seen once maps to [`HeaderValue::Single`], a header seen several times to
//! [`HeaderValue::Multiple`] holding every value in order of appearance.
//!
//! [`format_request_headers`] renders the `headers` setting into the
//! `Name: value` lines a driver sends.
use std::fmt;

use http::Method;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Whitespace that marks a folded continuation line.
const FOLD: &[char] = &[' ', '\t'];

/// Characters after which a header name word starts.
const WORD_BREAKS: &[char] = &['-', ' ', '\t', '_'];

/// Parsed response headers, keyed by canonical name, in order of first appearance.
pub type Headers = IndexMap<String, HeaderValue>;

/// Value of a response header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Single(String),
    Multiple(Vec<String>),
}

impl HeaderValue {
    /// First value received for the header.
    pub fn first(&self) -> &str {
        match self {
            HeaderValue::Single(v) => v,
            HeaderValue::Multiple(vs) => vs.first().map(String::as_str).unwrap_or_default(),
        }
    }

    /// All values in order of appearance.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let values = match self {
            HeaderValue::Single(v) => std::slice::from_ref(v),
            HeaderValue::Multiple(vs) => vs.as_slice(),
        };
        values.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        match self {
            HeaderValue::Single(_) => 1,
            HeaderValue::Multiple(vs) => vs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, value: String) {
        match self {
            HeaderValue::Single(first) => {
                *self = HeaderValue::Multiple(vec![std::mem::take(first), value]);
            }
            HeaderValue::Multiple(vs) => vs.push(value),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Single(v.to_string())
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut values = self.iter();
        if let Some(first) = values.next() {
            f.write_str(first)?;
        }
        for v in values {
            write!(f, ", {v}")?;
        }
        Ok(())
    }
}

/// Parses a CRLF separated header block.
///
/// Continuation lines starting with a space or tab are folded into the line
/// above. Lines without a `name: value` shape (the status line, blank lines)
/// are skipped.
pub fn parse_headers(block: &str) -> Headers {
    let mut headers = Headers::new();

    for line in unfold(block) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let (name, value) = (name.trim(), value.trim());
        if name.is_empty() || value.is_empty() {
            continue;
        }

        let name = canonical_name(name);
        match headers.get_mut(&name) {
            Some(existing) => existing.push(value.to_string()),
            None => {
                headers.insert(name, HeaderValue::Single(value.to_string()));
            }
        }
    }

    headers
}

/// Lowercases `name` and uppercases the first letter of every word.
pub fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut word_start = true;
    for c in name.trim().chars() {
        out.push(if word_start { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() });
        word_start = WORD_BREAKS.contains(&c);
    }
    out
}

fn unfold(block: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for line in block.lines() {
        if line.starts_with(FOLD) {
            if let Some(prev) = lines.last_mut() {
                prev.push(' ');
                prev.push_str(line.trim_start_matches(FOLD));
                continue;
            }
        }
        lines.push(line.to_string());
    }
    lines
}

/// Renders the `headers` setting into request header lines.
///
/// Positional entries (array elements, or object keys that are plain indexes)
/// are sent verbatim. Named entries become `Name: value` with both sides
/// trimmed. For POST, any header whose name contains `content-type` is dropped
/// since the form encoding sets its own.
pub fn format_request_headers(headers: &Value, method: &Method) -> Vec<String> {
    let lines: Vec<String> = match headers {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| {
                if is_positional(key) {
                    scalar(value)
                } else {
                    format!("{}: {}", key.trim(), scalar(value).trim())
                }
            })
            .collect(),
        Value::Array(list) => list.iter().map(scalar).collect(),
        Value::String(line) if !line.is_empty() => vec![line.clone()],
        _ => Vec::new(),
    };

    if *method != Method::POST {
        return lines;
    }

    lines
        .into_iter()
        .filter(|line| {
            let name = line.split(':').next().unwrap_or_default();
            !name.to_ascii_lowercase().contains("content-type")
        })
        .collect()
}

fn is_positional(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn repeated_names_accumulate_in_order() {
        let headers = parse_headers("Content-Type: text/html\r\nX-Foo: a\r\nX-Foo: b");
        assert_eq!(headers.get("Content-Type"), Some(&HeaderValue::from("text/html")));
        assert_eq!(
            headers.get("X-Foo"),
            Some(&HeaderValue::Multiple(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn names_are_canonicalized() {
        assert_eq!(canonical_name("content-type"), "Content-Type");
        assert_eq!(canonical_name("X-REQUEST-ID"), "X-Request-Id");
        assert_eq!(canonical_name("x_forwarded_for"), "X_Forwarded_For");
        assert_eq!(canonical_name(" www-authenticate "), "Www-Authenticate");

        let headers = parse_headers("set-cookie: a=1\r\nSET-COOKIE: b=2");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["Set-Cookie"].len(), 2);
    }

    #[test]
    fn status_line_and_garbage_are_skipped() {
        let headers = parse_headers("HTTP/1.1 200 OK\r\nServer: test\r\nnot a header\r\nEmpty:\r\n: novalue");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["Server"].first(), "test");
    }

    #[test]
    fn names_keep_wire_order() {
        let headers = parse_headers("Server: s\r\nDate: d\r\nx-b: 1\r\nAccept-Ranges: r\r\nX-B: 2");
        let names: Vec<&str> = headers.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Server", "Date", "X-B", "Accept-Ranges"]);
    }

    #[test]
    fn continuation_lines_are_folded() {
        let headers = parse_headers("X-Long: part one\r\n  part two\r\n\tpart three\r\nX-Next: n");
        assert_eq!(headers["X-Long"].first(), "part one part two part three");
        assert_eq!(headers["X-Next"].first(), "n");
    }

    #[test]
    fn values_keep_inner_colons() {
        let headers = parse_headers("Location: http://example.com:8080/x");
        assert_eq!(headers["Location"].first(), "http://example.com:8080/x");
    }

    #[test]
    fn header_value_accessors() {
        let single = HeaderValue::from("one");
        assert_eq!(single.iter().collect::<Vec<_>>(), vec!["one"]);
        assert_eq!(single.to_string(), "one");

        let multi = HeaderValue::Multiple(vec!["a".into(), "b".into()]);
        assert_eq!(multi.first(), "a");
        assert_eq!(multi.to_string(), "a, b");
        assert_eq!(serde_json::to_value(&multi).unwrap(), json!(["a", "b"]));
        assert_eq!(serde_json::to_value(&single).unwrap(), json!("one"));
    }

    #[test]
    fn named_and_positional_request_headers() {
        let headers = json!({" Accept ": " text/html ", "0": "X-Raw:  kept  ", "X-Num": 5});
        assert_eq!(
            format_request_headers(&headers, &Method::GET),
            vec!["Accept: text/html", "X-Raw:  kept  ", "X-Num: 5"]
        );

        let headers = json!(["Accept: */*", "X-Other: y"]);
        assert_eq!(
            format_request_headers(&headers, &Method::PUT),
            vec!["Accept: */*", "X-Other: y"]
        );
    }

    #[test]
    fn content_type_is_dropped_only_for_post() {
        let headers = json!({"Content-Type": "text/plain", "Accept": "*/*", "0": "x-content-type-options: nosniff"});

        assert_eq!(format_request_headers(&headers, &Method::POST), vec!["Accept: */*"]);
        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let lines = format_request_headers(&headers, &method);
            assert!(lines.contains(&"Content-Type: text/plain".to_string()), "{method}");
            assert_eq!(lines.len(), 3);
        }
    }

    #[test]
    fn non_container_headers_setting_yields_nothing() {
        assert!(format_request_headers(&json!(null), &Method::GET).is_empty());
        assert!(format_request_headers(&json!(false), &Method::GET).is_empty());
        assert!(format_request_headers(&json!({}), &Method::GET).is_empty());
    }
}
