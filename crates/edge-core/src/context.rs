//! Request identity and the immutable render context.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use percent_encoding::percent_decode_str;

use crate::mode::{ResponseFormat, TransportMode};

/// Unique request identifier for log correlation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

static REQUEST_COUNTER: AtomicU32 = AtomicU32::new(0);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seq = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("{:x}-{:x}", nanos, seq))
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Query string parameters.
pub type QueryParams = HashMap<String, String>;

/// HTTP headers.
pub type Headers = HashMap<String, String>;

/// Parse a raw query string (without the leading `?`).
///
/// Keys without `=` map to an empty value, so `?_bot` yields `("_bot", "")`.
/// Values are percent-decoded; `+` is read as a space.
pub fn parse_query(qs: &str) -> QueryParams {
    qs.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next().unwrap_or("");
            let value = parts.next().unwrap_or("");
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(s: &str) -> String {
    let spaced = s.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Split `"/path?query"` into path and parsed query.
pub fn split_path_and_query(path_with_query: &str) -> (String, QueryParams) {
    match path_with_query.split_once('?') {
        Some((path, qs)) => (path.to_string(), parse_query(qs)),
        None => (path_with_query.to_string(), QueryParams::new()),
    }
}

/// Read-only request data passed explicitly down the render call chain.
///
/// Built once per request in `Init`; components receive it by reference
/// and clone what they need into their boundary futures.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Unique request identifier.
    pub request_id: RequestId,
    /// Target pathname.
    pub pathname: String,
    /// Query string parameters.
    pub query: QueryParams,
    /// HTTP headers.
    pub headers: Headers,
    /// Transport mode chosen for this request.
    pub mode: TransportMode,
    /// Response body format.
    pub format: ResponseFormat,
}

impl RenderContext {
    /// Get a query parameter by name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(|s| s.as_str())
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        header_lookup(&self.headers, name)
    }

    /// Whether the response is buffered for a non-interactive client.
    pub fn is_buffered(&self) -> bool {
        self.mode == TransportMode::Buffer
    }
}

/// Case-insensitive header lookup.
pub fn header_lookup<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }

    #[test]
    fn test_parse_query_flag_without_value() {
        let q = parse_query("_bot");
        assert_eq!(q.get("_bot").map(String::as_str), Some(""));
    }

    #[test]
    fn test_parse_query_decodes_values() {
        let q = parse_query("state=%7B%22pathname%22%3A%22%2Fstream%22%7D&q=a+b");
        assert_eq!(q["state"], r#"{"pathname":"/stream"}"#);
        assert_eq!(q["q"], "a b");
    }

    #[test]
    fn test_split_path_and_query() {
        let (path, query) = split_path_and_query("/seo?_bot&x=1");
        assert_eq!(path, "/seo");
        assert!(query.contains_key("_bot"));
        assert_eq!(query["x"], "1");

        let (path, query) = split_path_and_query("/plain");
        assert_eq!(path, "/plain");
        assert!(query.is_empty());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("User-Agent".into(), "Googlebot".into());
        assert_eq!(header_lookup(&headers, "user-agent"), Some("Googlebot"));
        assert_eq!(header_lookup(&headers, "accept"), None);
    }
}
