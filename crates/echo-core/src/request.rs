//! Request inspection helpers

use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use http::{HeaderMap, Uri};
use std::collections::BTreeMap;

/// Multi-valued string map, sorted by key
pub type MultiMap = BTreeMap<String, Vec<String>>;

/// Parse a query string into name -> values, keeping every value in order
///
/// Keys without `=` map to an empty value; `+` and percent escapes are
/// decoded.
pub fn query_params(query: Option<&str>) -> MultiMap {
    let mut params = MultiMap::new();
    if let Some(query) = query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params.entry(key.into_owned()).or_default().push(value.into_owned());
        }
    }
    params
}

/// Collect headers into canonical name -> values
///
/// `Host` is left out; it is reported as the hostname instead.
pub fn header_map(headers: &HeaderMap) -> MultiMap {
    let mut map = MultiMap::new();
    for (name, value) in headers.iter().filter(|(name, _)| **name != HOST) {
        map.entry(canonical_header_name(name.as_str()))
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    map
}

/// `content-type` -> `Content-Type`
pub fn canonical_header_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }
    out
}

/// First value of a header, lossily decoded
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<std::borrow::Cow<'a, str>> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()))
}

/// First `Content-Type` value
pub fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

/// Declared body length
///
/// The `Content-Length` header wins; without it the body's exact size hint is
/// used. Streams of unknown length yield `None`.
pub fn declared_length(headers: &HeaderMap, exact_hint: Option<u64>) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .or(exact_hint)
}

/// Host the client addressed: `Host` header, falling back to the URI authority
pub fn hostname(headers: &HeaderMap, uri: &Uri) -> String {
    headers
        .get(HOST)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .or_else(|| uri.authority().map(|a| a.to_string()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_query_params_multi() {
        let params = query_params(Some("foo=bar&foo=baz&x=1"));
        assert_eq!(params["foo"], vec!["bar", "baz"]);
        assert_eq!(params["x"], vec!["1"]);
    }

    #[test]
    fn test_query_params_decoding() {
        let params = query_params(Some("baz=qux%20quux&plus=a+b&flag"));
        assert_eq!(params["baz"], vec!["qux quux"]);
        assert_eq!(params["plus"], vec!["a b"]);
        assert_eq!(params["flag"], vec![""]);
    }

    #[test]
    fn test_query_params_none() {
        assert!(query_params(None).is_empty());
        assert!(query_params(Some("")).is_empty());
    }

    #[test]
    fn test_canonical_header_name() {
        assert_eq!(canonical_header_name("content-type"), "Content-Type");
        assert_eq!(canonical_header_name("x-set-response-delay-ms"), "X-Set-Response-Delay-Ms");
        assert_eq!(canonical_header_name("accept"), "Accept");
    }

    #[test]
    fn test_header_map_multi() {
        let mut headers = HeaderMap::new();
        headers.append("x-thing", HeaderValue::from_static("one"));
        headers.append("x-thing", HeaderValue::from_static("two"));
        headers.insert("accept", HeaderValue::from_static("*/*"));
        headers.insert(HOST, HeaderValue::from_static("localhost:8080"));

        let map = header_map(&headers);
        assert_eq!(map["X-Thing"], vec!["one", "two"]);
        assert_eq!(map["Accept"], vec!["*/*"]);
        assert!(!map.contains_key("Host"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_declared_length() {
        let mut headers = HeaderMap::new();
        assert_eq!(declared_length(&headers, None), None);
        assert_eq!(declared_length(&headers, Some(4)), Some(4));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("12"));
        assert_eq!(declared_length(&headers, Some(4)), Some(12));
    }

    #[test]
    fn test_hostname_fallback() {
        let uri: Uri = "http://example.com:8080/path".parse().unwrap();
        assert_eq!(hostname(&HeaderMap::new(), &uri), "example.com:8080");

        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("localhost"));
        assert_eq!(hostname(&headers, &uri), "localhost");
    }
}
