//! Normalized responses.

use std::collections::HashMap;

use super::transport::RawHeaderValue;

/// Successful response of an outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse<T> {
    /// Decoded body
    pub data: T,
    /// Status code
    pub status: u16,
    /// Reason phrase
    pub status_text: String,
    /// Normalized headers, names lower-cased
    pub headers: HashMap<String, String>,
}

impl<T> HttpResponse<T> {
    /// Header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// 2xx status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Transform the body, keeping status and headers.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> HttpResponse<U> {
        HttpResponse {
            data: f(self.data),
            status: self.status,
            status_text: self.status_text,
            headers: self.headers,
        }
    }
}

/// Flatten transport headers into a string map.
///
/// Text values are copied, lists are joined with `", "`, anything else is
/// dropped.
#[must_use]
pub fn normalize_headers(raw: &[(String, RawHeaderValue)]) -> HashMap<String, String> {
    raw.iter()
        .filter_map(|(name, value)| {
            let text = match value {
                RawHeaderValue::Text(text) => text.clone(),
                RawHeaderValue::List(items) => items.join(", "),
                RawHeaderValue::Opaque(_) => return None,
            };
            Some((name.to_ascii_lowercase(), text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_joined() {
        let raw = vec![(
            "vary".to_string(),
            RawHeaderValue::List(vec!["a".to_string(), "b".to_string()]),
        )];
        assert_eq!(normalize_headers(&raw)["vary"], "a, b");
    }

    #[test]
    fn test_opaque_dropped() {
        let raw = vec![
            ("x-bin".to_string(), RawHeaderValue::Opaque(vec![0xff])),
            ("etag".to_string(), RawHeaderValue::Text("\"v1\"".to_string())),
        ];
        let headers = normalize_headers(&raw);
        assert_eq!(headers.len(), 1);
        assert!(!headers.contains_key("x-bin"));
        assert_eq!(headers["etag"], "\"v1\"");
    }

    #[test]
    fn test_empty_headers() {
        assert!(normalize_headers(&[]).is_empty());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let raw = vec![(
            "Content-Type".to_string(),
            RawHeaderValue::Text("application/json".to_string()),
        )];
        let response = HttpResponse {
            data: (),
            status: 200,
            status_text: "OK".to_string(),
            headers: normalize_headers(&raw),
        };
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.header("CONTENT-TYPE"), Some("application/json"));
        assert!(response.is_success());
    }

    #[test]
    fn test_map_keeps_metadata() {
        let response = HttpResponse {
            data: 21,
            status: 201,
            status_text: "Created".to_string(),
            headers: HashMap::new(),
        };
        let doubled = response.map(|n| n * 2);
        assert_eq!(doubled.data, 42);
        assert_eq!(doubled.status, 201);
    }
}
