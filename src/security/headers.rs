//! Outbound header construction.
//!
//! # Responsibilities
//! - Sanitize caller-supplied header names and values
//! - Merge them over the pipeline defaults
//! - Name the wire headers the pipeline adds or consults
//!
//! # Design Decisions
//! - Caller headers override `Content-Type`, never the security headers
//! - Headers that are still invalid after sanitization are dropped, not fatal

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

use crate::security::sanitizer::sanitize_input;

pub const CSRF_HEADER: &str = "x-csrf-token";
pub const REQUESTED_WITH_HEADER: &str = "x-requested-with";
pub const REQUESTED_WITH_VALUE: &str = "XMLHttpRequest";
pub const MESSAGE_HEADER: &str = "x-message";
pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// How the outbound body is encoded, which decides the default `Content-Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// JSON or no body at all.
    Json,
    PlainText,
    /// The transport sets the type along with the boundary.
    Multipart,
}

impl BodyKind {
    fn content_type(self) -> Option<&'static str> {
        match self {
            BodyKind::Json => Some(JSON_CONTENT_TYPE),
            BodyKind::PlainText => Some(TEXT_CONTENT_TYPE),
            BodyKind::Multipart => None,
        }
    }
}

/// Sanitize a list of caller headers, returning the cleaned pairs.
pub fn sanitize_headers<'a, I>(headers: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    headers
        .into_iter()
        .map(|(k, v)| (sanitize_input(k), sanitize_input(v)))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

/// Build the base header map: the content type for `kind` overlaid with
/// sanitized caller headers.
pub fn build_base_headers<'a, I>(caller: I, kind: BodyKind) -> HeaderMap
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut map = HeaderMap::new();
    if let Some(content_type) = kind.content_type() {
        map.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }

    for (name, value) in sanitize_headers(caller) {
        let parsed_name = HeaderName::from_bytes(name.as_bytes());
        let parsed_value = HeaderValue::from_str(&value);
        match (parsed_name, parsed_value) {
            (Ok(n), Ok(v)) => {
                if kind == BodyKind::Multipart && n == CONTENT_TYPE {
                    // multipart bodies need the transport-generated boundary
                    continue;
                }
                map.insert(n, v);
            }
            _ => {
                tracing::warn!(header = %name, "Dropping header that is invalid after sanitization");
            }
        }
    }

    map
}

/// Insert a pipeline-owned header, overriding whatever the caller supplied.
pub fn set_header(map: &mut HeaderMap, name: &'static str, value: &str) -> bool {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            map.insert(HeaderName::from_static(name), v);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_caller_headers_sanitized_and_merged() {
        let mut caller = HashMap::new();
        caller.insert("X-Custom".to_string(), "<b>value</b>".to_string());
        caller.insert("<>".to_string(), "gone".to_string());

        let map = build_base_headers(&caller, BodyKind::Json);
        assert_eq!(map.get("x-custom").unwrap(), "bvalue/b");
        assert_eq!(map.get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_caller_may_override_content_type() {
        let mut caller = HashMap::new();
        caller.insert("Content-Type".to_string(), "text/plain".to_string());
        let map = build_base_headers(&caller, BodyKind::Json);
        assert_eq!(map.get(CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn test_multipart_never_forces_content_type() {
        let mut caller = HashMap::new();
        caller.insert("Content-Type".to_string(), "application/json".to_string());
        let map = build_base_headers(&caller, BodyKind::Multipart);
        assert!(map.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_plain_text_body_is_not_labelled_json() {
        let map = build_base_headers(&HashMap::new(), BodyKind::PlainText);
        assert_eq!(map.get(CONTENT_TYPE).unwrap(), TEXT_CONTENT_TYPE);
    }

    #[test]
    fn test_invalid_header_name_dropped() {
        let mut caller = HashMap::new();
        caller.insert("bad name".to_string(), "v".to_string());
        let map = build_base_headers(&caller, BodyKind::Json);
        assert_eq!(map.len(), 1);
    }
}
