//! Per-request options and outbound bodies.

use std::collections::BTreeMap;

use reqwest::Method;
use serde_json::Value;

use crate::security::file_validation::FileMetadata;

/// Knobs a caller can set per request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Attach the stored bearer token; fail with `AuthenticationRequired` if absent.
    pub require_auth: bool,

    /// Do not attach a CSRF token even on mutating methods.
    pub skip_csrf: bool,

    /// Deadline override in milliseconds; falls back to `request.timeout_ms`.
    pub timeout_ms: Option<u64>,

    /// Extra headers, sanitized before use.
    pub headers: BTreeMap<String, String>,

    /// Rate-limit bucket; `api` for plain requests, `file` for uploads.
    pub rate_limit_key: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            require_auth: true,
            skip_csrf: false,
            timeout_ms: None,
            headers: BTreeMap::new(),
            rate_limit_key: None,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for endpoints that do not need a bearer token.
    pub fn public() -> Self {
        Self {
            require_auth: false,
            ..Self::default()
        }
    }

    pub fn require_auth(mut self, require: bool) -> Self {
        self.require_auth = require;
        self
    }

    pub fn skip_csrf(mut self) -> Self {
        self.skip_csrf = true;
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn rate_limit(mut self, key: impl Into<String>) -> Self {
        self.rate_limit_key = Some(key.into());
        self
    }
}

/// Structured or textual request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Sanitized recursively and serialized as JSON.
    Json(Value),
    /// Parsed as JSON when possible, otherwise sanitized as plain text.
    Text(String),
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

/// An in-memory file to upload as multipart form data.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn metadata(&self) -> FileMetadata {
        FileMetadata {
            name: self.name.clone(),
            size: self.bytes.len() as u64,
            mime_type: self.mime_type.clone(),
        }
    }
}

/// Methods that change server state and therefore carry a CSRF token.
pub fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}
