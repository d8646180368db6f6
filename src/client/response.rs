//! Response decoding and the success envelope.
//!
//! # Responsibilities
//! - Pick a decoding strategy from `Content-Type`
//! - Turn non-2xx responses into sanitized `ApiError`s
//! - Wrap successful payloads in [`ApiResponse`]

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SecurityError, SecurityResult};
use crate::security::headers::MESSAGE_HEADER;
use crate::security::sanitizer::sanitize_input;

const MAX_DETAIL_BYTES: usize = 512;

/// Uniform success contract returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: Option<String>) -> Self {
        Self {
            data,
            success: true,
            message,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            data: f(self.data),
            success: self.success,
            message: self.message,
        }
    }
}

impl ApiResponse<ResponseBody> {
    /// Decode a JSON payload into `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> SecurityResult<ApiResponse<T>> {
        let data = self.data.into_json()?;
        Ok(ApiResponse {
            data,
            success: self.success,
            message: self.message,
        })
    }
}

/// Decoded response payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Json(Value),
    /// Sanitized text.
    Text(String),
    /// Opaque bytes, passed through untouched.
    Binary(Vec<u8>),
    Empty,
}

impl ResponseBody {
    /// Deserialize the payload as `T`. Text and empty bodies are offered as
    /// JSON strings and `null` respectively; binary bodies are rejected.
    pub fn into_json<T: DeserializeOwned>(self) -> SecurityResult<T> {
        let value = match self {
            ResponseBody::Json(v) => v,
            ResponseBody::Text(s) => Value::String(s),
            ResponseBody::Empty => Value::Null,
            ResponseBody::Binary(_) => {
                return Err(SecurityError::Transport {
                    message: "response is binary, not JSON".to_string(),
                    detail: None,
                })
            }
        };
        serde_json::from_value(value).map_err(|e| SecurityError::Transport {
            message: "response could not be decoded".to_string(),
            detail: Some(e.to_string()),
        })
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ResponseBody::Binary(b) => Some(b),
            _ => None,
        }
    }
}

/// A fully received response, before interpretation.
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase())
        .unwrap_or_default()
}

fn is_json_type(ct: &str) -> bool {
    let essence = ct.split(';').next().unwrap_or("").trim();
    essence == "application/json" || essence.ends_with("+json")
}

/// Decode a 2xx body according to its declared content type.
pub fn decode_body(headers: &HeaderMap, body: Vec<u8>) -> SecurityResult<ResponseBody> {
    let ct = content_type(headers);

    if is_json_type(&ct) {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(ResponseBody::Empty);
        }
        return serde_json::from_slice(&body)
            .map(ResponseBody::Json)
            .map_err(|e| SecurityError::Transport {
                message: "response could not be decoded".to_string(),
                detail: Some(e.to_string()),
            });
    }

    if body.is_empty() {
        return Ok(ResponseBody::Empty);
    }

    if ct.starts_with("text/") {
        let text = String::from_utf8_lossy(&body);
        return Ok(ResponseBody::Text(sanitize_input(&text)));
    }

    Ok(ResponseBody::Binary(body))
}

/// Sanitized `X-Message` annotation, if present.
pub fn success_message(headers: &HeaderMap) -> Option<String> {
    headers
        .get(MESSAGE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(sanitize_input)
        .filter(|m| !m.is_empty())
}

/// Build the error for a non-2xx response.
///
/// Prefers a `message`/`error` string from a JSON body, falling back to the
/// status text. The raw body is kept as diagnostic detail.
pub fn error_from_response(raw: &RawResponse) -> SecurityError {
    let from_json = serde_json::from_slice::<Value>(&raw.body).ok().and_then(|v| {
        ["message", "error", "detail"]
            .iter()
            .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
    });

    let message = from_json.unwrap_or_else(|| {
        raw.status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    });

    let detail = if raw.body.is_empty() {
        None
    } else {
        let end = raw.body.len().min(MAX_DETAIL_BYTES);
        Some(String::from_utf8_lossy(&raw.body[..end]).into_owned())
    };

    match SecurityError::api(raw.status.as_u16(), message) {
        SecurityError::Api {
            message, status, ..
        } => SecurityError::Api {
            message,
            status,
            detail,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers_with(ct: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_str(ct).unwrap());
        h
    }

    #[test]
    fn test_decode_json() {
        let body = decode_body(
            &headers_with("application/json; charset=utf-8"),
            br#"{"id": 1, "name": "<b>x</b>"}"#.to_vec(),
        )
        .unwrap();
        // JSON payloads are decoded as-is.
        assert_eq!(body.as_json().unwrap()["name"], "<b>x</b>");
    }

    #[test]
    fn test_decode_text_is_sanitized() {
        let body = decode_body(&headers_with("text/html"), b"<p>hi</p>".to_vec()).unwrap();
        assert_eq!(body.as_text(), Some("phi/p"));
    }

    #[test]
    fn test_decode_binary_passes_through() {
        let bytes = vec![0u8, 159, 146, 150];
        let body = decode_body(&headers_with("application/octet-stream"), bytes.clone()).unwrap();
        assert_eq!(body.as_bytes(), Some(bytes.as_slice()));
    }

    #[test]
    fn test_decode_empty_and_invalid_json() {
        let body = decode_body(&headers_with("application/json"), Vec::new()).unwrap();
        assert_eq!(body, ResponseBody::Empty);

        let err = decode_body(&headers_with("application/json"), b"{oops".to_vec()).unwrap_err();
        assert_eq!(err.kind(), "transport_error");
    }

    #[test]
    fn test_error_prefers_json_message() {
        let raw = RawResponse {
            status: StatusCode::BAD_REQUEST,
            headers: HeaderMap::new(),
            body: br#"{"message": "<i>Email</i> is invalid"}"#.to_vec(),
        };
        let err = error_from_response(&raw);
        assert_eq!(err.to_string(), "iEmail/i is invalid");
        assert_eq!(err.status(), Some(400));
        assert!(err.detail().is_some());
    }

    #[test]
    fn test_error_falls_back_to_status_text() {
        let raw = RawResponse {
            status: StatusCode::SERVICE_UNAVAILABLE,
            headers: HeaderMap::new(),
            body: b"upstream exploded".to_vec(),
        };
        let err = error_from_response(&raw);
        assert_eq!(err.to_string(), "Service Unavailable");
        assert_eq!(err.detail(), Some("upstream exploded"));
    }

    #[test]
    fn test_typed_json_envelope() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct User {
            id: u32,
        }
        let response = ApiResponse::ok(
            ResponseBody::Json(serde_json::json!({"id": 7})),
            Some("done".into()),
        );
        let typed: ApiResponse<User> = response.into_json().unwrap();
        assert_eq!(typed.data, User { id: 7 });
        assert_eq!(typed.message.as_deref(), Some("done"));

        let binary = ResponseBody::Binary(vec![1]);
        assert!(binary.into_json::<User>().is_err());
    }

    #[test]
    fn test_success_message_header() {
        let mut h = HeaderMap::new();
        h.insert(MESSAGE_HEADER, HeaderValue::from_static("Saved <ok>"));
        assert_eq!(success_message(&h).as_deref(), Some("Saved ok"));
    }
}
