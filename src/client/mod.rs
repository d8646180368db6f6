//! Secure HTTP client subsystem.
//!
//! # Data Flow
//! ```text
//! caller → SecureApiClient::request(method, path, body, options)
//!     → request.rs (options, body shapes)
//!     → security::headers / sanitizer (clean headers + body)
//!     → security::rate_limit / csrf (pre-flight)
//!     → resilience::timeouts (deadline around send + body read)
//!     → response.rs (decode, error mapping, CSRF echo)
//!     → ApiResponse<ResponseBody> | SecurityError
//!     → security::monitor (redacted event)
//! ```

pub mod api_client;
pub mod request;
pub mod response;

pub use api_client::{http_client_builder, SecureApiClient, SecureApiClientBuilder, SecurityServices};
pub use request::{RequestBody, RequestOptions, UploadFile};
pub use response::{ApiResponse, ResponseBody};
