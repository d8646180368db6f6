//! Client-side request-security pipeline.
//!
//! CSRF token lifecycle, recursive input sanitization, fixed-window rate
//! limiting, a deadline-bound HTTP executor with uniform error handling, and a
//! bounded security-event log.

pub mod client;
pub mod config;
pub mod error;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod storage;

pub use client::{ApiResponse, RequestBody, RequestOptions, ResponseBody, SecureApiClient, UploadFile};
pub use config::ClientConfig;
pub use error::{SecurityError, SecurityResult};
pub use storage::{AuthTokens, SecureStorage};
