//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing request:
//!     → headers.rs (sanitize caller headers, add pipeline headers)
//!     → sanitizer.rs (clean JSON/text bodies)
//!     → rate_limit.rs (per-bucket fixed windows)
//!     → csrf.rs (attach token on mutating methods)
//!     → Pass to transport
//!
//! Response:
//!     → csrf.rs (validate echoed token)
//!     → monitor.rs (redacted event for observability)
//! ```
//!
//! # Design Decisions
//! - Every stateful component is an explicit struct; no globals
//! - Shared state sits behind one mutex per structure
//! - Fail closed: a failed check aborts the request before it is sent

pub mod clock;
pub mod csrf;
pub mod file_validation;
pub mod headers;
pub mod monitor;
pub mod rate_limit;
pub mod sanitizer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use csrf::{CsrfStore, CsrfToken};
pub use file_validation::{validate_file_upload, FileMetadata, FileValidation};
pub use monitor::{SecurityEvent, SecurityMonitor, REDACTED};
pub use rate_limit::{RateLimitBucket, RateLimiter};
pub use sanitizer::{sanitize_input, sanitize_value};
