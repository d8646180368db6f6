//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → handed to SecureApiClient::new
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require building a new client
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BucketLimit, ClientConfig, CsrfConfig, Environment, MonitorConfig, ObservabilityConfig,
    RateLimitConfig, RequestConfig, UploadConfig,
};
pub use validation::{validate_config, ValidationError};
