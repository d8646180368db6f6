//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the secure client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every request path is joined onto.
    pub base_url: String,

    /// Runtime mode; controls how much error detail reaches callers.
    pub environment: Environment,

    /// Request execution settings.
    pub request: RequestConfig,

    /// File upload policy.
    pub upload: UploadConfig,

    /// Rate limiting buckets.
    pub rate_limit: RateLimitConfig,

    /// CSRF token pool settings.
    pub csrf: CsrfConfig,

    /// Security event log settings.
    pub monitor: MonitorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            environment: Environment::default(),
            request: RequestConfig::default(),
            upload: UploadConfig::default(),
            rate_limit: RateLimitConfig::default(),
            csrf: CsrfConfig::default(),
            monitor: MonitorConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Runtime mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Errors keep internal diagnostic detail.
    #[default]
    Development,
    /// Errors are stripped down to sanitized messages.
    Production,
}

/// Request execution settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Default deadline per request in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

/// File upload allow-lists and limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum upload size in bytes.
    pub max_size_bytes: u64,

    /// Accepted MIME types.
    pub allowed_types: Vec<String>,

    /// Accepted filename extensions (without the dot).
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 10 * 1024 * 1024, // 10 MiB
            allowed_types: [
                "image/jpeg",
                "image/png",
                "image/gif",
                "image/webp",
                "application/pdf",
                "text/plain",
                "text/csv",
                "application/msword",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            allowed_extensions: [
                "jpg", "jpeg", "png", "gif", "webp", "pdf", "txt", "csv", "doc", "docx",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Limit for a single rate-limit bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct BucketLimit {
    /// Attempts allowed per window.
    pub limit: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl BucketLimit {
    pub const fn new(limit: u32, window_ms: u64) -> Self {
        Self { limit, window_ms }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Bucket name → limit.
    pub buckets: BTreeMap<String, BucketLimit>,

    /// Bucket applied to keys with no entry of their own.
    pub default_bucket: String,
}

impl RateLimitConfig {
    /// Limit for `key`, falling back to the default bucket.
    pub fn limit_for(&self, key: &str) -> BucketLimit {
        self.buckets
            .get(key)
            .or_else(|| self.buckets.get(&self.default_bucket))
            .copied()
            .unwrap_or(BucketLimit::new(100, 60_000))
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let mut buckets = BTreeMap::new();
        buckets.insert("login".to_string(), BucketLimit::new(5, 15 * 60 * 1000));
        buckets.insert("api".to_string(), BucketLimit::new(100, 60_000));
        buckets.insert("form".to_string(), BucketLimit::new(10, 60_000));
        buckets.insert("file".to_string(), BucketLimit::new(20, 60_000));
        Self {
            buckets,
            default_bucket: "api".to_string(),
        }
    }
}

/// CSRF token pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Random bytes per token.
    pub token_length: usize,

    /// Pool size that triggers eviction.
    pub max_tokens: usize,

    /// Pool size eviction drains down to.
    pub cleanup_threshold: usize,

    /// Consume tokens on successful verification.
    pub single_use: bool,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            token_length: 32,
            max_tokens: 1000,
            cleanup_threshold: 500,
            single_use: false,
        }
    }
}

/// Security event log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Ring buffer capacity.
    pub max_events: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { max_events: 1000 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,

    /// Record counters through the `metrics` facade.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = ClientConfig::default();
        assert_eq!(config.request.timeout_ms, 10_000);
        assert_eq!(config.upload.max_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.csrf.token_length, 32);
        assert_eq!(config.csrf.max_tokens, 1000);
        assert_eq!(config.csrf.cleanup_threshold, 500);
        assert_eq!(config.monitor.max_events, 1000);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(
            config.rate_limit.limit_for("login"),
            BucketLimit::new(5, 900_000)
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            base_url = "https://api.example.com"
            environment = "production"

            [request]
            timeout_ms = 2500

            [rate_limit.buckets.search]
            limit = 30
            window_ms = 1000
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.request.timeout_ms, 2500);
        assert_eq!(config.rate_limit.limit_for("search"), BucketLimit::new(30, 1000));
        // Overriding buckets replaces the whole table; unknown keys fall back.
        assert_eq!(config.rate_limit.limit_for("login"), BucketLimit::new(100, 60_000));
        assert_eq!(config.csrf.max_tokens, 1000);
    }
}
