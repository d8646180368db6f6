//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check cross-field constraints (cleanup threshold below pool size)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::ClientConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match url::Url::parse(&config.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(_) => errors.push(ValidationError::new("base_url", "scheme must be http or https")),
        Err(e) => errors.push(ValidationError::new("base_url", format!("invalid URL: {}", e))),
    }

    if config.request.timeout_ms == 0 {
        errors.push(ValidationError::new("request.timeout_ms", "must be greater than 0"));
    }

    if config.upload.max_size_bytes == 0 {
        errors.push(ValidationError::new("upload.max_size_bytes", "must be greater than 0"));
    }
    if config.upload.allowed_types.is_empty() {
        errors.push(ValidationError::new("upload.allowed_types", "must not be empty"));
    }
    if config.upload.allowed_extensions.is_empty() {
        errors.push(ValidationError::new("upload.allowed_extensions", "must not be empty"));
    }

    for (name, bucket) in &config.rate_limit.buckets {
        if bucket.limit == 0 {
            errors.push(ValidationError::new(
                format!("rate_limit.buckets.{}.limit", name),
                "must be greater than 0",
            ));
        }
        if bucket.window_ms == 0 {
            errors.push(ValidationError::new(
                format!("rate_limit.buckets.{}.window_ms", name),
                "must be greater than 0",
            ));
        }
    }
    if !config.rate_limit.buckets.contains_key(&config.rate_limit.default_bucket) {
        errors.push(ValidationError::new(
            "rate_limit.default_bucket",
            format!("bucket '{}' is not defined", config.rate_limit.default_bucket),
        ));
    }

    if config.csrf.token_length < 16 {
        errors.push(ValidationError::new("csrf.token_length", "must be at least 16 bytes"));
    }
    if config.csrf.max_tokens == 0 {
        errors.push(ValidationError::new("csrf.max_tokens", "must be greater than 0"));
    }
    if config.csrf.cleanup_threshold >= config.csrf.max_tokens {
        errors.push(ValidationError::new(
            "csrf.cleanup_threshold",
            "must be lower than csrf.max_tokens",
        ));
    }

    if config.monitor.max_events == 0 {
        errors.push(ValidationError::new("monitor.max_events", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BucketLimit;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ClientConfig::default();
        config.base_url = "ftp://files".into();
        config.csrf.cleanup_threshold = 2000;
        config.rate_limit.buckets.insert("broken".into(), BucketLimit::new(0, 0));

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "base_url",
                "rate_limit.buckets.broken.limit",
                "rate_limit.buckets.broken.window_ms",
                "csrf.cleanup_threshold",
            ]
        );
    }

    #[test]
    fn test_default_bucket_must_exist() {
        let mut config = ClientConfig::default();
        config.rate_limit.default_bucket = "missing".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "rate_limit.default_bucket");
        assert!(errors[0].to_string().contains("missing"));
    }
}
