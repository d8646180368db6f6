//! Metrics collection.
//!
//! # Metrics
//! - `secure_client_requests_total` (counter): completed requests by method, status
//! - `secure_client_rate_limited_total` (counter): rejections by bucket
//! - `secure_client_csrf_failures_total` (counter): echoed tokens that failed validation
//! - `secure_client_timeouts_total` (counter): requests cancelled by their deadline
//! - `secure_client_security_events_total` (counter): logged events by type
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; the host picks the exporter
//! - Labels are low-cardinality (no paths, no tokens)
//! - The on/off switch travels with each client's services, not a global

/// Handle for recording pipeline metrics; a disabled handle records nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    enabled: bool,
}

impl Default for Metrics {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Metrics {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record_request(&self, method: &str, status: u16) {
        if self.enabled {
            metrics::counter!(
                "secure_client_requests_total",
                "method" => method.to_string(),
                "status" => status.to_string()
            )
            .increment(1);
        }
    }

    pub fn record_rate_limited(&self, bucket: &str) {
        if self.enabled {
            metrics::counter!("secure_client_rate_limited_total", "bucket" => bucket.to_string())
                .increment(1);
        }
    }

    pub fn record_csrf_failure(&self) {
        if self.enabled {
            metrics::counter!("secure_client_csrf_failures_total").increment(1);
        }
    }

    pub fn record_timeout(&self) {
        if self.enabled {
            metrics::counter!("secure_client_timeouts_total").increment(1);
        }
    }

    pub fn record_security_event(&self, kind: &str) {
        if self.enabled {
            metrics::counter!("secure_client_security_events_total", "type" => kind.to_string())
                .increment(1);
        }
    }
}
