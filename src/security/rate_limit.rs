//! Fixed-window rate limiting per named bucket.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::{BucketLimit, RateLimitConfig};
use crate::error::{SecurityError, SecurityResult};
use crate::observability::metrics::Metrics;
use crate::security::clock::{Clock, SystemClock};

/// Well-known buckets with default limits in [`RateLimitConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitBucket {
    Login,
    Api,
    Form,
    File,
}

impl RateLimitBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitBucket::Login => "login",
            RateLimitBucket::Api => "api",
            RateLimitBucket::Form => "form",
            RateLimitBucket::File => "file",
        }
    }
}

/// A single counting window.
struct Window {
    start: Instant,
    count: u32,
}

/// Per-key fixed-window counter.
///
/// Rejected attempts still increment the count, so a client hammering a
/// closed window does not get extra headroom when it stops.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            config,
            clock,
            metrics: Metrics::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    fn limit_for(&self, key: &str) -> BucketLimit {
        self.config.limit_for(key)
    }

    /// Record an attempt for `key`; returns whether it is within the limit.
    pub fn can_submit(&self, key: &str) -> bool {
        let limit = self.limit_for(key);
        let window_len = Duration::from_millis(limit.window_ms);
        let now = self.clock.now();

        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let window = windows.entry(key.to_string()).or_insert(Window {
            start: now,
            count: 0,
        });

        if window.count == 0 || now.duration_since(window.start) >= window_len {
            window.start = now;
            window.count = 1;
        } else {
            window.count = window.count.saturating_add(1);
        }

        window.count <= limit.limit
    }

    /// Like [`can_submit`](Self::can_submit) but surfaces a typed error.
    pub fn check(&self, key: &str) -> SecurityResult<()> {
        if self.can_submit(key) {
            Ok(())
        } else {
            tracing::warn!(bucket = %key, "Rate limit exceeded");
            self.metrics.record_rate_limited(key);
            Err(SecurityError::RateLimitExceeded(key.to_string()))
        }
    }

    /// Attempts left in the current window.
    pub fn remaining(&self, key: &str) -> u32 {
        let limit = self.limit_for(key);
        let window_len = Duration::from_millis(limit.window_ms);
        let now = self.clock.now();

        let windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        match windows.get(key) {
            Some(w) if now.duration_since(w.start) < window_len => {
                limit.limit.saturating_sub(w.count)
            }
            _ => limit.limit,
        }
    }

    /// Forget the window for `key`.
    pub fn reset(&self, key: &str) {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        windows.remove(key);
    }
}
