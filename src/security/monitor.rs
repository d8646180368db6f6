//! Security event log.
//!
//! # Responsibilities
//! - Keep a bounded, insertion-ordered buffer of security events
//! - Redact sensitive fields before anything is stored
//! - Mirror events to the `security` tracing target and metrics
//!
//! # Design Decisions
//! - Purely observational: logging never fails and never blocks on I/O
//! - Oldest events drop silently once the buffer is full

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::MonitorConfig;
use crate::observability::metrics::Metrics;

pub const REDACTED: &str = "[REDACTED]";

const SENSITIVE_KEY_PARTS: &[&str] = &["password", "token", "secret", "key"];

/// A logged security-relevant action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    #[serde(rename = "type")]
    pub kind: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub data: Value,
}

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SENSITIVE_KEY_PARTS.iter().any(|part| lower.contains(part))
}

/// Replace values under sensitive keys, descending into objects and arrays.
pub fn redact(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, val) in map {
                let val = if is_sensitive_key(&key) {
                    Value::String(REDACTED.to_string())
                } else {
                    redact(val)
                };
                out.insert(key, val);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(redact).collect()),
        other => other,
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Ring buffer of redacted security events.
pub struct SecurityMonitor {
    events: Mutex<VecDeque<SecurityEvent>>,
    capacity: usize,
    metrics: Metrics,
}

impl SecurityMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(config.max_events.min(1024))),
            capacity: config.max_events,
            metrics: Metrics::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Record an event. `data` is redacted before it is stored or traced.
    pub fn log_event(&self, kind: &str, data: Value) {
        let event = SecurityEvent {
            kind: kind.to_string(),
            timestamp: now_millis(),
            data: redact(data),
        };

        tracing::info!(target: "security", event = %event.kind, data = %event.data);
        self.metrics.record_security_event(kind);

        if self.capacity == 0 {
            return;
        }
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// All events, or only those of `kind`, oldest first.
    pub fn get_events(&self, kind: Option<&str>) -> Vec<SecurityEvent> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events
            .iter()
            .filter(|e| kind.map_or(true, |k| e.kind == k))
            .cloned()
            .collect()
    }

    pub fn clear_events(&self) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Event counts by type.
    pub fn summary(&self) -> BTreeMap<String, usize> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let mut counts = BTreeMap::new();
        for e in events.iter() {
            *counts.entry(e.kind.clone()).or_insert(0) += 1;
        }
        counts
    }
}
