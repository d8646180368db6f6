//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters via the `metrics` facade)
//!
//! Consumers:
//!     → Log output (stdout, pretty or JSON)
//!     → Whatever metrics recorder the host application installs
//! ```
//!
//! # Design Decisions
//! - Request ID flows through request spans and security events
//! - Metrics are cheap (no-ops until a recorder is installed)
//! - Security events use their own `security` target for easy filtering

pub mod logging;
pub mod metrics;
