//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (enforce per-request deadline, cancel on expiry)
//!     → Timeout surfaced to caller
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No automatic retries at this layer; retry policy belongs to the caller

pub mod timeouts;

pub use timeouts::with_deadline;
