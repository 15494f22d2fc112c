//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Connector bootstrap:
//!     → timeouts.rs (each attempt has a deadline)
//!     → On failure: retries.rs (fixed delay, bounded attempts)
//!
//! Cache transport reconnect:
//!     → backoff.rs (linear delay, capped)
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - One retry utility shared by both connectors
//! - Giving up is reported to the caller, never a panic

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use backoff::Backoff;
pub use retries::{retry, RetryExhausted, RetryPolicy};
pub use timeouts::{with_timeout, TimeoutError};
