//! Health tracking subsystem.
//!
//! # Data Flow
//! ```text
//! Connectors (bootstrap, watchers, reconnect)
//!     → state.rs set_status()
//!     → HealthEvent broadcast → observers (logging, metrics)
//!
//! HTTP handlers
//!     → state.rs snapshot() → /health, /ready
//! ```
//!
//! # Design Decisions
//! - `server` is up for the life of the process
//! - Dependencies start down; only a successful connect flips them up
//! - Readiness ignores `server`; liveness requires all three

pub mod state;

pub use state::{HealthEvent, HealthState, HealthStatus, Subsystem};
