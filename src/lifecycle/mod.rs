//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Health state → Connectors → Bind listener → Serve → Bootstrap connectors
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT ─┐
//!     task panic ─────┼─→ ShutdownReason
//!     task error ─────┘
//!
//! Shutdown (shutdown.rs):
//!     Stop accepting → Drain requests → Close database → Close cache → Exit 0/1
//! ```
//!
//! # Design Decisions
//! - Listener first: the service answers probes while dependencies connect
//! - Every shutdown source runs the same routine
//! - Shutdown has timeout: draining stops after the deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownOutcome, ShutdownReason};
pub use startup::{run, Service, StartupError};
