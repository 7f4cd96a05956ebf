//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Stop accepting → Drain in-flight requests → Exit
//! ```
//!
//! In-flight requests cut short by shutdown still complete their access log
//! entry (see `http::middleware::access_log`).

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
