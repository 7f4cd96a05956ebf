//! Request correlation and access logging for axum services.
//!
//! Every request gets an `X-Toggly-Request-Id`, a START line when it arrives
//! and exactly one END (or PANIC) line when it leaves.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ServiceConfig;
pub use http::{instrument, HttpServer};
pub use lifecycle::{Shutdown, ShutdownSignal};
