//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! access-log middleware
//!     → access_log.rs (FieldSet, START / END / PANIC lines)
//!     → sink.rs (LogSink: tracing in production, memory in tests)
//!     → logging.rs (subscriber: pretty or JSON)
//!
//! handler code
//!     → request_logger.rs ("[req_id] message" via the same sink)
//! ```
//!
//! # Design Decisions
//! - The sink is injected, never global
//! - Request ID flows through every line of a request
//! - Fatal severity records a panic; terminating is a separate policy

pub mod access_log;
pub mod fields;
pub mod logging;
pub mod panic_hook;
pub mod request_logger;
pub mod sink;

pub use access_log::{AccessLogEntry, AccessLogFormatter, EntryState, ExclusionList, LogEntry, LogFormatter};
pub use fields::{FieldSet, FieldValue};
pub use request_logger::RequestLogger;
pub use sink::{LogSink, MemorySink, Severity, SharedSink, TracingSink};
