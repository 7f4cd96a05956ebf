//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → request.rs (adopt or generate X-Toggly-Request-Id)
//!     → metadata.rs (service headers, version tag)
//!     → middleware/access_log.rs (START, then END or PANIC)
//!     → handlers
//!     → response carries X-Toggly-Request-Id and service headers
//! ```

pub mod forwarded;
pub mod metadata;
pub mod middleware;
pub mod request;
pub mod server;

pub use metadata::{
    version_layer, ServiceInfoLayer, VersionTag, X_TOGGLY_SERVICE_NAME, X_TOGGLY_SERVICE_VERSION,
};
pub use request::{RequestId, RequestIdExt, RequestIdLayer, TlsConnection, X_TOGGLY_REQUEST_ID};
pub use server::{instrument, AppState, HttpServer, ServerError};
