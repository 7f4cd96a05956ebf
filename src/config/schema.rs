//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for an instrumented service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Static service metadata stamped on responses.
    pub service: ServiceInfoConfig,

    /// Access log and diagnostics settings.
    pub logging: LoggingConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Service identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceInfoConfig {
    /// Value of `X-Toggly-Service-Name`.
    pub name: String,

    /// Value of `X-Toggly-Service-Version`.
    pub version: String,

    /// Version tag injected into request extensions (e.g., "v1").
    pub api_version: String,
}

impl Default for ServiceInfoConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            api_version: "v1".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for production.
    Json,
}

/// What happens to the process after a handler panic has been logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PanicPolicy {
    /// Log the panic and let the pipeline answer with a 500.
    #[default]
    Record,
    /// Log the panic, then abort the process.
    Abort,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset (trace, debug, info, warn, error).
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Request targets (path and query, exact match) skipped by the access log.
    pub exclude: Vec<String>,

    /// Process behaviour after a handler panic.
    pub panic_policy: PanicPolicy,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            exclude: vec!["/health".to_string()],
            panic_policy: PanicPolicy::Record,
        }
    }
}
