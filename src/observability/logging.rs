//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber once at startup
//! - Pick the default filter from config when `RUST_LOG` is unset
//! - Select pretty or JSON output
//!
//! # Design Decisions
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` always wins over the configured level

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

use crate::config::{LogFormat, LoggingConfig};

/// Filter directive derived from the configured level.
///
/// A bare level applies to this crate and `tower_http`; anything containing
/// `=` or `,` is used verbatim.
pub fn default_directive(level: &str) -> String {
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("{}={level},tower_http={level}", env!("CARGO_CRATE_NAME"))
    }
}

/// Install the global subscriber.
pub fn init(config: &LoggingConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level)));
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_level_expands() {
        assert_eq!(default_directive("debug"), "toggly_middleware=debug,tower_http=debug");
    }

    #[test]
    fn test_full_directive_kept() {
        assert_eq!(default_directive("warn,toggly_middleware=trace"), "warn,toggly_middleware=trace");
    }
}
