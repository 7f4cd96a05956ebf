//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Header-bound values must be valid HTTP header values
//! - Validate value ranges (timeouts > 0, bind address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} is not a valid header value: {value:?}")]
    InvalidHeaderValue { field: &'static str, value: String },

    #[error("listener.bind_address is not a socket address: {0}")]
    InvalidBindAddress(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,

    #[error("logging.exclude entry must start with '/': {0:?}")]
    InvalidExclude(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.listener.bind_address.clone()));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    check_header_value(&mut errors, "service.name", &config.service.name);
    check_header_value(&mut errors, "service.version", &config.service.version);
    if config.service.api_version.is_empty() {
        errors.push(ValidationError::Empty { field: "service.api_version" });
    }

    for target in &config.logging.exclude {
        if !target.starts_with('/') {
            errors.push(ValidationError::InvalidExclude(target.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_header_value(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.is_empty() {
        errors.push(ValidationError::Empty { field });
    } else if HeaderValue::from_str(value).is_err() {
        errors.push(ValidationError::InvalidHeaderValue {
            field,
            value: value.to_string(),
        });
    }
}
