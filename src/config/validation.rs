//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the auction host URL and account id
//! - Validate value ranges (timeouts > 0, bound >= default)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.server.host_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "server.host_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("server.host_url", e.to_string())),
    }

    if config.server.account_id.trim().is_empty() {
        errors.push(ValidationError::new("server.account_id", "must not be empty"));
    }

    let timeouts = &config.timeouts;
    if timeouts.default_ms == 0 {
        errors.push(ValidationError::new("timeouts.default_ms", "must be greater than zero"));
    }
    if timeouts.upper_bound_ms < timeouts.default_ms {
        errors.push(ValidationError::new(
            "timeouts.upper_bound_ms",
            format!(
                "{} is below default_ms ({})",
                timeouts.upper_bound_ms, timeouts.default_ms
            ),
        ));
    }

    if config.cookies.session_key.is_empty() {
        errors.push(ValidationError::new("cookies.session_key", "must not be empty"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
