//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and referential names
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: `ServerConfig` → `Result<(), Vec<ValidationError>>`

use std::net::SocketAddr;

use crate::config::schema::ServerConfig;

/// One semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const KNOWN_TARGETS: &[&str] = &["console", "disc", "network", "sse"];

/// Validate a parsed configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address".to_string(),
            message: format!("not a valid socket address: {:?}", config.listener.bind_address),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError {
            field: "timeouts.request_secs".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }

    if config.logging.dir.is_empty() {
        errors.push(ValidationError {
            field: "logging.dir".to_string(),
            message: "must not be empty".to_string(),
        });
    }

    for (i, sub) in config.logging.debug.iter().enumerate() {
        if !KNOWN_TARGETS.contains(&sub.target.as_str()) {
            errors.push(ValidationError {
                field: format!("logging.debug[{}].target", i),
                message: format!(
                    "unknown target {:?}, expected one of {:?}",
                    sub.target, KNOWN_TARGETS
                ),
            });
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError {
            field: "observability.metrics_address".to_string(),
            message: format!(
                "not a valid socket address: {:?}",
                config.observability.metrics_address
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
