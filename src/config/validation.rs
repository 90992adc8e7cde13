//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (backlog > 0, buffer holds at least one byte)
//! - Check observability settings are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EndpointConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::EndpointConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.service must not be empty")]
    EmptyService,

    #[error("listener.backlog must be greater than zero")]
    ZeroBacklog,

    #[error("listener.buffer_size must be at least 2, got {0}")]
    BufferTooSmall(usize),

    #[error("accept.base_delay_ms ({base}) exceeds accept.max_delay_ms ({max})")]
    BackoffRange { base: u64, max: u64 },

    #[error("unknown observability.log_level {0:?}")]
    LogLevel(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &EndpointConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.service.trim().is_empty() {
        errors.push(ValidationError::EmptyService);
    }
    if config.listener.backlog == 0 {
        errors.push(ValidationError::ZeroBacklog);
    }
    if config.listener.buffer_size < 2 {
        errors.push(ValidationError::BufferTooSmall(config.listener.buffer_size));
    }
    if config.accept.base_delay_ms > config.accept.max_delay_ms {
        errors.push(ValidationError::BackoffRange {
            base: config.accept.base_delay_ms,
            max: config.accept.max_delay_ms,
        });
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
