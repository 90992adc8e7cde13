//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the endpoint.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Service used when none is given.
pub const DEFAULT_SERVICE: &str = "8080";

/// Pending connections queued by the platform before `accept`.
pub const DEFAULT_BACKLOG: u32 = 20;

/// Size of the per-connection receive buffer. One byte is held back, so at
/// most `DEFAULT_BUFFER_SIZE - 1` bytes are read from a client.
pub const DEFAULT_BUFFER_SIZE: usize = 3000;

/// Root configuration for the endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EndpointConfig {
    /// Bind parameters and socket sizing.
    pub listener: ListenerConfig,

    /// Accept loop behavior.
    pub accept: AcceptConfig,

    /// Per-connection serve behavior.
    pub serve: ServeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host to bind. `None` binds every local address.
    pub host: Option<String>,

    /// Port number or well-known service name (e.g., "8080", "http").
    pub service: String,

    /// Listen backlog.
    pub backlog: u32,

    /// Receive buffer size in bytes.
    pub buffer_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: None,
            service: DEFAULT_SERVICE.to_string(),
            backlog: DEFAULT_BACKLOG,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Accept loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AcceptConfig {
    /// Sleep between consecutive accept failures.
    /// Off by default: a failed accept is retried immediately.
    pub backoff_enabled: bool,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for AcceptConfig {
    fn default() -> Self {
        Self {
            backoff_enabled: false,
            base_delay_ms: 10,
            max_delay_ms: 1000,
        }
    }
}

/// Per-connection serve configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Send the response even when reading the request failed.
    pub respond_on_read_error: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            respond_on_read_error: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
