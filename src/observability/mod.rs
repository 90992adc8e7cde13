//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! endpoint, net
//!     → logging.rs (structured log events, stdout)
//!     → metrics.rs (counters, optional Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
