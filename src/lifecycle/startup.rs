//! Startup orchestration.
//!
//! # Order
//! 1. Metrics exporter (optional; failure is logged, not fatal)
//! 2. Endpoint: resolve, bind
//! 3. Signal watcher wired to `Shutdown`
//! 4. Accept loop until a signal arrives

use crate::config::EndpointConfig;
use crate::endpoint::{Endpoint, EndpointError, RunSummary};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

/// Build the endpoint from `config` and serve until SIGINT/SIGTERM.
pub async fn run(config: EndpointConfig) -> Result<RunSummary, EndpointError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut endpoint = Endpoint::from_config(&config).await;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    let summary = endpoint.run(receiver).await?;
    endpoint.stop();
    Ok(summary)
}
