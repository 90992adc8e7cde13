//! hello-endpoint
//!
//! ```text
//!   client ──TCP──▶ ┌──────────────────────────────────────────┐
//!                   │ Endpoint (single thread)                 │
//!                   │   resolve → bind → listen(20)            │
//!                   │   loop: accept → read → respond → close  │
//!   client ◀─────── │   200 OK + fixed HTML                    │
//!                   └──────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use hello_endpoint::config::{load_config, validate_config, ConfigError, EndpointConfig};
use hello_endpoint::lifecycle::startup;
use hello_endpoint::observability::logging;

#[derive(Parser)]
#[command(name = "hello-endpoint")]
#[command(about = "Serve a fixed HTML page, one connection at a time", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind (default: every local address)
    #[arg(long)]
    host: Option<String>,

    /// Port number or service name
    #[arg(short, long)]
    port: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Expose Prometheus metrics
    #[arg(long)]
    metrics: bool,
}

impl Cli {
    fn into_config(self) -> Result<EndpointConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => EndpointConfig::default(),
        };

        if let Some(host) = self.host {
            config.listener.host = Some(host);
        }
        if let Some(port) = self.port {
            config.listener.service = port;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if self.metrics {
            config.observability.metrics_enabled = true;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init_logging(&config.observability.log_level);

    tracing::info!("hello-endpoint v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        host = config.listener.host.as_deref().unwrap_or("*"),
        service = %config.listener.service,
        backlog = config.listener.backlog,
        "Configuration loaded"
    );

    let summary = startup::run(config).await?;

    tracing::info!(
        connections_served = summary.connections_served,
        "Shutdown complete"
    );
    Ok(())
}
