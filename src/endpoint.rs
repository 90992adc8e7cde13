//! The endpoint: bind once, then serve connections strictly one at a time.
//!
//! # Lifecycle
//! ```text
//! from_config ─▶ resolve ─▶ bind_first ─▶ Bound ─listen─▶ Listening ─run─┐
//!      │                                                                 │
//!      └── any setup error ─▶ Failed (logged)                            ▼
//!                                      ┌──── accept ◀──────────────────────┐
//!                                      ▼                                   │
//!                                   serve (read, respond) ─▶ close ────────┘
//! ```
//!
//! Construction never returns an error. A failed endpoint reports itself
//! through `is_ready`/`failure` and refuses to `listen` or `run`.

use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::{AcceptConfig, EndpointConfig};
use crate::net::connection::{serve_connection, ConnectionId, ServeOptions};
use crate::net::listener::{bind_first, Accept, BoundSocket, ResolvedEndpointInfo, SetupError};
use crate::net::resolve::{BindTarget, ResolveError};
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

/// Why an endpoint failed to come up.
#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Setup(#[from] SetupError),
}

/// Errors returned by [`Endpoint::listen`] and [`Endpoint::run`].
#[derive(Debug, Error)]
pub enum EndpointError {
    /// Setup failed earlier, or the endpoint already ran or was stopped.
    #[error("endpoint is not bound")]
    NotReady,

    /// The bound socket could not be switched to listening.
    #[error("socket listen failed: {0}")]
    Listen(#[source] std::io::Error),
}

/// Totals reported when the accept loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Connections that went through the whole serve step.
    pub connections_served: u64,
    pub accept_failures: u64,
    /// Responses written in full.
    pub responses_sent: u64,
    /// Responses cut short, failed outright or skipped after a read error.
    pub responses_failed: u64,
}

#[derive(Debug)]
enum State {
    Bound(BoundSocket),
    Listening(TcpListener),
    Failed(StartError),
    Stopped,
}

/// A single-connection-at-a-time network endpoint.
#[derive(Debug)]
pub struct Endpoint {
    state: State,
    info: Option<ResolvedEndpointInfo>,
    service: String,
    backlog: u32,
    accept: AcceptConfig,
    serve: ServeOptions,
}

impl Endpoint {
    /// Bind every local address on service "8080".
    pub async fn new() -> Self {
        Self::from_config(&EndpointConfig::default()).await
    }

    /// Bind `host` (or every local address) on `service`.
    pub async fn with_address(host: Option<&str>, service: &str) -> Self {
        let mut config = EndpointConfig::default();
        config.listener.host = host.map(str::to_string);
        config.listener.service = service.to_string();
        Self::from_config(&config).await
    }

    /// Resolve and bind according to `config`.
    pub async fn from_config(config: &EndpointConfig) -> Self {
        let target = BindTarget::from_config(&config.listener);

        let (state, info) = match setup(&target).await {
            Ok(bound) => {
                let info = bound.info().cloned();
                (State::Bound(bound), info)
            }
            Err(e) => {
                tracing::error!(
                    target_address = %target,
                    error = %e,
                    "Failed to start server with PORT: {}",
                    target.service
                );
                (State::Failed(e), None)
            }
        };

        Self {
            state,
            info,
            service: config.listener.service.clone(),
            backlog: config.listener.backlog,
            accept: config.accept.clone(),
            serve: ServeOptions::from_config(&config.listener, &config.serve),
        }
    }

    /// Whether the endpoint holds a bound or listening socket.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Bound(_) | State::Listening(_))
    }

    /// Whether `listen` has succeeded and clients can connect.
    pub fn is_listening(&self) -> bool {
        matches!(self.state, State::Listening(_))
    }

    /// The setup error, if construction failed.
    pub fn failure(&self) -> Option<&StartError> {
        match &self.state {
            State::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Numeric host and service of the bound address.
    pub fn info(&self) -> Option<&ResolvedEndpointInfo> {
        self.info.as_ref()
    }

    /// Local address while bound or listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.state {
            State::Bound(bound) => bound.local_addr().ok(),
            State::Listening(listener) => listener.local_addr().ok(),
            _ => None,
        }
    }

    /// Switch the bound socket into listening mode. Calling it again while
    /// listening is a no-op. A listen failure closes the socket.
    pub fn listen(&mut self) -> Result<(), EndpointError> {
        match std::mem::replace(&mut self.state, State::Stopped) {
            State::Bound(bound) => {
                let listener = bound.listen(self.backlog).map_err(|e| {
                    tracing::error!(error = %e, "Socket listen failed");
                    EndpointError::Listen(e)
                })?;

                let (host, serv) = self.display_addr();
                tracing::info!(
                    backlog = self.backlog,
                    "*** Listening on ADDRESS: {}, PORT: {} ***",
                    host,
                    serv
                );
                self.state = State::Listening(listener);
                Ok(())
            }
            State::Listening(listener) => {
                self.state = State::Listening(listener);
                Ok(())
            }
            other => {
                self.state = other;
                tracing::error!(
                    service = %self.service,
                    "Endpoint is not bound; refusing to listen"
                );
                Err(EndpointError::NotReady)
            }
        }
    }

    /// Listen if not already listening, then accept and serve connections
    /// one after another until `shutdown` fires or its sender is dropped.
    ///
    /// The endpoint is spent afterwards: the listening socket is closed when
    /// this returns.
    pub async fn run(
        &mut self,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<RunSummary, EndpointError> {
        self.listen()?;
        let listener = match std::mem::replace(&mut self.state, State::Stopped) {
            State::Listening(listener) => listener,
            other => {
                self.state = other;
                return Err(EndpointError::NotReady);
            }
        };

        Ok(self.serve_loop(&listener, shutdown).await)
    }

    async fn serve_loop<A: Accept>(
        &self,
        listener: &A,
        mut shutdown: broadcast::Receiver<()>,
    ) -> RunSummary {
        let (host, serv) = self.display_addr();
        let mut summary = RunSummary::default();
        let mut consecutive_failures: u32 = 0;

        loop {
            tracing::info!("====== Waiting for a new connection ======");

            let accepted = tokio::select! {
                _ = shutdown.recv() => break,
                accepted = listener.accept() => accepted,
            };

            let (mut stream, peer_addr) = match accepted {
                Ok(accepted) => {
                    consecutive_failures = 0;
                    accepted
                }
                Err(e) => {
                    summary.accept_failures += 1;
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    metrics::record_accept_failure();
                    tracing::error!(
                        error = %e,
                        "Server failed to accept incoming connection from ADDRESS: {}, PORT: {}",
                        host,
                        serv
                    );

                    if self.accept.backoff_enabled {
                        let delay = calculate_backoff(
                            consecutive_failures,
                            self.accept.base_delay_ms,
                            self.accept.max_delay_ms,
                        );
                        tokio::select! {
                            _ = shutdown.recv() => break,
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    continue;
                }
            };

            let id = ConnectionId::new();
            metrics::record_connection_accepted();
            tracing::debug!(connection_id = %id, peer_addr = %peer_addr, "Connection accepted");

            let report = tokio::select! {
                _ = shutdown.recv() => break,
                report = serve_connection(&mut stream, id, &self.serve) => report,
            };
            summary.connections_served += 1;
            if report.response_complete {
                summary.responses_sent += 1;
            } else {
                summary.responses_failed += 1;
            }

            drop(stream);
            tracing::debug!(connection_id = %id, "Connection closed");
        }

        tracing::info!(
            connections_served = summary.connections_served,
            accept_failures = summary.accept_failures,
            responses_sent = summary.responses_sent,
            responses_failed = summary.responses_failed,
            "Accept loop stopped"
        );
        summary
    }

    /// Release the listening socket. Safe to call any number of times.
    pub fn stop(&mut self) {
        if self.is_ready() {
            self.state = State::Stopped;
            tracing::debug!(service = %self.service, "Listening socket closed");
        }
    }

    fn display_addr(&self) -> (&str, &str) {
        match &self.info {
            Some(info) => (info.host.as_str(), info.service.as_str()),
            None => ("?", self.service.as_str()),
        }
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn setup(target: &BindTarget) -> Result<BoundSocket, StartError> {
    let candidates = target.resolve().await?;
    Ok(bind_first(&candidates)?)
}
