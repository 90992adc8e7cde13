//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use hello_endpoint::{Endpoint, EndpointConfig, EndpointError, RunSummary, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

/// Upper bound for any single client-side wait.
pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// An endpoint running its accept loop on a background task.
pub struct RunningEndpoint {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<RunSummary, EndpointError>>,
}

impl RunningEndpoint {
    /// Trigger shutdown and wait for the loop's summary.
    pub async fn stop(self) -> RunSummary {
        self.shutdown.trigger();
        tokio::time::timeout(IO_TIMEOUT, self.handle)
            .await
            .expect("accept loop did not stop")
            .expect("accept loop panicked")
            .expect("accept loop failed")
    }
}

/// Loopback configuration on `service`.
pub fn loopback_config(service: &str) -> EndpointConfig {
    let mut config = EndpointConfig::default();
    config.listener.host = Some("127.0.0.1".to_string());
    config.listener.service = service.to_string();
    config
}

/// Bind `config` and run the accept loop in the background.
pub async fn start_endpoint(config: EndpointConfig) -> RunningEndpoint {
    let mut endpoint = Endpoint::from_config(&config).await;
    assert!(endpoint.is_ready(), "endpoint failed: {:?}", endpoint.failure());
    // Listen before spawning so clients can connect as soon as this returns.
    endpoint.listen().unwrap();
    let addr = endpoint.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let handle = tokio::spawn(async move { endpoint.run(receiver).await });

    RunningEndpoint { addr, shutdown, handle }
}

/// Send `request`, half-close, and read until the server closes.
pub async fn exchange(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    stream.shutdown().await.unwrap();
    read_response(&mut stream).await
}

/// Send `request` without half-closing and read until the server closes,
/// so the server side closes the connection first.
pub async fn exchange_server_closes(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    read_response(&mut stream).await
}

/// Read until EOF, bounded by [`IO_TIMEOUT`].
pub async fn read_response(stream: &mut TcpStream) -> Vec<u8> {
    let mut response = Vec::new();
    tokio::time::timeout(IO_TIMEOUT, stream.read_to_end(&mut response))
        .await
        .expect("timed out waiting for response")
        .unwrap();
    response
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}
