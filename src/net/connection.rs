//! Per-connection serve step.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Read one buffer's worth of request bytes (never parsed)
//! - Write the canned response and report whether it went out whole
//!
//! A connection lives for exactly one read → respond cycle. Closing it is
//! the caller's job and happens whatever this step reports.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::{ListenerConfig, ServeConfig};
use crate::http::build_response;
use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Knobs for the serve step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServeOptions {
    /// Receive buffer size; one byte less than this is read.
    pub buffer_size: usize,
    /// Send the response even when the read failed.
    pub respond_on_read_error: bool,
}

impl ServeOptions {
    pub fn from_config(listener: &ListenerConfig, serve: &ServeConfig) -> Self {
        Self {
            buffer_size: listener.buffer_size,
            respond_on_read_error: serve.respond_on_read_error,
        }
    }

    /// Largest request prefix captured from one client.
    pub fn read_limit(&self) -> usize {
        self.buffer_size.saturating_sub(1)
    }
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self::from_config(&ListenerConfig::default(), &ServeConfig::default())
    }
}

/// What happened while serving one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeReport {
    pub id: ConnectionId,
    /// Bytes received; zero when the read failed or the peer sent nothing.
    pub bytes_received: usize,
    /// Exactly the received bytes.
    pub request: Vec<u8>,
    pub read_failed: bool,
    /// Bytes accepted by the single write, zero if it failed or was skipped.
    pub bytes_sent: usize,
    /// Whether the whole response went out in that write.
    pub response_complete: bool,
}

/// Read from `stream`, then answer with the canned response.
///
/// Every failure is logged and reflected in the report; nothing is retried.
pub async fn serve_connection<S>(
    stream: &mut S,
    id: ConnectionId,
    options: &ServeOptions,
) -> ServeReport
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; options.buffer_size];
    let limit = options.read_limit();

    let (bytes_received, read_failed) = match stream.read(&mut buffer[..limit]).await {
        Ok(n) => (n, false),
        Err(e) => {
            tracing::warn!(
                connection_id = %id,
                error = %e,
                "Failed to read bytes from client socket connection"
            );
            metrics::record_read_failure();
            (0, true)
        }
    };
    buffer.truncate(bytes_received);
    metrics::record_request_bytes(bytes_received);

    tracing::info!(
        connection_id = %id,
        bytes = bytes_received,
        "------ Received Request from client ------\n{}",
        String::from_utf8_lossy(&buffer)
    );

    let mut report = ServeReport {
        id,
        bytes_received,
        request: buffer,
        read_failed,
        bytes_sent: 0,
        response_complete: false,
    };

    if read_failed && !options.respond_on_read_error {
        tracing::debug!(connection_id = %id, "Skipping response after read failure");
        metrics::record_response("skipped");
        return report;
    }

    let response = build_response();
    report.bytes_sent = match stream.write(response.as_bytes()).await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(connection_id = %id, error = %e, "Write to client failed");
            0
        }
    };
    report.response_complete = report.bytes_sent == response.len();

    if report.response_complete {
        tracing::info!(
            connection_id = %id,
            bytes = report.bytes_sent,
            "------ Server Response sent to client ------"
        );
        metrics::record_response("sent");
    } else {
        tracing::error!(
            connection_id = %id,
            sent = report.bytes_sent,
            expected = response.len(),
            "Error sending response to client"
        );
        metrics::record_response("failed");
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{build_response, HTML_BODY};
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{duplex, ReadBuf};

    /// Stream whose reads always fail and whose writes are recorded.
    #[derive(Default)]
    struct BrokenReader {
        written: Vec<u8>,
    }

    impl AsyncRead for BrokenReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
            _: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
        }
    }

    impl AsyncWrite for BrokenReader {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.written.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    async fn serve<S: AsyncRead + AsyncWrite + Unpin>(stream: &mut S) -> ServeReport {
        serve_connection(stream, ConnectionId::new(), &ServeOptions::default()).await
    }

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id2.as_u64() > id1.as_u64());
        assert_eq!(id1.to_string(), format!("conn-{}", id1.as_u64()));
    }

    #[test]
    fn read_limit_holds_back_one_byte() {
        assert_eq!(ServeOptions::default().read_limit(), 2999);
    }

    #[tokio::test]
    async fn captures_request_and_responds() {
        let (mut client, mut server) = duplex(8192);
        client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();

        let report = serve(&mut server).await;
        assert_eq!(report.request, b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(report.bytes_received, 18);
        assert!(!report.read_failed);
        assert!(report.response_complete);

        drop(server);
        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, build_response().as_bytes());
    }

    #[tokio::test]
    async fn oversized_request_is_truncated() {
        let (mut client, mut server) = duplex(8192);
        let payload: Vec<u8> = (0..5000u32).map(|i| b'a' + (i % 26) as u8).collect();
        client.write_all(&payload).await.unwrap();

        let report = serve(&mut server).await;
        assert_eq!(report.bytes_received, 2999);
        assert_eq!(report.request, &payload[..2999]);
        assert!(report.response_complete);
    }

    #[tokio::test]
    async fn empty_request_still_answered() {
        let (mut client, mut server) = duplex(8192);
        client.shutdown().await.unwrap();

        let report = serve(&mut server).await;
        assert_eq!(report.bytes_received, 0);
        assert!(report.request.is_empty());
        assert!(report.response_complete);

        drop(server);
        let mut received = String::new();
        client.read_to_string(&mut received).await.unwrap();
        assert!(received.ends_with(HTML_BODY));
    }

    #[tokio::test]
    async fn read_failure_still_answered_by_default() {
        let mut stream = BrokenReader::default();
        let report = serve(&mut stream).await;
        assert!(report.read_failed);
        assert!(report.response_complete);
        assert_eq!(stream.written, build_response().as_bytes());
    }

    #[tokio::test]
    async fn read_failure_can_skip_response() {
        let mut stream = BrokenReader::default();
        let options = ServeOptions {
            respond_on_read_error: false,
            ..ServeOptions::default()
        };
        let report = serve_connection(&mut stream, ConnectionId::new(), &options).await;
        assert!(report.read_failed);
        assert!(!report.response_complete);
        assert_eq!(report.bytes_sent, 0);
        assert!(stream.written.is_empty());
    }

    #[tokio::test]
    async fn short_write_is_reported() {
        // A duplex pipe smaller than the response accepts only part of it.
        let (mut client, mut server) = duplex(64);
        client.write_all(b"hi").await.unwrap();

        let report = serve(&mut server).await;
        assert_eq!(report.bytes_sent, 64);
        assert!(!report.response_complete);
    }
}
