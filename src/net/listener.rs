//! Listening socket setup.
//!
//! # Responsibilities
//! - Create a socket for each candidate address, in order
//! - Enable address reuse so a restarted endpoint can rebind at once
//! - Bind the first candidate that accepts it
//! - Switch the bound socket into listening mode with a fixed backlog
//!
//! # Failure Policy
//! - Socket creation or bind failure: log, try the next candidate
//! - Address reuse cannot be enabled: fatal, stop trying candidates
//! - No candidate bound: fatal

use std::future::Future;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpSocket, TcpStream};

/// Error type for listener setup.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Address reuse could not be enabled on a fresh socket.
    #[error("failed to set address reuse on {addr}: {source}")]
    ReuseAddress {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Every candidate failed at socket creation or bind.
    #[error("failed to bind any of {tried} candidate address(es)")]
    NoCandidate { tried: usize },
}

/// Numeric host and service of the bound address, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpointInfo {
    pub host: String,
    pub service: String,
}

impl From<SocketAddr> for ResolvedEndpointInfo {
    fn from(addr: SocketAddr) -> Self {
        Self {
            host: addr.ip().to_string(),
            service: addr.port().to_string(),
        }
    }
}

impl std::fmt::Display for ResolvedEndpointInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "host={}, serv={}", self.host, self.service)
    }
}

/// A socket bound to a local address but not yet listening.
#[derive(Debug)]
pub struct BoundSocket {
    socket: TcpSocket,
    info: Option<ResolvedEndpointInfo>,
}

impl BoundSocket {
    /// Diagnostic view of the bound address, if it could be read back.
    pub fn info(&self) -> Option<&ResolvedEndpointInfo> {
        self.info.as_ref()
    }

    /// Get the local address this socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.socket.local_addr()
    }

    /// Start listening. On failure the socket is closed.
    pub fn listen(self, backlog: u32) -> Result<TcpListener, std::io::Error> {
        self.socket.listen(backlog)
    }
}

/// The socket operations candidate binding needs.
pub trait CandidateSocket: Sized {
    fn set_reuseaddr(&self, reuse: bool) -> Result<(), std::io::Error>;
    fn bind(&self, addr: SocketAddr) -> Result<(), std::io::Error>;
    fn local_addr(&self) -> Result<SocketAddr, std::io::Error>;
}

impl CandidateSocket for TcpSocket {
    fn set_reuseaddr(&self, reuse: bool) -> Result<(), std::io::Error> {
        TcpSocket::set_reuseaddr(self, reuse)
    }

    fn bind(&self, addr: SocketAddr) -> Result<(), std::io::Error> {
        TcpSocket::bind(self, addr)
    }

    fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        TcpSocket::local_addr(self)
    }
}

/// Bind the first candidate address that works.
pub fn bind_first(candidates: &[SocketAddr]) -> Result<BoundSocket, SetupError> {
    let (socket, info) = bind_candidates(candidates, new_socket)?;
    Ok(BoundSocket { socket, info })
}

/// Walk `candidates` in order, opening each with `open`, and return the
/// first socket that binds together with its diagnostic info.
pub fn bind_candidates<S, F>(
    candidates: &[SocketAddr],
    mut open: F,
) -> Result<(S, Option<ResolvedEndpointInfo>), SetupError>
where
    S: CandidateSocket,
    F: FnMut(&SocketAddr) -> Result<S, std::io::Error>,
{
    for addr in candidates {
        let socket = match open(addr) {
            Ok(socket) => socket,
            Err(e) => {
                tracing::warn!(address = %addr, error = %e, "server: socket");
                continue;
            }
        };

        if let Err(source) = socket.set_reuseaddr(true) {
            tracing::error!(address = %addr, error = %source, "setsockopt");
            return Err(SetupError::ReuseAddress { addr: *addr, source });
        }

        // Dropping the socket on bind failure closes it.
        if let Err(e) = socket.bind(*addr) {
            tracing::warn!(address = %addr, error = %e, "server: bind");
            continue;
        }

        let info = match socket.local_addr() {
            Ok(local) => {
                let info = ResolvedEndpointInfo::from(local);
                tracing::info!(host = %info.host, serv = %info.service, "Socket bound");
                Some(info)
            }
            Err(e) => {
                tracing::warn!(address = %addr, error = %e, "could not resolve hostname");
                None
            }
        };

        return Ok((socket, info));
    }

    Err(SetupError::NoCandidate {
        tried: candidates.len(),
    })
}

fn new_socket(addr: &SocketAddr) -> Result<TcpSocket, std::io::Error> {
    match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    }
}

/// Result of one accept: the connection and its peer address.
pub type Accepted<S> = Result<(S, SocketAddr), std::io::Error>;

/// Source of accepted connections for the serve loop.
pub trait Accept {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    fn accept(&self) -> impl Future<Output = Accepted<Self::Stream>> + Send;
}

impl Accept for TcpListener {
    type Stream = TcpStream;

    fn accept(&self) -> impl Future<Output = Accepted<TcpStream>> + Send {
        TcpListener::accept(self)
    }
}
