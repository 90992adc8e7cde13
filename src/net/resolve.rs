//! Bind address resolution.
//!
//! # Responsibilities
//! - Describe what kind of local address is wanted (`BindTarget`)
//! - Turn a host and a port/service string into ordered candidates
//!
//! # Design Decisions
//! - Any address family; IPv4 wildcard is tried before IPv6
//! - Resolution failure is terminal for the caller; no retry

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use thiserror::Error;

use crate::config::ListenerConfig;

/// Well-known service names accepted in place of a port number.
const SERVICES: [(&str, u16); 4] = [
    ("http", 80),
    ("https", 443),
    ("http-alt", 8080),
    ("webcache", 8080),
];

/// Errors raised while resolving a bind target.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Service is neither a port number nor a known service name.
    #[error("unknown service {0:?}")]
    Service(String),

    /// Host lookup failed.
    #[error("failed to resolve host {host:?}: {source}")]
    Lookup {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// Lookup succeeded but produced nothing to bind.
    #[error("no addresses found for {0:?}")]
    NoAddresses(String),
}

/// Address family requested from resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    /// IPv4 or IPv6.
    Unspecified,
    V4,
    V6,
}

impl AddressFamily {
    fn admits(&self, addr: &SocketAddr) -> bool {
        match self {
            AddressFamily::Unspecified => true,
            AddressFamily::V4 => addr.is_ipv4(),
            AddressFamily::V6 => addr.is_ipv6(),
        }
    }
}

/// Transport requested from resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stream,
}

/// Criteria for finding local addresses to bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindTarget {
    /// Host to bind; `None` means every local address.
    pub host: Option<String>,
    /// Port number or service name.
    pub service: String,
    pub family: AddressFamily,
    pub transport: Transport,
    /// Fill in the local wildcard address when no host is given.
    pub passive: bool,
}

impl BindTarget {
    /// Create a target for `host` (or the wildcard) and `service`.
    pub fn new(host: Option<&str>, service: &str) -> Self {
        Self {
            host: host.map(str::to_string),
            service: service.to_string(),
            family: AddressFamily::Unspecified,
            transport: Transport::Stream,
            passive: host.is_none(),
        }
    }

    /// Create a target from listener configuration.
    pub fn from_config(config: &ListenerConfig) -> Self {
        Self::new(config.host.as_deref(), &config.service)
    }

    /// Resolve into candidate addresses, in the order they should be tried.
    pub async fn resolve(&self) -> Result<Vec<SocketAddr>, ResolveError> {
        let port = resolve_service(&self.service)?;

        let candidates: Vec<SocketAddr> = match self.host.as_deref() {
            None if self.passive => vec![
                SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
                SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port),
            ],
            None => vec![
                SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port),
                SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), port),
            ],
            Some(host) => match host.parse::<IpAddr>() {
                Ok(ip) => vec![SocketAddr::new(ip, port)],
                Err(_) => tokio::net::lookup_host((host, port))
                    .await
                    .map_err(|source| ResolveError::Lookup {
                        host: host.to_string(),
                        source,
                    })?
                    .collect(),
            },
        };

        let candidates: Vec<SocketAddr> = candidates
            .into_iter()
            .filter(|addr| self.family.admits(addr))
            .collect();

        if candidates.is_empty() {
            return Err(ResolveError::NoAddresses(self.to_string()));
        }

        tracing::debug!(
            target = %self,
            candidates = candidates.len(),
            "Bind target resolved"
        );
        Ok(candidates)
    }
}

impl std::fmt::Display for BindTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host.as_deref().unwrap_or("*"), self.service)
    }
}

/// Map a port number or well-known service name to a port.
pub fn resolve_service(service: &str) -> Result<u16, ResolveError> {
    let service = service.trim();
    if let Ok(port) = service.parse::<u16>() {
        return Ok(port);
    }
    SERVICES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(service))
        .map(|(_, port)| *port)
        .ok_or_else(|| ResolveError::Service(service.to_string()))
}
