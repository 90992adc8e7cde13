//! Minimal static-response network endpoint.
//!
//! Binds a local address, accepts stream connections strictly one at a time,
//! reads whatever the client sends, answers with a fixed HTML document and
//! closes the connection.

pub mod config;
pub mod endpoint;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;

pub use config::schema::EndpointConfig;
pub use endpoint::{Endpoint, EndpointError, RunSummary, StartError};
pub use lifecycle::Shutdown;
