//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! (host, service)
//!     → resolve.rs (BindTarget → ordered candidate addresses)
//!     → listener.rs (socket, reuse-address, bind first candidate, listen)
//!     → accept (endpoint.rs, one connection at a time)
//!     → connection.rs (read request bytes, write canned response)
//!     → close
//! ```
//!
//! # Design Decisions
//! - First candidate that binds wins; no ranking beyond resolution order
//! - Request bytes are an opaque buffer, logged and otherwise ignored

pub mod connection;
pub mod listener;
pub mod resolve;

pub use connection::{serve_connection, ConnectionId, ServeOptions, ServeReport};
pub use listener::{
    bind_candidates, bind_first, Accept, Accepted, BoundSocket, CandidateSocket,
    ResolvedEndpointInfo, SetupError,
};
pub use resolve::{resolve_service, AddressFamily, BindTarget, ResolveError, Transport};
