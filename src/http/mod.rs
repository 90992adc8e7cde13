//! HTTP framing for the canned response.
//!
//! Requests are never parsed. The only HTTP this crate speaks is the fixed
//! document in response.rs.

pub mod response;

pub use response::{build_response, HTML_BODY};
