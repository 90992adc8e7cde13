//! Resilience subsystem.
//!
//! Only one piece applies to a serial endpoint: pacing the accept loop when
//! `accept` keeps failing (e.g., the process is out of descriptors). It is
//! opt-in; see `AcceptConfig::backoff_enabled`.

pub mod backoff;
