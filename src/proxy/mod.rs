//! Upstream proxying
//!
//! Relays requests to a plain-HTTP upstream and streams the reply back as a
//! chunked response with integrity trailers.

pub mod upstream;

pub use upstream::{RelaySummary, UpstreamProxy, UpstreamResponse};
