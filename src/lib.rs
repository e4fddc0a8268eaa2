//! httpfromtcp - HTTP/1.1 from raw TCP
//!
//! Incremental request parsing, streaming response writing and a
//! one-request-per-connection server with graceful shutdown.

pub mod config;
pub mod http;
pub mod proxy;
pub mod routes;
pub mod server;
