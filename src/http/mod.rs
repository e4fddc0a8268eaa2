//! HTTP/1.1 over raw byte streams.
//!
//! This module parses requests incrementally from any async byte source and
//! streams responses onto any async byte sink. Each connection serves exactly
//! one request/response exchange.
//!
//! # Architecture
//!
//! - **`headers`**: Case-insensitive header table with a line-at-a-time parser
//! - **`request`**: Request, request line and parse state types
//! - **`parser`**: The request state machine and the reader-driven loop
//! - **`response`**: Status codes, default headers and error responses
//! - **`writer`**: Status line, headers, fixed and chunked bodies, trailers
//! - **`connection`**: Per-connection worker used by the server
//! - **`error`**: Parse and write error types
//!
//! # Request parsing
//!
//! ```text
//!        ┌─────────────────┐
//!        │   Initialized   │ ← Wait for the request line
//!        └────────┬────────┘
//!                 │ METHOD SP TARGET SP HTTP/1.1 CRLF
//!                 ▼
//!        ┌─────────────────┐
//!        │ ParsingHeaders  │ ← One header line per step
//!        └────────┬────────┘
//!                 │ blank line
//!                 ▼
//!        ┌─────────────────┐
//!        │   ParsingBody   │ ← Accumulate Content-Length bytes
//!        └────────┬────────┘
//!                 │ body complete (or no body)
//!                 ▼
//!        ┌─────────────────┐
//!        │      Done       │
//!        └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use httpfromtcp::http::parser::request_from_reader;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut raw: &[u8] = b"GET /coffee HTTP/1.1\r\nHost: localhost:42069\r\n\r\n";
//! let request = request_from_reader(&mut raw).await.unwrap();
//! assert_eq!(request.request_line.target, "/coffee");
//! assert_eq!(request.headers.get("Host"), Some("localhost:42069"));
//! # });
//! ```

pub mod connection;
pub mod error;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
