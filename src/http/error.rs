//! Error types for request parsing and response writing.

use std::io;

use thiserror::Error;

use crate::http::request::ParseState;

/// Broad classification of a [`ParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The bytes received violate HTTP/1.1 syntax.
    Malformed,
    /// The stream ended before the request was complete.
    Incomplete,
    /// Reading from the connection failed or timed out.
    Transport,
}

/// Errors produced while parsing an HTTP request.
///
/// Every variant is terminal for the connection it came from.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty request line")]
    EmptyRequestLine,

    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    #[error("invalid method in request line: {0:?}")]
    InvalidMethod(String),

    #[error("invalid request target in request line: {0:?}")]
    InvalidTarget(String),

    #[error("unsupported HTTP version in request line: {0:?}")]
    UnsupportedVersion(String),

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("invalid Content-Length: {0:?}")]
    InvalidContentLength(String),

    #[error("body length {received} exceeds Content-Length {declared}")]
    BodyOverrun { received: usize, declared: usize },

    #[error("incomplete request: stream ended while {state:?}")]
    Incomplete { state: ParseState },

    #[error("request read timeout")]
    Timeout,

    #[error("read error: {0}")]
    Io(#[from] io::Error),
}

impl ParseError {
    pub fn kind(&self) -> ParseErrorKind {
        match self {
            ParseError::Incomplete { .. } => ParseErrorKind::Incomplete,
            ParseError::Timeout | ParseError::Io(_) => ParseErrorKind::Transport,
            _ => ParseErrorKind::Malformed,
        }
    }

    /// True when the read deadline expired, either as enforced by the server
    /// or as reported by the underlying socket.
    pub fn is_timeout(&self) -> bool {
        match self {
            ParseError::Timeout => true,
            ParseError::Io(e) => e.kind() == io::ErrorKind::TimedOut,
            _ => false,
        }
    }
}

/// Errors produced while writing a response.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The sink stopped accepting bytes before the payload was fully written.
    #[error("short write: {written} of {expected} bytes written")]
    ShortWrite { written: usize, expected: usize },

    #[error("write error: {0}")]
    Io(#[from] io::Error),
}
