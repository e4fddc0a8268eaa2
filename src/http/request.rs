use crate::http::error::ParseError;
use crate::http::headers::Headers;

/// The first line of an HTTP request: `METHOD TARGET HTTP/1.1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// Uppercase method token (e.g. "GET")
    pub method: String,
    /// Request target, always starting with `/`
    pub target: String,
    /// Protocol version with the `HTTP/` prefix stripped; always "1.1"
    pub version: String,
}

impl RequestLine {
    /// Parses and validates a request line without its trailing CRLF.
    ///
    /// # Example
    ///
    /// ```
    /// # use httpfromtcp::http::request::RequestLine;
    /// let line = RequestLine::parse("GET /coffee HTTP/1.1").unwrap();
    /// assert_eq!(line.method, "GET");
    /// assert_eq!(line.target, "/coffee");
    /// assert_eq!(line.version, "1.1");
    /// ```
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        if line.is_empty() {
            return Err(ParseError::EmptyRequestLine);
        }

        let parts: Vec<&str> = line.split(' ').collect();
        let [method, target, version] = parts[..] else {
            return Err(ParseError::MalformedRequestLine(line.to_string()));
        };

        if method.is_empty() || !method.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(ParseError::InvalidMethod(method.to_string()));
        }

        if !target.starts_with('/') {
            return Err(ParseError::InvalidTarget(target.to_string()));
        }

        match version.strip_prefix("HTTP/") {
            Some("1.1") => {}
            _ => return Err(ParseError::UnsupportedVersion(version.to_string())),
        }

        Ok(Self {
            method: method.to_string(),
            target: target.to_string(),
            version: "1.1".to_string(),
        })
    }
}

/// Progress of a [`RequestParser`](crate::http::parser::RequestParser).
///
/// States only ever advance in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParseState {
    Initialized,
    ParsingHeaders,
    ParsingBody,
    Done,
}

/// A fully parsed HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub request_line: RequestLine,
    /// Headers keyed by lowercase name
    pub headers: Headers,
    /// Exactly `Content-Length` bytes, or empty when there is no body
    pub body: Vec<u8>,
}

impl Request {
    pub fn method(&self) -> &str {
        &self.request_line.method
    }

    pub fn target(&self) -> &str {
        &self.request_line.target
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Always [`ParseState::Done`]: a `Request` only exists once parsing
    /// has finished.
    pub fn state(&self) -> ParseState {
        ParseState::Done
    }
}
