//! Incremental HTTP/1.1 request parsing.
//!
//! [`RequestParser`] is a push parser: it is handed whatever bytes are
//! currently buffered and reports how many it consumed. Zero consumed without
//! an error means "need more data". [`request_from_reader`] drives it from any
//! async byte source, so the result is the same however the stream is
//! fragmented.

use std::mem;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::error::ParseError;
use crate::http::headers::{Headers, find_crlf};
use crate::http::request::{ParseState, Request, RequestLine};

/// Initial size of the read buffer; it doubles whenever it fills up.
const INITIAL_BUFFER_SIZE: usize = 8;

enum Stage {
    Initialized,
    ParsingHeaders {
        request_line: RequestLine,
        headers: Headers,
    },
    ParsingBody {
        request_line: RequestLine,
        headers: Headers,
        body: Vec<u8>,
    },
    Done(Request),
}

/// State machine over request line, headers and body.
pub struct RequestParser {
    stage: Stage,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            stage: Stage::Initialized,
        }
    }

    pub fn state(&self) -> ParseState {
        match self.stage {
            Stage::Initialized => ParseState::Initialized,
            Stage::ParsingHeaders { .. } => ParseState::ParsingHeaders,
            Stage::ParsingBody { .. } => ParseState::ParsingBody,
            Stage::Done(_) => ParseState::Done,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.stage, Stage::Done(_))
    }

    /// Feeds buffered bytes to the parser and returns how many were consumed.
    ///
    /// At most one step (request line, one header line, or a slice of body)
    /// is taken per call. Once done, every call consumes nothing.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        match &mut self.stage {
            Stage::Initialized => {
                let Some(idx) = find_crlf(data) else {
                    return Ok(0);
                };
                let line = String::from_utf8_lossy(&data[..idx]);
                let request_line = RequestLine::parse(&line)?;

                self.stage = Stage::ParsingHeaders {
                    request_line,
                    headers: Headers::new(),
                };
                Ok(idx + 2)
            }

            Stage::ParsingHeaders { headers, .. } => {
                let (n, done) = headers.parse(data)?;
                if done {
                    self.stage = match mem::replace(&mut self.stage, Stage::Initialized) {
                        Stage::ParsingHeaders {
                            request_line,
                            headers,
                        } => Stage::ParsingBody {
                            request_line,
                            headers,
                            body: Vec::new(),
                        },
                        other => other,
                    };
                }
                Ok(n)
            }

            Stage::ParsingBody { headers, body, .. } => {
                let declared = match headers.get("content-length") {
                    None => 0,
                    Some(raw) => raw
                        .parse::<usize>()
                        .map_err(|_| ParseError::InvalidContentLength(raw.to_string()))?,
                };

                if declared == 0 {
                    // No body: whatever else is buffered is discarded, never
                    // treated as the start of another request.
                    self.finish_body();
                    return Ok(data.len());
                }

                body.extend_from_slice(data);
                if body.len() > declared {
                    return Err(ParseError::BodyOverrun {
                        received: body.len(),
                        declared,
                    });
                }
                if body.len() == declared {
                    self.finish_body();
                }
                Ok(data.len())
            }

            Stage::Done(_) => Ok(0),
        }
    }

    /// Returns the parsed request, or [`ParseError::Incomplete`] if parsing
    /// never reached [`ParseState::Done`].
    pub fn finish(self) -> Result<Request, ParseError> {
        let state = self.state();
        match self.stage {
            Stage::Done(request) => Ok(request),
            _ => Err(ParseError::Incomplete { state }),
        }
    }

    fn finish_body(&mut self) {
        self.stage = match mem::replace(&mut self.stage, Stage::Initialized) {
            Stage::ParsingBody {
                request_line,
                headers,
                body,
            } => Stage::Done(Request {
                request_line,
                headers,
                body,
            }),
            other => other,
        };
    }
}

/// Growable read buffer with an explicit fill cursor.
///
/// Consumed bytes are compacted away by shifting the remainder to the front.
struct ReadBuffer {
    buf: Vec<u8>,
    filled: usize,
}

impl ReadBuffer {
    fn new() -> Self {
        Self {
            buf: vec![0; INITIAL_BUFFER_SIZE],
            filled: 0,
        }
    }

    fn data(&self) -> &[u8] {
        &self.buf[..self.filled]
    }

    fn consume(&mut self, n: usize) {
        let n = n.min(self.filled);
        self.buf.copy_within(n..self.filled, 0);
        self.filled -= n;
    }

    fn spare(&mut self) -> &mut [u8] {
        if self.filled == self.buf.len() {
            let grown = self.buf.len() * 2;
            self.buf.resize(grown, 0);
        }
        &mut self.buf[self.filled..]
    }

    fn advance(&mut self, n: usize) {
        self.filled += n;
    }
}

/// Feeds everything currently buffered to the parser until it stops making
/// progress.
fn drain(parser: &mut RequestParser, buf: &mut ReadBuffer) -> Result<(), ParseError> {
    while !parser.is_done() {
        let consumed = parser.parse(buf.data())?;
        if consumed == 0 {
            break;
        }
        buf.consume(consumed);
    }
    Ok(())
}

/// Reads and parses a single request from `reader`.
///
/// Tolerates any fragmentation of the stream. If the source reaches EOF
/// before the request is complete, [`ParseError::Incomplete`] is returned.
pub async fn request_from_reader<R>(reader: &mut R) -> Result<Request, ParseError>
where
    R: AsyncRead + Unpin,
{
    let mut parser = RequestParser::new();
    let mut buf = ReadBuffer::new();

    loop {
        drain(&mut parser, &mut buf)?;
        if parser.is_done() {
            return parser.finish();
        }

        let n = reader.read(buf.spare()).await?;
        if n == 0 {
            drain(&mut parser, &mut buf)?;
            return parser.finish();
        }
        buf.advance(n);
    }
}
