use tokio::io::AsyncWrite;

use crate::http::error::{ParseError, WriteError};
use crate::http::headers::Headers;
use crate::http::writer::ResponseWriter;

/// HTTP status codes the server names explicitly.
///
/// Any other code can still be sent through [`StatusCode::Other`]; it is
/// rendered without a reason phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 408 Request Timeout
    RequestTimeout,
    /// 500 Internal Server Error
    InternalServerError,
    /// Any other status code
    Other(u16),
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use httpfromtcp::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::Other(418).as_u16(), 418);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::RequestTimeout => 408,
            StatusCode::InternalServerError => 500,
            StatusCode::Other(code) => *code,
        }
    }

    /// Returns the reason phrase, or `""` for codes outside the known set.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::Other(_) => "",
        }
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        match code {
            200 => StatusCode::Ok,
            400 => StatusCode::BadRequest,
            408 => StatusCode::RequestTimeout,
            500 => StatusCode::InternalServerError,
            other => StatusCode::Other(other),
        }
    }
}

/// Minimal header set for a fixed-length plain-text response.
///
/// Callers adjust individual entries as needed, e.g. replacing
/// `content-type` or swapping `content-length` for
/// `transfer-encoding: chunked`.
pub fn default_headers(content_len: usize) -> Headers {
    let mut headers = Headers::new();
    headers.set("content-length", content_len.to_string());
    headers.set("connection", "close");
    headers.set("content-type", "text/plain");
    headers
}

/// A complete plain-text error response: status line, default headers sized
/// to the message, and the message as body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: StatusCode,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub async fn write_to<W>(&self, w: &mut ResponseWriter<W>) -> Result<(), WriteError>
    where
        W: AsyncWrite + Unpin,
    {
        w.write_status_line(self.status).await?;
        w.write_headers(&default_headers(self.message.len())).await?;
        if !self.message.is_empty() {
            w.write_body(self.message.as_bytes()).await?;
        }
        w.flush().await
    }
}

impl From<&ParseError> for ErrorResponse {
    fn from(err: &ParseError) -> Self {
        if err.is_timeout() {
            ErrorResponse::new(StatusCode::RequestTimeout, "request read timeout\n")
        } else {
            ErrorResponse::new(StatusCode::BadRequest, format!("{err}\n"))
        }
    }
}
