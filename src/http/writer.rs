use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::error::WriteError;
use crate::http::headers::Headers;
use crate::http::response::StatusCode;

const HTTP_VERSION: &str = "HTTP/1.1";
const CRLF: &[u8] = b"\r\n";

/// Streams a response onto a byte sink.
///
/// Callers must emit the parts in order: status line, headers, then either a
/// fixed-length body or a sequence of chunks followed by
/// [`write_chunked_body_done`](Self::write_chunked_body_done) and
/// [`write_trailers`](Self::write_trailers). The writer does not check this.
pub struct ResponseWriter<W> {
    sink: W,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<(), WriteError> {
        // The space before the (possibly empty) reason phrase is always kept.
        let line = format!(
            "{} {} {}\r\n",
            HTTP_VERSION,
            status.as_u16(),
            status.reason_phrase()
        );
        self.write_full(line.as_bytes()).await
    }

    /// Writes one `name: value` line per header and the blank line ending the
    /// header section.
    pub async fn write_headers(&mut self, headers: &Headers) -> Result<(), WriteError> {
        self.write_field_lines(headers).await
    }

    /// Writes body bytes verbatim. Returns the number of bytes written.
    pub async fn write_body(&mut self, body: &[u8]) -> Result<usize, WriteError> {
        self.write_full(body).await?;
        Ok(body.len())
    }

    /// Writes one chunk: hex size, CRLF, payload, CRLF.
    ///
    /// Returns the payload length. An empty payload produces `0\r\n\r\n`;
    /// use [`write_chunked_body_done`](Self::write_chunked_body_done) to end
    /// the body when trailers follow.
    pub async fn write_chunked_body(&mut self, chunk: &[u8]) -> Result<usize, WriteError> {
        let size_line = format!("{:x}\r\n", chunk.len());
        self.write_full(size_line.as_bytes()).await?;
        if !chunk.is_empty() {
            self.write_full(chunk).await?;
        }
        self.write_full(CRLF).await?;
        Ok(chunk.len())
    }

    /// Writes the terminal zero-length chunk marker `0\r\n`.
    ///
    /// The trailer section is left open; finish it with
    /// [`write_trailers`](Self::write_trailers), passing an empty table if
    /// there are none.
    pub async fn write_chunked_body_done(&mut self) -> Result<(), WriteError> {
        self.write_full(b"0\r\n").await
    }

    /// Writes trailer fields and the blank line ending the message.
    pub async fn write_trailers(&mut self, trailers: &Headers) -> Result<(), WriteError> {
        self.write_field_lines(trailers).await
    }

    pub async fn flush(&mut self) -> Result<(), WriteError> {
        self.sink.flush().await?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    async fn write_field_lines(&mut self, fields: &Headers) -> Result<(), WriteError> {
        for (name, value) in fields.iter() {
            let line = format!("{name}: {value}\r\n");
            self.write_full(line.as_bytes()).await?;
        }
        self.write_full(CRLF).await
    }

    /// Writes all of `buf`, failing if the sink stops accepting bytes.
    async fn write_full(&mut self, buf: &[u8]) -> Result<(), WriteError> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.sink.write(&buf[written..]).await?;
            if n == 0 {
                return Err(WriteError::ShortWrite {
                    written,
                    expected: buf.len(),
                });
            }
            written += n;
        }
        Ok(())
    }
}
