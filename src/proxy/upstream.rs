//! Upstream connection and response relaying
//!
//! Connects to a plain-HTTP upstream, sends the request, and relays the
//! upstream body back to the client as a chunked response whose trailers
//! carry the SHA-256 digest and length of the full body.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use bytes::{Buf, BytesMut};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::Url;

use crate::http::error::WriteError;
use crate::http::headers::Headers;
use crate::http::request::Request;
use crate::http::response::{StatusCode, default_headers};
use crate::http::writer::ResponseWriter;

/// Upper bound for one relayed chunk.
pub const CHUNK_SIZE: usize = 1024;

/// Upper bound for the upstream status line plus headers.
const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Forwards requests to a single upstream base URL.
#[derive(Debug, Clone)]
pub struct UpstreamProxy {
    base: Url,
    connect_timeout: Duration,
}

impl UpstreamProxy {
    pub fn new(base: &str, connect_timeout: Duration) -> Result<Self> {
        let base = Url::parse(base).context("Invalid upstream URL")?;
        if base.scheme() != "http" {
            bail!("Unsupported upstream scheme {:?}: only http is supported", base.scheme());
        }
        if base.host_str().is_none() {
            bail!("Upstream URL missing host");
        }
        Ok(Self {
            base,
            connect_timeout,
        })
    }

    /// Resolves `path` against the upstream base, keeping any path prefix
    /// the base carries.
    ///
    /// `path` must start with `/`, and the result must still point at the
    /// base's host and port.
    pub fn upstream_url(&self, path: &str) -> Result<Url> {
        if !path.starts_with('/') {
            bail!("Upstream path {path:?} must start with '/'");
        }
        let joined = format!("{}{}", self.base.as_str().trim_end_matches('/'), path);
        let url = Url::parse(&joined).with_context(|| format!("Invalid upstream path {path:?}"))?;

        if url.host_str() != self.base.host_str()
            || url.port_or_known_default() != self.base.port_or_known_default()
            || url.username() != self.base.username()
        {
            bail!("Upstream path {path:?} escapes the upstream authority");
        }
        Ok(url)
    }

    /// Build HTTP request bytes to send upstream.
    ///
    /// HTTP/1.0 is used so the upstream never chunk-encodes its reply and
    /// the body simply runs until the connection closes.
    pub fn build_request(&self, request: &Request, url: &Url) -> Vec<u8> {
        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        let mut buffer = Vec::new();
        buffer.extend_from_slice(format!("{} {} HTTP/1.0\r\n", request.method(), path).as_bytes());
        buffer.extend_from_slice(format!("Host: {}\r\n", host_header(url)).as_bytes());
        buffer.extend_from_slice(b"Connection: close\r\n");

        if let Some(content_type) = request.header("content-type") {
            buffer.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        if !request.body.is_empty() {
            buffer
                .extend_from_slice(format!("Content-Length: {}\r\n", request.body.len()).as_bytes());
        }

        buffer.extend_from_slice(b"\r\n");
        buffer.extend_from_slice(&request.body);
        buffer
    }

    /// Connects upstream, sends the request, and reads the response head.
    pub async fn open(&self, request: &Request, path: &str) -> Result<UpstreamResponse<TcpStream>> {
        let url = self.upstream_url(path)?;
        let addr = format!(
            "{}:{}",
            url.host_str().context("Upstream URL missing host")?,
            url.port_or_known_default().unwrap_or(80)
        );

        tracing::debug!(upstream = %url, method = %request.method(), "Forwarding request upstream");

        let mut stream = timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .context("Connection timeout")?
            .with_context(|| format!("Failed to connect to {addr}"))?;

        stream.write_all(&self.build_request(request, &url)).await?;
        stream.flush().await?;

        UpstreamResponse::read_head(stream).await
    }
}

/// An upstream response whose head has been read; the body is still on the
/// wire.
#[derive(Debug)]
pub struct UpstreamResponse<S> {
    pub status: u16,
    pub headers: Headers,
    stream: S,
    buffer: BytesMut,
}

/// Totals reported in the trailers of a relayed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySummary {
    pub content_length: usize,
    pub sha256: String,
}

impl<S> UpstreamResponse<S>
where
    S: AsyncRead + Unpin,
{
    /// Reads the status line and headers from `stream`.
    pub async fn read_head(mut stream: S) -> Result<Self> {
        let mut buffer = BytesMut::with_capacity(CHUNK_SIZE);

        let head_end = loop {
            if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            if buffer.len() > MAX_HEAD_SIZE {
                bail!("Response headers too large");
            }
            let n = stream.read_buf(&mut buffer).await?;
            if n == 0 {
                bail!("Connection closed before complete response head received");
            }
        };

        let head = buffer.split_to(head_end);
        let status_end = head
            .windows(2)
            .position(|w| w == b"\r\n")
            .context("Empty response")?;
        let status = parse_status_line(&head[..status_end])?;

        let mut headers = Headers::new();
        let mut rest = &head[status_end + 2..];
        loop {
            let (n, done) = headers
                .parse(rest)
                .context("Invalid upstream header")?;
            if done {
                break;
            }
            if n == 0 {
                bail!("Unterminated upstream header line");
            }
            rest = &rest[n..];
        }

        Ok(Self {
            status,
            headers,
            stream,
            buffer,
        })
    }

    /// Streams the body to `w` as a chunked response followed by
    /// `X-Content-SHA256` and `X-Content-Length` trailers.
    ///
    /// A read error from upstream ends the body early; the trailers then
    /// describe what was actually relayed.
    pub async fn relay<W>(mut self, w: &mut ResponseWriter<W>) -> Result<RelaySummary, WriteError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut headers = default_headers(0);
        headers.remove("content-length");
        headers.set("transfer-encoding", "chunked");
        headers.set(
            "content-type",
            self.headers
                .get("content-type")
                .unwrap_or("application/json")
                .to_string(),
        );
        headers.set("trailer", "X-Content-SHA256, X-Content-Length");

        w.write_status_line(StatusCode::from(self.status)).await?;
        w.write_headers(&headers).await?;

        let mut hasher = Sha256::new();
        let mut total = 0;

        while self.buffer.has_remaining() {
            let n = self.buffer.len().min(CHUNK_SIZE);
            let chunk = self.buffer.split_to(n);
            hasher.update(&chunk);
            total += w.write_chunked_body(&chunk).await?;
        }

        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            match self.stream.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    hasher.update(&buf[..n]);
                    total += w.write_chunked_body(&buf[..n]).await?;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Upstream read failed, ending relayed body");
                    break;
                }
            }
        }

        let summary = RelaySummary {
            content_length: total,
            sha256: hex::encode(hasher.finalize()),
        };

        let mut trailers = Headers::new();
        trailers.set("X-Content-SHA256", summary.sha256.clone());
        trailers.set("X-Content-Length", summary.content_length.to_string());

        tracing::debug!(
            sha256 = %summary.sha256,
            content_length = summary.content_length,
            "Writing trailers"
        );

        w.write_chunked_body_done().await?;
        w.write_trailers(&trailers).await?;
        w.flush().await?;

        Ok(summary)
    }
}

fn parse_status_line(line: &[u8]) -> Result<u16> {
    let line = std::str::from_utf8(line).context("Invalid UTF-8 in status line")?;
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        bail!("Invalid status line: {}", line);
    }
    parts
        .next()
        .context("Status line missing code")?
        .parse()
        .with_context(|| format!("Invalid status code in {line:?}"))
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}
