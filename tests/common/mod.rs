//! Helpers shared by the integration tests.
#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use httpfromtcp::http::headers::Headers;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;

/// Yields at most `per_read` bytes per read.
pub struct ChunkReader {
    data: Vec<u8>,
    pos: usize,
    per_read: usize,
}

impl ChunkReader {
    pub fn new(data: impl Into<Vec<u8>>, per_read: usize) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            per_read,
        }
    }
}

impl AsyncRead for ChunkReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let end = (this.pos + this.per_read)
            .min(this.data.len())
            .min(this.pos + buf.remaining());
        buf.put_slice(&this.data[this.pos..end]);
        this.pos = end;
        Poll::Ready(Ok(()))
    }
}

/// Yields the given fragments one per read (split further only if the
/// caller's buffer is smaller).
pub struct FragmentReader {
    fragments: Vec<Vec<u8>>,
    next: usize,
    offset: usize,
}

impl FragmentReader {
    pub fn new(fragments: Vec<Vec<u8>>) -> Self {
        Self {
            fragments,
            next: 0,
            offset: 0,
        }
    }

    /// Splits `data` at pseudo-random points derived from `seed`.
    pub fn scattered(data: &[u8], seed: u64) -> Self {
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let mut fragments = Vec::new();
        let mut rest = data;
        while !rest.is_empty() {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let len = 1 + (state >> 33) as usize % 7;
            let len = len.min(rest.len());
            fragments.push(rest[..len].to_vec());
            rest = &rest[len..];
        }
        Self::new(fragments)
    }
}

impl AsyncRead for FragmentReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(fragment) = this.fragments.get(this.next) {
            let end = (this.offset + buf.remaining()).min(fragment.len());
            buf.put_slice(&fragment[this.offset..end]);
            if end == fragment.len() {
                this.next += 1;
                this.offset = 0;
            } else {
                this.offset = end;
            }
        }
        Poll::Ready(Ok(()))
    }
}

#[derive(Debug)]
pub struct ParsedResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub trailers: Headers,
}

impl ParsedResponse {
    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_fields(rest: &mut &[u8]) -> Headers {
    let mut fields = Headers::new();
    loop {
        let (n, done) = fields.parse(*rest).unwrap();
        assert!(n > 0, "truncated field section");
        *rest = &rest[n..];
        if done {
            return fields;
        }
    }
}

fn decode_chunked(rest: &mut &[u8]) -> (Vec<u8>, Headers) {
    let mut body = Vec::new();
    loop {
        let end = find(*rest, b"\r\n").expect("chunk size line");
        let size =
            usize::from_str_radix(std::str::from_utf8(&rest[..end]).unwrap(), 16).unwrap();
        *rest = &rest[end + 2..];
        if size == 0 {
            break;
        }
        body.extend_from_slice(&rest[..size]);
        assert_eq!(&rest[size..size + 2], b"\r\n", "chunk not CRLF-terminated");
        *rest = &rest[size + 2..];
    }
    let trailers = parse_fields(rest);
    (body, trailers)
}

/// Parses a complete serialized response, decoding chunked bodies.
pub fn parse_response(raw: &[u8]) -> ParsedResponse {
    let line_end = find(raw, b"\r\n").expect("status line");
    let status_line = std::str::from_utf8(&raw[..line_end]).unwrap();
    let mut parts = status_line.splitn(3, ' ');
    assert_eq!(parts.next(), Some("HTTP/1.1"));
    let status = parts.next().unwrap().parse().unwrap();
    let reason = parts.next().unwrap_or("").to_string();

    let mut rest = &raw[line_end + 2..];
    let headers = parse_fields(&mut rest);

    let (body, trailers) = if headers.get("transfer-encoding") == Some("chunked") {
        decode_chunked(&mut rest)
    } else {
        let len = headers
            .get("content-length")
            .map(|v| v.parse().unwrap())
            .unwrap_or(rest.len());
        (rest[..len].to_vec(), Headers::new())
    };

    ParsedResponse {
        status,
        reason,
        headers,
        body,
        trailers,
    }
}

/// Sends `request`, half-closes, and reads until the server closes.
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    stream.shutdown().await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    response
}

pub async fn get(addr: SocketAddr, path: &str) -> ParsedResponse {
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
    parse_response(&send_raw(addr, request.as_bytes()).await)
}

/// Loopback address for a server bound to all interfaces.
pub fn loopback(addr: SocketAddr) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], addr.port()))
}
