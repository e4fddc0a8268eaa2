mod common;

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use common::{ChunkReader, FragmentReader};
use httpfromtcp::http::error::{ParseError, ParseErrorKind};
use httpfromtcp::http::parser::request_from_reader;
use httpfromtcp::http::request::{ParseState, Request, RequestLine};
use tokio::io::{AsyncRead, ReadBuf};

async fn parse_chunked(raw: &[u8], per_read: usize) -> Result<Request, ParseError> {
    let mut reader = ChunkReader::new(raw, per_read);
    request_from_reader(&mut reader).await
}

#[tokio::test]
async fn test_good_get_request_line() {
    let req = parse_chunked(
        b"GET / HTTP/1.1\r\nHost: localhost:42069\r\nUser-Agent: curl/7.81.0\r\nAccept: */*\r\n\r\n",
        3,
    )
    .await
    .unwrap();

    assert_eq!(req.request_line.method, "GET");
    assert_eq!(req.request_line.target, "/");
    assert_eq!(req.request_line.version, "1.1");
}

#[tokio::test]
async fn test_good_get_request_line_with_path() {
    let req = parse_chunked(
        b"GET /coffee HTTP/1.1\r\nHost: localhost:42069\r\nUser-Agent: curl/7.81.0\r\nAccept: */*\r\n\r\n",
        1,
    )
    .await
    .unwrap();

    assert_eq!(req.method(), "GET");
    assert_eq!(req.target(), "/coffee");
    assert_eq!(req.request_line.version, "1.1");
}

#[tokio::test]
async fn test_minimal_request() {
    let req = parse_chunked(b"GET / HTTP/1.1\r\nHost: localhost:42069\r\n\r\n", 64)
        .await
        .unwrap();

    assert_eq!(
        req.request_line,
        RequestLine {
            method: "GET".into(),
            target: "/".into(),
            version: "1.1".into(),
        }
    );
    assert_eq!(req.headers.get("host"), Some("localhost:42069"));
    assert!(req.body.is_empty());
    assert_eq!(req.state(), ParseState::Done);
}

#[tokio::test]
async fn test_request_line_without_headers() {
    let req = parse_chunked(b"DELETE /items/7 HTTP/1.1\r\n\r\n", 2)
        .await
        .unwrap();

    assert_eq!(req.method(), "DELETE");
    assert!(req.headers.is_empty());
}

#[tokio::test]
async fn test_invalid_number_of_parts() {
    let err = parse_chunked(
        b"/coffee HTTP/1.1\r\nHost: localhost:42069\r\n\r\n",
        3,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ParseError::MalformedRequestLine(_)));

    let err = parse_chunked(b"GET / HTTP/1.1 extra\r\n\r\n", 3)
        .await
        .unwrap_err();
    assert!(matches!(err, ParseError::MalformedRequestLine(_)));
}

#[tokio::test]
async fn test_double_space_is_rejected() {
    assert!(parse_chunked(b"GET  / HTTP/1.1\r\n\r\n", 4).await.is_err());
}

#[tokio::test]
async fn test_invalid_method() {
    let err = parse_chunked(b"get / HTTP/1.1\r\n\r\n", 4)
        .await
        .unwrap_err();
    assert!(matches!(err, ParseError::InvalidMethod(ref m) if m == "get"));
    assert_eq!(err.kind(), ParseErrorKind::Malformed);

    let err = parse_chunked(b"G3T / HTTP/1.1\r\n\r\n", 4)
        .await
        .unwrap_err();
    assert!(matches!(err, ParseError::InvalidMethod(_)));
}

#[tokio::test]
async fn test_invalid_target() {
    let err = parse_chunked(b"GET coffee HTTP/1.1\r\n\r\n", 4)
        .await
        .unwrap_err();
    assert!(matches!(err, ParseError::InvalidTarget(_)));
}

#[tokio::test]
async fn test_unsupported_versions() {
    for line in [
        "GET / HTTP/1.0\r\n\r\n",
        "GET / HTTP/2\r\n\r\n",
        "GET / 1.1\r\n\r\n",
        "GET / http/1.1\r\n\r\n",
    ] {
        let err = parse_chunked(line.as_bytes(), 5).await.unwrap_err();
        assert!(
            matches!(err, ParseError::UnsupportedVersion(_)),
            "{line:?} gave {err:?}"
        );
    }
}

#[tokio::test]
async fn test_empty_request_line() {
    let err = parse_chunked(b"\r\nGET / HTTP/1.1\r\n\r\n", 4)
        .await
        .unwrap_err();
    assert!(matches!(err, ParseError::EmptyRequestLine));
}

#[tokio::test]
async fn test_standard_headers() {
    let req = parse_chunked(
        b"GET / HTTP/1.1\r\nHost: localhost:42069\r\nUser-Agent: curl/7.81.0\r\nAccept: */*\r\n\r\n",
        3,
    )
    .await
    .unwrap();

    assert_eq!(req.headers.get("host"), Some("localhost:42069"));
    assert_eq!(req.headers.get("user-agent"), Some("curl/7.81.0"));
    assert_eq!(req.headers.get("accept"), Some("*/*"));
}

#[tokio::test]
async fn test_malformed_header() {
    let err = parse_chunked(b"GET / HTTP/1.1\r\nHost localhost:42069\r\n\r\n", 3)
        .await
        .unwrap_err();
    assert!(matches!(err, ParseError::MalformedHeader(_)));
}

#[tokio::test]
async fn test_non_utf8_header_value_is_accepted() {
    let req = parse_chunked(b"GET / HTTP/1.1\r\nX-Name: caf\xe9\r\nHost: a\r\n\r\n", 2)
        .await
        .unwrap();

    assert_eq!(req.headers.get("x-name"), Some("caf\u{FFFD}"));
    assert_eq!(req.headers.get("host"), Some("a"));
}

#[tokio::test]
async fn test_non_utf8_target_is_accepted() {
    let req = parse_chunked(b"GET /caf\xe9 HTTP/1.1\r\n\r\n", 5)
        .await
        .unwrap();

    assert_eq!(req.target(), "/caf\u{FFFD}");
}

#[tokio::test]
async fn test_duplicate_headers() {
    let req = parse_chunked(
        b"GET / HTTP/1.1\r\nHost: localhost:8000\r\nHost: localhost:42069\r\n\r\n",
        3,
    )
    .await
    .unwrap();

    assert_eq!(req.header("host"), Some("localhost:8000, localhost:42069"));
}

#[tokio::test]
async fn test_case_insensitive_headers() {
    let req = parse_chunked(
        b"GET / HTTP/1.1\r\nHOST: example.com\r\nuser-AGENT: foobar\r\n\r\n",
        3,
    )
    .await
    .unwrap();

    assert_eq!(req.header("host"), Some("example.com"));
    assert_eq!(req.header("User-Agent"), Some("foobar"));
}

#[tokio::test]
async fn test_missing_end_of_headers() {
    let err = parse_chunked(b"GET / HTTP/1.1\r\nHost: localhost:42069\r\n", 3)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ParseError::Incomplete {
            state: ParseState::ParsingHeaders
        }
    ));
    assert_eq!(err.kind(), ParseErrorKind::Incomplete);
}

#[tokio::test]
async fn test_missing_request_line_terminator() {
    let err = parse_chunked(b"GET / HTTP/1.1", 3).await.unwrap_err();
    assert!(matches!(
        err,
        ParseError::Incomplete {
            state: ParseState::Initialized
        }
    ));
}

#[tokio::test]
async fn test_empty_stream() {
    let err = parse_chunked(b"", 3).await.unwrap_err();
    assert!(matches!(err, ParseError::Incomplete { .. }));
}

#[tokio::test]
async fn test_standard_body() {
    let req = parse_chunked(
        b"POST /submit HTTP/1.1\r\nHost: localhost:42069\r\nContent-Length: 13\r\n\r\nhello world!\n",
        3,
    )
    .await
    .unwrap();

    assert_eq!(req.method(), "POST");
    assert_eq!(req.body, b"hello world!\n");
}

#[tokio::test]
async fn test_body_shorter_than_reported() {
    let err = parse_chunked(
        b"POST /submit HTTP/1.1\r\nHost: localhost:42069\r\nContent-Length: 20\r\n\r\npartial content",
        3,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        ParseError::Incomplete {
            state: ParseState::ParsingBody
        }
    ));
}

#[tokio::test]
async fn test_body_overrun_in_single_read() {
    let err = parse_chunked(
        b"POST /submit HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello!",
        1024,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        ParseError::BodyOverrun {
            received: 6,
            declared: 5
        }
    ));
}

#[tokio::test]
async fn test_body_stops_at_declared_length() {
    // One byte at a time the parser is done after the fifth body byte, so the
    // sixth is never read.
    let req = parse_chunked(
        b"POST /submit HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello!",
        1,
    )
    .await
    .unwrap();

    assert_eq!(req.body, b"hello");
}

#[tokio::test]
async fn test_invalid_content_length() {
    let err = parse_chunked(
        b"POST /submit HTTP/1.1\r\nContent-Length: five\r\n\r\nhello",
        3,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ParseError::InvalidContentLength(ref v) if v == "five"));

    let err = parse_chunked(
        b"POST /submit HTTP/1.1\r\nContent-Length: -1\r\n\r\n",
        3,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ParseError::InvalidContentLength(_)));
}

#[tokio::test]
async fn test_zero_content_length() {
    let req = parse_chunked(
        b"POST /submit HTTP/1.1\r\nContent-Length: 0\r\n\r\n",
        3,
    )
    .await
    .unwrap();
    assert!(req.body.is_empty());
}

#[tokio::test]
async fn test_bytes_after_bodyless_request_are_discarded() {
    let req = parse_chunked(
        b"GET /first HTTP/1.1\r\nHost: a\r\n\r\nGET /second HTTP/1.1\r\n\r\n",
        1024,
    )
    .await
    .unwrap();

    assert_eq!(req.target(), "/first");
    assert!(req.body.is_empty());
}

#[tokio::test]
async fn test_binary_body() {
    let req = parse_chunked(
        b"POST /upload HTTP/1.1\r\nContent-Length: 4\r\n\r\n\x00\x01\r\n",
        2,
    )
    .await
    .unwrap();
    assert_eq!(req.body, vec![0, 1, b'\r', b'\n']);
}

const FRAGMENTATION_CASES: &[&[u8]] = &[
    b"GET / HTTP/1.1\r\nHost: localhost:42069\r\n\r\n",
    b"GET /coffee HTTP/1.1\r\nHost: localhost:42069\r\nUser-Agent: curl/7.81.0\r\nAccept: */*\r\n\r\n",
    b"POST /submit HTTP/1.1\r\nHost: localhost:42069\r\nContent-Length: 13\r\n\r\nhello world!\n",
    b"PUT /a/b?c=d HTTP/1.1\r\nX-A: 1\r\nx-a: 2\r\nContent-Type: application/json\r\nContent-Length: 27\r\n\r\n{\"key\": \"value\", \"n\": 1234}",
    b"OPTIONS /x HTTP/1.1\r\n\r\n",
];

#[tokio::test]
async fn test_fragmentation_independence_fixed_sizes() {
    for raw in FRAGMENTATION_CASES {
        let whole = parse_chunked(raw, raw.len()).await.unwrap();
        for per_read in 1..=raw.len() {
            let fragmented = parse_chunked(raw, per_read).await.unwrap();
            assert_eq!(fragmented, whole, "per_read = {per_read}");
        }
    }
}

#[tokio::test]
async fn test_fragmentation_independence_scattered() {
    for raw in FRAGMENTATION_CASES {
        let whole = parse_chunked(raw, raw.len()).await.unwrap();
        for seed in 0..50 {
            let mut reader = FragmentReader::scattered(raw, seed);
            let fragmented = request_from_reader(&mut reader).await.unwrap();
            assert_eq!(fragmented, whole, "seed = {seed}");
        }
    }
}

#[tokio::test]
async fn test_fragmentation_does_not_hide_errors() {
    let raw: &[u8] = b"GET / HTTP/1.1\r\nBad Header: x\r\n\r\n";
    for per_read in 1..=raw.len() {
        let err = parse_chunked(raw, per_read).await.unwrap_err();
        assert!(matches!(err, ParseError::MalformedHeader(_)));
    }
}

/// Delivers some bytes, then fails every read with the given error kind.
struct FailingReader {
    data: &'static [u8],
    kind: io::ErrorKind,
}

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.data.is_empty() {
            return Poll::Ready(Err(io::Error::new(this.kind, "read failed")));
        }
        let n = this.data.len().min(buf.remaining());
        buf.put_slice(&this.data[..n]);
        this.data = &this.data[n..];
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_read_errors_are_transport_errors() {
    let mut reader = FailingReader {
        data: b"GET / HTTP/1.1\r\n",
        kind: io::ErrorKind::ConnectionReset,
    };
    let err = request_from_reader(&mut reader).await.unwrap_err();

    assert!(matches!(err, ParseError::Io(_)));
    assert_eq!(err.kind(), ParseErrorKind::Transport);
    assert!(!err.is_timeout());
}

#[tokio::test]
async fn test_would_block_is_not_a_timeout() {
    let mut reader = FailingReader {
        data: b"GET / HTTP/1.1\r\n",
        kind: io::ErrorKind::WouldBlock,
    };
    let err = request_from_reader(&mut reader).await.unwrap_err();

    assert_eq!(err.kind(), ParseErrorKind::Transport);
    assert!(!err.is_timeout());
}

#[tokio::test]
async fn test_read_timeout_is_distinguished() {
    let mut reader = FailingReader {
        data: b"GET / HTTP/1.1\r\n",
        kind: io::ErrorKind::TimedOut,
    };
    let err = request_from_reader(&mut reader).await.unwrap_err();

    assert!(err.is_timeout());
    assert!(ParseError::Timeout.is_timeout());
}
