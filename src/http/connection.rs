use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::http::error::ParseError;
use crate::http::parser::request_from_reader;
use crate::http::request::Request;
use crate::http::response::ErrorResponse;
use crate::http::writer::ResponseWriter;
use crate::server::Handler;

/// One accepted client connection, serving a single request/response
/// exchange.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    read_timeout: Duration,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr, read_timeout: Duration) -> Self {
        Self {
            stream,
            peer,
            read_timeout,
        }
    }

    /// Reads the request, hands it to `handler`, and closes the connection.
    ///
    /// Parse failures are answered with a best-effort error response.
    pub async fn run(mut self, handler: &Handler) {
        let request = match self.read_request().await {
            Ok(req) => req,
            Err(e) => {
                warn!(peer = %self.peer, error = %e, timeout = e.is_timeout(), "Failed to read request");
                let mut writer = ResponseWriter::new(self.stream);
                if let Err(we) = ErrorResponse::from(&e).write_to(&mut writer).await {
                    debug!(peer = %self.peer, error = %we, "Failed to write error response");
                }
                Self::close(writer.into_inner(), self.peer).await;
                return;
            }
        };

        debug!(
            peer = %self.peer,
            method = %request.method(),
            path = %request.target(),
            "Parsed request"
        );

        let mut writer = ResponseWriter::new(self.stream);
        handler(&mut writer, &request).await;

        if let Err(e) = writer.flush().await {
            debug!(peer = %self.peer, error = %e, "Failed to flush response");
        }
        Self::close(writer.into_inner(), self.peer).await;
    }

    /// Parses one request, giving up once the read deadline passes.
    async fn read_request(&mut self) -> Result<Request, ParseError> {
        match timeout(self.read_timeout, request_from_reader(&mut self.stream)).await {
            Ok(result) => result,
            Err(_) => Err(ParseError::Timeout),
        }
    }

    async fn close(mut stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = stream.shutdown().await {
            debug!(peer = %peer, error = %e, "Error shutting down connection");
        }
        debug!(peer = %peer, "Connection closed");
    }
}
