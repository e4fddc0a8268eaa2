//! Connection-accepting server.
//!
//! [`Server::serve`] binds a listener and runs the accept loop in the
//! background; every accepted connection is handled by its own task that
//! parses exactly one request, passes it to the [`Handler`], and closes the
//! connection. [`Server::close`] stops accepting and waits for every
//! in-flight connection to finish.

mod active;
pub mod listener;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::net::TcpStream;

use crate::http::request::Request;
use crate::http::writer::ResponseWriter;

pub use listener::Server;

/// Future returned by a handler, borrowing the writer and request.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Produces a complete response for one parsed request.
///
/// Any closure of the shape `|w, req| Box::pin(async move { .. })` works:
///
/// ```ignore
/// let server = Server::serve(42069, |w, _req| {
///     Box::pin(async move {
///         let body = b"hello";
///         let _ = w.write_status_line(StatusCode::Ok).await;
///         let _ = w.write_headers(&default_headers(body.len())).await;
///         let _ = w.write_body(body).await;
///     })
/// })
/// .await?;
/// ```
pub type Handler = Arc<
    dyn for<'a> Fn(&'a mut ResponseWriter<TcpStream>, &'a Request) -> HandlerFuture<'a>
        + Send
        + Sync,
>;
