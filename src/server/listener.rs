use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::http::connection::Connection;
use crate::http::request::Request;
use crate::http::writer::ResponseWriter;
use crate::server::active::ActiveConnections;
use crate::server::{Handler, HandlerFuture};

/// A running server. Dropping it without calling [`close`](Self::close)
/// leaves the accept loop running in the background.
pub struct Server {
    local_addr: SocketAddr,
    closed: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    active: Arc<ActiveConnections>,
    accept_loop: JoinHandle<()>,
}

impl Server {
    /// Binds `0.0.0.0:port` and starts accepting connections in the
    /// background, using the default read timeout.
    ///
    /// Returns as soon as the socket is bound. Port `0` picks a free port;
    /// see [`local_addr`](Self::local_addr).
    pub async fn serve<H>(port: u16, handler: H) -> anyhow::Result<Server>
    where
        H: for<'a> Fn(&'a mut ResponseWriter<TcpStream>, &'a Request) -> HandlerFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        let config = ServerConfig {
            port,
            ..ServerConfig::default()
        };
        Self::serve_with(&config, handler).await
    }

    pub async fn serve_with<H>(config: &ServerConfig, handler: H) -> anyhow::Result<Server>
    where
        H: for<'a> Fn(&'a mut ResponseWriter<TcpStream>, &'a Request) -> HandlerFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        let listener = TcpListener::bind(("0.0.0.0", config.port))
            .await
            .with_context(|| format!("failed to bind port {}", config.port))?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "Listening");

        let closed = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(Notify::new());
        let active = Arc::new(ActiveConnections::default());

        let accept_loop = tokio::spawn(accept_loop(
            listener,
            Arc::new(handler) as Handler,
            config.read_timeout(),
            Arc::clone(&closed),
            Arc::clone(&shutdown),
            Arc::clone(&active),
        ));

        Ok(Server {
            local_addr,
            closed,
            shutdown,
            active,
            accept_loop,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of connections currently being handled.
    pub fn active_connections(&self) -> usize {
        self.active.count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stops accepting connections, closes the listening socket, and waits
    /// until every in-flight connection has finished.
    ///
    /// In-flight handlers are never interrupted.
    pub async fn close(self) {
        self.closed.store(true, Ordering::Release);
        self.shutdown.notify_one();

        // The listener is dropped, and so closed, when the loop exits.
        if let Err(e) = self.accept_loop.await {
            warn!(error = %e, "Accept loop ended abnormally");
        }

        let in_flight = self.active.count();
        if in_flight > 0 {
            info!(connections = in_flight, "Waiting for in-flight connections");
        }
        self.active.wait_idle().await;
        info!(addr = %self.local_addr, "Server closed");
    }
}

async fn accept_loop(
    listener: TcpListener,
    handler: Handler,
    read_timeout: Duration,
    closed: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    active: Arc<ActiveConnections>,
) {
    loop {
        let accepted = tokio::select! {
            res = listener.accept() => res,
            _ = shutdown.notified() => break,
        };

        let (socket, peer) = match accepted {
            Ok(conn) => conn,
            Err(_) if closed.load(Ordering::Acquire) => break,
            Err(e) => {
                debug!(error = %e, "Transient accept error");
                continue;
            }
        };

        info!("Accepted connection from {}", peer);

        let guard = active.enter();
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            Connection::new(socket, peer, read_timeout).run(&handler).await;
            drop(guard);
        });
    }

    debug!("Accept loop stopped");
}
