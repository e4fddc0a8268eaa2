use std::sync::Arc;

use httpfromtcp::config::Config;
use httpfromtcp::routes::Routes;
use httpfromtcp::server::Server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let routes = Arc::new(Routes::from_config(&cfg)?);

    let server = Server::serve_with(&cfg.server, move |w, req| {
        let routes = Arc::clone(&routes);
        Box::pin(async move { routes.handle(w, req).await })
    })
    .await?;
    tracing::info!(port = server.local_addr().port(), "Server started");

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    server.close().await;
    tracing::info!("Server gracefully stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
