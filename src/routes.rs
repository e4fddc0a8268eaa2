//! Demonstration routes served by the binary.

use std::path::PathBuf;

use tokio::io::AsyncWrite;
use tracing::{info, warn};

use crate::config::Config;
use crate::http::error::WriteError;
use crate::http::request::Request;
use crate::http::response::{StatusCode, default_headers};
use crate::http::writer::ResponseWriter;
use crate::proxy::UpstreamProxy;

const PROXY_PREFIX: &str = "/httpbin";

const BAD_REQUEST_HTML: &str = "<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>Your request honestly kinda sucked.</p>
  </body>
</html>
";

const INTERNAL_ERROR_HTML: &str = "<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Okay, you know what? This one is on me.</p>
  </body>
</html>
";

const SUCCESS_HTML: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>
";

pub struct Routes {
    proxy: UpstreamProxy,
    video_path: PathBuf,
}

impl Routes {
    pub fn new(proxy: UpstreamProxy, video_path: impl Into<PathBuf>) -> Self {
        Self {
            proxy,
            video_path: video_path.into(),
        }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let proxy = UpstreamProxy::new(&cfg.proxy.upstream, cfg.proxy.connect_timeout())?;
        Ok(Self::new(proxy, cfg.video_path.clone()))
    }

    /// Writes the response for `req`. Write failures are logged; the
    /// connection is closed by the server either way.
    pub async fn handle<W>(&self, w: &mut ResponseWriter<W>, req: &Request)
    where
        W: AsyncWrite + Unpin,
    {
        let target = req.target();
        let result = if let Some(rest) = proxy_path(target) {
            self.proxy_upstream(w, req, rest).await
        } else {
            match target {
                "/yourproblem" => html(w, StatusCode::BadRequest, BAD_REQUEST_HTML).await,
                "/myproblem" => html(w, StatusCode::InternalServerError, INTERNAL_ERROR_HTML).await,
                "/video" => self.video(w).await,
                _ => html(w, StatusCode::Ok, SUCCESS_HTML).await,
            }
        };

        if let Err(e) = result {
            warn!(path = %target, error = %e, "Failed to write response");
        }
    }

    async fn proxy_upstream<W>(
        &self,
        w: &mut ResponseWriter<W>,
        req: &Request,
        path: &str,
    ) -> Result<(), WriteError>
    where
        W: AsyncWrite + Unpin,
    {
        let upstream = match self.proxy.open(req, path).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(path = %path, error = %e, "Error contacting upstream");
                return plain(w, StatusCode::InternalServerError, "Error contacting upstream").await;
            }
        };

        let summary = upstream.relay(w).await?;
        info!(
            path = %path,
            content_length = summary.content_length,
            sha256 = %summary.sha256,
            "Relayed upstream response"
        );
        Ok(())
    }

    async fn video<W>(&self, w: &mut ResponseWriter<W>) -> Result<(), WriteError>
    where
        W: AsyncWrite + Unpin,
    {
        let video = match tokio::fs::read(&self.video_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %self.video_path.display(), error = %e, "Error reading video file");
                return plain(w, StatusCode::InternalServerError, "Error reading video file").await;
            }
        };

        let mut headers = default_headers(video.len());
        headers.set("content-type", "video/mp4");
        w.write_status_line(StatusCode::Ok).await?;
        w.write_headers(&headers).await?;
        w.write_body(&video).await?;
        Ok(())
    }
}

/// Upstream path for a proxied target: `/httpbin` itself or anything under
/// `/httpbin/`. Other targets sharing the prefix text are not proxied.
fn proxy_path(target: &str) -> Option<&str> {
    match target.strip_prefix(PROXY_PREFIX)? {
        "" => Some("/"),
        rest if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

async fn html<W>(w: &mut ResponseWriter<W>, status: StatusCode, body: &str) -> Result<(), WriteError>
where
    W: AsyncWrite + Unpin,
{
    let mut headers = default_headers(body.len());
    headers.set("content-type", "text/html");
    w.write_status_line(status).await?;
    w.write_headers(&headers).await?;
    w.write_body(body.as_bytes()).await?;
    Ok(())
}

async fn plain<W>(w: &mut ResponseWriter<W>, status: StatusCode, body: &str) -> Result<(), WriteError>
where
    W: AsyncWrite + Unpin,
{
    w.write_status_line(status).await?;
    w.write_headers(&default_headers(body.len())).await?;
    w.write_body(body.as_bytes()).await?;
    Ok(())
}
