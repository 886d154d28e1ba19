//! Tower Service Example
//!
//! Demonstrates the Preload layer around a hand-written Tower service,
//! served with Hyper directly (without Axum).
//!
//! Features shown:
//!   - Direct tower::Service trait implementation
//!   - Hyper HTTP server integration
//!   - TowerToHyperService adapter pattern
//!   - Extra Link attributes (`nopush`) and a non-ASCII target
//!
//! Run:
//!   cargo run -p headstart-demos --example tower
//!
//! Endpoints:
//!   - http://localhost:3001/         - HTML page (Link headers appended)
//!   - http://localhost:3001/nordic   - Page with a non-ASCII image path
//!   - http://localhost:3001/health   - Health check (not HTML)
//!
//! Try it:
//!   curl -v http://localhost:3001/           # scanned, then replayed
//!   curl -v http://localhost:3001/nordic     # percent-encoded Link target
//!   curl -v http://localhost:3001/health     # untouched

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::{Request, Response, StatusCode, header};
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tower::{Service, ServiceBuilder};

use headstart_tower::{Preload, PreloadConfig};

const INDEX: &str = r#"<!doctype html>
<html>
  <head><link rel="stylesheet" href="/static/main.css"></head>
  <body>
    <img src="/static/banner.png">
    <script src="/static/main.js"></script>
  </body>
</html>
"#;

const NORDIC: &str = r#"<!doctype html>
<html>
  <body><img src="/static/søborg.jpg"></body>
</html>
"#;

/// Simple handler service that routes requests based on path.
#[derive(Clone)]
struct PageService;

impl<B> Service<Request<B>> for PageService
where
    B: Send + 'static,
{
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let path = req.uri().path().to_string();

        Box::pin(async move {
            let response = match path.as_str() {
                "/" => Response::builder()
                    .status(StatusCode::OK)
                    .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
                    .header(header::ETAG, "\"index-1\"")
                    .body(Full::new(Bytes::from(INDEX)))
                    .unwrap(),

                "/nordic" => Response::builder()
                    .status(StatusCode::OK)
                    .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
                    .header(header::ETAG, "\"nordic-1\"")
                    .body(Full::new(Bytes::from(NORDIC)))
                    .unwrap(),

                "/health" => Response::builder()
                    .status(StatusCode::OK)
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Full::new(Bytes::from("OK")))
                    .unwrap(),

                _ => Response::builder()
                    .status(StatusCode::NOT_FOUND)
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Full::new(Bytes::from("Not Found")))
                    .unwrap(),
            };

            Ok(response)
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let subscriber = tracing_subscriber::fmt()
        .pretty()
        .with_env_filter("info,headstart_tower=debug")
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let config = PreloadConfig::builder()
        .extra_link_attribute("nopush")
        .cache_capacity(256)
        .build();

    let service = ServiceBuilder::new()
        .layer(Preload::new(config))
        .service(PageService);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3001));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let svc = service.clone();

        tokio::task::spawn(async move {
            let hyper_service = TowerToHyperService::new(svc);

            if let Err(err) = http1::Builder::new()
                .serve_connection(io, hyper_service)
                .await
            {
                tracing::error!(?err, "Error serving connection");
            }
        });
    }
}
