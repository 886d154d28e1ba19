//! Axum Integration Example
//!
//! Serves a small HTML site through the Preload layer so every page
//! response carries `Link: rel=preload` headers for its images, scripts
//! and stylesheets.
//!
//! Features shown:
//! - Layering Preload onto an axum Router
//! - ETag-keyed replay: repeat requests for a page skip the scan
//! - A `<base href>` page whose relative targets get prefixed
//! - A capture limit that leaves oversized pages untouched
//!
//! Run:
//!   cargo run -p headstart-demos --example axum
//!
//! Endpoints:
//!   - http://localhost:3000/          - Landing page (scanned, then replayed)
//!   - http://localhost:3000/gallery   - Page with a base href
//!   - http://localhost:3000/health    - Health check (not HTML, untouched)
//!
//! Try it:
//!   curl -v http://localhost:3000/          # Link headers appear
//!   curl -v http://localhost:3000/          # same headers, replayed from cache
//!   curl -v http://localhost:3000/gallery   # targets prefixed with the CDN base
//!   curl -v http://localhost:3000/health    # no Link header

use axum::{Router, response::Html, response::IntoResponse, routing::get};
use http::header;

use headstart_tower::{Preload, PreloadConfig};

const LANDING: &str = r#"<!doctype html>
<html>
  <head>
    <title>headstart demo</title>
    <link rel="stylesheet" href="/assets/site.css">
    <script src="/assets/app.js"></script>
  </head>
  <body>
    <h1>Welcome</h1>
    <img src="/assets/hero.jpg" alt="hero">
    <img src="data:image/gif;base64,R0lGODlhAQABAAAAACw=" alt="spacer">
  </body>
</html>
"#;

const GALLERY: &str = r#"<!doctype html>
<html>
  <head>
    <title>gallery</title>
    <base href="https://cdn.example/site/">
    <link rel="stylesheet" href="gallery.css">
  </head>
  <body>
    <img src="photos/one.jpg">
    <img src="photos/two.jpg">
    <img src="/local/three.jpg">
  </body>
</html>
"#;

async fn landing() -> impl IntoResponse {
    ([(header::ETAG, "\"landing-1\"")], Html(LANDING))
}

async fn gallery() -> impl IntoResponse {
    ([(header::ETAG, "\"gallery-1\"")], Html(GALLERY))
}

async fn health() -> &'static str {
    "OK"
}

#[tokio::main]
async fn main() {
    let subscriber = tracing_subscriber::fmt()
        .pretty()
        .with_env_filter("info,headstart_tower=debug,headstart_core=debug")
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let config = PreloadConfig::builder()
        .max_capture_bytes(1024 * 1024)
        .on_evict(|fingerprint, _| tracing::info!(fingerprint, "cache entry evicted"))
        .build();

    let app = Router::new()
        .route("/", get(landing))
        .route("/gallery", get(gallery))
        .route("/health", get(health))
        .layer(Preload::new(config));

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("Failed to bind to port 3000");
    tracing::info!("Listening on http://{}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("Server error");
}
