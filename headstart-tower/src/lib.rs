//! # headstart-tower
//!
//! Tower middleware that teaches an HTTP service to announce the
//! subresources of its HTML pages ahead of time. Outgoing `text/html`
//! responses are scanned for images, scripts, stylesheets and HTML
//! imports, and one `Link: rel=preload` value is appended per reference
//! so clients start fetching them before the document is parsed.
//!
//! ## How a response flows through
//!
//! | Response | Action |
//! |----------|--------|
//! | Not `text/html` | Streams through byte-for-byte without buffering. |
//! | HTML with a cached `ETag` | Headers replay from the cache while the body streams through. |
//! | HTML not seen before | The body is buffered, scanned, cached under its `ETag` and replayed verbatim with headers appended. |
//!
//! The body a client receives is always byte-identical to what the
//! upstream produced. Headers are only appended; nothing is removed or
//! rewritten. A response whose body fails mid-read, or outgrows the
//! configured capture limit, is released unscanned.
//!
//! ## Quick start
//!
//! ```ignore
//! use headstart_tower::{Preload, PreloadConfig};
//! use tower::ServiceBuilder;
//!
//! let config = PreloadConfig::builder()
//!     .html_imports(true)
//!     .max_capture_bytes(2 * 1024 * 1024)
//!     .build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(Preload::new(config))
//!     .service(app);
//! ```
//!
//! ## Replay trust
//!
//! Replay is keyed on the response `ETag` and takes it at face value: the
//! middleware assumes the host derives validators from body content. A
//! host that reuses one validator across different bodies will replay
//! hints composed for another document.
//!
//! ## Examples
//!
//! For complete, runnable examples see the `demos/` directory:
//!
//! ```text
//! cargo run -p headstart-demos --example axum
//! cargo run -p headstart-demos --example tower
//! ```
//!
//! ## Feature flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `metrics` | Emit session, header and eviction counters through the `metrics` facade. |

#![warn(missing_docs)]

/// Response body forms returned by the service.
pub mod body;
/// Response future driving the interception pipeline.
pub mod future;
/// Layer construction and shared state.
pub mod layer;
/// Counters describing the interception pipeline.
pub mod metrics;
/// The middleware service.
pub mod service;
/// Per-request session state.
pub mod session;

pub use body::{InterceptedBody, Remaining, SpilledBody};
pub use future::PreloadFuture;
pub use layer::{Preload, PreloadShared};
pub use service::PreloadService;
pub use session::{Session, Stage};

pub use headstart_core::{
    CacheOptions, FingerprintCache, PreloadConfig, PreloadConfigBuilder, ResourceKind,
    ResourceReference,
};
