//! # headstart-core
//!
//! Core types and logic for the Headstart preload-hint middleware.
//!
//! This crate is **transport-agnostic**: it knows nothing about HTTP
//! services or body streams. It owns the three leaf pieces of the
//! pipeline and the contracts between them, leaving parsing to
//! `headstart-html` and response interception to `headstart-tower`.
//!
//! ## Pieces
//!
//! - **Extraction** ([`extract`]): the matching rules that turn a parsed
//!   document into an ordered [`ResourceReference`] list, driven by
//!   [`Matcher`] patterns over the [`Document`]/[`Element`] seam.
//! - **Composition** ([`compose`]): the `Link: rel=preload` header-value
//!   grammar, base-href resolution and target percent-encoding.
//! - **Fingerprint cache** ([`FingerprintCache`]): a bounded LRU from
//!   response validator (ETag) to extracted references, with a
//!   synchronous eviction notification hook.
//!
//! All three are total: extraction and composition never fail on
//! malformed input, and cache operations never error.
#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod extract;
pub mod link;
pub mod markup;
pub mod reference;

pub use cache::{
    CacheOptions, CachedReferences, DEFAULT_CACHE_CAPACITY, EvictionListener, FingerprintCache,
};
pub use config::{PreloadConfig, PreloadConfigBuilder};
pub use extract::{extract, matchers};
pub use link::{compose, escape_target};
pub use markup::{AttrRule, Document, Element, Matcher};
pub use reference::{ResourceKind, ResourceReference};
