//! Metrics declaration and initialization.
//!
//! Counters are registered through the `metrics` facade when the `metrics`
//! feature is enabled. Without the feature the recording helpers compile
//! to nothing, so call sites stay unconditional.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

use crate::session::Stage;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track finished interception sessions by terminal stage.
    pub static ref SESSION_COUNTER: &'static str = {
        metrics::describe_counter!(
            "headstart_session_total",
            "Total number of interception sessions by terminal stage."
        );
        "headstart_session_total"
    };
    /// Track preload header values appended to responses.
    pub static ref PRELOAD_HEADER_COUNTER: &'static str = {
        metrics::describe_counter!(
            "headstart_preload_headers_total",
            "Total number of Link header values appended to responses."
        );
        "headstart_preload_headers_total"
    };
    /// Track fingerprint entries displaced from the cache.
    pub static ref CACHE_EVICTION_COUNTER: &'static str = {
        metrics::describe_counter!(
            "headstart_cache_evictions_total",
            "Total number of fingerprint entries evicted from the cache."
        );
        "headstart_cache_evictions_total"
    };
}

/// Records one finished session and the number of header values it
/// emitted.
///
/// A session recorded at the `capturing` stage was abandoned mid-capture
/// by a body error or the capture limit.
///
/// When the `metrics` feature is disabled, this function is a no-op
/// and will be eliminated by the compiler.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_session(stage: Stage, header_values: usize) {
    metrics::counter!(*SESSION_COUNTER, "stage" => stage.as_str()).increment(1);
    if header_values > 0 {
        metrics::counter!(*PRELOAD_HEADER_COUNTER).increment(header_values as u64);
    }
}

/// No-op version when the metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_session(_stage: Stage, _header_values: usize) {}

/// Records one capacity eviction from the fingerprint cache.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_eviction() {
    metrics::counter!(*CACHE_EVICTION_COUNTER).increment(1);
}

/// No-op version when the metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_eviction() {}
