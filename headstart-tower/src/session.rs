//! Per-request interception state.
//!
//! Every request that enters the preload service gets its own [`Session`].
//! Concurrent sessions never share mutable state with each other; the only
//! thing they have in common is the fingerprint cache owned by the layer.

use tracing::debug;

/// Lifecycle stage of one interception session.
///
/// A session moves forward through these stages and never backtracks:
///
/// ```text
/// Undecided ─┬─> Passthrough
///            ├─> Replay
///            └─> Capturing ──> Injected
/// ```
///
/// `Capturing` is also a terminal stage: a session that hits the capture
/// limit or an upstream body error stops there and releases the response
/// without headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Response headers have not been inspected yet.
    Undecided,
    /// Not an HTML response; it is released untouched.
    Passthrough,
    /// Headers are composed from cached references while the body streams
    /// through unchanged.
    Replay,
    /// The response body is being buffered before any byte is released.
    Capturing,
    /// Headers were injected and the buffered body replayed verbatim.
    Injected,
}

impl Stage {
    /// Label used in tracing fields and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Undecided => "undecided",
            Stage::Passthrough => "passthrough",
            Stage::Replay => "replay",
            Stage::Capturing => "capturing",
            Stage::Injected => "injected",
        }
    }
}

/// Transient state owned by one in-flight response.
///
/// The session records which stage the response reached and the validator
/// it was keyed under. It is dropped together with its future, so a client
/// that disconnects mid-capture discards the partial buffer without
/// scanning it or touching the cache.
#[derive(Debug)]
pub struct Session {
    stage: Stage,
    fingerprint: Option<String>,
}

impl Session {
    pub(crate) fn new() -> Self {
        Session {
            stage: Stage::Undecided,
            fingerprint: None,
        }
    }

    /// Stage the session is currently in.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Validator token the response was keyed under, if it carried one.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub(crate) fn set_fingerprint(&mut self, fingerprint: Option<String>) {
        self.fingerprint = fingerprint;
    }

    pub(crate) fn transition(&mut self, to: Stage) {
        debug!(from = self.stage.as_str(), to = to.as_str(), "session stage");
        self.stage = to;
    }
}
