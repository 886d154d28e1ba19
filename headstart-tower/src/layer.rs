//! Layer construction and the state shared across cloned services.

use std::sync::Arc;

use tower::Layer;

use headstart_core::{FingerprintCache, PreloadConfig};

use crate::service::PreloadService;

/// State shared by every service built from one [`Preload`] layer.
///
/// Cloned services hand out the same fingerprint cache, so a reference
/// list captured through one connection replays on every other.
#[derive(Debug)]
pub struct PreloadShared {
    pub(crate) config: PreloadConfig,
    pub(crate) cache: FingerprintCache,
}

impl PreloadShared {
    /// Configuration the layer was built with.
    pub fn config(&self) -> &PreloadConfig {
        &self.config
    }

    /// Fingerprint cache backing header replays.
    pub fn cache(&self) -> &FingerprintCache {
        &self.cache
    }
}

/// Tower layer that appends preload `Link` headers to HTML responses.
///
/// The layer owns the fingerprint cache; build it once and clone it into
/// as many stacks as needed.
#[derive(Clone, Debug)]
pub struct Preload {
    shared: Arc<PreloadShared>,
}

impl Preload {
    /// Creates a layer from a configuration.
    pub fn new(config: PreloadConfig) -> Self {
        #[cfg(feature = "metrics")]
        let config = instrument_evictions(config);
        let cache = FingerprintCache::new(config.cache.clone());
        Preload {
            shared: Arc::new(PreloadShared { config, cache }),
        }
    }

    /// Fingerprint cache shared by all services built from this layer.
    pub fn cache(&self) -> &FingerprintCache {
        &self.shared.cache
    }
}

impl Default for Preload {
    fn default() -> Self {
        Preload::new(PreloadConfig::default())
    }
}

/// Chains eviction accounting in front of any user-provided listener.
#[cfg(feature = "metrics")]
fn instrument_evictions(mut config: PreloadConfig) -> PreloadConfig {
    let user = config.cache.on_evict.take();
    config.cache.on_evict = Some(Arc::new(move |fingerprint, references| {
        crate::metrics::record_eviction();
        if let Some(listener) = &user {
            listener(fingerprint, references);
        }
    }));
    config
}

impl<S> Layer<S> for Preload {
    type Service = PreloadService<S>;

    fn layer(&self, upstream: S) -> Self::Service {
        PreloadService::new(upstream, Arc::clone(&self.shared))
    }
}
