//! Library configuration surface.

use serde::{Deserialize, Serialize};

use crate::cache::CacheOptions;
use crate::reference::ResourceReference;

/// Configuration for the scan and injection pipeline.
///
/// The defaults mirror what most pages want preloaded: images, scripts
/// and stylesheets on, HTML imports off. Construct directly, through
/// [`PreloadConfig::builder`], or deserialize from configuration data
/// (the eviction callback is code, not data, and is skipped by serde).
///
/// ```
/// use headstart_core::PreloadConfig;
///
/// let config = PreloadConfig::builder()
///     .html_imports(true)
///     .extra_link_attribute("nopush")
///     .cache_capacity(256)
///     .build();
/// assert!(config.images);
/// assert_eq!(config.cache.capacity, 256);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloadConfig {
    /// Scan `img[src]` elements.
    pub images: bool,
    /// Scan `script[src]` elements.
    pub scripts: bool,
    /// Scan `link[rel=stylesheet]` elements.
    pub styles: bool,
    /// Scan `link[rel=import]` elements.
    pub html_imports: bool,
    /// Attributes appended verbatim to every generated `Link` value, in
    /// order, e.g. `nopush`.
    pub extra_link_attributes: Vec<String>,
    /// Upper bound on bytes buffered while capturing one body. When the
    /// cap is exceeded the session abandons scanning and streams the
    /// body through unmodified. `None` buffers without limit, matching
    /// the behavior hosts relied on before the cap existed.
    pub max_capture_bytes: Option<usize>,
    /// Fingerprint cache sizing and eviction hook.
    pub cache: CacheOptions,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            images: true,
            scripts: true,
            styles: true,
            html_imports: false,
            extra_link_attributes: Vec::new(),
            max_capture_bytes: None,
            cache: CacheOptions::default(),
        }
    }
}

impl PreloadConfig {
    /// Configuration with the default switches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fluent builder over the defaults.
    pub fn builder() -> PreloadConfigBuilder {
        PreloadConfigBuilder::default()
    }

    /// Whether any resource class is enabled at all. When false the
    /// pipeline never parses a body.
    pub fn any_enabled(&self) -> bool {
        self.images || self.scripts || self.styles || self.html_imports
    }
}

/// Fluent builder for [`PreloadConfig`].
#[derive(Debug, Default)]
pub struct PreloadConfigBuilder {
    config: PreloadConfig,
}

impl PreloadConfigBuilder {
    /// Toggles `img[src]` scanning.
    pub fn images(mut self, enabled: bool) -> Self {
        self.config.images = enabled;
        self
    }

    /// Toggles `script[src]` scanning.
    pub fn scripts(mut self, enabled: bool) -> Self {
        self.config.scripts = enabled;
        self
    }

    /// Toggles `link[rel=stylesheet]` scanning.
    pub fn styles(mut self, enabled: bool) -> Self {
        self.config.styles = enabled;
        self
    }

    /// Toggles `link[rel=import]` scanning.
    pub fn html_imports(mut self, enabled: bool) -> Self {
        self.config.html_imports = enabled;
        self
    }

    /// Appends one extra attribute to every generated `Link` value.
    pub fn extra_link_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.config.extra_link_attributes.push(attribute.into());
        self
    }

    /// Appends several extra attributes, preserving iteration order.
    pub fn extra_link_attributes<I, A>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.config
            .extra_link_attributes
            .extend(attributes.into_iter().map(Into::into));
        self
    }

    /// Caps the number of bytes buffered per captured body.
    pub fn max_capture_bytes(mut self, limit: usize) -> Self {
        self.config.max_capture_bytes = Some(limit);
        self
    }

    /// Sets the fingerprint cache capacity.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache.capacity = capacity;
        self
    }

    /// Registers the eviction notification hook.
    pub fn on_evict<F>(mut self, listener: F) -> Self
    where
        F: Fn(&str, &[ResourceReference]) + Send + Sync + 'static,
    {
        self.config.cache.on_evict = Some(std::sync::Arc::new(listener));
        self
    }

    /// Finishes the builder.
    pub fn build(self) -> PreloadConfig {
        self.config
    }
}
