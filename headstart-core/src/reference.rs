//! Discovered resource references and their preload categories.

use serde::{Deserialize, Serialize};

/// The preload category of a discovered resource.
///
/// Maps one-to-one onto the `as=` attribute of a generated `Link` header
/// value, except for [`ResourceKind::Base`], which never reaches the wire:
/// it carries the page's base URL and is consumed during composition to
/// resolve relative references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// An `img[src]` reference, preloaded with `as=image`.
    Image,
    /// A `script[src]` reference, preloaded with `as=script`.
    Script,
    /// A `link[rel=stylesheet]` reference, preloaded with `as=style`.
    Style,
    /// A `link[rel=import]` reference, preloaded with `as=document`.
    Document,
    /// A `base[href]` value used for relative-URL resolution only.
    Base,
}

impl ResourceKind {
    /// Wire token used in the `as=` attribute (and as a metrics label).
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Script => "script",
            ResourceKind::Style => "style",
            ResourceKind::Document => "document",
            ResourceKind::Base => "base",
        }
    }
}

/// A single resource discovered while scanning a document.
///
/// Immutable once produced: the extractor emits references in document
/// order and neither the composer nor the cache ever rewrites them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReference {
    /// The reference target exactly as it appeared in the markup.
    pub url: String,
    /// The preload category.
    pub kind: ResourceKind,
}

impl ResourceReference {
    /// Creates a reference from a raw attribute value.
    pub fn new(url: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }

    /// Whether this reference is a base href rather than a preloadable
    /// resource.
    pub fn is_base(&self) -> bool {
        self.kind == ResourceKind::Base
    }
}
