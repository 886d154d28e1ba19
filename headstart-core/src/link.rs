//! `Link` header value composition.
//!
//! Turns an extracted reference list into the literal header values to
//! append to a response. Base-href resolution is deliberately textual:
//! non-absolute URLs are prefixed with the page's base href as strings,
//! with no dot-segment normalization and no URL parsing, so the emitted
//! target is exactly what the document asked for.

use std::sync::LazyLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;

use crate::config::PreloadConfig;
use crate::reference::ResourceReference;

/// Characters percent-encoded inside a `Link` target.
///
/// Keeps alphanumerics, the URI marks `; , / ? : @ & = + $ - _ . ! ~ #`
/// and the literal `|`, `` ` ``, `^`; everything else is escaped with
/// uppercase hex, including `'`, `(`, `)`, `*`, `%`, quotes, angle
/// brackets, whitespace and every non-ASCII byte. Decoding the target
/// with a standard percent-decoder restores the original URL.
const LINK_TARGET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'#')
    .remove(b'|')
    .remove(b'`')
    .remove(b'^');

/// `scheme://` prefix per RFC 3986 scheme syntax.
static SCHEME_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://").expect("scheme prefix pattern is valid")
});

/// Whether a URL stands on its own: rooted at the origin (`/...`) or
/// carrying an explicit scheme. Only URLs that are neither get the base
/// href prefixed.
fn is_absolute(url: &str) -> bool {
    url.starts_with('/') || SCHEME_PREFIX.is_match(url)
}

/// Percent-encodes a URL for inclusion inside a `Link` header target.
pub fn escape_target(url: &str) -> String {
    utf8_percent_encode(url, LINK_TARGET).to_string()
}

/// Composes the literal `Link` header values for a reference list.
///
/// Produces one value per non-base reference, preserving extraction
/// order. The first base reference resolves relative URLs; later bases
/// are ignored. Composition never fails: a malformed URL is escaped as
/// literal text and emitted best-effort.
pub fn compose(references: &[ResourceReference], config: &PreloadConfig) -> Vec<String> {
    let base = references
        .iter()
        .find(|reference| reference.is_base())
        .map(|reference| reference.url.as_str());

    references
        .iter()
        .filter(|reference| !reference.is_base())
        .map(|reference| {
            let target = match base {
                Some(base) if !is_absolute(&reference.url) => {
                    escape_target(&format!("{base}{}", reference.url))
                }
                _ => escape_target(&reference.url),
            };
            let mut value = format!("<{target}>; rel=preload; as={}", reference.kind.as_str());
            for attribute in &config.extra_link_attributes {
                value.push_str("; ");
                value.push_str(attribute);
            }
            value
        })
        .collect()
}
