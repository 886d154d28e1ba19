//! Resource reference extraction rules.

use crate::config::PreloadConfig;
use crate::markup::{Document, Element, Matcher};
use crate::reference::{ResourceKind, ResourceReference};

/// Scheme prefix identifying inline data payloads, which can never be
/// preloaded and must not produce a reference.
const INLINE_DATA_SCHEME: &str = "data:";

/// Builds the selection patterns for the enabled resource classes.
///
/// Returns an empty list when every class is disabled. The `base` matcher
/// joins only when at least one resource matcher is active: a base href
/// on its own can never produce a header, and an empty list lets callers
/// skip the tree walk entirely.
pub fn matchers(config: &PreloadConfig) -> Vec<Matcher> {
    let mut matchers = Vec::new();
    if config.images {
        matchers.push(Matcher::new("img").attr_present("src"));
    }
    if config.scripts {
        matchers.push(Matcher::new("script").attr_present("src"));
    }
    if config.styles {
        matchers.push(Matcher::new("link").attr_equals("rel", "stylesheet"));
    }
    if config.html_imports {
        matchers.push(Matcher::new("link").attr_equals("rel", "import"));
    }
    if !matchers.is_empty() {
        matchers.push(Matcher::new("base").attr_present("href"));
    }
    matchers
}

/// Scans a parsed document for preloadable resource references.
///
/// A pure function of `(document, config)`: matched elements are
/// classified in document order, inline data payloads are dropped, and
/// every `base[href]` is recorded as [`ResourceKind::Base`] for the
/// composer to resolve against (the composer keeps the first). With no
/// resource class enabled this returns empty without touching the tree.
pub fn extract<D: Document>(document: &D, config: &PreloadConfig) -> Vec<ResourceReference> {
    let matchers = matchers(config);
    if matchers.is_empty() {
        return Vec::new();
    }
    document
        .select(&matchers)
        .iter()
        .filter_map(|element| classify(element, config))
        .collect()
}

/// Maps one matched element to a reference, or drops it.
fn classify<E: Element>(element: &E, config: &PreloadConfig) -> Option<ResourceReference> {
    match element.tag_name() {
        "base" => element
            .attribute("href")
            .map(|href| ResourceReference::new(href, ResourceKind::Base)),
        "img" if config.images => match element.attribute("src") {
            Some(src) if !src.starts_with(INLINE_DATA_SCHEME) => {
                Some(ResourceReference::new(src, ResourceKind::Image))
            }
            _ => None,
        },
        "script" if config.scripts => element
            .attribute("src")
            .map(|src| ResourceReference::new(src, ResourceKind::Script)),
        "link" => {
            let href = element.attribute("href")?;
            match element.attribute("rel") {
                Some("stylesheet") if config.styles => {
                    Some(ResourceReference::new(href, ResourceKind::Style))
                }
                Some("import") if config.html_imports => {
                    Some(ResourceReference::new(href, ResourceKind::Document))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory document: a flat element list standing in for a parsed
    /// tree, selected in insertion order.
    struct FakeDocument {
        elements: Vec<FakeElement>,
        walked: std::cell::Cell<bool>,
    }

    #[derive(Clone)]
    struct FakeElement {
        tag: String,
        attrs: Vec<(String, String)>,
    }

    impl FakeDocument {
        fn new(elements: &[(&str, &[(&str, &str)])]) -> Self {
            Self {
                elements: elements
                    .iter()
                    .map(|(tag, attrs)| FakeElement {
                        tag: tag.to_string(),
                        attrs: attrs
                            .iter()
                            .map(|(name, value)| (name.to_string(), value.to_string()))
                            .collect(),
                    })
                    .collect(),
                walked: std::cell::Cell::new(false),
            }
        }
    }

    impl Element for FakeElement {
        fn tag_name(&self) -> &str {
            &self.tag
        }

        fn attribute(&self, name: &str) -> Option<&str> {
            self.attrs
                .iter()
                .find(|(attr, _)| attr == name)
                .map(|(_, value)| value.as_str())
        }
    }

    impl Document for FakeDocument {
        type Element = FakeElement;

        fn select(&self, matchers: &[Matcher]) -> Vec<FakeElement> {
            self.walked.set(true);
            self.elements
                .iter()
                .filter(|element| matchers.iter().any(|matcher| matcher.matches(*element)))
                .cloned()
                .collect()
        }
    }

    fn urls(references: &[ResourceReference]) -> Vec<&str> {
        references.iter().map(|r| r.url.as_str()).collect()
    }

    #[test]
    fn collects_enabled_kinds_in_document_order() {
        let document = FakeDocument::new(&[
            ("img", &[("src", "/a.jpg")]),
            ("script", &[("src", "/b.js")]),
            ("link", &[("href", "/c.css"), ("rel", "stylesheet")]),
            ("img", &[("src", "/d.jpg")]),
        ]);
        let references = extract(&document, &PreloadConfig::default());
        assert_eq!(urls(&references), ["/a.jpg", "/b.js", "/c.css", "/d.jpg"]);
        assert_eq!(
            references.iter().map(|r| r.kind).collect::<Vec<_>>(),
            [
                ResourceKind::Image,
                ResourceKind::Script,
                ResourceKind::Style,
                ResourceKind::Image,
            ]
        );
    }

    #[test]
    fn disabled_switch_drops_its_kind() {
        let document = FakeDocument::new(&[
            ("img", &[("src", "/a.jpg")]),
            ("script", &[("src", "/b.js")]),
        ]);
        let config = PreloadConfig::builder().images(false).build();
        let references = extract(&document, &config);
        assert_eq!(urls(&references), ["/b.js"]);
    }

    #[test]
    fn html_imports_are_off_by_default() {
        let document = FakeDocument::new(&[("link", &[("href", "/x.html"), ("rel", "import")])]);
        assert!(extract(&document, &PreloadConfig::default()).is_empty());

        let config = PreloadConfig::builder().html_imports(true).build();
        let references = extract(&document, &config);
        assert_eq!(references[0].kind, ResourceKind::Document);
        assert_eq!(references[0].url, "/x.html");
    }

    #[test]
    fn inline_data_images_are_filtered() {
        let document = FakeDocument::new(&[
            ("img", &[("src", "data:image/gif;base64,AAAA")]),
            ("img", &[("src", "/real.png")]),
        ]);
        let references = extract(&document, &PreloadConfig::default());
        assert_eq!(urls(&references), ["/real.png"]);
    }

    #[test]
    fn inline_scripts_are_not_matched() {
        let document = FakeDocument::new(&[("script", &[("type", "text/javascript")])]);
        assert!(extract(&document, &PreloadConfig::default()).is_empty());
    }

    #[test]
    fn base_href_is_recorded_alongside_resources() {
        let document = FakeDocument::new(&[
            ("base", &[("href", "/assets/")]),
            ("img", &[("src", "x.jpg")]),
        ]);
        let references = extract(&document, &PreloadConfig::default());
        assert_eq!(references[0].kind, ResourceKind::Base);
        assert_eq!(references[0].url, "/assets/");
        assert_eq!(references[1].url, "x.jpg");
    }

    #[test]
    fn no_enabled_matcher_skips_the_walk() {
        let document = FakeDocument::new(&[("img", &[("src", "/a.jpg")])]);
        let config = PreloadConfig::builder()
            .images(false)
            .scripts(false)
            .styles(false)
            .build();
        assert!(extract(&document, &config).is_empty());
        assert!(!document.walked.get());
    }

    #[test]
    fn extraction_is_idempotent() {
        let document = FakeDocument::new(&[
            ("img", &[("src", "/a.jpg")]),
            ("link", &[("href", "/c.css"), ("rel", "stylesheet")]),
        ]);
        let config = PreloadConfig::default();
        assert_eq!(extract(&document, &config), extract(&document, &config));
    }

    #[test]
    fn stylesheet_matching_is_exact() {
        let document = FakeDocument::new(&[
            ("link", &[("href", "/a.css"), ("rel", "preconnect")]),
            ("link", &[("href", "/b.css")]),
        ]);
        assert!(extract(&document, &PreloadConfig::default()).is_empty());
    }
}
