//! html5ever-backed implementation of the scanning contract.

use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{NodeData, RcDom};

use headstart_core::{Document, Element, Matcher, PreloadConfig, ResourceReference};

/// A parsed HTML document ready for matcher queries.
///
/// The underlying tree holds `Rc` handles and is not `Send`; parse,
/// query and drop it within one synchronous step. [`scan`] wraps that
/// whole sequence for callers that only want the references.
pub struct ScannedDocument {
    dom: RcDom,
}

impl ScannedDocument {
    /// Parses a byte buffer into a document.
    ///
    /// Runs the full HTML5 recovery algorithm: fragments without a
    /// surrounding `<html>` scaffold, unclosed tags and stray markup all
    /// produce a tree. Invalid UTF-8 decodes lossily. Parsing never
    /// fails; pathological input degrades to a tree with nothing to
    /// match.
    pub fn parse(mut bytes: &[u8]) -> Self {
        let opts = ParseOpts {
            tree_builder: TreeBuilderOpts {
                drop_doctype: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let dom = parse_document(RcDom::default(), opts)
            .from_utf8()
            .read_from(&mut bytes)
            .unwrap_or_default();
        Self { dom }
    }
}

impl Document for ScannedDocument {
    type Element = MatchedElement;

    fn select(&self, matchers: &[Matcher]) -> Vec<MatchedElement> {
        if matchers.is_empty() {
            return Vec::new();
        }
        let mut matched = Vec::new();
        let mut stack = vec![self.dom.document.clone()];
        while let Some(handle) = stack.pop() {
            let mut template = None;
            if let NodeData::Element {
                ref name,
                ref attrs,
                ref template_contents,
                ..
            } = handle.data
            {
                let tag: &str = &name.local;
                if matchers.iter().any(|matcher| matcher.tag == tag) {
                    let attrs = attrs.borrow();
                    let element = MatchedElement {
                        tag: tag.to_string(),
                        attrs: attrs
                            .iter()
                            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                            .collect(),
                    };
                    if matchers.iter().any(|matcher| matcher.matches(&element)) {
                        matched.push(element);
                    }
                }
                template = template_contents.borrow().clone();
            }
            // Children are pushed reversed so they pop in document order.
            // Template content hangs off the element rather than the child
            // list; pushed last, it pops before any following sibling.
            for child in handle.children.borrow().iter().rev() {
                stack.push(child.clone());
            }
            if let Some(contents) = template {
                stack.push(contents);
            }
        }
        matched
    }
}

/// Owned snapshot of one matched element's tag and attributes.
///
/// Snapshotting keeps borrow lifetimes of the `Rc`/`RefCell` tree out of
/// the matching API.
#[derive(Debug, Clone)]
pub struct MatchedElement {
    tag: String,
    attrs: Vec<(String, String)>,
}

impl Element for MatchedElement {
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

/// Parses a body and extracts its resource references in one step.
///
/// Skips parsing entirely when no resource class is enabled. The tree
/// never escapes this function, which keeps the surrounding pipeline
/// `Send` even though the tree itself is not.
pub fn scan(bytes: &[u8], config: &PreloadConfig) -> Vec<ResourceReference> {
    if !config.any_enabled() {
        return Vec::new();
    }
    let document = ScannedDocument::parse(bytes);
    headstart_core::extract(&document, config)
}
