//! The seam between the scan pipeline and whatever parses the markup.
//!
//! The extractor never talks to a concrete HTML parser. It expresses what
//! it needs as a list of [`Matcher`] patterns and runs them against any
//! [`Document`] implementation, which yields matching [`Element`]s in
//! document order. The `headstart-html` crate provides the production
//! implementation; tests substitute lightweight fakes.

use smol_str::SmolStr;

/// Requirement a single attribute must satisfy for an element to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrRule {
    /// The attribute must exist; any value is accepted.
    Present(SmolStr),
    /// The attribute must exist with exactly this value.
    Equals(SmolStr, SmolStr),
}

impl AttrRule {
    /// Name of the attribute this rule inspects.
    pub fn name(&self) -> &str {
        match self {
            AttrRule::Present(name) => name,
            AttrRule::Equals(name, _) => name,
        }
    }

    /// Evaluates the rule against one element.
    pub fn matches<E: Element + ?Sized>(&self, element: &E) -> bool {
        match self {
            AttrRule::Present(name) => element.attribute(name).is_some(),
            AttrRule::Equals(name, value) => element.attribute(name) == Some(value.as_str()),
        }
    }
}

/// A `(tag name, required attributes)` selection pattern.
///
/// All attribute rules must hold for an element to match. Tag and
/// attribute names are compared verbatim; HTML parsers lowercase both
/// during tree construction, so patterns use lowercase names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matcher {
    /// Lowercase element name, e.g. `img`.
    pub tag: SmolStr,
    /// Attribute requirements, all of which must hold.
    pub attrs: Vec<AttrRule>,
}

impl Matcher {
    /// Starts a pattern matching every element with the given tag name.
    pub fn new(tag: &str) -> Self {
        Self {
            tag: SmolStr::new(tag),
            attrs: Vec::new(),
        }
    }

    /// Requires an attribute to be present, with any value.
    pub fn attr_present(mut self, name: &str) -> Self {
        self.attrs.push(AttrRule::Present(SmolStr::new(name)));
        self
    }

    /// Requires an attribute to carry exactly the given value.
    pub fn attr_equals(mut self, name: &str, value: &str) -> Self {
        self.attrs
            .push(AttrRule::Equals(SmolStr::new(name), SmolStr::new(value)));
        self
    }

    /// Evaluates the full pattern against one element.
    pub fn matches<E: Element + ?Sized>(&self, element: &E) -> bool {
        element.tag_name() == self.tag && self.attrs.iter().all(|rule| rule.matches(element))
    }
}

/// A single element yielded by a document query.
pub trait Element {
    /// Lowercase tag name.
    fn tag_name(&self) -> &str;

    /// Value of the named attribute, if present on the element.
    fn attribute(&self, name: &str) -> Option<&str>;
}

/// Parsed-markup capability the extractor runs against.
///
/// Implementations must yield elements matching *any* of the given
/// patterns, in document order, visiting each element at most once.
/// Callers guarantee a non-empty matcher list; implementations may still
/// short-circuit on an empty one.
pub trait Document {
    /// Concrete element view produced by this document.
    type Element: Element;

    /// All elements matching at least one of `matchers`, in document order.
    fn select(&self, matchers: &[Matcher]) -> Vec<Self::Element>;
}
