//! # headstart-html
//!
//! The HTML parsing collaborator for Headstart: an html5ever/rcdom
//! document that answers `headstart-core` matcher queries in document
//! order, plus the one-shot [`scan`] used by the response pipeline.
//!
//! Parsing follows the HTML5 recovery algorithm, so anything a browser
//! would render (fragments, unclosed tags, mixed-case markup) scans the
//! same way the browser sees it. Tag and attribute names arrive
//! lowercased; attribute values are untouched.

#![warn(missing_docs)]

mod document;

pub use document::{MatchedElement, ScannedDocument, scan};
