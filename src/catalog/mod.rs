//! Hierarchical markup catalog documents.
//!
//! A catalog file is an XML-style element tree. The parser is tolerant:
//! a file that fails to parse yields [`ParseOutcome::Unparseable`] and is
//! treated as absent for its tier, never as a fatal error.

mod parser;
mod writer;

pub use parser::{parse_document, ParseOutcome};
pub use writer::write_document;

/// A single element in a catalog document tree.
///
/// Ownership is exclusive top-down: a node owns its children and no
/// back-references exist. Merged output is always a freshly extended
/// tree; subtrees move between trees by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Element-type name.
    pub tag: String,
    /// Attributes in declaration order; names are unique.
    pub attrs: Vec<(String, String)>,
    /// Trimmed text content; empty-after-trim is `None`.
    pub text: Option<String>,
    /// Child elements in document order.
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(tag: impl Into<String>) -> Self {
        Node {
            tag: tag.into(),
            attrs: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Look up an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or overwrite one attribute. An existing name keeps its
    /// declaration position; a new name is appended.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        if let Some(slot) = self.attrs.iter_mut().find(|(k, _)| k == name) {
            slot.1 = value.to_string();
        } else {
            self.attrs.push((name.to_string(), value.to_string()));
        }
    }

    /// Attributes as a name-sorted list, for canonical comparisons.
    pub fn sorted_attrs(&self) -> Vec<(String, String)> {
        let mut attrs = self.attrs.clone();
        attrs.sort();
        attrs
    }

    /// Trimmed text, with empty-after-trim normalized to `None`.
    ///
    /// The parser already stores text in this form; nodes built by hand
    /// go through this accessor wherever canonical text matters.
    pub fn normalized_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Reasons a catalog document failed to parse.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("document is not valid UTF-8")]
    NotUtf8,

    #[error("no root element found")]
    NoRoot,

    #[error("unexpected end of input at byte {0}")]
    UnexpectedEof(usize),

    #[error("malformed markup at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    #[error("mismatched closing tag at byte {offset}: expected </{expected}>, found </{found}>")]
    MismatchedClose {
        offset: usize,
        expected: String,
        found: String,
    },

    #[error("trailing content after root element at byte {0}")]
    TrailingContent(usize),
}
