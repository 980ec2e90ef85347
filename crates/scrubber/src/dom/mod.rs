// ABOUTME: DocumentTree, the owned mutable parse of one input document, plus its serializer.
// ABOUTME: Wraps dom_query's arena so sanitization passes can walk and detach nodes by id.

//! Document loading and serialization.
//!
//! A [`DocumentTree`] is created fresh for every input item and mutated only by
//! the sanitization stages in [`cleaners`]. Parsing is lenient: malformed or
//! unterminated markup is repaired by the HTML5 tree builder instead of failing.

pub mod cleaners;
pub mod compiled;

use dom_query::{Document, NodeRef};

/// The mutable in-memory parse of a raw document.
pub struct DocumentTree {
    doc: Document,
}

impl DocumentTree {
    /// Parse markup into a tree. Never fails; broken markup is recovered.
    pub fn parse(html: &str) -> Self {
        Self {
            doc: Document::from(html),
        }
    }

    /// Serialize the current state of the tree.
    pub fn to_html(&self) -> String {
        self.doc.html().to_string()
    }

    /// The underlying document, for collaborators that consume a parsed tree.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn root(&self) -> NodeRef<'_> {
        self.doc.root()
    }

    /// Count nodes matching a CSS selector. Invalid selectors match nothing.
    pub fn count(&self, css: &str) -> usize {
        self.doc.try_select(css).map_or(0, |sel| sel.length())
    }

    /// Element nodes in document order, captured at call time.
    pub(crate) fn elements(&self) -> Vec<NodeRef<'_>> {
        self.root()
            .descendants()
            .into_iter()
            .filter(|n| n.is_element())
            .collect()
    }

    /// Count the element nodes currently attached to the tree.
    pub fn element_count(&self) -> usize {
        self.elements().len()
    }

    /// Count the comment nodes currently attached to the tree.
    pub fn comment_count(&self) -> usize {
        self.root()
            .descendants()
            .into_iter()
            .filter(|n| n.is_comment())
            .count()
    }
}

impl From<&str> for DocumentTree {
    fn from(html: &str) -> Self {
        Self::parse(html)
    }
}
