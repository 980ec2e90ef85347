// ABOUTME: Extraction bridge: the ContentExtractor seam, ArticleResult, and the null-result mapping.
// ABOUTME: "No article" is a normal Ok(None) outcome; only real collaborator faults become errors.

//! Main-content extraction.
//!
//! The extraction algorithm itself lives behind [`ContentExtractor`]. The
//! default implementation, [`ReadabilityExtractor`], delegates to a Readability
//! port; tests and embedders can plug in their own.

pub mod readability;

use serde::{Deserialize, Serialize};

use crate::dom::DocumentTree;
use crate::error::ScrubError;
use crate::options::ExtractionOptions;

pub use readability::ReadabilityExtractor;

/// The best-effort "main article" found in a document. Every field is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResult {
    pub title: Option<String>,
    pub content: Option<String>,
    pub text_content: Option<String>,
    pub length: Option<usize>,
    pub excerpt: Option<String>,
    pub lang: Option<String>,
    pub byline: Option<String>,
    pub dir: Option<String>,
    pub site_name: Option<String>,
    pub published_time: Option<String>,
}

/// A content-extraction collaborator.
pub trait ContentExtractor: Send + Sync {
    /// Find the main article in a sanitized tree.
    ///
    /// Returns `Ok(None)` when the document has no extractable main content.
    fn extract(
        &self,
        tree: &DocumentTree,
        opts: &ExtractionOptions,
    ) -> Result<Option<ArticleResult>, ScrubError>;
}

/// Run the extractor and apply the length floor.
///
/// An article shorter than `char_threshold` characters counts as no article,
/// whatever the collaborator decided internally.
pub fn extract_article(
    extractor: &dyn ContentExtractor,
    tree: &DocumentTree,
    opts: &ExtractionOptions,
) -> Result<Option<ArticleResult>, ScrubError> {
    let Some(article) = extractor.extract(tree, opts)? else {
        return Ok(None);
    };

    let length = article.length.unwrap_or_else(|| {
        article
            .text_content
            .as_deref()
            .map_or(0, |t| t.chars().count())
    });
    if length < opts.char_threshold {
        tracing::debug!(length, threshold = opts.char_threshold, "article below threshold");
        return Ok(None);
    }

    Ok(Some(article))
}

/// Map empty strings to `None`.
pub(crate) fn non_empty(s: impl Into<String>) -> Option<String> {
    let s = s.into();
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
