// ABOUTME: Markdown serialization seam and its htmd-backed default implementation.
// ABOUTME: Converts an extracted content fragment to Markdown, normalizing runs of blank lines.

//! Output format conversion.
//!
//! Markdown is produced by a [`MarkdownConverter`] so that the pipeline does
//! not depend on one converter's quirks. [`HtmdConverter`] is the default.

use anyhow::anyhow;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ScrubError;

static BR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?\s*>").expect("valid regex"));
static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Tags whose content never belongs in Markdown output.
const SKIP_TAGS: &[&str] = &["script", "style", "noscript"];

/// A markdown-serialization collaborator.
pub trait MarkdownConverter: Send + Sync {
    /// Convert an HTML fragment to Markdown. An empty fragment converts to an empty string.
    fn to_markdown(&self, html: &str) -> Result<String, ScrubError>;
}

/// Markdown conversion using htmd.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmdConverter;

impl MarkdownConverter for HtmdConverter {
    fn to_markdown(&self, html: &str) -> Result<String, ScrubError> {
        if html.trim().is_empty() {
            return Ok(String::new());
        }

        // htmd drops bare <br>; turn them into hard newlines first
        let preprocessed = BR_RE.replace_all(html, "\n");

        let converter = htmd::HtmlToMarkdown::builder()
            .skip_tags(SKIP_TAGS.to_vec())
            .build();

        let md = converter
            .convert(&preprocessed)
            .map_err(|e| ScrubError::collaborator("Markdown", Some(anyhow!("{}", e))))?;

        Ok(collapse_blank_lines(&md).trim().to_string())
    }
}

/// Collapse more than 2 consecutive newlines to exactly 2.
fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUN_RE.replace_all(text, "\n\n").to_string()
}
