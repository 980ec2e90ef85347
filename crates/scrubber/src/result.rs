// ABOUTME: Per-item input (BatchItem) and output (ItemOutput, ItemFailure, OutputRecord) shapes.
// ABOUTME: Serialized with the camelCase wire names the batch runner consumes and emits.

use anyhow::anyhow;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ScrubError;
use crate::extractors::ArticleResult;
use crate::options::{lenient, CleanOptions, ReadabilityOptions};

/// One document to process, in its wire form.
///
/// Option blocks that cannot be read fall back to their defaults. A missing
/// or null `htmlContent` reads as empty and fails validation later.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub html_content: String,
    #[serde(default, deserialize_with = "lenient")]
    pub clean_options: Option<CleanOptions>,
    #[serde(default, deserialize_with = "lenient")]
    pub readability_options: Option<ReadabilityOptions>,
    #[serde(default, deserialize_with = "lenient")]
    pub markdown_output: bool,
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

impl BatchItem {
    /// An item with default options.
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html_content: html.into(),
            ..Default::default()
        }
    }

    pub fn with_clean_options(mut self, opts: CleanOptions) -> Self {
        self.clean_options = Some(opts);
        self
    }

    pub fn with_readability_options(mut self, opts: ReadabilityOptions) -> Self {
        self.readability_options = Some(opts);
        self
    }

    pub fn with_markdown(mut self, markdown: bool) -> Self {
        self.markdown_output = markdown;
        self
    }
}

impl TryFrom<serde_json::Value> for BatchItem {
    type Error = ScrubError;

    /// Decode one raw batch entry. Entries that are not objects, or whose
    /// `htmlContent` is not a string, are validation failures.
    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value).map_err(|e| ScrubError::validation("Decode", Some(anyhow!(e))))
    }
}

impl From<&BatchItem> for BatchItem {
    fn from(item: &BatchItem) -> Self {
        item.clone()
    }
}

/// The record for a successfully processed item.
///
/// Article fields are `null` when no main content was found. `markdown` is
/// omitted entirely unless it was requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutput {
    pub html: String,
    pub title: Option<String>,
    pub lang: Option<String>,
    pub content: Option<String>,
    pub text_content: Option<String>,
    pub length: Option<usize>,
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
}

impl ItemOutput {
    /// Combine the serialized document with an optional article.
    pub fn new(html: String, article: Option<ArticleResult>) -> Self {
        let article = article.unwrap_or_default();
        Self {
            html,
            title: article.title,
            lang: article.lang,
            content: article.content,
            text_content: article.text_content,
            length: article.length,
            excerpt: article.excerpt,
            markdown: None,
        }
    }
}

/// The record for an item whose failure was isolated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub error: String,
    pub message: String,
}

impl From<&ScrubError> for ItemFailure {
    fn from(err: &ScrubError) -> Self {
        Self {
            error: err.code.wire_name().to_string(),
            message: err.to_string(),
        }
    }
}

/// One slot of the batch output, positionally paired with its input item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputRecord {
    Failure(ItemFailure),
    Success(ItemOutput),
}

impl OutputRecord {
    pub fn is_success(&self) -> bool {
        matches!(self, OutputRecord::Success(_))
    }

    pub fn as_success(&self) -> Option<&ItemOutput> {
        match self {
            OutputRecord::Success(out) => Some(out),
            OutputRecord::Failure(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&ItemFailure> {
        match self {
            OutputRecord::Failure(f) => Some(f),
            OutputRecord::Success(_) => None,
        }
    }
}

impl From<Result<ItemOutput, ScrubError>> for OutputRecord {
    fn from(res: Result<ItemOutput, ScrubError>) -> Self {
        match res {
            Ok(out) => OutputRecord::Success(out),
            Err(err) => OutputRecord::Failure(ItemFailure::from(&err)),
        }
    }
}
