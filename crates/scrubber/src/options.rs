// ABOUTME: Configuration for the scrubber: raw wire options, normalized Ruleset/ExtractionOptions, PipelineBuilder.
// ABOUTME: Normalization happens once here; every downstream stage reads fully-populated typed values.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::extractors::{ContentExtractor, ReadabilityExtractor};
use crate::formats::{HtmdConverter, MarkdownConverter};
use crate::pipeline::Pipeline;

/// Default minimum article length, in characters, for an extraction to count.
pub const DEFAULT_CHAR_THRESHOLD: usize = 500;

/// Default number of top candidates the extractor compares.
pub const DEFAULT_NB_TOP_CANDIDATES: usize = 5;

/// A list-valued option as it arrives on the wire: comma-separated text or a JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    Text(String),
    List(Vec<String>),
}

impl StringList {
    /// Trimmed, non-empty tokens, dropping repeats and keeping first-seen order.
    ///
    /// Text is split on commas. Array entries are taken whole, so a selector
    /// such as `:is(h1, h2)` survives intact.
    pub fn tokens(&self) -> Vec<String> {
        match self {
            StringList::Text(s) => dedup_tokens(s.split(',')),
            StringList::List(items) => dedup_tokens(items.iter().map(String::as_str)),
        }
    }
}

impl From<&str> for StringList {
    fn from(s: &str) -> Self {
        StringList::Text(s.to_string())
    }
}

fn dedup_tokens<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for token in raw.map(str::trim).filter(|t| !t.is_empty()) {
        if !out.iter().any(|seen| seen == token) {
            out.push(token.to_string());
        }
    }
    out
}

fn tokens_of(list: &Option<StringList>) -> Vec<String> {
    list.as_ref().map(StringList::tokens).unwrap_or_default()
}

/// Deserialize a field, falling back to its default when the value has the wrong type.
///
/// Option fields are normalized later, so a value that cannot be read is
/// treated the same as one that was never given.
pub(crate) fn lenient<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(d)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Cleaning options as supplied per item, before normalization.
///
/// Unknown fields are ignored and fields of the wrong type read as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanOptions {
    #[serde(default, deserialize_with = "lenient")]
    pub remove_comments: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub remove_empty_tags: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub remove_scripts: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub remove_styles: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub remove_attributes: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub excluded_attributes: Option<StringList>,
    #[serde(default, deserialize_with = "lenient")]
    pub excluded_selectors: Option<StringList>,
    #[serde(default, deserialize_with = "lenient")]
    pub excluded_tags: Option<StringList>,
}

/// Extraction options as supplied per item, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadabilityOptions {
    #[serde(default, deserialize_with = "lenient")]
    pub char_threshold: Option<usize>,
    #[serde(default, deserialize_with = "lenient")]
    pub classes_to_preserve: Option<StringList>,
    #[serde(default, deserialize_with = "lenient")]
    #[serde(rename = "disableJSONLD")]
    pub disable_json_ld: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub keep_classes: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub nb_top_candidates: Option<usize>,
}

/// The normalized sanitization rule set.
///
/// Every flag defaults to `false` and every list to empty, so a default
/// ruleset leaves documents untouched. Selector and tag lists keep the
/// caller's order because removal order is observable when entries overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ruleset {
    pub remove_comments: bool,
    pub remove_empty_tags: bool,
    pub remove_scripts: bool,
    pub remove_styles: bool,
    pub remove_attributes: bool,
    pub excluded_attributes: Vec<String>,
    pub excluded_selectors: Vec<String>,
    pub excluded_tags: Vec<String>,
}

impl Ruleset {
    /// Normalize raw cleaning options. Never fails; absent options yield the no-op ruleset.
    pub fn from_raw(raw: Option<&CleanOptions>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };

        Self {
            remove_comments: raw.remove_comments.unwrap_or(false),
            remove_empty_tags: raw.remove_empty_tags.unwrap_or(false),
            remove_scripts: raw.remove_scripts.unwrap_or(false),
            remove_styles: raw.remove_styles.unwrap_or(false),
            remove_attributes: raw.remove_attributes.unwrap_or(false),
            excluded_attributes: tokens_of(&raw.excluded_attributes),
            excluded_selectors: tokens_of(&raw.excluded_selectors),
            excluded_tags: tokens_of(&raw.excluded_tags),
        }
    }

    /// True when no stage would touch the document.
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Normalized options handed to the content-extraction collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOptions {
    pub char_threshold: usize,
    pub classes_to_preserve: Vec<String>,
    pub disable_json_ld: bool,
    pub keep_classes: bool,
    /// Always at least 1.
    pub nb_top_candidates: usize,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            char_threshold: DEFAULT_CHAR_THRESHOLD,
            classes_to_preserve: Vec::new(),
            disable_json_ld: false,
            keep_classes: false,
            nb_top_candidates: DEFAULT_NB_TOP_CANDIDATES,
        }
    }
}

impl ExtractionOptions {
    /// Normalize raw extraction options, filling defaults and clamping `nb_top_candidates` to 1.
    pub fn from_raw(raw: Option<&ReadabilityOptions>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };

        Self {
            char_threshold: raw.char_threshold.unwrap_or(DEFAULT_CHAR_THRESHOLD),
            classes_to_preserve: tokens_of(&raw.classes_to_preserve),
            disable_json_ld: raw.disable_json_ld.unwrap_or(false),
            keep_classes: raw.keep_classes.unwrap_or(false),
            nb_top_candidates: raw
                .nb_top_candidates
                .unwrap_or(DEFAULT_NB_TOP_CANDIDATES)
                .max(1),
        }
    }
}

/// Configuration for a [`Pipeline`].
#[derive(Clone)]
pub struct PipelineOptions {
    /// Record per-item failures instead of aborting the batch.
    pub isolate_failures: bool,
    /// Worker-pool width for the async batch runner.
    pub concurrency: usize,
    /// Deadline for one item's run; `None` waits indefinitely.
    pub item_timeout: Option<Duration>,
    pub extractor: Arc<dyn ContentExtractor>,
    pub markdown: Arc<dyn MarkdownConverter>,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("isolate_failures", &self.isolate_failures)
            .field("concurrency", &self.concurrency)
            .field("item_timeout", &self.item_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            isolate_failures: false,
            concurrency: 1,
            item_timeout: None,
            extractor: Arc::new(ReadabilityExtractor),
            markdown: Arc::new(HtmdConverter),
        }
    }
}

/// Builder for constructing Pipeline instances with custom configuration.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    opts: PipelineOptions,
}

impl PipelineBuilder {
    /// Create a new PipelineBuilder with default options.
    pub fn new() -> Self {
        Self {
            opts: PipelineOptions::default(),
        }
    }

    /// Enable or disable per-item failure isolation.
    pub fn isolate_failures(mut self, isolate: bool) -> Self {
        self.opts.isolate_failures = isolate;
        self
    }

    /// Set how many items may run at once in the async runner. Zero is treated as one.
    pub fn concurrency(mut self, workers: usize) -> Self {
        self.opts.concurrency = workers.max(1);
        self
    }

    /// Set a per-item deadline.
    pub fn item_timeout(mut self, timeout: Duration) -> Self {
        self.opts.item_timeout = Some(timeout);
        self
    }

    /// Use a custom content-extraction collaborator.
    pub fn extractor(mut self, extractor: Arc<dyn ContentExtractor>) -> Self {
        self.opts.extractor = extractor;
        self
    }

    /// Use a custom markdown collaborator.
    pub fn markdown(mut self, markdown: Arc<dyn MarkdownConverter>) -> Self {
        self.opts.markdown = markdown;
        self
    }

    /// Build the Pipeline with the configured options.
    pub fn build(self) -> Pipeline {
        Pipeline::new(self.opts)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn absent_clean_options_are_noop() {
        let rules = Ruleset::from_raw(None);
        assert!(rules.is_noop());
        assert_eq!(Ruleset::from_raw(Some(&CleanOptions::default())), rules);
    }

    #[test]
    fn comma_lists_are_trimmed_and_filtered() {
        let raw = CleanOptions {
            excluded_selectors: Some(" .ad , ,#nav,, footer ".into()),
            ..Default::default()
        };
        let rules = Ruleset::from_raw(Some(&raw));
        assert_eq!(rules.excluded_selectors, vec![".ad", "#nav", "footer"]);
        assert!(!rules.remove_comments);
    }

    #[test]
    fn array_entries_are_not_split_on_commas() {
        let raw: CleanOptions = serde_json::from_str(
            r#"{"excludedSelectors": [" :is(h1, h2) ", "", "p.note"]}"#,
        )
        .unwrap();
        let rules = Ruleset::from_raw(Some(&raw));
        assert_eq!(rules.excluded_selectors, vec![":is(h1, h2)", "p.note"]);
    }

    #[test]
    fn ill_typed_fields_fall_back_to_defaults() {
        let raw: CleanOptions = serde_json::from_str(
            r#"{"removeComments": "yes", "removeScripts": true, "excludedTags": 7}"#,
        )
        .unwrap();
        let rules = Ruleset::from_raw(Some(&raw));
        assert!(!rules.remove_comments);
        assert!(rules.remove_scripts);
        assert!(rules.excluded_tags.is_empty());

        let raw: ReadabilityOptions = serde_json::from_str(
            r#"{"charThreshold": -1, "nbTopCandidates": "many", "keepClasses": true}"#,
        )
        .unwrap();
        let opts = ExtractionOptions::from_raw(Some(&raw));
        assert_eq!(opts.char_threshold, DEFAULT_CHAR_THRESHOLD);
        assert_eq!(opts.nb_top_candidates, DEFAULT_NB_TOP_CANDIDATES);
        assert!(opts.keep_classes);
    }

    #[test]
    fn duplicates_collapse_keeping_first_position() {
        let raw = CleanOptions {
            excluded_tags: Some("nav, aside, nav, footer, aside".into()),
            ..Default::default()
        };
        let rules = Ruleset::from_raw(Some(&raw));
        assert_eq!(rules.excluded_tags, vec!["nav", "aside", "footer"]);
    }

    #[test]
    fn no_case_folding() {
        let raw = CleanOptions {
            excluded_attributes: Some("Data-Id,data-id".into()),
            ..Default::default()
        };
        let rules = Ruleset::from_raw(Some(&raw));
        assert_eq!(rules.excluded_attributes, vec!["Data-Id", "data-id"]);
    }

    #[test]
    fn deserializes_wire_shape_and_ignores_unknown_fields() {
        let raw: CleanOptions = serde_json::from_str(
            r#"{
                "removeComments": true,
                "removeScripts": true,
                "excludedTags": "nav,footer",
                "excludedSelectors": [".ad", " .promo "],
                "somethingElse": 42
            }"#,
        )
        .unwrap();
        let rules = Ruleset::from_raw(Some(&raw));

        assert!(rules.remove_comments);
        assert!(rules.remove_scripts);
        assert!(!rules.remove_styles);
        assert_eq!(rules.excluded_tags, vec!["nav", "footer"]);
        assert_eq!(rules.excluded_selectors, vec![".ad", ".promo"]);
    }

    #[test]
    fn extraction_defaults() {
        let opts = ExtractionOptions::from_raw(None);
        assert_eq!(opts.char_threshold, 500);
        assert_eq!(opts.nb_top_candidates, 5);
        assert!(!opts.keep_classes);
        assert!(!opts.disable_json_ld);
        assert!(opts.classes_to_preserve.is_empty());
    }

    #[test]
    fn extraction_options_from_wire() {
        let raw: ReadabilityOptions = serde_json::from_str(
            r#"{"charThreshold": 20, "disableJSONLD": true, "classesToPreserve": "caption, note", "nbTopCandidates": 0}"#,
        )
        .unwrap();
        let opts = ExtractionOptions::from_raw(Some(&raw));

        assert_eq!(opts.char_threshold, 20);
        assert!(opts.disable_json_ld);
        assert_eq!(opts.classes_to_preserve, vec!["caption", "note"]);
        assert_eq!(opts.nb_top_candidates, 1);
    }

    #[test]
    fn builder_clamps_concurrency() {
        let pipeline = PipelineBuilder::new().concurrency(0).build();
        assert_eq!(pipeline.options().concurrency, 1);
    }
}
