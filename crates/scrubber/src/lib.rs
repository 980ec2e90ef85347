// ABOUTME: Main library entry point for the scrubber rule-driven HTML sanitization pipeline.
// ABOUTME: Re-exports the public API: Pipeline, PipelineBuilder, Ruleset, DocumentTree, records and errors.

//! Scrubber - rule-driven HTML sanitization with optional article extraction.
//!
//! Each input document is parsed into its own tree, cleaned by a fixed
//! sequence of stages selected by a per-item [`Ruleset`], serialized back to
//! HTML, and handed to a content extractor (and optionally a Markdown
//! converter). Batches keep input order and can isolate per-item failures.
//!
//! # Example
//!
//! ```no_run
//! use digests_scrubber::{BatchItem, CleanOptions, Pipeline, ScrubError};
//!
//! fn main() -> Result<(), ScrubError> {
//!     let pipeline = Pipeline::builder().isolate_failures(true).build();
//!     let item = BatchItem::new("<p>Hello<!-- tracking --></p><script>x()</script>")
//!         .with_clean_options(CleanOptions {
//!             remove_comments: Some(true),
//!             remove_scripts: Some(true),
//!             ..Default::default()
//!         });
//!     let records = pipeline.run_batch_blocking(&[item])?;
//!     println!("{}", serde_json::to_string_pretty(&records).unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod dom;
pub mod error;
pub mod extractors;
pub mod formats;
pub mod options;
pub mod pipeline;
pub mod result;

pub use crate::dom::cleaners::{sanitize, sanitize_with, CleanReport};
pub use crate::dom::compiled::CompiledSelectors;
pub use crate::dom::DocumentTree;
pub use crate::error::{ErrorCode, ScrubError};
pub use crate::extractors::{ArticleResult, ContentExtractor, ReadabilityExtractor};
pub use crate::formats::{HtmdConverter, MarkdownConverter};
pub use crate::options::{
    CleanOptions, ExtractionOptions, PipelineBuilder, PipelineOptions, ReadabilityOptions,
    Ruleset, StringList,
};
pub use crate::pipeline::Pipeline;
pub use crate::result::{BatchItem, ItemFailure, ItemOutput, OutputRecord};
