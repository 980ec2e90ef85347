// ABOUTME: Pipeline runs one item through Validate, Sanitize, Extract, Markdown, Emit, and coordinates batches.
// ABOUTME: Batches keep input order, isolate per-item failures on request, and can fan out over a worker pool.

use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use tracing::{debug, info, info_span, warn};

use crate::dom::cleaners::sanitize_with;
use crate::dom::compiled::CompiledSelectors;
use crate::dom::DocumentTree;
use crate::error::ScrubError;
use crate::extractors::extract_article;
use crate::options::{ExtractionOptions, PipelineBuilder, PipelineOptions, Ruleset};
use crate::result::{BatchItem, ItemOutput, OutputRecord};

/// An item decoded and normalized, ready to run.
struct PreparedItem {
    item: BatchItem,
    rules: Ruleset,
    extraction: ExtractionOptions,
}

impl From<BatchItem> for PreparedItem {
    fn from(item: BatchItem) -> Self {
        let rules = Ruleset::from_raw(item.clean_options.as_ref());
        let extraction = ExtractionOptions::from_raw(item.readability_options.as_ref());
        Self {
            item,
            rules,
            extraction,
        }
    }
}

/// Decode and normalize every input. Failures keep their slot and index.
fn prepare_all<I>(items: impl IntoIterator<Item = I>) -> Vec<Result<PreparedItem, ScrubError>>
where
    I: TryInto<BatchItem>,
    I::Error: Into<ScrubError>,
{
    items
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            TryInto::<BatchItem>::try_into(raw).map(PreparedItem::from).map_err(|e| {
                let err: ScrubError = e.into();
                err.at_index(index)
            })
        })
        .collect()
}

/// Compile the excluded selectors of every prepared item once for the batch.
fn compile_batch(prepared: &[Result<PreparedItem, ScrubError>]) -> CompiledSelectors {
    CompiledSelectors::compile(
        prepared
            .iter()
            .flatten()
            .flat_map(|p| p.rules.excluded_selectors.iter()),
    )
}

/// The sanitization pipeline.
///
/// Cheap to clone; collaborators are shared behind `Arc`s and no item state
/// lives here, so every run gets its own tree.
#[derive(Debug, Clone)]
pub struct Pipeline {
    opts: PipelineOptions,
}

impl Pipeline {
    /// Create a new PipelineBuilder for configuring the pipeline.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Create a new Pipeline with the given options.
    pub fn new(opts: PipelineOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.opts
    }

    /// Process a single item.
    ///
    /// Fails on an empty `htmlContent`, an unparsable excluded selector, or a
    /// collaborator fault. Finding no article is not a failure.
    pub fn process_item(&self, item: &BatchItem) -> Result<ItemOutput, ScrubError> {
        let rules = Ruleset::from_raw(item.clean_options.as_ref());
        let extraction = ExtractionOptions::from_raw(item.readability_options.as_ref());
        let compiled = CompiledSelectors::compile(&rules.excluded_selectors);
        self.process_with(item, &rules, &extraction, &compiled)
    }

    fn process_with(
        &self,
        item: &BatchItem,
        rules: &Ruleset,
        extraction: &ExtractionOptions,
        compiled: &CompiledSelectors,
    ) -> Result<ItemOutput, ScrubError> {
        if item.html_content.is_empty() {
            return Err(ScrubError::validation(
                "Validate",
                Some(anyhow!("htmlContent is required")),
            ));
        }

        let mut tree = DocumentTree::parse(&item.html_content);
        let report = sanitize_with(&mut tree, rules, compiled)?;
        debug!(removed = report.total(), "sanitized document");

        let html = tree.to_html();
        let article = extract_article(self.opts.extractor.as_ref(), &tree, extraction)?;
        debug!(found = article.is_some(), "extraction finished");

        let markdown = if item.markdown_output {
            let fragment = article
                .as_ref()
                .and_then(|a| a.content.as_deref())
                .unwrap_or("");
            Some(self.opts.markdown.to_markdown(fragment)?)
        } else {
            None
        };

        Ok(ItemOutput {
            markdown,
            ..ItemOutput::new(html, article)
        })
    }

    fn run_item(
        &self,
        index: usize,
        prepared: &PreparedItem,
        compiled: &CompiledSelectors,
    ) -> Result<ItemOutput, ScrubError> {
        let span = info_span!("item", index);
        let _guard = span.enter();
        self.process_with(&prepared.item, &prepared.rules, &prepared.extraction, compiled)
            .map_err(|e| e.at_index(index))
    }

    /// Turn an item result into its output slot, or abort when isolation is off.
    fn settle(&self, res: Result<ItemOutput, ScrubError>) -> Result<OutputRecord, ScrubError> {
        match res {
            Ok(out) => Ok(OutputRecord::Success(out)),
            Err(err) if self.opts.isolate_failures => {
                warn!(error = %err, "item failed; recorded and continuing");
                Ok(OutputRecord::from(Err(err)))
            }
            Err(err) => Err(err),
        }
    }

    /// Process items one after another on the calling thread.
    ///
    /// Accepts anything that converts to a [`BatchItem`]: items, references to
    /// items, or raw JSON values. An entry that fails to convert is a
    /// validation failure in its own slot. Returns one record per input, in
    /// input order. Without isolation the first failure is returned and no
    /// records are.
    pub fn run_batch_blocking<I>(
        &self,
        items: impl IntoIterator<Item = I>,
    ) -> Result<Vec<OutputRecord>, ScrubError>
    where
        I: TryInto<BatchItem>,
        I::Error: Into<ScrubError>,
    {
        let start = Instant::now();
        let prepared = prepare_all(items);
        let compiled = compile_batch(&prepared);
        info!(items = prepared.len(), selectors = compiled.len(), "batch started");

        let mut records = Vec::with_capacity(prepared.len());
        for (index, entry) in prepared.into_iter().enumerate() {
            let res = entry.and_then(|p| self.run_item(index, &p, &compiled));
            records.push(self.settle(res)?);
        }

        log_finished(&records, start);
        Ok(records)
    }

    /// Process items on the blocking thread pool, at most `concurrency` at a time.
    ///
    /// Output order matches input order regardless of completion order. Each
    /// item is bounded by `item_timeout` when one is set. A worker whose item
    /// timed out keeps its slot in the pool until its thread returns, so the
    /// number of running workers never exceeds `concurrency`.
    pub async fn run_batch<I>(&self, items: Vec<I>) -> Result<Vec<OutputRecord>, ScrubError>
    where
        I: TryInto<BatchItem> + Send,
        I::Error: Into<ScrubError>,
    {
        let start = Instant::now();
        let workers = self.opts.concurrency.max(1);
        let prepared = prepare_all(items);
        let total = prepared.len();
        let compiled = Arc::new(compile_batch(&prepared));
        let permits = Arc::new(Semaphore::new(workers));
        info!(items = total, workers, selectors = compiled.len(), "batch started");

        let results = stream::iter(prepared.into_iter().enumerate())
            .map(|(index, entry)| {
                let compiled = Arc::clone(&compiled);
                let permits = Arc::clone(&permits);
                async move {
                    match entry {
                        Ok(prepared) => {
                            self.run_item_async(index, prepared, compiled, permits)
                                .await
                        }
                        Err(err) => Err(err),
                    }
                }
            })
            .buffered(workers);
        let mut results = std::pin::pin!(results);

        let mut records = Vec::with_capacity(total);
        while let Some(res) = results.next().await {
            records.push(self.settle(res)?);
        }

        log_finished(&records, start);
        Ok(records)
    }

    async fn run_item_async(
        &self,
        index: usize,
        prepared: PreparedItem,
        compiled: Arc<CompiledSelectors>,
        permits: Arc<Semaphore>,
    ) -> Result<ItemOutput, ScrubError> {
        let permit = permits.acquire_owned().await.map_err(|e| {
            ScrubError::collaborator("Process", Some(anyhow!("worker pool closed: {}", e)))
                .at_index(index)
        })?;

        let pipeline = self.clone();
        let task = tokio::task::spawn_blocking(move || {
            // Released only when the work ends, even if nobody waits for it
            let _permit = permit;
            pipeline.run_item(index, &prepared, &compiled)
        });

        let joined = match self.opts.item_timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    return Err(ScrubError::timeout(
                        "Process",
                        Some(anyhow!("no result within {}ms", limit.as_millis())),
                    )
                    .at_index(index))
                }
            },
            None => task.await,
        };

        joined.map_err(|e| {
            ScrubError::collaborator("Process", Some(anyhow!("worker stopped: {}", e))).at_index(index)
        })?
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineOptions::default())
    }
}

fn log_finished(records: &[OutputRecord], start: Instant) {
    let failed = records.iter().filter(|r| !r.is_success()).count();
    info!(
        items = records.len(),
        failed,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "batch finished"
    );
}
