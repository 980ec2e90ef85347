// ABOUTME: Default ContentExtractor backed by dom_smoothie, a Rust port of Mozilla Readability.
// ABOUTME: Maps ExtractionOptions onto its Config and its Article onto ArticleResult.

use anyhow::anyhow;
use dom_smoothie::{Article, Config, Readability};

use super::{non_empty, ArticleResult, ContentExtractor};
use crate::dom::DocumentTree;
use crate::error::ScrubError;
use crate::options::ExtractionOptions;

/// Readability-based extractor. Stateless; one instance serves every item.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadabilityExtractor;

fn config_for(opts: &ExtractionOptions) -> Config {
    Config {
        char_threshold: opts.char_threshold,
        n_top_candidates: opts.nb_top_candidates,
        keep_classes: opts.keep_classes,
        classes_to_preserve: opts.classes_to_preserve.clone(),
        disable_json_ld: opts.disable_json_ld,
        ..Default::default()
    }
}

impl From<Article> for ArticleResult {
    fn from(article: Article) -> Self {
        ArticleResult {
            title: non_empty(article.title),
            content: non_empty(article.content.to_string()),
            text_content: non_empty(article.text_content.to_string()),
            length: Some(article.length),
            excerpt: article.excerpt.and_then(non_empty),
            lang: article.lang.and_then(non_empty),
            byline: article.byline.and_then(non_empty),
            dir: article.dir.and_then(non_empty),
            site_name: article.site_name.and_then(non_empty),
            published_time: article.published_time.and_then(non_empty),
        }
    }
}

impl ContentExtractor for ReadabilityExtractor {
    fn extract(
        &self,
        tree: &DocumentTree,
        opts: &ExtractionOptions,
    ) -> Result<Option<ArticleResult>, ScrubError> {
        // Readability mutates the document it scores, so it gets its own copy
        let mut reader =
            Readability::with_document(tree.document().clone(), None, Some(config_for(opts)))
                .map_err(|e| ScrubError::collaborator("Readability", Some(anyhow!("{}", e))))?;

        match reader.parse() {
            Ok(article) => Ok(Some(article.into())),
            Err(e) => {
                tracing::debug!(error = %e, "readability found no article");
                Ok(None)
            }
        }
    }
}
