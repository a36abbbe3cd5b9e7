//! Autocomplete over the suggestion index.

use crate::engine::SearchEngine;
use crate::errors::SearchError;
use crate::results::{SearchOptions, SuggestResult, Suggestion};
use catalog_store::keys;
use tracing::debug;

/// Product preview size when `include_products` is requested.
const PREVIEW_LIMIT: usize = 8;

impl SearchEngine {
    /// Prefix lookup against the suggestion index.
    ///
    /// The index holds every cumulative left-anchored phrase of tokenized
    /// product names, scored by how many products contribute it; matching is
    /// a plain starts-with over the normalized prefix, ordered by count.
    pub async fn suggest(
        &self,
        project_id: &str,
        prefix: &str,
        limit: usize,
        include_products: bool,
    ) -> Result<SuggestResult, SearchError> {
        let normalized = self.processor().normalize(prefix);

        let entries = self
            .kv()
            .zrevrange_withscores(&keys::suggest(project_id))
            .await?;
        let mut queries: Vec<Suggestion> = entries
            .into_iter()
            .filter(|(phrase, _)| phrase.starts_with(&normalized))
            .map(|(text, count)| {
                let highlight = match text.strip_prefix(&normalized) {
                    Some(rest) if !normalized.is_empty() => {
                        format!("<b>{normalized}</b>{rest}")
                    }
                    _ => text.clone(),
                };
                Suggestion {
                    text,
                    highlight,
                    count: count as i64,
                }
            })
            .collect();
        queries.truncate(limit);
        debug!(
            "SearchEngine::suggest project={} prefix={:?} matches={}",
            project_id,
            normalized,
            queries.len()
        );

        let products = if include_products {
            // Preview products for the strongest suggestion, falling back to
            // the raw prefix when nothing matched.
            let preview_query = queries
                .first()
                .map(|s| s.text.clone())
                .unwrap_or_else(|| prefix.to_string());
            let opts = SearchOptions {
                limit: PREVIEW_LIMIT,
                ..Default::default()
            };
            self.search(project_id, &preview_query, &opts).await?.items
        } else {
            Vec::new()
        };

        Ok(SuggestResult {
            prefix: prefix.to_string(),
            queries,
            products,
        })
    }
}
