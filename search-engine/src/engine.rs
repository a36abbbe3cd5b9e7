//! Query resolution over the project indexes.
//!
//! Retrieval runs up to three passes, each strictly weaker than the last:
//! 1. inverted-index lookup over synonym-expanded tokens,
//! 2. keyboard-layout variants at a 0.9 confidence factor,
//! 3. n-gram candidates scaled by Jaccard similarity of the token shapes.
//! Fallback passes only ever introduce products the stronger passes missed;
//! they never touch an existing score, so primary matches of equal raw
//! weight always rank above repaired ones.

use crate::accumulate::ScoreAccumulator;
use crate::errors::SearchError;
use crate::results::{SearchItem, SearchOptions, SearchResult, SortOrder};
use crate::synonyms::expand_tokens;
use catalog_store::{keys, KvStore, Product};
use query_processor::{NGramGenerator, QueryProcessor};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Confidence factor applied to layout-variant matches.
const LAYOUT_FACTOR: f64 = 0.9;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct SearchEngine {
    kv: Arc<dyn KvStore>,
    processor: QueryProcessor,
    ngrams: NGramGenerator,
}

impl SearchEngine {
    pub fn new(kv: Arc<dyn KvStore>, processor: QueryProcessor, ngrams: NGramGenerator) -> Self {
        Self {
            kv,
            processor,
            ngrams,
        }
    }

    pub(crate) fn kv(&self) -> &Arc<dyn KvStore> {
        &self.kv
    }

    pub(crate) fn processor(&self) -> &QueryProcessor {
        &self.processor
    }

    /// Resolves a query into ranked, filtered, hydrated products.
    ///
    /// An empty query (or one consisting entirely of stop-words) returns an
    /// empty result without touching the store. Scored IDs whose product
    /// record is gone are dropped silently; that is the repair path for the
    /// reindex consistency window.
    ///
    /// # Errors
    /// Returns `SearchError::Store` only when the KV store itself fails.
    pub async fn search(
        &self,
        project_id: &str,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<SearchResult, SearchError> {
        let started = Instant::now();

        let processed = self.processor.process(query);
        if processed.tokens.is_empty() {
            return Ok(SearchResult::empty(query, took_ms(started)));
        }
        if let (Some(min), Some(max)) = (opts.filters.min_price, opts.filters.max_price) {
            if min > max {
                return Ok(SearchResult::empty(query, took_ms(started)));
            }
        }

        let groups = self.load_synonyms(project_id).await?;
        let expanded = expand_tokens(&processed.tokens, &groups);
        debug!(
            "SearchEngine::search project={} tokens={:?} expanded={:?}",
            project_id, processed.tokens, expanded
        );

        let mut scores = ScoreAccumulator::new();
        for (product_id, score) in self.collect_postings(project_id, &expanded).await? {
            scores.add(&product_id, score);
        }

        if scores.len() < opts.limit && !processed.layout_variants.is_empty() {
            for variant in &processed.layout_variants {
                let tokens = self.processor.tokenize(variant);
                if tokens.is_empty() {
                    continue;
                }
                let variant_scores = self.collect_postings(project_id, &tokens).await?;
                if !variant_scores.is_empty() {
                    debug!(
                        "SearchEngine::search: layout fallback variant={} hits={}",
                        variant,
                        variant_scores.len()
                    );
                }
                for (product_id, score) in variant_scores {
                    scores.add_if_absent(&product_id, score * LAYOUT_FACTOR);
                }
            }
        }

        if scores.len() < opts.limit {
            let fuzzy = self.ngram_candidates(project_id, &processed.tokens).await?;
            if !fuzzy.is_empty() {
                debug!("SearchEngine::search: ngram fallback hits={}", fuzzy.len());
            }
            for (product_id, score) in fuzzy {
                scores.add_if_absent(&product_id, score);
            }
        }

        let mut items = self.hydrate_filtered(project_id, &scores, opts).await?;
        sort_items(&mut items, opts.sort);

        let total = items.len();
        let items: Vec<SearchItem> = items
            .into_iter()
            .skip(opts.offset)
            .take(opts.limit)
            .map(|mut item| {
                item.score = round2(item.score);
                item
            })
            .collect();

        let result = SearchResult {
            query: query.to_string(),
            total,
            items,
            took_ms: took_ms(started),
        };
        info!(
            "SearchEngine::search project={} query={:?} total={} took_ms={}",
            project_id, query, result.total, result.took_ms
        );
        Ok(result)
    }

    /// Sums full postings per product over `tokens`, keeping first-encounter
    /// order for deterministic ties.
    async fn collect_postings(
        &self,
        project_id: &str,
        tokens: &[String],
    ) -> Result<Vec<(String, f64)>, SearchError> {
        let mut acc = ScoreAccumulator::new();
        for token in tokens {
            let postings = self
                .kv
                .zrevrange_withscores(&keys::inverted(project_id, token))
                .await?;
            for (product_id, score) in postings {
                acc.add(&product_id, score);
            }
        }
        Ok(acc.into_entries())
    }

    /// N-gram fallback: candidate tokens sharing n-grams with the original
    /// tokens, their postings scaled by Jaccard similarity.
    async fn ngram_candidates(
        &self,
        project_id: &str,
        tokens: &[String],
    ) -> Result<Vec<(String, f64)>, SearchError> {
        let mut acc = ScoreAccumulator::new();
        for token in tokens {
            let mut candidates: Vec<String> = Vec::new();
            for gram in self.ngrams.generate(token) {
                for candidate in self.kv.smembers(&keys::ngram(project_id, &gram)).await? {
                    if !candidates.contains(&candidate) {
                        candidates.push(candidate);
                    }
                }
            }
            for candidate in &candidates {
                let similarity = self.ngrams.similarity(token, candidate);
                if similarity <= 0.0 {
                    continue;
                }
                let postings = self
                    .kv
                    .zrevrange_withscores(&keys::inverted(project_id, candidate))
                    .await?;
                for (product_id, score) in postings {
                    acc.add(&product_id, score * similarity);
                }
            }
        }
        Ok(acc.into_entries())
    }

    /// Hydrates scored IDs, silently dropping store misses, and applies
    /// the request filters.
    async fn hydrate_filtered(
        &self,
        project_id: &str,
        scores: &ScoreAccumulator,
        opts: &SearchOptions,
    ) -> Result<Vec<SearchItem>, SearchError> {
        let filters = &opts.filters;
        let mut items = Vec::new();
        for (product_id, score) in scores.ranked() {
            let Some(raw) = self.kv.get(&keys::product(project_id, &product_id)).await? else {
                continue;
            };
            let product: Product = match serde_json::from_str(&raw) {
                Ok(product) => product,
                Err(err) => {
                    warn!("SearchEngine::hydrate: bad record {product_id}: {err}");
                    continue;
                }
            };

            if let Some(want) = filters.in_stock {
                if product.in_stock != want {
                    continue;
                }
            }
            if let Some(min) = filters.min_price {
                if product.price < min {
                    continue;
                }
            }
            if let Some(max) = filters.max_price {
                if product.price > max {
                    continue;
                }
            }
            if let Some(category) = &filters.category {
                if &product.category != category {
                    continue;
                }
            }

            items.push(SearchItem { product, score });
        }
        Ok(items)
    }

    async fn load_synonyms(&self, project_id: &str) -> Result<Vec<Vec<String>>, SearchError> {
        match self.kv.get(&keys::synonyms(project_id)).await? {
            Some(raw) => Ok(serde_json::from_str(&raw).unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }
}

fn sort_items(items: &mut [SearchItem], sort: SortOrder) {
    match sort {
        // Already ranked by accumulated score with stable ties.
        SortOrder::Relevance => {}
        SortOrder::PriceAsc => items.sort_by(|a, b| {
            a.product
                .price
                .partial_cmp(&b.product.price)
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
        SortOrder::PriceDesc => items.sort_by(|a, b| {
            b.product
                .price
                .partial_cmp(&a.product.price)
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
        SortOrder::Popular => items.sort_by(|a, b| {
            b.product
                .popularity
                .unwrap_or(0.0)
                .partial_cmp(&a.product.popularity.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
    }
}

fn took_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
