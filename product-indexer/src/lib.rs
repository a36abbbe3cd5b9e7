//! Index construction: full replacement of a project's product store,
//! inverted index, n-gram index and suggestion index.
//!
//! The replacement batch deletes every old `products:{p}:*` / `idx:{p}:*`
//! key and writes the new generation in one pipelined sequence. The batch is
//! chunked, not transactional: readers interleaving with it may observe a
//! partially replaced index, and the search engine compensates by dropping
//! hydrate misses. A failed batch leaves the store in an undefined state
//! that the next successful refresh overwrites.

mod errors;
mod tokens;

pub use errors::IndexError;
pub use tokens::extract_token_scores;

use catalog_store::{keys, Database, KvCommand, KvStore, Product, StockUpdate};
use query_processor::{NGramGenerator, QueryProcessor};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Commands per pipeline round-trip.
const PIPELINE_CHUNK: usize = 2000;

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

pub struct ProductIndexer {
    kv: Arc<dyn KvStore>,
    backup: Option<Database>,
    processor: QueryProcessor,
    ngrams: NGramGenerator,
}

impl ProductIndexer {
    pub fn new(
        kv: Arc<dyn KvStore>,
        backup: Option<Database>,
        processor: QueryProcessor,
        ngrams: NGramGenerator,
    ) -> Self {
        Self {
            kv,
            backup,
            processor,
            ngrams,
        }
    }

    /// Full replacement of a project's indexed products.
    ///
    /// Duplicate IDs within one batch collapse to the last occurrence. An
    /// empty batch still runs the deletion step, leaving the project
    /// cleanly indexed with zero products.
    ///
    /// # Errors
    /// Returns `IndexError::Store` when the KV store is unreachable; a
    /// failed relational backup is logged and does not fail the call.
    pub async fn index_products(
        &self,
        project_id: &str,
        products: &[Product],
    ) -> Result<usize, IndexError> {
        self.index_inner(project_id, products, true).await
    }

    /// One-shot bulk reload of the relational backup into the KV indexes.
    ///
    /// # Errors
    /// `IndexError::NoBackup` when the indexer was wired without a
    /// relational store.
    pub async fn restore_from_backup(&self, project_id: &str) -> Result<usize, IndexError> {
        let db = self.backup.as_ref().ok_or(IndexError::NoBackup)?;
        let products = db.load_products_backup(project_id).await?;
        if products.is_empty() {
            info!("ProductIndexer::restore_from_backup: no backup for {project_id}");
            return Ok(0);
        }
        info!(
            "ProductIndexer::restore_from_backup: reloading {} products for {project_id}",
            products.len()
        );
        self.index_inner(project_id, &products, false).await
    }

    async fn index_inner(
        &self,
        project_id: &str,
        products: &[Product],
        write_backup: bool,
    ) -> Result<usize, IndexError> {
        // Last occurrence wins for both the record and its index weights.
        let mut order: Vec<&str> = Vec::new();
        let mut by_id: HashMap<&str, &Product> = HashMap::new();
        for product in products {
            if by_id.insert(product.id.as_str(), product).is_none() {
                order.push(product.id.as_str());
            }
        }

        let mut inverted: HashMap<String, Vec<(String, f64)>> = HashMap::new();
        let mut ngram_index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut suggest: BTreeMap<String, i64> = BTreeMap::new();
        let mut records: Vec<(String, String)> = Vec::with_capacity(order.len());

        for id in &order {
            let product = by_id[id];
            let mut product = (*product).clone();
            product.recompute_discount();

            records.push((
                keys::product(project_id, &product.id),
                serde_json::to_string(&product)?,
            ));

            for (token, score) in extract_token_scores(&self.processor, &product) {
                for gram in self.ngrams.generate(&token) {
                    ngram_index.entry(gram).or_default().insert(token.clone());
                }
                inverted
                    .entry(token)
                    .or_default()
                    .push((product.id.clone(), round4(score)));
            }

            let name_tokens = self
                .processor
                .tokenize(&self.processor.normalize(&product.name));
            for end in 1..=name_tokens.len() {
                let phrase = name_tokens[..end].join(" ");
                *suggest.entry(phrase).or_insert(0) += 1;
            }
        }

        let mut commands = Vec::new();

        let mut old_keys = self.kv.keys(&keys::product_pattern(project_id)).await?;
        old_keys.extend(self.kv.keys(&keys::index_pattern(project_id)).await?);
        if !old_keys.is_empty() {
            commands.push(KvCommand::Delete { keys: old_keys });
        }

        for (key, value) in records {
            commands.push(KvCommand::Set { key, value });
        }
        for (token, postings) in inverted {
            let key = keys::inverted(project_id, &token);
            for (product_id, score) in postings {
                commands.push(KvCommand::ZAdd {
                    key: key.clone(),
                    member: product_id,
                    score,
                });
            }
        }
        for (gram, tokens) in ngram_index {
            commands.push(KvCommand::SAdd {
                key: keys::ngram(project_id, &gram),
                members: tokens.into_iter().collect(),
            });
        }
        for (phrase, count) in suggest {
            commands.push(KvCommand::ZAdd {
                key: keys::suggest(project_id),
                member: phrase,
                score: count as f64,
            });
        }

        self.execute_chunked(commands).await?;

        let indexed = order.len();
        info!("ProductIndexer::index_products: {indexed} products indexed for {project_id}");

        if write_backup {
            if let Some(db) = &self.backup {
                let deduped: Vec<Product> = order.iter().map(|id| by_id[id].clone()).collect();
                if let Err(err) = db.save_products_backup(project_id, &deduped).await {
                    error!("ProductIndexer::index_products: backup failed for {project_id}: {err}");
                }
            }
        }

        Ok(indexed)
    }

    /// Partial update of commercial fields without reindexing.
    ///
    /// When a product transitions out of stock its inverted scores are
    /// halved; transitioning back in restores them by re-running token
    /// extraction on the stored record.
    pub async fn update_stock_prices(
        &self,
        project_id: &str,
        updates: &[StockUpdate],
    ) -> Result<usize, IndexError> {
        let mut commands = Vec::new();
        let mut updated = 0usize;

        for update in updates {
            if update.id.is_empty() {
                continue;
            }
            let key = keys::product(project_id, &update.id);
            let Some(raw) = self.kv.get(&key).await? else {
                continue;
            };
            let mut product: Product = match serde_json::from_str(&raw) {
                Ok(product) => product,
                Err(err) => {
                    warn!("ProductIndexer::update_stock_prices: bad record {key}: {err}");
                    continue;
                }
            };

            let mut changed = false;
            if let Some(price) = update.price {
                if price != product.price {
                    product.price = price;
                    changed = true;
                }
            }
            if let Some(old_price) = update.old_price {
                product.old_price = Some(old_price);
                changed = true;
            }
            if let Some(in_stock) = update.in_stock {
                if in_stock != product.in_stock {
                    product.in_stock = in_stock;
                    changed = true;
                    if in_stock {
                        self.restore_scores(project_id, &product, &mut commands);
                    } else {
                        self.demote_product(project_id, &product.id, &mut commands)
                            .await?;
                    }
                }
            }
            if let Some(quantity) = update.quantity {
                product.quantity = Some(quantity);
                changed = true;
            }

            if changed {
                product.recompute_discount();
                commands.push(KvCommand::Set {
                    key,
                    value: serde_json::to_string(&product)?,
                });
                updated += 1;
            }
        }

        self.execute_chunked(commands).await?;
        debug!("ProductIndexer::update_stock_prices: {updated} products updated");
        Ok(updated)
    }

    /// Halves every inverted score of an out-of-stock product.
    async fn demote_product(
        &self,
        project_id: &str,
        product_id: &str,
        commands: &mut Vec<KvCommand>,
    ) -> Result<(), IndexError> {
        for key in self.kv.keys(&keys::inverted_pattern(project_id)).await? {
            if let Some(score) = self.kv.zscore(&key, product_id).await? {
                commands.push(KvCommand::ZAdd {
                    key,
                    member: product_id.to_string(),
                    score: round4(score * 0.5),
                });
            }
        }
        Ok(())
    }

    /// Restores full scores for a product back in stock.
    fn restore_scores(&self, project_id: &str, product: &Product, commands: &mut Vec<KvCommand>) {
        for (token, score) in extract_token_scores(&self.processor, product) {
            commands.push(KvCommand::ZAdd {
                key: keys::inverted(project_id, &token),
                member: product.id.clone(),
                score: round4(score),
            });
        }
    }

    async fn execute_chunked(&self, commands: Vec<KvCommand>) -> Result<(), IndexError> {
        for chunk in commands.chunks(PIPELINE_CHUNK) {
            self.kv.pipeline_execute(chunk.to_vec()).await?;
        }
        Ok(())
    }
}
