//! Replacement discipline and partial updates, exercised against the
//! in-memory store by inspecting the keys the indexer writes.

use catalog_store::{keys, KvStore, MemoryStore, Product, StockUpdate};
use product_indexer::ProductIndexer;
use query_processor::{NGramGenerator, QueryProcessor};
use std::sync::Arc;

const PROJECT: &str = "p1";

fn harness() -> (Arc<MemoryStore>, ProductIndexer) {
    let kv = Arc::new(MemoryStore::new());
    let indexer = ProductIndexer::new(
        kv.clone(),
        None,
        QueryProcessor::default(),
        NGramGenerator::new(3),
    );
    (kv, indexer)
}

fn product(id: &str, name: &str) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}

async fn stored_product(kv: &MemoryStore, id: &str) -> Option<Product> {
    kv.get(&keys::product(PROJECT, id))
        .await
        .unwrap()
        .map(|raw| serde_json::from_str(&raw).unwrap())
}

#[tokio::test]
async fn every_indexed_product_has_a_record_and_postings() {
    let (kv, indexer) = harness();
    let mut p = product("sku-1", "Беговые кроссовки");
    p.brand = "Nike".to_string();
    let count = indexer.index_products(PROJECT, &[p]).await.unwrap();
    assert_eq!(count, 1);

    assert!(stored_product(&kv, "sku-1").await.is_some());

    let postings = kv
        .zrevrange_withscores(&keys::inverted(PROJECT, "кроссовки"))
        .await
        .unwrap();
    assert_eq!(postings, vec![("sku-1".to_string(), 3.0)]);
    let postings = kv
        .zrevrange_withscores(&keys::inverted(PROJECT, "nike"))
        .await
        .unwrap();
    assert_eq!(postings, vec![("sku-1".to_string(), 2.0)]);

    // Each token is reachable from its n-grams.
    let tokens = kv.smembers(&keys::ngram(PROJECT, "кро")).await.unwrap();
    assert!(tokens.contains(&"кроссовки".to_string()));
}

#[tokio::test]
async fn reindex_replaces_the_previous_generation() {
    let (kv, indexer) = harness();
    indexer
        .index_products(PROJECT, &[product("old", "Зимняя куртка")])
        .await
        .unwrap();
    indexer
        .index_products(PROJECT, &[product("new", "Летняя футболка")])
        .await
        .unwrap();

    assert!(stored_product(&kv, "old").await.is_none());
    assert!(stored_product(&kv, "new").await.is_some());
    let postings = kv
        .zrevrange_withscores(&keys::inverted(PROJECT, "куртка"))
        .await
        .unwrap();
    assert!(postings.is_empty());
}

#[tokio::test]
async fn empty_batch_still_clears_the_project() {
    let (kv, indexer) = harness();
    indexer
        .index_products(PROJECT, &[product("a", "Пылесос вертикальный")])
        .await
        .unwrap();

    let count = indexer.index_products(PROJECT, &[]).await.unwrap();
    assert_eq!(count, 0);
    assert!(stored_product(&kv, "a").await.is_none());
    assert!(kv
        .keys(&keys::index_pattern(PROJECT))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn duplicate_ids_collapse_to_the_last_occurrence() {
    let (kv, indexer) = harness();
    let count = indexer
        .index_products(
            PROJECT,
            &[product("d", "Старое название"), product("d", "Новое название")],
        )
        .await
        .unwrap();
    assert_eq!(count, 1);

    let stored = stored_product(&kv, "d").await.unwrap();
    assert_eq!(stored.name, "Новое название");

    // No postings survive from the shadowed occurrence, and weights are not
    // accumulated across duplicates.
    let postings = kv
        .zrevrange_withscores(&keys::inverted(PROJECT, "старое"))
        .await
        .unwrap();
    assert!(postings.is_empty());
    let postings = kv
        .zrevrange_withscores(&keys::inverted(PROJECT, "новое"))
        .await
        .unwrap();
    assert_eq!(postings, vec![("d".to_string(), 3.0)]);
}

#[tokio::test]
async fn suggestion_index_counts_contributing_products() {
    let (kv, indexer) = harness();
    indexer
        .index_products(
            PROJECT,
            &[
                product("1", "Чайник электрический белый"),
                product("2", "Чайник электрический красный"),
            ],
        )
        .await
        .unwrap();

    let phrases = kv
        .zrevrange_withscores(&keys::suggest(PROJECT))
        .await
        .unwrap();
    let get = |phrase: &str| {
        phrases
            .iter()
            .find(|(p, _)| p == phrase)
            .map(|(_, count)| *count)
    };
    assert_eq!(get("чайник"), Some(2.0));
    assert_eq!(get("чайник электрический"), Some(2.0));
    assert_eq!(get("чайник электрический белый"), Some(1.0));
    assert_eq!(get("чайник электрический красный"), Some(1.0));
    // Exactly the cumulative left prefixes, nothing else.
    assert_eq!(phrases.len(), 4);
}

#[tokio::test]
async fn discount_is_derived_at_index_time() {
    let (kv, indexer) = harness();
    let mut p = product("deal", "Ноутбук игровой");
    p.price = 80_000.0;
    p.old_price = Some(100_000.0);
    indexer.index_products(PROJECT, &[p]).await.unwrap();

    let stored = stored_product(&kv, "deal").await.unwrap();
    assert_eq!(stored.discount_percent, Some(20));
}

#[tokio::test]
async fn stock_price_update_touches_only_commercial_fields() {
    let (kv, indexer) = harness();
    let mut p = product("sku", "Кофемашина автоматическая");
    p.price = 500.0;
    indexer.index_products(PROJECT, &[p]).await.unwrap();

    let updated = indexer
        .update_stock_prices(
            PROJECT,
            &[StockUpdate {
                id: "sku".to_string(),
                price: Some(400.0),
                old_price: Some(500.0),
                quantity: Some(7),
                in_stock: None,
            }],
        )
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let stored = stored_product(&kv, "sku").await.unwrap();
    assert_eq!(stored.price, 400.0);
    assert_eq!(stored.old_price, Some(500.0));
    assert_eq!(stored.quantity, Some(7));
    assert_eq!(stored.discount_percent, Some(20));
    assert_eq!(stored.name, "Кофемашина автоматическая");

    // The index itself is untouched by a pure price change.
    let postings = kv
        .zrevrange_withscores(&keys::inverted(PROJECT, "кофемашина"))
        .await
        .unwrap();
    assert_eq!(postings, vec![("sku".to_string(), 3.0)]);
}

#[tokio::test]
async fn out_of_stock_transition_halves_scores_and_back_restores() {
    let (kv, indexer) = harness();
    indexer
        .index_products(PROJECT, &[product("sku", "Фен дорожный")])
        .await
        .unwrap();

    indexer
        .update_stock_prices(
            PROJECT,
            &[StockUpdate {
                id: "sku".to_string(),
                in_stock: Some(false),
                ..Default::default()
            }],
        )
        .await
        .unwrap();
    let demoted = kv
        .zscore(&keys::inverted(PROJECT, "фен"), "sku")
        .await
        .unwrap();
    assert_eq!(demoted, Some(1.5));

    indexer
        .update_stock_prices(
            PROJECT,
            &[StockUpdate {
                id: "sku".to_string(),
                in_stock: Some(true),
                ..Default::default()
            }],
        )
        .await
        .unwrap();
    let restored = kv
        .zscore(&keys::inverted(PROJECT, "фен"), "sku")
        .await
        .unwrap();
    assert_eq!(restored, Some(3.0));
}

#[tokio::test]
async fn unknown_product_update_is_skipped() {
    let (_kv, indexer) = harness();
    let updated = indexer
        .update_stock_prices(
            PROJECT,
            &[StockUpdate {
                id: "missing".to_string(),
                price: Some(1.0),
                ..Default::default()
            }],
        )
        .await
        .unwrap();
    assert_eq!(updated, 0);
}
