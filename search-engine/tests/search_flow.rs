//! End-to-end retrieval flows: products are seeded through the indexer and
//! queried through the engine against the in-memory store, no HTTP involved.

use catalog_store::{keys, KvStore, MemoryStore, Product, SearchSettings};
use product_indexer::ProductIndexer;
use query_processor::{NGramGenerator, QueryProcessor};
use search_engine::{SearchEngine, SearchFilters, SearchOptions};
use std::sync::Arc;

const PROJECT: &str = "p1";

fn harness() -> (Arc<MemoryStore>, ProductIndexer, SearchEngine) {
    let kv = Arc::new(MemoryStore::new());
    let processor = QueryProcessor::default();
    let ngrams = NGramGenerator::new(3);
    let indexer = ProductIndexer::new(kv.clone(), None, processor.clone(), ngrams);
    let engine = SearchEngine::new(kv.clone(), processor, ngrams);
    (kv, indexer, engine)
}

fn product(id: &str, name: &str) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}

fn opts(limit: usize) -> SearchOptions {
    SearchOptions {
        limit,
        ..Default::default()
    }
}

#[tokio::test]
async fn name_hits_outrank_brand_hits() {
    let (_kv, indexer, engine) = harness();
    let mut p1 = product("a", "Apple iPhone 15 Pro");
    p1.brand = "Apple".to_string();
    let mut p2 = product("b", "Generic phone");
    p2.brand = "Apple".to_string();
    indexer.index_products(PROJECT, &[p1, p2]).await.unwrap();

    // A full first page suppresses the fallback passes; only the name hit
    // qualifies.
    let result = engine.search(PROJECT, "iphone", &opts(1)).await.unwrap();
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].product.id, "a");

    let result = engine.search(PROJECT, "apple", &opts(10)).await.unwrap();
    let ids: Vec<&str> = result.items.iter().map(|i| i.product.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    // Name hit (3.0) plus brand hit (2.0) versus brand alone.
    assert_eq!(result.items[0].score, 5.0);
    assert_eq!(result.items[1].score, 2.0);
}

#[tokio::test]
async fn stock_filter_keeps_only_matching_products() {
    let (_kv, indexer, engine) = harness();
    let mut x = product("x", "Кружка синяя");
    x.price = 100.0;
    let mut y = product("y", "Кружка красная");
    y.price = 100.0;
    y.in_stock = false;
    indexer.index_products(PROJECT, &[x, y]).await.unwrap();

    // Empty query short-circuits regardless of filters.
    let mut options = opts(10);
    options.filters = SearchFilters {
        in_stock: Some(true),
        ..Default::default()
    };
    let result = engine.search(PROJECT, "", &options).await.unwrap();
    assert_eq!(result.total, 0);
    assert!(result.items.is_empty());

    let result = engine.search(PROJECT, "кружка", &options).await.unwrap();
    assert_eq!(result.total, 1);
    assert_eq!(result.items[0].product.id, "x");
}

#[tokio::test]
async fn ngram_fallback_recovers_a_dropped_letter() {
    let (_kv, indexer, engine) = harness();
    indexer
        .index_products(PROJECT, &[product("shoe", "кроссовки")])
        .await
        .unwrap();

    let result = engine.search(PROJECT, "кроссвки", &opts(10)).await.unwrap();
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].product.id, "shoe");
    // Name weight 3.0 scaled by Jaccard(6-gram set, 7-gram set) = 4/9.
    assert_eq!(result.items[0].score, 1.33);
}

#[tokio::test]
async fn layout_fallback_matches_wrong_keyboard_queries() {
    let (_kv, indexer, engine) = harness();
    indexer
        .index_products(PROJECT, &[product("ip", "iphone")])
        .await
        .unwrap();

    let result = engine.search(PROJECT, "шзрщту", &opts(10)).await.unwrap();
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].product.id, "ip");
    // Layout-repaired matches carry the 0.9 confidence factor.
    assert_eq!(result.items[0].score, 2.7);
}

#[tokio::test]
async fn synonym_groups_expand_the_query() {
    let (kv, indexer, engine) = harness();
    indexer
        .index_products(PROJECT, &[product("hp", "Headphones")])
        .await
        .unwrap();
    kv.set(
        &keys::synonyms(PROJECT),
        r#"[["наушники","headphones","earbuds"]]"#,
    )
    .await
    .unwrap();

    let result = engine.search(PROJECT, "наушники", &opts(10)).await.unwrap();
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].product.id, "hp");
}

#[tokio::test]
async fn related_items_share_the_designated_field() {
    let (_kv, indexer, engine) = harness();

    let mut catalog = Vec::new();
    for i in 0..5 {
        let mut p = product(&format!("apple-{i}"), &format!("Apple гаджет {i}"));
        p.brand = "Apple".to_string();
        catalog.push(p);
    }
    for i in 0..5 {
        let mut p = product(&format!("sony-{i}"), &format!("Sony устройство {i}"));
        p.brand = "Sony".to_string();
        catalog.push(p);
    }
    let mut macbook = product("macbook", "MacBook ноутбук");
    macbook.brand = "Apple".to_string();
    catalog.push(macbook);
    indexer.index_products(PROJECT, &catalog).await.unwrap();

    let settings = SearchSettings {
        related_products_field: Some("brand".to_string()),
        related_products_limit: 4,
        ..Default::default()
    };

    // All five Apple-named products fill the head; nothing is left over.
    let result = engine.search(PROJECT, "apple", &opts(10)).await.unwrap();
    let related = engine
        .related_items(PROJECT, &settings, &result.items)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(related.field, "brand");
    assert_eq!(related.value, "Apple");
    let head: Vec<&str> = result
        .items
        .iter()
        .take(5)
        .map(|i| i.product.id.as_str())
        .collect();
    for item in &related.items {
        assert_eq!(item.brand, "Apple");
        assert!(!head.contains(&item.id.as_str()));
    }

    // A single-hit query leaves the other Apple products for the block.
    let result = engine.search(PROJECT, "macbook", &opts(1)).await.unwrap();
    let related = engine
        .related_items(PROJECT, &settings, &result.items)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(related.value, "Apple");
    assert_eq!(related.items.len(), 4);
    assert!(related.items.iter().all(|p| p.brand == "Apple"));
    assert!(related.items.iter().all(|p| p.id != "macbook"));
}

#[tokio::test]
async fn related_field_can_point_into_params() {
    let (_kv, indexer, engine) = harness();
    let mut red1 = product("r1", "Кеды городские");
    red1.params.insert("Цвет".to_string(), "Красный".to_string());
    let mut red2 = product("r2", "Бутсы футбольные");
    red2.params.insert("Цвет".to_string(), "красный".to_string());
    let mut blue = product("b1", "Кеды пляжные");
    blue.params.insert("Цвет".to_string(), "Синий".to_string());
    indexer
        .index_products(PROJECT, &[red1, red2, blue])
        .await
        .unwrap();

    let settings = SearchSettings {
        related_products_field: Some("params.Цвет".to_string()),
        related_products_limit: 4,
        ..Default::default()
    };
    let result = engine.search(PROJECT, "городские", &opts(1)).await.unwrap();
    let related = engine
        .related_items(PROJECT, &settings, &result.items)
        .await
        .unwrap()
        .unwrap();
    // Value matching is case-folded.
    assert_eq!(related.items.len(), 1);
    assert_eq!(related.items[0].id, "r2");
}

#[tokio::test]
async fn stopword_only_query_is_as_empty_as_an_empty_one() {
    let (_kv, indexer, engine) = harness();
    indexer
        .index_products(PROJECT, &[product("a", "Настольная лампа")])
        .await
        .unwrap();

    for query in ["", "и в на", "я"] {
        let result = engine.search(PROJECT, query, &opts(10)).await.unwrap();
        assert_eq!(result.total, 0, "query {query:?} must be empty");
    }
}

#[tokio::test]
async fn inverted_price_bounds_yield_empty_not_error() {
    let (_kv, indexer, engine) = harness();
    let mut p = product("a", "Чайник электрический");
    p.price = 50.0;
    indexer.index_products(PROJECT, &[p]).await.unwrap();

    let mut options = opts(10);
    options.filters = SearchFilters {
        min_price: Some(100.0),
        max_price: Some(10.0),
        ..Default::default()
    };
    let result = engine.search(PROJECT, "чайник", &options).await.unwrap();
    assert_eq!(result.total, 0);
}

#[tokio::test]
async fn hydrate_misses_are_dropped_silently() {
    let (kv, indexer, engine) = harness();
    indexer
        .index_products(PROJECT, &[product("ghost", "Призрачный товар")])
        .await
        .unwrap();

    // Simulate the reindex window: the record is gone, postings remain.
    kv.delete(&[keys::product(PROJECT, "ghost")]).await.unwrap();

    let result = engine.search(PROJECT, "призрачный", &opts(10)).await.unwrap();
    assert_eq!(result.total, 0);
    assert!(result.items.is_empty());
}

#[tokio::test]
async fn search_returns_only_products_from_the_latest_index() {
    let (_kv, indexer, engine) = harness();
    indexer
        .index_products(PROJECT, &[product("old", "Старая коллекция")])
        .await
        .unwrap();
    indexer
        .index_products(PROJECT, &[product("new", "Новая коллекция")])
        .await
        .unwrap();
    // A second tenant must stay invisible to the first.
    indexer
        .index_products("p2", &[product("other", "Новая коллекция соседа")])
        .await
        .unwrap();

    let result = engine.search(PROJECT, "коллекция", &opts(10)).await.unwrap();
    let ids: Vec<&str> = result.items.iter().map(|i| i.product.id.as_str()).collect();
    assert_eq!(ids, vec!["new"]);
}

#[tokio::test]
async fn suggestions_rank_shared_prefixes_by_contribution() {
    let (_kv, indexer, engine) = harness();
    indexer
        .index_products(
            PROJECT,
            &[
                product("i", "Apple iPhone 15"),
                product("w", "Apple Watch"),
            ],
        )
        .await
        .unwrap();

    let result = engine.suggest(PROJECT, "app", 10, false).await.unwrap();
    assert_eq!(result.queries[0].text, "apple");
    assert_eq!(result.queries[0].count, 2);
    assert_eq!(result.queries[0].highlight, "<b>app</b>le");
    let texts: Vec<&str> = result.queries.iter().map(|s| s.text.as_str()).collect();
    assert!(texts.contains(&"apple iphone 15"));
    assert!(texts.contains(&"apple watch"));
    assert!(result.products.is_empty());

    let with_products = engine.suggest(PROJECT, "app", 10, true).await.unwrap();
    assert!(!with_products.products.is_empty());
}

#[tokio::test]
async fn pagination_windows_the_ranked_list() {
    let (_kv, indexer, engine) = harness();
    let mut catalog = Vec::new();
    for i in 0..6 {
        catalog.push(product(&format!("m-{i}"), &format!("Монитор модель {i}")));
    }
    indexer.index_products(PROJECT, &catalog).await.unwrap();

    let mut options = opts(2);
    options.offset = 2;
    let result = engine.search(PROJECT, "монитор", &options).await.unwrap();
    assert_eq!(result.total, 6);
    assert_eq!(result.items.len(), 2);
}
