//! Key schema for the key-value store.
//!
//! Every key is project-scoped ASCII with `:` separators. Indexes and product
//! records are derived state and live under patterns the indexer is allowed
//! to wipe wholesale (`products:{p}:*`, `idx:{p}:*`); everything else
//! (project hash, feed status, counters, locks) survives a reindex.

/// Product record, JSON value: `products:{project}:{id}`.
pub fn product(project_id: &str, product_id: &str) -> String {
    format!("products:{project_id}:{product_id}")
}

/// Pattern matching every product record of a project.
pub fn product_pattern(project_id: &str) -> String {
    format!("products:{project_id}:*")
}

/// Inverted postings, zset `product_id -> score`: `idx:{project}:inv:{token}`.
pub fn inverted(project_id: &str, token: &str) -> String {
    format!("idx:{project_id}:inv:{token}")
}

/// Pattern matching all inverted postings of a project.
pub fn inverted_pattern(project_id: &str) -> String {
    format!("idx:{project_id}:inv:*")
}

/// Token set for one n-gram: `idx:{project}:ngram:{gram}`.
pub fn ngram(project_id: &str, gram: &str) -> String {
    format!("idx:{project_id}:ngram:{gram}")
}

/// Pattern matching every derived index key of a project.
pub fn index_pattern(project_id: &str) -> String {
    format!("idx:{project_id}:*")
}

/// Suggestion zset, `phrase -> contributing product count`.
pub fn suggest(project_id: &str) -> String {
    format!("idx:{project_id}:suggest")
}

/// Feed status hash: `project:{project}:feed`.
pub fn feed(project_id: &str) -> String {
    format!("project:{project_id}:feed")
}

/// Synonym groups cache, JSON array of arrays.
pub fn synonyms(project_id: &str) -> String {
    format!("synonyms:{project_id}")
}

/// API key -> project id cache.
pub fn api_key(key: &str) -> String {
    format!("apikey:{key}")
}

/// Per-project refresh lock, `SET NX EX` with a 300 s TTL.
pub fn feed_lock(project_id: &str) -> String {
    format!("lock:feed:{project_id}")
}

/// Daily query counter, `day` formatted `YYYY-MM-DD`.
pub fn daily_queries(project_id: &str, day: &str) -> String {
    format!("analytics:{project_id}:queries:{day}")
}

/// Daily click counter.
pub fn daily_clicks(project_id: &str, day: &str) -> String {
    format!("analytics:{project_id}:clicks:{day}")
}

/// Cumulative query counter.
pub fn total_queries(project_id: &str) -> String {
    format!("analytics:{project_id}:total_queries")
}

/// Cumulative click counter.
pub fn total_clicks(project_id: &str) -> String {
    format!("analytics:{project_id}:total_clicks")
}

/// Ranked popular queries, zset `query -> count`.
pub fn popular_queries(project_id: &str) -> String {
    format!("analytics:{project_id}:popular_queries")
}

/// Ranked popular products by clicks.
pub fn popular_products(project_id: &str) -> String {
    format!("analytics:{project_id}:popular_products")
}

/// Ranked queries that preceded a click.
pub fn converting_queries(project_id: &str) -> String {
    format!("analytics:{project_id}:converting_queries")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_project_scoped() {
        assert_eq!(product("p1", "sku-9"), "products:p1:sku-9");
        assert_eq!(inverted("p1", "кроссовки"), "idx:p1:inv:кроссовки");
        assert_eq!(ngram("p1", "кро"), "idx:p1:ngram:кро");
        assert_eq!(suggest("p1"), "idx:p1:suggest");
        assert_eq!(feed_lock("p1"), "lock:feed:p1");
    }

    #[test]
    fn index_pattern_covers_inverted_ngram_and_suggest() {
        for key in [inverted("p", "t"), ngram("p", "abc"), suggest("p")] {
            assert!(key.starts_with(&index_pattern("p").trim_end_matches('*').to_string()));
        }
    }
}
