//! Field-weighted token extraction.

use catalog_store::Product;
use query_processor::QueryProcessor;
use std::collections::HashMap;

/// Per-occurrence term weights. A token hitting several fields accumulates
/// every contribution (name + brand scores 5.0).
const WEIGHT_NAME: f64 = 3.0;
const WEIGHT_BRAND: f64 = 2.0;
const WEIGHT_CATEGORY: f64 = 1.5;
const WEIGHT_DESCRIPTION: f64 = 1.0;
const WEIGHT_VENDOR_CODE: f64 = 3.0;
const WEIGHT_PARAM_VALUE: f64 = 2.0;

/// Descriptions are capped before tokenization; anything beyond carries
/// little ranking signal and bloats the index.
const DESCRIPTION_CAP_CHARS: usize = 500;

fn accumulate(scores: &mut HashMap<String, f64>, processor: &QueryProcessor, text: &str, weight: f64) {
    if text.is_empty() {
        return;
    }
    for token in processor.process(text).tokens {
        *scores.entry(token).or_insert(0.0) += weight;
    }
}

/// Token-to-score mapping for one product, ready for the inverted index.
pub fn extract_token_scores(processor: &QueryProcessor, product: &Product) -> HashMap<String, f64> {
    let mut scores = HashMap::new();

    accumulate(&mut scores, processor, &product.name, WEIGHT_NAME);

    if !product.description.is_empty() {
        let capped: String = product.description.chars().take(DESCRIPTION_CAP_CHARS).collect();
        accumulate(&mut scores, processor, &capped, WEIGHT_DESCRIPTION);
    }

    accumulate(&mut scores, processor, &product.brand, WEIGHT_BRAND);
    accumulate(&mut scores, processor, &product.category, WEIGHT_CATEGORY);
    accumulate(&mut scores, processor, &product.vendor_code, WEIGHT_VENDOR_CODE);

    for value in product.params.values() {
        accumulate(&mut scores, processor, value, WEIGHT_PARAM_VALUE);
    }

    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, brand: &str) -> Product {
        Product {
            id: "p".to_string(),
            name: name.to_string(),
            brand: brand.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn name_and_brand_weights_accumulate() {
        let processor = QueryProcessor::default();
        let scores = extract_token_scores(&processor, &product("Apple iPhone", "Apple"));
        assert_eq!(scores.get("apple"), Some(&5.0));
        assert_eq!(scores.get("iphone"), Some(&3.0));
    }

    #[test]
    fn params_and_vendor_code_are_indexed() {
        let processor = QueryProcessor::default();
        let mut p = product("Кроссовки беговые", "");
        p.vendor_code = "NK-AIR90".to_string();
        p.params.insert("Цвет".to_string(), "красный".to_string());
        let scores = extract_token_scores(&processor, &p);
        assert_eq!(scores.get("красный"), Some(&2.0));
        // Hyphenated vendor codes match both as-is and dehyphenated.
        assert_eq!(scores.get("nk-air90"), Some(&3.0));
        assert_eq!(scores.get("nkair90"), Some(&3.0));
    }

    #[test]
    fn description_is_capped() {
        let processor = QueryProcessor::default();
        let mut p = product("товар", "");
        p.description = format!("{} хвостовой", "слово ".repeat(200));
        let scores = extract_token_scores(&processor, &p);
        // 200 x "слово " is 1200 chars; the tail word lies past the cap.
        assert!(scores.contains_key("слово"));
        assert!(!scores.contains_key("хвостовой"));
    }
}
