//! Related items: a direct product-store scan keyed on one field of the
//! top search hit.

use crate::engine::SearchEngine;
use crate::errors::SearchError;
use crate::results::{RelatedItems, SearchItem};
use catalog_store::{keys, Product, SearchSettings};
use std::collections::HashSet;
use tracing::debug;

/// The leading results are excluded from the related block so it never
/// repeats what the user already sees.
const EXCLUDE_HEAD: usize = 5;

fn field_value(product: &Product, field: &str) -> Option<String> {
    if let Some(param) = field.strip_prefix("params.") {
        return product.params.get(param).cloned();
    }
    let top_level = match field {
        "brand" => product.brand.clone(),
        "category" => product.category.clone(),
        "vendor_code" => product.vendor_code.clone(),
        _ => String::new(),
    };
    if !top_level.is_empty() {
        Some(top_level)
    } else {
        // Unknown names fall through to the feed parameters.
        product.params.get(field).cloned()
    }
}

impl SearchEngine {
    /// Builds the related-items block for a result set, when the project's
    /// search settings designate a related field.
    ///
    /// Takes the first result, reads the designated field (`brand`,
    /// `category` or `params.<Name>`), and scans the product store for up to
    /// `relatedProductsLimit` other products sharing that value
    /// (case-folded), excluding the first five result IDs.
    pub async fn related_items(
        &self,
        project_id: &str,
        settings: &SearchSettings,
        results: &[SearchItem],
    ) -> Result<Option<RelatedItems>, SearchError> {
        let Some(field) = settings.related_products_field.as_deref() else {
            return Ok(None);
        };
        let Some(first) = results.first() else {
            return Ok(None);
        };
        let Some(value) = field_value(&first.product, field).filter(|v| !v.is_empty()) else {
            return Ok(None);
        };

        let excluded: HashSet<&str> = results
            .iter()
            .take(EXCLUDE_HEAD)
            .map(|item| item.product.id.as_str())
            .collect();
        let value_folded = value.to_lowercase();

        let mut items = Vec::new();
        for key in self.kv().keys(&keys::product_pattern(project_id)).await? {
            if items.len() >= settings.related_products_limit {
                break;
            }
            let Some(raw) = self.kv().get(&key).await? else {
                continue;
            };
            let Ok(product) = serde_json::from_str::<Product>(&raw) else {
                continue;
            };
            if excluded.contains(product.id.as_str()) {
                continue;
            }
            match field_value(&product, field) {
                Some(candidate) if candidate.to_lowercase() == value_folded => items.push(product),
                _ => {}
            }
        }

        debug!(
            "SearchEngine::related_items project={} field={} value={:?} items={}",
            project_id,
            field,
            value,
            items.len()
        );
        Ok(Some(RelatedItems {
            field: field.to_string(),
            value,
            items,
        }))
    }
}
