//! Domain records shared across the service.
//!
//! Conventions:
//! - Every optional feed field has a serde default so data-shape drift in
//!   tenant feeds degrades to empty values instead of failing hydration.
//! - `params` uses a `BTreeMap` to keep serialized product JSON stable.
//! - Settings blobs coming from the JSONB columns keep their original
//!   camelCase keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

fn default_true() -> bool {
    true
}

fn default_currency() -> String {
    "RUB".to_string()
}

/// One indexed catalog item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub old_price: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub vendor_code: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<f64>,
}

impl Product {
    /// Recomputes `discount_percent` from the current price pair.
    ///
    /// Set iff `0 < price < old_price`; `None` otherwise.
    pub fn recompute_discount(&mut self) {
        self.discount_percent = match self.old_price {
            Some(old) if self.price > 0.0 && old > self.price => {
                Some(((1.0 - self.price / old) * 100.0).round() as i64)
            }
            _ => None,
        };
    }
}

/// Per-project search tuning stored in the `search_settings` JSONB column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchSettings {
    /// Field driving the related-items block: `brand`, `category`,
    /// or `params.<Name>` for feed parameters.
    pub related_products_field: Option<String>,
    pub related_products_limit: usize,
    pub boost_fields: Vec<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            related_products_field: None,
            related_products_limit: 4,
            boost_fields: vec!["brand".to_string(), "category".to_string()],
        }
    }
}

/// Tenant unit: one catalog, one API key, one isolation boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub feed_url: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub products_count: i64,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_true")]
    pub auto_update: bool,
    #[serde(default)]
    pub widget_settings: serde_json::Value,
    #[serde(default)]
    pub search_settings: SearchSettings,
    /// Ordered groups of mutually-interchangeable surface forms.
    #[serde(default)]
    pub synonyms: Vec<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of the last feed refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedState {
    NotLoaded,
    Downloading,
    Indexing,
    Success,
    Error,
}

impl FeedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedState::NotLoaded => "not_loaded",
            FeedState::Downloading => "downloading",
            FeedState::Indexing => "indexing",
            FeedState::Success => "success",
            FeedState::Error => "error",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "downloading" => FeedState::Downloading,
            "indexing" => FeedState::Indexing,
            "success" => FeedState::Success,
            "error" => FeedState::Error,
            _ => FeedState::NotLoaded,
        }
    }
}

/// Last refresh outcome, stored as the `project:{p}:feed` hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedStatus {
    pub status: FeedState,
    pub last_update: Option<DateTime<Utc>>,
    pub products_count: u64,
    pub categories_count: u64,
    pub message: String,
    /// Coarse refresh progress in `[0, 100]`.
    pub progress: u8,
}

impl Default for FeedStatus {
    fn default() -> Self {
        Self {
            status: FeedState::NotLoaded,
            last_update: None,
            products_count: 0,
            categories_count: 0,
            message: String::new(),
            progress: 0,
        }
    }
}

impl FeedStatus {
    /// Flattens the status into hash fields for `HSET`.
    pub fn to_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("status".to_string(), self.status.as_str().to_string()),
            ("products_count".to_string(), self.products_count.to_string()),
            (
                "categories_count".to_string(),
                self.categories_count.to_string(),
            ),
            ("message".to_string(), self.message.clone()),
            ("progress".to_string(), self.progress.to_string()),
        ];
        if let Some(ts) = self.last_update {
            fields.push(("last_update".to_string(), ts.to_rfc3339()));
        }
        fields
    }

    /// Rebuilds the status from `HGETALL` output. Missing or malformed
    /// fields fall back to defaults; an empty hash reads as `not_loaded`.
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let mut status = FeedStatus::default();
        if let Some(s) = fields.get("status") {
            status.status = FeedState::parse(s);
        }
        if let Some(ts) = fields.get("last_update") {
            status.last_update = DateTime::parse_from_rfc3339(ts)
                .ok()
                .map(|dt| dt.with_timezone(&Utc));
        }
        if let Some(n) = fields.get("products_count") {
            status.products_count = n.parse().unwrap_or(0);
        }
        if let Some(n) = fields.get("categories_count") {
            status.categories_count = n.parse().unwrap_or(0);
        }
        if let Some(m) = fields.get("message") {
            status.message = m.clone();
        }
        if let Some(p) = fields.get("progress") {
            status.progress = p.parse().unwrap_or(0);
        }
        status
    }
}

/// Partial update applied by delta feeds: only commercial fields change,
/// the index structure stays as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockUpdate {
    pub id: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default, alias = "oldprice")]
    pub old_price: Option<f64>,
    #[serde(default, alias = "available")]
    pub in_stock: Option<bool>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_set_only_when_old_price_is_higher() {
        let mut p = Product {
            price: 80.0,
            old_price: Some(100.0),
            ..Default::default()
        };
        p.recompute_discount();
        assert_eq!(p.discount_percent, Some(20));

        p.old_price = Some(80.0);
        p.recompute_discount();
        assert_eq!(p.discount_percent, None);

        p.old_price = Some(100.0);
        p.price = 0.0;
        p.recompute_discount();
        assert_eq!(p.discount_percent, None);
    }

    #[test]
    fn product_deserializes_with_missing_optionals() {
        let p: Product = serde_json::from_str(r#"{"id":"x","name":"Widget"}"#).unwrap();
        assert!(p.in_stock);
        assert_eq!(p.currency, "RUB");
        assert_eq!(p.price, 0.0);
        assert!(p.params.is_empty());
    }

    #[test]
    fn feed_status_round_trips_through_hash_fields() {
        let status = FeedStatus {
            status: FeedState::Success,
            last_update: Some(Utc::now()),
            products_count: 42,
            categories_count: 7,
            message: String::new(),
            progress: 100,
        };
        let map: HashMap<String, String> = status.to_fields().into_iter().collect();
        let back = FeedStatus::from_fields(&map);
        assert_eq!(back.status, FeedState::Success);
        assert_eq!(back.products_count, 42);
        assert_eq!(back.categories_count, 7);
        assert!(back.last_update.is_some());
    }

    #[test]
    fn search_settings_accept_camel_case_json() {
        let s: SearchSettings = serde_json::from_str(
            r#"{"relatedProductsField":"brand","relatedProductsLimit":6}"#,
        )
        .unwrap();
        assert_eq!(s.related_products_field.as_deref(), Some("brand"));
        assert_eq!(s.related_products_limit, 6);
    }
}
