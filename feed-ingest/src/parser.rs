//! Catalog feed parsing.
//!
//! The wire format is sniffed from the first non-whitespace byte: XML
//! (Yandex-Market-style YML, the primary format), JSON, or CSV. The XML
//! branch is a streaming pull-parse; state never outgrows one offer plus the
//! category map, which is what keeps 500 MB feeds inside a bounded heap.
//!
//! An item that fails to parse is logged and skipped; incomplete but
//! parseable offers (empty id or name) flow through with empty fields.
//! A malformed document is fatal and bubbles to the feed manager.

use crate::errors::FeedError;
use catalog_store::{Product, StockUpdate};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;
use tracing::{debug, warn};

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("static regex"))
}

/// Strips markup and collapses whitespace in feed-supplied text.
fn clean_text(text: &str) -> String {
    let stripped = tag_re().replace_all(text, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Numeric field cleaning: comma decimal separators and embedded spaces are
/// tolerated, anything unparseable reads as 0.
fn parse_price(text: &str) -> f64 {
    parse_price_opt(text).unwrap_or(0.0)
}

fn parse_price_opt(text: &str) -> Option<f64> {
    let cleaned: String = text
        .replace(',', ".")
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse().ok()
}

fn parse_bool(text: &str) -> bool {
    matches!(
        text.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "в наличии" | "available"
    )
}

/// Parse result: category map plus the product list, in feed order.
#[derive(Debug, Default)]
pub struct ParsedFeed {
    pub shop_name: String,
    pub categories: HashMap<String, String>,
    pub products: Vec<Product>,
}

/// Offer element under construction.
#[derive(Debug, Default)]
struct OfferDraft {
    id: String,
    available: bool,
    name: String,
    type_prefix: String,
    vendor: String,
    model: String,
    price: String,
    old_price: String,
    currency: String,
    category_id: String,
    url: String,
    pictures: Vec<String>,
    description: String,
    vendor_code: String,
    params: BTreeMap<String, String>,
    quantity: String,
}

impl OfferDraft {
    fn from_attrs(start: &BytesStart) -> Self {
        let mut draft = OfferDraft {
            available: true,
            ..Default::default()
        };
        for attr in start.attributes().flatten() {
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_default();
            match attr.key.as_ref() {
                b"id" => draft.id = value,
                b"available" => draft.available = parse_bool(&value),
                _ => {}
            }
        }
        draft
    }

    fn append(&mut self, field: &str, param_name: Option<&str>, text: &str) {
        match field {
            "name" => self.name.push_str(text),
            "typePrefix" => self.type_prefix.push_str(text),
            "vendor" => self.vendor.push_str(text),
            "model" => self.model.push_str(text),
            "price" => self.price.push_str(text),
            "oldprice" | "old_price" => self.old_price.push_str(text),
            "currencyId" => self.currency.push_str(text),
            "categoryId" => self.category_id.push_str(text),
            "url" => self.url.push_str(text),
            "picture" => match self.pictures.last_mut() {
                Some(last) => last.push_str(text),
                None => self.pictures.push(text.to_string()),
            },
            "description" => self.description.push_str(text),
            "vendorCode" => self.vendor_code.push_str(text),
            "quantity" => self.quantity.push_str(text),
            "param" => {
                if let Some(name) = param_name {
                    self.params
                        .entry(name.to_string())
                        .or_default()
                        .push_str(text);
                }
            }
            _ => {}
        }
    }

    /// Finalizes the draft. Empty ids and names pass through as empty
    /// fields; skipping is reserved for parse failures, which surface
    /// before this point.
    fn build(self, categories: &HashMap<String, String>) -> Product {
        let id = self.id.trim().to_string();

        let mut name = clean_text(&self.name);
        if name.is_empty() {
            name = [&self.type_prefix, &self.vendor, &self.model]
                .iter()
                .map(|part| part.trim())
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
        }

        let category = categories
            .get(self.category_id.trim())
            .cloned()
            .unwrap_or_default();

        let mut product = Product {
            id,
            name,
            url: self.url.trim().to_string(),
            description: clean_text(&self.description),
            image: self
                .pictures
                .first()
                .map(|p| p.trim().to_string())
                .unwrap_or_default(),
            images: self
                .pictures
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            price: parse_price(&self.price),
            old_price: parse_price_opt(&self.old_price),
            currency: if self.currency.trim().is_empty() {
                "RUB".to_string()
            } else {
                self.currency.trim().to_string()
            },
            in_stock: self.available,
            quantity: self.quantity.trim().parse().ok(),
            category,
            brand: self.vendor.trim().to_string(),
            vendor_code: self.vendor_code.trim().to_string(),
            params: self.params,
            discount_percent: None,
            popularity: None,
        };
        product.recompute_discount();
        product
    }
}

/// Format-sniffing feed parser.
pub struct FeedParser {
    max_products: usize,
}

impl FeedParser {
    pub fn new(max_products: usize) -> Self {
        Self { max_products }
    }

    /// Parses a feed buffer, dispatching on the leading byte.
    ///
    /// # Errors
    /// `FeedError::Parse` for malformed documents,
    /// `FeedError::TooManyProducts` past the offer cap.
    pub fn parse(&self, content: &[u8]) -> Result<ParsedFeed, FeedError> {
        match leading_byte(content) {
            Some(b'<') => self.parse_xml(content),
            Some(b'{') | Some(b'[') => self.parse_json(content),
            Some(_) => self.parse_csv(content),
            None => Err(FeedError::Parse("empty feed".to_string())),
        }
    }

    fn parse_xml(&self, content: &[u8]) -> Result<ParsedFeed, FeedError> {
        let mut reader = Reader::from_reader(content);
        reader.config_mut().trim_text(true);

        let mut feed = ParsedFeed::default();
        let mut buf = Vec::new();

        // Offer-local state; cleared at each </offer> so memory stays flat.
        let mut offer: Option<OfferDraft> = None;
        let mut field: Option<String> = None;
        let mut param_name: Option<String> = None;

        let mut category_id: Option<String> = None;
        let mut category_name = String::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(start)) => {
                    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                    match tag.as_str() {
                        "offer" => {
                            offer = Some(OfferDraft::from_attrs(&start));
                            field = None;
                        }
                        "category" => {
                            category_id = attr_value(&start, b"id");
                            category_name.clear();
                        }
                        _ if offer.is_some() => {
                            if tag == "param" {
                                param_name = attr_value(&start, b"name");
                            }
                            field = Some(tag);
                        }
                        "name" if feed.shop_name.is_empty() => {
                            field = Some("shop_name".to_string());
                        }
                        _ => {}
                    }
                }
                Ok(Event::Text(text)) => {
                    let text = match text.unescape() {
                        Ok(unescaped) => unescaped.into_owned(),
                        Err(_) => String::from_utf8_lossy(&text).into_owned(),
                    };
                    if category_id.is_some() {
                        category_name.push_str(&text);
                    } else if let (Some(draft), Some(field)) = (offer.as_mut(), field.as_deref()) {
                        draft.append(field, param_name.as_deref(), &text);
                    } else if field.as_deref() == Some("shop_name") {
                        feed.shop_name.push_str(text.trim());
                    }
                }
                Ok(Event::End(end)) => match end.name().as_ref() {
                    b"offer" => {
                        if let Some(draft) = offer.take() {
                            feed.products.push(draft.build(&feed.categories));
                            if feed.products.len() > self.max_products {
                                return Err(FeedError::TooManyProducts(self.max_products));
                            }
                        }
                        field = None;
                        param_name = None;
                    }
                    b"category" => {
                        if let Some(id) = category_id.take() {
                            feed.categories.insert(id, category_name.trim().to_string());
                        }
                    }
                    b"param" => {
                        param_name = None;
                        field = None;
                    }
                    _ => {
                        field = None;
                    }
                },
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => {
                    return Err(FeedError::Parse(format!(
                        "malformed xml at byte {}: {err}",
                        reader.buffer_position()
                    )));
                }
            }
            buf.clear();
        }

        debug!(
            "FeedParser::parse_xml products={} categories={}",
            feed.products.len(),
            feed.categories.len()
        );
        Ok(feed)
    }

    fn parse_json(&self, content: &[u8]) -> Result<ParsedFeed, FeedError> {
        let value: serde_json::Value =
            serde_json::from_slice(content).map_err(|err| FeedError::Parse(err.to_string()))?;

        let items = match &value {
            serde_json::Value::Array(items) => items.clone(),
            serde_json::Value::Object(map) => ["products", "items", "offers", "data"]
                .iter()
                .find_map(|key| map.get(*key).and_then(|v| v.as_array()).cloned())
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        let mut feed = ParsedFeed::default();
        for item in items {
            match serde_json::from_value::<Product>(item) {
                Ok(mut product) => {
                    product.recompute_discount();
                    feed.products.push(product);
                    if feed.products.len() > self.max_products {
                        return Err(FeedError::TooManyProducts(self.max_products));
                    }
                }
                Err(err) => {
                    warn!("FeedParser: skipping malformed json item: {err}");
                }
            }
        }
        Ok(feed)
    }

    fn parse_csv(&self, content: &[u8]) -> Result<ParsedFeed, FeedError> {
        let text = String::from_utf8_lossy(content);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());
        let headers = reader
            .headers()
            .map_err(|err| FeedError::Parse(err.to_string()))?
            .clone();

        let mut feed = ParsedFeed::default();
        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(err) => {
                    warn!("FeedParser: skipping malformed csv row: {err}");
                    continue;
                }
            };
            let get = |name: &str| {
                headers
                    .iter()
                    .position(|h| h == name)
                    .and_then(|i| record.get(i))
                    .unwrap_or("")
                    .trim()
                    .to_string()
            };

            let in_stock_raw = get("in_stock");
            let mut product = Product {
                id: get("id"),
                name: clean_text(&get("name")),
                url: get("url"),
                description: clean_text(&get("description")),
                image: get("image"),
                price: parse_price(&get("price")),
                old_price: parse_price_opt(&get("old_price")),
                in_stock: in_stock_raw.is_empty() || parse_bool(&in_stock_raw),
                category: get("category"),
                brand: get("brand"),
                vendor_code: get("vendor_code"),
                ..Default::default()
            };
            product.recompute_discount();
            feed.products.push(product);
            if feed.products.len() > self.max_products {
                return Err(FeedError::TooManyProducts(self.max_products));
            }
        }
        Ok(feed)
    }

    /// Delta-feed parse: only commercial fields, keyed by offer id.
    pub fn parse_stock_updates(&self, content: &[u8]) -> Result<Vec<StockUpdate>, FeedError> {
        match leading_byte(content) {
            Some(b'<') => self.parse_xml_stock_updates(content),
            Some(b'{') | Some(b'[') => self.parse_json_stock_updates(content),
            _ => Err(FeedError::Parse("unsupported delta feed format".to_string())),
        }
    }

    fn parse_xml_stock_updates(&self, content: &[u8]) -> Result<Vec<StockUpdate>, FeedError> {
        let feed = self.parse_xml(content)?;
        // Delta entries are keyed by id; unlike full-feed offers, ones
        // without an id have nothing to update and are dropped.
        Ok(feed
            .products
            .into_iter()
            .filter(|product| !product.id.is_empty())
            .map(|product| StockUpdate {
                id: product.id,
                price: Some(product.price),
                old_price: product.old_price,
                in_stock: Some(product.in_stock),
                quantity: product.quantity,
            })
            .collect())
    }

    fn parse_json_stock_updates(&self, content: &[u8]) -> Result<Vec<StockUpdate>, FeedError> {
        let value: serde_json::Value =
            serde_json::from_slice(content).map_err(|err| FeedError::Parse(err.to_string()))?;
        let items = match &value {
            serde_json::Value::Array(items) => items.clone(),
            serde_json::Value::Object(map) => ["items", "products", "offers"]
                .iter()
                .find_map(|key| map.get(*key).and_then(|v| v.as_array()).cloned())
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<StockUpdate>(item).ok())
            .filter(|update| !update.id.is_empty())
            .collect())
    }
}

fn leading_byte(content: &[u8]) -> Option<u8> {
    content
        .iter()
        .find(|byte| !byte.is_ascii_whitespace())
        .copied()
}

fn attr_value(start: &BytesStart, name: &[u8]) -> Option<String> {
    start.attributes().flatten().find_map(|attr| {
        if attr.key.as_ref() == name {
            Some(
                attr.unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_default(),
            )
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const YML_FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<yml_catalog date="2024-01-15 10:00">
  <shop>
    <name>Магазин электроники</name>
    <categories>
      <category id="1">Смартфоны</category>
      <category id="2" parentId="1">Наушники</category>
    </categories>
    <offers>
      <offer id="iphone-15" available="true">
        <name>Apple iPhone 15 Pro 256GB</name>
        <price>119 990,50</price>
        <oldprice>129990</oldprice>
        <currencyId>RUB</currencyId>
        <categoryId>1</categoryId>
        <url>https://shop.example/iphone-15</url>
        <picture>https://cdn.example/iphone-main.jpg</picture>
        <picture>https://cdn.example/iphone-side.jpg</picture>
        <description>Флагман с чипом A17 Pro. &lt;b&gt;Титановый корпус&lt;/b&gt;</description>
        <vendor>Apple</vendor>
        <vendorCode>MTV03</vendorCode>
        <param name="Цвет">Титановый</param>
        <param name="Память">256 ГБ</param>
      </offer>
      <offer id="airpods" available="false">
        <typePrefix>Наушники</typePrefix>
        <vendor>Apple</vendor>
        <model>AirPods Pro 2</model>
        <price>24990</price>
        <categoryId>2</categoryId>
        <url>https://shop.example/airpods</url>
      </offer>
      <offer id="" available="true">
        <name>Безымянный мусор</name>
      </offer>
    </offers>
  </shop>
</yml_catalog>"#;

    #[test]
    fn yml_offers_are_extracted_with_all_fields() {
        let parser = FeedParser::new(1_000_000);
        let feed = parser.parse(YML_FIXTURE.as_bytes()).unwrap();

        assert_eq!(feed.shop_name, "Магазин электроники");
        assert_eq!(feed.categories.len(), 2);
        assert_eq!(feed.products.len(), 3);

        let iphone = &feed.products[0];
        assert_eq!(iphone.id, "iphone-15");
        assert_eq!(iphone.name, "Apple iPhone 15 Pro 256GB");
        assert_eq!(iphone.price, 119_990.50);
        assert_eq!(iphone.old_price, Some(129_990.0));
        assert_eq!(iphone.currency, "RUB");
        assert_eq!(iphone.category, "Смартфоны");
        assert_eq!(iphone.image, "https://cdn.example/iphone-main.jpg");
        assert_eq!(iphone.images.len(), 2);
        assert_eq!(iphone.brand, "Apple");
        assert_eq!(iphone.vendor_code, "MTV03");
        assert_eq!(iphone.params.get("Цвет").unwrap(), "Титановый");
        assert_eq!(iphone.params.get("Память").unwrap(), "256 ГБ");
        assert!(iphone.in_stock);
        assert_eq!(iphone.discount_percent, Some(8));
        // Markup in descriptions is stripped.
        assert_eq!(iphone.description, "Флагман с чипом A17 Pro. Титановый корпус");
    }

    #[test]
    fn name_falls_back_to_prefix_vendor_model() {
        let parser = FeedParser::new(1_000_000);
        let feed = parser.parse(YML_FIXTURE.as_bytes()).unwrap();
        let airpods = &feed.products[1];
        assert_eq!(airpods.name, "Наушники Apple AirPods Pro 2");
        assert!(!airpods.in_stock);
        assert_eq!(airpods.category, "Наушники");
    }

    #[test]
    fn offer_without_id_passes_through() {
        let parser = FeedParser::new(1_000_000);
        let feed = parser.parse(YML_FIXTURE.as_bytes()).unwrap();
        // Only a parse failure skips an offer; a missing id is data, not an
        // error, and flows through as an empty field.
        let orphan = &feed.products[2];
        assert_eq!(orphan.id, "");
        assert_eq!(orphan.name, "Безымянный мусор");
    }

    #[test]
    fn zero_offer_feed_parses_cleanly() {
        let parser = FeedParser::new(1_000_000);
        let feed = parser
            .parse(b"<yml_catalog><shop><offers></offers></shop></yml_catalog>")
            .unwrap();
        assert!(feed.products.is_empty());
    }

    #[test]
    fn malformed_document_is_fatal() {
        let parser = FeedParser::new(1_000_000);
        let result =
            parser.parse(b"<yml_catalog><shop><offers><offer id=\"x\"></wrong></offers></shop></yml_catalog>");
        assert!(matches!(result, Err(FeedError::Parse(_))));
    }

    #[test]
    fn offer_cap_is_enforced() {
        let parser = FeedParser::new(1);
        let xml = r#"<o><offers>
            <offer id="a"><name>A</name></offer>
            <offer id="b"><name>B</name></offer>
        </offers></o>"#;
        assert!(matches!(
            parser.parse(xml.as_bytes()),
            Err(FeedError::TooManyProducts(1))
        ));
    }

    #[test]
    fn json_feed_is_sniffed_and_parsed() {
        let parser = FeedParser::new(1_000_000);
        let feed = parser
            .parse(br#"{"products":[{"id":"x","name":"Widget","price":10.5}]}"#)
            .unwrap();
        assert_eq!(feed.products.len(), 1);
        assert_eq!(feed.products[0].price, 10.5);
    }

    #[test]
    fn csv_feed_maps_headered_columns() {
        let parser = FeedParser::new(1_000_000);
        let feed = parser
            .parse(b"id,name,price,in_stock\nsku-1,Socks,99,true\n,NoId,5,true\n")
            .unwrap();
        assert_eq!(feed.products.len(), 2);
        assert_eq!(feed.products[0].id, "sku-1");
        assert_eq!(feed.products[0].price, 99.0);
        assert_eq!(feed.products[1].id, "");
        assert_eq!(feed.products[1].name, "NoId");
    }

    #[test]
    fn price_cleaning_tolerates_commas_and_junk() {
        assert_eq!(parse_price("1 234,56"), 1234.56);
        assert_eq!(parse_price("12990 руб."), 12990.0);
        assert_eq!(parse_price("договорная"), 0.0);
        assert_eq!(parse_price_opt(""), None);
    }

    #[test]
    fn delta_feed_yields_stock_updates() {
        let parser = FeedParser::new(1_000_000);
        let updates = parser
            .parse_stock_updates(
                br#"[{"id":"a","price":5.0,"in_stock":false},{"id":"","price":1.0}]"#,
            )
            .unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].in_stock, Some(false));
    }
}
