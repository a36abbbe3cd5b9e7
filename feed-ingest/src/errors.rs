//! Feed pipeline error type.

use catalog_store::StoreError;
use product_indexer::IndexError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("invalid feed url: {0}")]
    InvalidUrl(String),

    #[error("failed to download feed: HTTP {0}")]
    HttpStatus(u16),

    #[error("feed download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("feed too large: {0} bytes")]
    TooLarge(usize),

    #[error("feed has too many offers (limit {0})")]
    TooManyProducts(usize),

    #[error("feed parse error: {0}")]
    Parse(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),
}
