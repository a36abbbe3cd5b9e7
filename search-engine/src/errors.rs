//! Search error type.

use catalog_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
