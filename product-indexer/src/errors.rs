//! Indexer error type.

use catalog_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("no relational backup configured")]
    NoBackup,
}
