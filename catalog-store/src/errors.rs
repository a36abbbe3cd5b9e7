//! Error type shared by both storage backends.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("config error: {0}")]
    Config(String),

    #[error("kv error: {0}")]
    Kv(#[from] redis::RedisError),

    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
