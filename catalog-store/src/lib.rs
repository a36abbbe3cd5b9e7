//! Storage facade for the product search service.
//!
//! Two backends with distinct roles:
//! - a key-value store (Redis) holding the derived serving copy: product
//!   records, inverted/n-gram/suggestion indexes, feed status, locks,
//!   analytics counters and the API-key cache;
//! - a relational store (PostgreSQL) holding durable truth: users, projects,
//!   API keys, the product backup and analytics durability.
//!
//! Consumers depend on the [`KvStore`] capability trait, not on a client:
//! production wires [`RedisStore`], tests wire [`MemoryStore`].

mod config;
mod errors;
mod facade;
pub mod keys;
mod kv;
mod memory;
mod models;
mod redis_store;
mod relational;

pub use config::StoreConfig;
pub use errors::StoreError;
pub use facade::DataStore;
pub use kv::{KvCommand, KvStore};
pub use memory::MemoryStore;
pub use models::{FeedState, FeedStatus, Product, Project, SearchSettings, StockUpdate};
pub use redis_store::RedisStore;
pub use relational::Database;
