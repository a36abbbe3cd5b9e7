//! Backend connection configuration.

/// Connection settings for both stores.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_password: Option<String>,
    pub redis_db: u8,

    pub postgres_host: String,
    pub postgres_port: u16,
    pub postgres_user: String,
    pub postgres_password: String,
    pub postgres_db: String,
    pub postgres_pool_size: u32,
}

impl StoreConfig {
    /// Build `StoreConfig` from environment variables.
    ///
    /// Recognized vars:
    /// - REDIS_HOST (default: localhost), REDIS_PORT (default: 6379),
    ///   REDIS_PASSWORD (optional), REDIS_DB (default: 0)
    /// - POSTGRES_HOST (default: localhost), POSTGRES_PORT (default: 5432),
    ///   POSTGRES_USER (default: search), POSTGRES_PASSWORD,
    ///   POSTGRES_DB (default: search_service), POSTGRES_POOL_SIZE (default: 10)
    pub fn from_env() -> Self {
        use std::env;
        Self {
            redis_host: env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".into()),
            redis_port: env::var("REDIS_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(6379),
            redis_password: env::var("REDIS_PASSWORD").ok().filter(|s| !s.is_empty()),
            redis_db: env::var("REDIS_DB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            postgres_host: env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".into()),
            postgres_port: env::var("POSTGRES_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            postgres_user: env::var("POSTGRES_USER").unwrap_or_else(|_| "search".into()),
            postgres_password: env::var("POSTGRES_PASSWORD").unwrap_or_default(),
            postgres_db: env::var("POSTGRES_DB").unwrap_or_else(|_| "search_service".into()),
            postgres_pool_size: env::var("POSTGRES_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        }
    }

    pub fn redis_url(&self) -> String {
        let auth = match &self.redis_password {
            Some(password) => format!(":{password}@"),
            None => String::new(),
        };
        format!(
            "redis://{auth}{}:{}/{}",
            self.redis_host, self.redis_port, self.redis_db
        )
    }

    pub fn postgres_url(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.postgres_user,
            self.postgres_password,
            self.postgres_host,
            self.postgres_port,
            self.postgres_db
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_assembled_from_parts() {
        let cfg = StoreConfig {
            redis_host: "cache".into(),
            redis_port: 6380,
            redis_password: None,
            redis_db: 2,
            postgres_host: "db".into(),
            postgres_port: 5432,
            postgres_user: "search".into(),
            postgres_password: "secret".into(),
            postgres_db: "search_service".into(),
            postgres_pool_size: 10,
        };
        assert_eq!(cfg.redis_url(), "redis://cache:6380/2");
        assert_eq!(cfg.postgres_url(), "postgresql://search:secret@db:5432/search_service");
    }
}
