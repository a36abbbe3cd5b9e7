//! API surface configuration.

/// Build-time knobs of the HTTP surface and the shared text pipeline.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Signing key consumed by the external auth collaborator; carried here
    /// so one env file configures the whole deployment.
    pub jwt_secret: Option<String>,
    /// Prefix of issued API keys (key CRUD lives outside this service).
    pub api_key_prefix: String,
    /// Character window of the fuzzy-fallback n-grams.
    pub ngram_width: usize,
    /// Widget-facing cap on query suggestions.
    pub suggest_queries_cap: usize,
    /// Upper bound on the search page size.
    pub max_limit: usize,
    /// Deployment-specific stop-words on top of the baseline set.
    pub extra_stopwords: Vec<String>,
}

impl ApiConfig {
    /// Build `ApiConfig` from environment variables.
    ///
    /// Recognized vars:
    /// - API_HOST (default: 0.0.0.0), API_PORT (default: 8000)
    /// - JWT_SECRET (optional), API_KEY_PREFIX (default: sk_live_)
    /// - NGRAM_WIDTH (default: 3)
    /// - SUGGEST_QUERIES_CAP (default: 3)
    /// - SEARCH_MAX_LIMIT (default: 100)
    /// - STOPWORDS_EXTRA (optional, comma-separated)
    pub fn from_env() -> Self {
        use std::env;
        Self {
            host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            jwt_secret: env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
            api_key_prefix: env::var("API_KEY_PREFIX").unwrap_or_else(|_| "sk_live_".into()),
            ngram_width: env::var("NGRAM_WIDTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            suggest_queries_cap: env::var("SUGGEST_QUERIES_CAP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            max_limit: env::var("SEARCH_MAX_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            extra_stopwords: env::var("STOPWORDS_EXTRA")
                .map(|raw| {
                    raw.split(',')
                        .map(|w| w.trim().to_lowercase())
                        .filter(|w| !w.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}
