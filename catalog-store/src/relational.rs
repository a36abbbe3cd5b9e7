//! PostgreSQL facade: durable truth for project metadata, product backups
//! and analytics.
//!
//! The schema is created on startup; columns added after the initial release
//! (`search_settings`, `synonyms`, `auto_update`) are migrated in with
//! guarded `DO $$` blocks so existing databases upgrade in place.

use crate::config::StoreConfig;
use crate::errors::StoreError;
use crate::models::{Product, Project, SearchSettings};
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id VARCHAR(32) PRIMARY KEY,
    email VARCHAR(255) UNIQUE NOT NULL,
    name VARCHAR(255) NOT NULL,
    password_hash VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS projects (
    id VARCHAR(32) PRIMARY KEY,
    user_id VARCHAR(32) REFERENCES users(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    domain VARCHAR(255) DEFAULT '',
    feed_url TEXT DEFAULT '',
    status VARCHAR(20) DEFAULT 'active',
    products_count INTEGER DEFAULT 0,
    widget_settings JSONB DEFAULT '{}',
    created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS api_keys (
    key VARCHAR(64) PRIMARY KEY,
    project_id VARCHAR(32) REFERENCES projects(id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_projects_user_id ON projects(user_id);
CREATE INDEX IF NOT EXISTS idx_api_keys_project_id ON api_keys(project_id);

DO $$
BEGIN
    IF NOT EXISTS (SELECT 1 FROM information_schema.columns
                   WHERE table_name='projects' AND column_name='search_settings') THEN
        ALTER TABLE projects ADD COLUMN search_settings JSONB DEFAULT '{}';
    END IF;
END $$;

DO $$
BEGIN
    IF NOT EXISTS (SELECT 1 FROM information_schema.columns
                   WHERE table_name='projects' AND column_name='synonyms') THEN
        ALTER TABLE projects ADD COLUMN synonyms JSONB DEFAULT '[]';
    END IF;
END $$;

DO $$
BEGIN
    IF NOT EXISTS (SELECT 1 FROM information_schema.columns
                   WHERE table_name='projects' AND column_name='auto_update') THEN
        ALTER TABLE projects ADD COLUMN auto_update BOOLEAN DEFAULT TRUE;
    END IF;
END $$;

CREATE TABLE IF NOT EXISTS products (
    id SERIAL PRIMARY KEY,
    project_id VARCHAR(32) REFERENCES projects(id) ON DELETE CASCADE,
    product_id VARCHAR(255) NOT NULL,
    data JSONB NOT NULL,
    created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(project_id, product_id)
);

CREATE INDEX IF NOT EXISTS idx_products_project_id ON products(project_id);

CREATE TABLE IF NOT EXISTS analytics_daily (
    id SERIAL PRIMARY KEY,
    project_id VARCHAR(32) REFERENCES projects(id) ON DELETE CASCADE,
    date DATE NOT NULL,
    queries_count INTEGER DEFAULT 0,
    clicks_count INTEGER DEFAULT 0,
    UNIQUE(project_id, date)
);

CREATE INDEX IF NOT EXISTS idx_analytics_daily_project_date ON analytics_daily(project_id, date);

CREATE TABLE IF NOT EXISTS analytics_totals (
    project_id VARCHAR(32) PRIMARY KEY REFERENCES projects(id) ON DELETE CASCADE,
    total_queries BIGINT DEFAULT 0,
    total_clicks BIGINT DEFAULT 0,
    updated_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS analytics_popular_queries (
    id SERIAL PRIMARY KEY,
    project_id VARCHAR(32) REFERENCES projects(id) ON DELETE CASCADE,
    query TEXT NOT NULL,
    count INTEGER DEFAULT 0,
    updated_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(project_id, query)
);

CREATE INDEX IF NOT EXISTS idx_analytics_popular_queries_project ON analytics_popular_queries(project_id);

CREATE TABLE IF NOT EXISTS analytics_popular_products (
    id SERIAL PRIMARY KEY,
    project_id VARCHAR(32) REFERENCES projects(id) ON DELETE CASCADE,
    product_id VARCHAR(255) NOT NULL,
    clicks INTEGER DEFAULT 0,
    updated_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(project_id, product_id)
);

CREATE INDEX IF NOT EXISTS idx_analytics_popular_products_project ON analytics_popular_products(project_id);

CREATE TABLE IF NOT EXISTS analytics_converting_queries (
    id SERIAL PRIMARY KEY,
    project_id VARCHAR(32) REFERENCES projects(id) ON DELETE CASCADE,
    query TEXT NOT NULL,
    clicks INTEGER DEFAULT 0,
    updated_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(project_id, query)
);

CREATE INDEX IF NOT EXISTS idx_analytics_converting_queries_project ON analytics_converting_queries(project_id);

INSERT INTO users (id, email, name, password_hash)
VALUES ('demo', 'demo@localhost', 'Demo', '')
ON CONFLICT (id) DO NOTHING;

INSERT INTO projects (id, user_id, name, domain)
VALUES ('demo', 'demo', 'Demo project', '')
ON CONFLICT (id) DO NOTHING;
"#;

const PROJECT_COLUMNS: &str = r"p.id, p.user_id, p.name, p.domain, p.feed_url, p.status,
       p.products_count, p.auto_update, p.widget_settings, p.search_settings,
       p.synonyms, p.created_at, a.key AS api_key";

/// Connection pool plus the query surface the service needs.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Opens the connection pool.
    ///
    /// # Errors
    /// Returns `StoreError::Sql` when the server is unreachable.
    pub async fn connect(cfg: &StoreConfig) -> Result<Self, StoreError> {
        info!(
            "Database::connect host={} db={}",
            cfg.postgres_host, cfg.postgres_db
        );
        let pool = PgPoolOptions::new()
            .max_connections(cfg.postgres_pool_size)
            .connect(&cfg.postgres_url())
            .await?;
        Ok(Self { pool })
    }

    /// Applies the startup schema, including the guarded column migrations
    /// and the reserved `demo` tenant.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        info!("Database::migrate: applying startup schema");
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    fn project_from_row(row: &PgRow) -> Result<Project, StoreError> {
        let widget_settings: serde_json::Value = row.try_get("widget_settings")?;
        let search_settings: serde_json::Value = row.try_get("search_settings")?;
        let synonyms: serde_json::Value = row.try_get("synonyms")?;
        Ok(Project {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            domain: row.try_get::<Option<String>, _>("domain")?.unwrap_or_default(),
            feed_url: row
                .try_get::<Option<String>, _>("feed_url")?
                .unwrap_or_default(),
            status: row
                .try_get::<Option<String>, _>("status")?
                .unwrap_or_else(|| "active".to_string()),
            products_count: row
                .try_get::<Option<i32>, _>("products_count")?
                .unwrap_or(0) as i64,
            api_key: row
                .try_get::<Option<String>, _>("api_key")?
                .unwrap_or_default(),
            auto_update: row.try_get::<Option<bool>, _>("auto_update")?.unwrap_or(true),
            widget_settings,
            search_settings: serde_json::from_value::<SearchSettings>(search_settings)
                .unwrap_or_default(),
            synonyms: serde_json::from_value(synonyms).unwrap_or_default(),
            created_at: row.try_get("created_at")?,
        })
    }

    pub async fn get_project(&self, project_id: &str) -> Result<Option<Project>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS}
             FROM projects p
             LEFT JOIN api_keys a ON a.project_id = p.id
             WHERE p.id = $1"
        ))
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::project_from_row).transpose()
    }

    pub async fn get_project_by_api_key(&self, api_key: &str) -> Result<Option<Project>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS}
             FROM api_keys a
             JOIN projects p ON p.id = a.project_id
             WHERE a.key = $1"
        ))
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::project_from_row).transpose()
    }

    /// All projects, newest first. The scheduler drives its cycle off this.
    pub async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS}
             FROM projects p
             LEFT JOIN api_keys a ON a.project_id = p.id
             ORDER BY p.created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::project_from_row).collect()
    }

    pub async fn update_products_count(
        &self,
        project_id: &str,
        count: i64,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE projects SET products_count = $1 WHERE id = $2")
            .bind(count as i32)
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_synonyms(
        &self,
        project_id: &str,
        synonyms: &[Vec<String>],
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE projects SET synonyms = $1 WHERE id = $2")
            .bind(serde_json::to_value(synonyms)?)
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Deletes the project row; derived rows cascade through foreign keys.
    pub async fn delete_project(&self, project_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replaces the product backup of a project in one transaction.
    pub async fn save_products_backup(
        &self,
        project_id: &str,
        products: &[Product],
    ) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM products WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
        for product in products {
            sqlx::query(
                "INSERT INTO products (project_id, product_id, data)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (project_id, product_id) DO UPDATE SET data = $3",
            )
            .bind(project_id)
            .bind(&product.id)
            .bind(serde_json::to_value(product)?)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        debug!(
            "Database::save_products_backup project={} products={}",
            project_id,
            products.len()
        );
        Ok(products.len())
    }

    /// Loads the backed-up product list for a one-shot index restore.
    pub async fn load_products_backup(&self, project_id: &str) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query("SELECT data FROM products WHERE project_id = $1")
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            let data: serde_json::Value = row.try_get("data")?;
            match serde_json::from_value::<Product>(data) {
                Ok(product) => products.push(product),
                Err(err) => debug!(
                    "Database::load_products_backup: skipping malformed row: {err}"
                ),
            }
        }
        Ok(products)
    }

    // ---- Analytics durability -------------------------------------------

    pub async fn increment_daily_queries(
        &self,
        project_id: &str,
        date: NaiveDate,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO analytics_daily (project_id, date, queries_count)
             VALUES ($1, $2, 1)
             ON CONFLICT (project_id, date)
             DO UPDATE SET queries_count = analytics_daily.queries_count + 1",
        )
        .bind(project_id)
        .bind(date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn increment_daily_clicks(
        &self,
        project_id: &str,
        date: NaiveDate,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO analytics_daily (project_id, date, clicks_count)
             VALUES ($1, $2, 1)
             ON CONFLICT (project_id, date)
             DO UPDATE SET clicks_count = analytics_daily.clicks_count + 1",
        )
        .bind(project_id)
        .bind(date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn increment_totals(
        &self,
        project_id: &str,
        queries: i64,
        clicks: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO analytics_totals (project_id, total_queries, total_clicks, updated_at)
             VALUES ($1, $2, $3, CURRENT_TIMESTAMP)
             ON CONFLICT (project_id)
             DO UPDATE SET total_queries = analytics_totals.total_queries + $2,
                           total_clicks = analytics_totals.total_clicks + $3,
                           updated_at = CURRENT_TIMESTAMP",
        )
        .bind(project_id)
        .bind(queries)
        .bind(clicks)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn increment_popular_query(
        &self,
        project_id: &str,
        query: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO analytics_popular_queries (project_id, query, count, updated_at)
             VALUES ($1, $2, 1, CURRENT_TIMESTAMP)
             ON CONFLICT (project_id, query)
             DO UPDATE SET count = analytics_popular_queries.count + 1,
                           updated_at = CURRENT_TIMESTAMP",
        )
        .bind(project_id)
        .bind(query)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn increment_popular_product(
        &self,
        project_id: &str,
        product_id: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO analytics_popular_products (project_id, product_id, clicks, updated_at)
             VALUES ($1, $2, 1, CURRENT_TIMESTAMP)
             ON CONFLICT (project_id, product_id)
             DO UPDATE SET clicks = analytics_popular_products.clicks + 1,
                           updated_at = CURRENT_TIMESTAMP",
        )
        .bind(project_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn increment_converting_query(
        &self,
        project_id: &str,
        query: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO analytics_converting_queries (project_id, query, clicks, updated_at)
             VALUES ($1, $2, 1, CURRENT_TIMESTAMP)
             ON CONFLICT (project_id, query)
             DO UPDATE SET clicks = analytics_converting_queries.clicks + 1,
                           updated_at = CURRENT_TIMESTAMP",
        )
        .bind(project_id)
        .bind(query)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
