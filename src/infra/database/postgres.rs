//! PostgreSQL transaction store.

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

use crate::domain::{StoreError, TransactionRecord, TransactionStore};

/// PostgreSQL connection pool configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(3),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

/// [`TransactionStore`] over a pooled PostgreSQL connection.
pub struct PostgresTransactionStore {
    pool: PgPool,
}

impl PostgresTransactionStore {
    pub async fn new(database_url: &str, config: PostgresConfig) -> Result<Self, StoreError> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    pub async fn with_defaults(database_url: &str) -> Result<Self, StoreError> {
        Self::new(database_url, PostgresConfig::default()).await
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Records a transaction, updating the signed hash of an existing row.
    #[instrument(skip(self, record), fields(chain = %record.chain, unsigned_hash = %record.unsigned_hash))]
    pub async fn save(&self, record: &TransactionRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (unsigned_hash, chain, signed_hash, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (chain, unsigned_hash)
            DO UPDATE SET signed_hash = COALESCE(EXCLUDED.signed_hash, transactions.signed_hash)
            "#,
        )
        .bind(&record.unsigned_hash)
        .bind(&record.chain)
        .bind(&record.signed_hash)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<TransactionRecord, StoreError> {
        Ok(TransactionRecord {
            unsigned_hash: row.try_get("unsigned_hash")?,
            signed_hash: row.try_get("signed_hash")?,
            chain: row.try_get("chain")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl TransactionStore for PostgresTransactionStore {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_unsigned_hash(
        &self,
        chain: &str,
        unsigned_hash: &str,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT unsigned_hash, signed_hash, chain, created_at
            FROM transactions
            WHERE chain = $1 AND unsigned_hash = $2
            "#,
        )
        .bind(chain)
        .bind(unsigned_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }
}
