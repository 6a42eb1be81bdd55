use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const GALLERY_DATASET: &str = "gallery";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("cache payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub dataset: String,
    pub fetched_at: DateTime<Utc>,
    pub bytes: i64,
}

/// Time-boxed copies of fetched lists, keyed by dataset name. Whoever
/// mutates a dataset must call [`ListCache::invalidate`].
pub struct ListCache {
    pool: SqlitePool,
    ttl: Duration,
}

impl ListCache {
    pub async fn new(database_url: &str, ttl: Duration) -> Result<Self, CacheError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // One long-lived connection, so `sqlite::memory:` behaves like a file.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool, ttl })
    }

    pub async fn run_migrations(&self) -> Result<(), CacheError> {
        let schema = include_str!("../schema.sql");
        sqlx::query(schema).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, dataset: &str) -> Result<Option<T>, CacheError> {
        self.get_at(dataset, Utc::now()).await
    }

    async fn get_at<T: DeserializeOwned>(
        &self,
        dataset: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<T>, CacheError> {
        let row = sqlx::query("SELECT payload, fetched_at FROM list_cache WHERE dataset = ?")
            .bind(dataset)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            debug!("Cache miss for {}", dataset);
            return Ok(None);
        };
        let payload: String = row.get(0);
        let fetched_at: i64 = row.get(1);

        let age_ms = now.timestamp_millis().saturating_sub(fetched_at);
        if age_ms < 0 || age_ms as u128 >= self.ttl.as_millis() {
            debug!("Cache entry for {} is stale ({} ms old)", dataset, age_ms);
            return Ok(None);
        }

        match serde_json::from_str(&payload) {
            Ok(value) => {
                debug!("Cache hit for {}", dataset);
                Ok(Some(value))
            }
            Err(e) => {
                warn!("Dropping unreadable cache entry for {}: {}", dataset, e);
                self.invalidate(dataset).await?;
                Ok(None)
            }
        }
    }

    pub async fn put<T: Serialize>(&self, dataset: &str, value: &T) -> Result<(), CacheError> {
        self.put_at(dataset, value, Utc::now()).await
    }

    async fn put_at<T: Serialize>(
        &self,
        dataset: &str,
        value: &T,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let payload = serde_json::to_string(value)?;
        sqlx::query(
            "INSERT INTO list_cache (dataset, payload, fetched_at) VALUES (?, ?, ?)
             ON CONFLICT(dataset) DO UPDATE SET payload=excluded.payload, fetched_at=excluded.fetched_at",
        )
        .bind(dataset)
        .bind(payload)
        .bind(fetched_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn invalidate(&self, dataset: &str) -> Result<(), CacheError> {
        sqlx::query("DELETE FROM list_cache WHERE dataset = ?")
            .bind(dataset)
            .execute(&self.pool)
            .await?;
        debug!("Invalidated cache entry for {}", dataset);
        Ok(())
    }

    pub async fn entries(&self) -> Result<Vec<CacheEntry>, CacheError> {
        let rows = sqlx::query(
            "SELECT dataset, fetched_at, length(payload) FROM list_cache ORDER BY dataset ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CacheEntry {
                dataset: row.get(0),
                fetched_at: DateTime::from_timestamp_millis(row.get(1)).unwrap_or_default(),
                bytes: row.get(2),
            })
            .collect())
    }
}
