use std::path::Path;
use std::time::Duration;

use logoscout_core::AppError;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::cache_repository::PageCacheRepository;

/// Central database facade — owns the SQLite pool, initializes the schema,
/// and vends repository instances.
///
/// The handle is cheap to clone and explicitly passed to whoever needs it;
/// its lifecycle (open at run start, close at run end or on interrupt) is the
/// caller's.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the SQLite file at `path`.
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| AppError::CacheError(format!("Failed to open cache db: {e}")))?;

        tracing::debug!(path = %path.display(), "Opened cache db");
        Ok(Self { pool })
    }

    /// Create a `Database` from an existing pool (useful for testing).
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the cache table and index. Safe to call on every process start.
    pub async fn init_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS site_cache (
                domain TEXT NOT NULL,
                html TEXT NOT NULL,
                status INTEGER NOT NULL,
                retrieved INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::CacheError(format!("Failed to initialize schema: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_site_cache_domain_retrieved
             ON site_cache (domain, retrieved)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::CacheError(format!("Failed to create index: {e}")))?;

        Ok(())
    }

    /// Get a [`PageCacheRepository`] backed by this pool.
    pub fn page_cache(&self) -> PageCacheRepository {
        PageCacheRepository::new(self.pool.clone())
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, waiting for in-flight cache calls to finish.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
