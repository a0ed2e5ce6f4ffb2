use std::time::Duration;

use chrono::Utc;
use logoscout_core::error::AppError;
use logoscout_core::models::NewCacheEntry;
use sqlx::SqlitePool;

/// Append-only page cache in SQLite.
///
/// `store` never replaces rows, so multiple entries per domain accumulate
/// over time; `lookup` serves the most recent entry still inside the caller's
/// freshness window. Concurrent stores of the same domain simply produce two
/// rows — accepted, per the cache contract.
#[derive(Clone)]
pub struct PageCacheRepository {
    pool: SqlitePool,
}

impl PageCacheRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The cached body for `domain` retrieved no longer than `max_age` ago,
    /// or `None` — absence is not an error.
    pub async fn lookup(&self, domain: &str, max_age: Duration) -> Result<Option<String>, AppError> {
        let cutoff = Utc::now().timestamp() - max_age.as_secs() as i64;
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT html FROM site_cache
             WHERE domain = ?1 AND retrieved >= ?2
             ORDER BY retrieved DESC
             LIMIT 1",
        )
        .bind(domain)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::CacheError(e.to_string()))?;

        Ok(row.map(|(html,)| html))
    }

    /// Append one fetched page. Unix-second granularity on `retrieved`.
    pub async fn store(&self, entry: &NewCacheEntry) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO site_cache (domain, html, status, retrieved)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&entry.domain)
        .bind(&entry.body)
        .bind(i64::from(entry.status))
        .bind(entry.retrieved_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::CacheError(e.to_string()))?;

        Ok(())
    }
}

// -- Trait implementation --

impl logoscout_core::traits::PageCache for PageCacheRepository {
    async fn lookup(&self, domain: &str, max_age: Duration) -> Result<Option<String>, AppError> {
        PageCacheRepository::lookup(self, domain, max_age).await
    }

    async fn store(&self, entry: &NewCacheEntry) -> Result<(), AppError> {
        PageCacheRepository::store(self, entry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    async fn test_db(dir: &tempfile::TempDir) -> Database {
        let db = Database::connect(&dir.path().join("websites.sqlite"))
            .await
            .unwrap();
        db.init_schema().await.unwrap();
        db
    }

    fn entry(domain: &str, body: &str, age_secs: i64) -> NewCacheEntry {
        NewCacheEntry {
            domain: domain.to_string(),
            body: body.to_string(),
            status: 200,
            retrieved_at: Utc::now() - chrono::Duration::seconds(age_secs),
        }
    }

    #[tokio::test]
    async fn round_trip_within_window() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_db(&dir).await.page_cache();

        cache.store(&entry("example.com", "<html>hi</html>", 0)).await.unwrap();
        let body = cache
            .lookup("example.com", Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(body.as_deref(), Some("<html>hi</html>"));
    }

    #[tokio::test]
    async fn expired_entry_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_db(&dir).await.page_cache();

        cache
            .store(&entry("example.com", "<html>old</html>", 7200))
            .await
            .unwrap();
        let body = cache
            .lookup("example.com", Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(body, None);
    }

    #[tokio::test]
    async fn unknown_domain_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_db(&dir).await.page_cache();

        let body = cache
            .lookup("never-seen.com", Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(body, None);
    }

    #[tokio::test]
    async fn most_recent_entry_wins() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_db(&dir).await.page_cache();

        cache
            .store(&entry("example.com", "<html>older</html>", 120))
            .await
            .unwrap();
        cache
            .store(&entry("example.com", "<html>newer</html>", 10))
            .await
            .unwrap();

        let body = cache
            .lookup("example.com", Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(body.as_deref(), Some("<html>newer</html>"));
    }

    #[tokio::test]
    async fn store_is_append_only() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir).await;
        let cache = db.page_cache();

        cache.store(&entry("example.com", "<html>a</html>", 20)).await.unwrap();
        cache.store(&entry("example.com", "<html>b</html>", 10)).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM site_cache WHERE domain = ?1")
            .bind("example.com")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn init_schema_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir).await;
        db.init_schema().await.unwrap();
        db.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_stores_and_lookups_do_not_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_db(&dir).await.page_cache();

        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let domain = format!("site{}.example", i % 2);
                cache
                    .store(&entry(&domain, "<html>race</html>", 0))
                    .await
                    .unwrap();
                cache
                    .lookup(&domain, Duration::from_secs(3600))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let body = cache
            .lookup("site0.example", Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(body.as_deref(), Some("<html>race</html>"));
    }
}
