use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use tracing::debug;

use orderdesk_core::session::store::{expiry_after, SessionStore, StoreError};

use crate::DbPool;

/// `SessionStore` backed by the `session_entry` table. Expiry is stored as
/// unix milliseconds and enforced when a key is read.
pub struct SqlSessionStore {
    pool: DbPool,
}

impl SqlSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Deletes every expired row. Reads already ignore them, so this only
    /// reclaims space.
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM session_entry WHERE expires_at <= ?")
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }
}

fn backend(error: sqlx::Error) -> StoreError {
    StoreError::Backend(error.to_string())
}

#[async_trait]
impl SessionStore for SqlSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Utc::now().timestamp_millis();
        let row = sqlx::query("SELECT value, expires_at FROM session_entry WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let expires_at: i64 = row.try_get("expires_at").map_err(backend)?;
        if expires_at > now {
            return Ok(Some(row.try_get("value").map_err(backend)?));
        }

        sqlx::query("DELETE FROM session_entry WHERE key = ? AND expires_at <= ?")
            .bind(key)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        debug!(event_name = "session_store.entry.expired", key, "evicted expired session entry");
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), StoreError> {
        let expires_at = expiry_after(Utc::now(), ttl_secs).timestamp_millis();
        sqlx::query(
            "INSERT INTO session_entry (key, value, expires_at)
             VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM session_entry WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use orderdesk_core::session::store::SessionStore;
    use sqlx::Row;

    use super::SqlSessionStore;
    use crate::{connect_with_settings, migrations::run_pending, DbPool};

    async fn pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");
        pool
    }

    async fn row_count(pool: &DbPool) -> i64 {
        sqlx::query("SELECT COUNT(*) AS count FROM session_entry")
            .fetch_one(pool)
            .await
            .expect("count rows")
            .get::<i64, _>("count")
    }

    #[tokio::test]
    async fn set_get_overwrite_and_delete() {
        let store = SqlSessionStore::new(pool().await);

        store.set("session:a:order", "[]".to_string(), 3600).await.expect("set");
        store.set("session:a:order", "[1]".to_string(), 3600).await.expect("overwrite");
        assert_eq!(store.get("session:a:order").await.expect("get"), Some("[1]".to_string()));

        store.delete("session:a:order").await.expect("delete");
        assert_eq!(store.get("session:a:order").await.expect("get"), None);
    }

    #[tokio::test]
    async fn expired_rows_read_as_absent_and_are_removed() {
        let pool = pool().await;
        let store = SqlSessionStore::new(pool.clone());

        store.set("stale", "value".to_string(), 0).await.expect("set");
        store.set("fresh", "value".to_string(), 3600).await.expect("set");

        assert_eq!(store.get("stale").await.expect("get"), None);
        assert_eq!(row_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn purge_removes_only_expired_rows() {
        let pool = pool().await;
        let store = SqlSessionStore::new(pool.clone());

        store.set("a", "1".to_string(), 0).await.expect("set");
        store.set("b", "2".to_string(), 0).await.expect("set");
        store.set("c", "3".to_string(), 3600).await.expect("set");

        assert_eq!(store.purge_expired().await.expect("purge"), 2);
        assert_eq!(store.get("c").await.expect("get"), Some("3".to_string()));
    }

    #[tokio::test]
    async fn huge_ttl_saturates() {
        let store = SqlSessionStore::new(pool().await);
        store.set("forever", "v".to_string(), u64::MAX).await.expect("set");
        assert_eq!(store.get("forever").await.expect("get"), Some("v".to_string()));
    }
}
