use super::{DbPool, Session, SessionRow};
use crate::models::DEFAULT_ID;
use crate::utils::error::StoreError;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error};

/// Last-access bookkeeping used to pick broadcast recipients.
pub struct SessionTracker {
    pool: DbPool,
    recency_window: Duration,
}

fn unavailable(op: &str, e: sqlx::Error) -> StoreError {
    error!("Session {} failed: {}", op, e);
    StoreError::Unavailable(e)
}

impl SessionTracker {
    pub async fn init(pool: DbPool, recency_days: u32) -> Result<Self, StoreError> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS session (
                id TEXT PRIMARY KEY NOT NULL,
                config TEXT NOT NULL,
                last_access INTEGER NOT NULL
            )"#,
        )
        .execute(pool.get_pool())
        .await
        .map_err(|e| unavailable("init", e))?;

        Ok(Self {
            pool,
            recency_window: Duration::days(i64::from(recency_days)),
        })
    }

    /// Record an access by `user_id` now.
    pub async fn touch(&self, user_id: &str, config_tag: &str) -> Result<(), StoreError> {
        self.touch_at(user_id, config_tag, Utc::now()).await
    }

    /// Record an access at `at`. `last_access` never moves backwards, even if
    /// an older timestamp arrives late.
    pub async fn touch_at(
        &self,
        user_id: &str,
        config_tag: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO session (id, config, last_access) VALUES (?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   config = excluded.config,
                   last_access = MAX(session.last_access, excluded.last_access)"#,
        )
        .bind(user_id)
        .bind(config_tag)
        .bind(at.timestamp_millis())
        .execute(self.pool.get_pool())
        .await
        .map_err(|e| unavailable("touch", e))?;

        debug!("Session touched for {}", user_id);
        Ok(())
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<Session>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, config, last_access FROM session WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool.get_pool())
        .await
        .map_err(|e| unavailable("get", e))?;

        row.map(|row| {
            Session::try_from(row).inspect_err(|e| error!("Session row unreadable: {}", e))
        })
        .transpose()
    }

    /// Known user ids, DEFAULT excluded, ordered by id.
    pub async fn list_ids(&self, recent_only: bool) -> Result<Vec<String>, StoreError> {
        self.list_ids_at(recent_only, Utc::now()).await
    }

    /// Same as [`list_ids`](Self::list_ids) with the recency window ending at `now`.
    pub async fn list_ids_at(
        &self,
        recent_only: bool,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        let ids = if recent_only {
            let cutoff = (now - self.recency_window).timestamp_millis();
            sqlx::query_scalar::<_, String>(
                "SELECT id FROM session WHERE id != ? AND last_access > ? ORDER BY id",
            )
            .bind(DEFAULT_ID)
            .bind(cutoff)
            .fetch_all(self.pool.get_pool())
            .await
        } else {
            sqlx::query_scalar::<_, String>("SELECT id FROM session WHERE id != ? ORDER BY id")
                .bind(DEFAULT_ID)
                .fetch_all(self.pool.get_pool())
                .await
        }
        .map_err(|e| unavailable("list", e))?;

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn tracker() -> SessionTracker {
        let pool = DbPool::in_memory().await.unwrap();
        SessionTracker::init(pool, 30).await.unwrap()
    }

    #[tokio::test]
    async fn test_touch_upserts() {
        let tracker = tracker().await;
        tracker.touch("alice", "TEST001").await.unwrap();
        tracker.touch("alice", "TEST002").await.unwrap();

        let session = tracker.get("alice").await.unwrap().unwrap();
        assert_eq!(session.config_tag, "TEST002");
        assert_eq!(tracker.list_ids(false).await.unwrap(), vec!["alice"]);
    }

    #[tokio::test]
    async fn test_last_access_is_monotonic() {
        let tracker = tracker().await;
        let now = Utc::now();
        let earlier = now - Duration::hours(1);

        tracker.touch_at("bob", "TEST001", now).await.unwrap();
        tracker.touch_at("bob", "TEST001", earlier).await.unwrap();

        let session = tracker.get("bob").await.unwrap().unwrap();
        assert_eq!(session.last_access.timestamp_millis(), now.timestamp_millis());
    }

    #[tokio::test]
    async fn test_out_of_range_timestamp_is_reported() {
        let tracker = tracker().await;
        sqlx::query("INSERT INTO session (id, config, last_access) VALUES ('henry', 'TEST001', ?)")
            .bind(i64::MAX)
            .execute(tracker.pool.get_pool())
            .await
            .unwrap();

        let err = tracker.get("henry").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidTimestamp { ref id, millis } if id == "henry" && millis == i64::MAX
        ));
    }

    #[tokio::test]
    async fn test_list_excludes_default_sentinel() {
        let tracker = tracker().await;
        tracker.touch(DEFAULT_ID, "TEST001").await.unwrap();
        tracker.touch("carol", "TEST001").await.unwrap();

        assert_eq!(tracker.list_ids(false).await.unwrap(), vec!["carol"]);
        assert_eq!(tracker.list_ids(true).await.unwrap(), vec!["carol"]);
    }

    #[tokio::test]
    async fn test_recent_only_applies_window() {
        let tracker = tracker().await;
        let now = Utc::now();

        tracker.touch_at("active", "TEST001", now - Duration::days(2)).await.unwrap();
        tracker.touch_at("edge", "TEST001", now - Duration::days(29)).await.unwrap();
        tracker.touch_at("stale", "TEST001", now - Duration::days(31)).await.unwrap();

        assert_eq!(
            tracker.list_ids_at(true, now).await.unwrap(),
            vec!["active", "edge"]
        );
        assert_eq!(
            tracker.list_ids_at(false, now).await.unwrap(),
            vec!["active", "edge", "stale"]
        );
    }
}
