use super::{DbPool, HistoryRow};
use crate::models::{Transcript, DEFAULT_ID};
use crate::utils::error::StoreError;
use tracing::{debug, error, warn};

/// Durable per-user transcripts, keyed by user id.
///
/// The DEFAULT seed is written (if missing) and read back once at `init`, then
/// held by the store. A first-contact `get` clones that value; it never goes
/// back to the database looking for DEFAULT.
///
/// Writes are last-write-wins. Two tasks writing the same user id at once can
/// lose one of the updates; callers rely on a user's own messages arriving in
/// order.
pub struct HistoryStore {
    pool: DbPool,
    default: Transcript,
}

fn unavailable(op: &str, user_id: &str, e: sqlx::Error) -> StoreError {
    error!("History {} failed for {}: {}", op, user_id, e);
    StoreError::Unavailable(e)
}

impl HistoryStore {
    pub async fn init(pool: DbPool, seed: &Transcript) -> Result<Self, StoreError> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS history (
                id TEXT PRIMARY KEY NOT NULL,
                template TEXT NOT NULL
            )"#,
        )
        .execute(pool.get_pool())
        .await
        .map_err(|e| unavailable("init", DEFAULT_ID, e))?;

        sqlx::query("INSERT OR IGNORE INTO history (id, template) VALUES (?, ?)")
            .bind(DEFAULT_ID)
            .bind(seed.to_json()?)
            .execute(pool.get_pool())
            .await
            .map_err(|e| unavailable("init", DEFAULT_ID, e))?;

        let row = sqlx::query_as::<_, HistoryRow>("SELECT id, template FROM history WHERE id = ?")
            .bind(DEFAULT_ID)
            .fetch_one(pool.get_pool())
            .await
            .map_err(|e| unavailable("init", DEFAULT_ID, e))?;

        let default = decode(row)?;
        debug!("History store ready, DEFAULT has {} turns", default.len());

        Ok(Self { pool, default })
    }

    /// The seed transcript new conversations are cloned from.
    pub fn default_transcript(&self) -> &Transcript {
        &self.default
    }

    /// Insert or overwrite the transcript of `user_id`.
    pub async fn put(&self, user_id: &str, transcript: &Transcript) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO history (id, template) VALUES (?, ?)
               ON CONFLICT(id) DO UPDATE SET template = excluded.template"#,
        )
        .bind(user_id)
        .bind(transcript.to_json()?)
        .execute(self.pool.get_pool())
        .await
        .map_err(|e| unavailable("put", user_id, e))?;

        debug!("Stored {} turns for {}", transcript.len(), user_id);
        Ok(())
    }

    /// Stored transcript of `user_id`; on first contact a fresh copy of
    /// DEFAULT is persisted and returned.
    pub async fn get(&self, user_id: &str) -> Result<Transcript, StoreError> {
        let row = sqlx::query_as::<_, HistoryRow>("SELECT id, template FROM history WHERE id = ?")
            .bind(user_id)
            .fetch_optional(self.pool.get_pool())
            .await
            .map_err(|e| unavailable("get", user_id, e))?;

        match row {
            Some(row) => decode(row),
            None => {
                warn!("Chat with user {} not found. Creating a new one.", user_id);
                let fresh = self.default.clone();
                self.put(user_id, &fresh).await?;
                Ok(fresh)
            }
        }
    }

    /// Wipe the conversation of `user_id` back to DEFAULT.
    pub async fn reset(&self, user_id: &str) -> Result<Transcript, StoreError> {
        let fresh = self.default.clone();
        self.put(user_id, &fresh).await?;
        Ok(fresh)
    }
}

fn decode(row: HistoryRow) -> Result<Transcript, StoreError> {
    Transcript::from_json(&row.template).map_err(|source| {
        error!("Stored transcript for {} is corrupt: {}", row.id, source);
        StoreError::Corrupt { id: row.id, source }
    })
}
