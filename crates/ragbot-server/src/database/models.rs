use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::utils::error::StoreError;

#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub id: String,
    pub template: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: String,
    pub config: String,
    pub last_access: i64, // unix millis
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: String,
    pub config_tag: String,
    pub last_access: DateTime<Utc>,
}

impl TryFrom<SessionRow> for Session {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let last_access = DateTime::<Utc>::from_timestamp_millis(row.last_access).ok_or_else(|| {
            StoreError::InvalidTimestamp {
                id: row.id.clone(),
                millis: row.last_access,
            }
        })?;

        Ok(Self {
            user_id: row.id,
            config_tag: row.config,
            last_access,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ActionRow {
    pub action_id: i64,
    pub action_name: String,
    pub embedding: String, // JSON array of floats
}
