use super::{ActionRow, DbPool};
use anyhow::{Context, Result};
use tracing::debug;

/// Join of action definitions with their reference vectors, ordered by id.
pub async fn fetch_action_rows(pool: &DbPool) -> Result<Vec<ActionRow>> {
    let rows = sqlx::query_as::<_, ActionRow>(
        r#"SELECT a.action_id, a.action_name, e.embedding
           FROM actions a
           JOIN embeddings e ON a.action_id = e.id
           ORDER BY a.action_id"#,
    )
    .fetch_all(pool.get_pool())
    .await
    .context("Failed to load action catalog")?;

    debug!("Fetched {} action rows", rows.len());
    Ok(rows)
}

/// Parse a stored reference vector (JSON array of floats).
pub fn parse_embedding(raw: &str) -> Result<Vec<f32>> {
    let vector: Vec<f32> = serde_json::from_str(raw).context("Embedding is not a JSON float array")?;
    if vector.is_empty() {
        anyhow::bail!("Embedding is empty");
    }
    // Out-of-range JSON numbers become inf when narrowed to f32
    if vector.iter().any(|v| !v.is_finite()) {
        anyhow::bail!("Embedding contains non-finite values");
    }
    Ok(vector)
}

#[cfg(test)]
pub(crate) async fn seed_catalog(pool: &DbPool, actions: &[(i64, &str, &str)]) {
    sqlx::query("CREATE TABLE actions (action_id INTEGER PRIMARY KEY, action_name TEXT NOT NULL)")
        .execute(pool.get_pool())
        .await
        .unwrap();
    sqlx::query("CREATE TABLE embeddings (id INTEGER PRIMARY KEY, embedding TEXT NOT NULL)")
        .execute(pool.get_pool())
        .await
        .unwrap();

    for (id, name, embedding) in actions {
        sqlx::query("INSERT INTO actions (action_id, action_name) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(pool.get_pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO embeddings (id, embedding) VALUES (?, ?)")
            .bind(id)
            .bind(embedding)
            .execute(pool.get_pool())
            .await
            .unwrap();
    }
}
