use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::database::catalog::{fetch_action_rows, parse_embedding};
use crate::database::DbPool;
use crate::utils::cosine_similarity;

/// A scripted intent and its reference vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub id: i64,
    pub name: String,
    pub reference_vector: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub score: f32,
    pub index: usize,
}

/// In-memory action catalog. Loaded once at startup, read-only afterwards.
#[derive(Debug, Default)]
pub struct ActionCatalog {
    actions: Vec<Action>,
}

impl ActionCatalog {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub async fn load(pool: &DbPool) -> Result<Self> {
        let rows = fetch_action_rows(pool).await?;

        let actions = rows
            .into_iter()
            .map(|row| {
                let reference_vector = parse_embedding(&row.embedding)
                    .with_context(|| format!("Bad reference vector for action {}", row.action_id))?;
                Ok(Action {
                    id: row.action_id,
                    name: row.action_name,
                    reference_vector,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!("Action catalog loaded: {} actions", actions.len());
        Ok(Self::new(actions))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Action> {
        self.actions.get(index)
    }

    pub fn find_by_id(&self, id: i64) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// Best cosine match for `query`. Linear scan; on equal scores the
    /// earliest action wins. Vectors of another dimension are skipped.
    pub fn search(&self, query: &[f32]) -> Option<SearchHit> {
        let mut best: Option<SearchHit> = None;

        for (index, action) in self.actions.iter().enumerate() {
            let score = match cosine_similarity(query, &action.reference_vector) {
                Ok(score) => score,
                Err(e) => {
                    warn!("Skipping action {} ({}): {}", action.id, action.name, e);
                    continue;
                }
            };

            if best.map_or(true, |b| score > b.score) {
                best = Some(SearchHit { score, index });
            }
        }

        best
    }

    /// The action `query` triggers, if its best score reaches `threshold`.
    pub fn classify(&self, query: &[f32], threshold: f32) -> Option<(&Action, f32)> {
        let hit = self.search(query)?;
        if hit.score < threshold {
            return None;
        }
        self.get(hit.index).map(|action| (action, hit.score))
    }
}
