//! Hand-written fakes shared by the service and handler tests.

use anyhow::Result;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::database::{DbPool, HistoryStore, SessionTracker};
use crate::models::{GenerationConfig, Transcript};
use crate::services::providers::{
    ComputeCapability, Generation, GenerationProvider, ScoreKind, TokenScores,
};

/// Returns the same text on every call and records how it was called.
pub struct ScriptedGenerator {
    text: String,
    scores: Option<Vec<TokenScores>>,
    calls: AtomicUsize,
    last_with_scores: AtomicBool,
    last_config: Mutex<Option<GenerationConfig>>,
}

impl ScriptedGenerator {
    pub fn new(text: &str, scores: Option<Vec<TokenScores>>) -> Self {
        Self {
            text: text.to_string(),
            scores,
            calls: AtomicUsize::new(0),
            last_with_scores: AtomicBool::new(false),
            last_config: Mutex::new(None),
        }
    }

    /// One decoding step whose chosen token has probability `confidence`.
    /// Only the chosen token is reported, as a top-1 logprob list would.
    pub fn with_confidence(text: &str, confidence: f32) -> Self {
        let step = TokenScores {
            chosen: confidence.ln(),
            candidates: vec![confidence.ln()],
        };
        Self::new(text, Some(vec![step]))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_with_scores(&self) -> bool {
        self.last_with_scores.load(Ordering::SeqCst)
    }

    pub fn last_config(&self) -> Option<GenerationConfig> {
        self.last_config.lock().clone()
    }
}

#[async_trait::async_trait]
impl GenerationProvider for ScriptedGenerator {
    async fn generate(
        &self,
        _transcript: &Transcript,
        config: &GenerationConfig,
        with_scores: bool,
    ) -> Result<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_with_scores.store(with_scores, Ordering::SeqCst);
        *self.last_config.lock() = Some(config.clone());

        Ok(Generation {
            text: self.text.clone(),
            scores: if with_scores { self.scores.clone() } else { None },
            score_kind: ScoreKind::LogProbs,
        })
    }

    async fn probe(&self) -> Result<ComputeCapability> {
        Ok(ComputeCapability { device: "cuda:0".into(), accelerated: true })
    }
}

/// History and session stores over one shared in-memory database. The pool
/// is returned so tests can take the database away.
pub async fn memory_stores() -> (DbPool, HistoryStore, SessionTracker) {
    let pool = DbPool::in_memory().await.unwrap();
    let history = HistoryStore::init(pool.clone(), &Transcript::seed()).await.unwrap();
    let sessions = SessionTracker::init(pool.clone(), 30).await.unwrap();
    (pool, history, sessions)
}

/// Generates fine but closes the database while doing so, so the write that
/// follows the generation fails.
pub struct DbClosingGenerator {
    pub pool: DbPool,
}

#[async_trait::async_trait]
impl GenerationProvider for DbClosingGenerator {
    async fn generate(
        &self,
        _transcript: &Transcript,
        _config: &GenerationConfig,
        _with_scores: bool,
    ) -> Result<Generation> {
        self.pool.close().await;
        Ok(Generation {
            text: "never stored".to_string(),
            scores: None,
            score_kind: ScoreKind::LogProbs,
        })
    }

    async fn probe(&self) -> Result<ComputeCapability> {
        Ok(ComputeCapability { device: "cuda:0".into(), accelerated: true })
    }
}
