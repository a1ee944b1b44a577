//! Contracts of the model services the router talks to.

use anyhow::Result;

use crate::models::{GenerationConfig, Transcript};

/// Turns text into a vector comparable with the action catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn encode(&self, text: &str) -> Result<Vec<f32>>;
}

/// Scores of one decoding step: the score of the emitted token and those of
/// every candidate the backend reported for that step.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenScores {
    pub chosen: f32,
    pub candidates: Vec<f32>,
}

/// What the numbers in [`TokenScores`] are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreKind {
    /// Raw logits over the whole vocabulary; `candidates` is every token.
    Logits,
    /// Log-probabilities already normalized over the whole vocabulary;
    /// `candidates` may be a truncated top-n list.
    LogProbs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    /// One entry per generated token; present only when requested.
    pub scores: Option<Vec<TokenScores>>,
    pub score_kind: ScoreKind,
}

/// What the generation backend runs on.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeCapability {
    pub device: String,
    pub accelerated: bool,
}

/// The heavy, device-bound model. Implementations are not expected to be
/// safe under concurrent calls; go through `GenerationQueue`.
#[async_trait::async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(
        &self,
        transcript: &Transcript,
        config: &GenerationConfig,
        with_scores: bool,
    ) -> Result<Generation>;

    async fn probe(&self) -> Result<ComputeCapability>;
}
