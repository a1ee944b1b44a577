use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{Transcript, Turn};

use super::confidence::mean_confidence;
use super::generation_queue::GenerationQueue;
use super::generation_settings::GenerationSettings;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    /// What the user gets to see
    pub text: String,
    pub updated_transcript: Transcript,
    pub confidence: Option<f32>,
}

/// Generation wrapper with the confidence gate.
pub struct Responder {
    queue: GenerationQueue,
    settings: Arc<GenerationSettings>,
    fallback: String,
}

impl Responder {
    pub fn new(queue: GenerationQueue, settings: Arc<GenerationSettings>, fallback: String) -> Self {
        Self { queue, settings, fallback }
    }

    /// Generate one assistant turn for `user_message`.
    ///
    /// With `min_confidence > 0` the backend must return per-token scores; a
    /// reply whose mean token probability falls short is replaced by the
    /// fallback text for display only. The returned transcript always records
    /// what the model actually produced.
    pub async fn reply(
        &self,
        transcript: &Transcript,
        user_message: &str,
        min_confidence: f32,
    ) -> Result<GenerationResult> {
        let mut working = transcript.clone();
        working.push(Turn::user(user_message));

        let gated = min_confidence > 0.0;
        let config = self.settings.snapshot().value;
        let generation = self.queue.generate(working.clone(), config, gated).await?;

        let confidence = if gated {
            let scores = generation
                .scores
                .as_deref()
                .ok_or_else(|| anyhow!("Confidence gate enabled but no token scores returned"))?;
            Some(mean_confidence(scores, generation.score_kind))
        } else {
            None
        };

        let text = match confidence {
            Some(c) if c < min_confidence => {
                info!("Low confidence reply ({:.3} < {:.3}), using fallback", c, min_confidence);
                self.fallback.clone()
            }
            _ => generation.text.clone(),
        };

        working.push(Turn::assistant(generation.text));
        debug!("Reply generated, transcript now {} turns", working.len());

        Ok(GenerationResult {
            text,
            updated_transcript: working,
            confidence,
        })
    }
}
